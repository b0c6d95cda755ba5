//! Chart pipeline for datasage analysis reports.
//!
//! Turns the analysis service's chart descriptions into renderer-ready
//! series: equal-width histogram binning, per-kind adaptation, the display
//! policy that picks which charts are shown, and markdown export.

pub mod adapter;
pub mod binning;
pub mod error;
pub mod policy;
pub mod reports;

pub use adapter::{ChartAdapter, RenderKind, RenderableChart, Series, SeriesData};
pub use binning::{compute_histogram, Histogram, DEFAULT_BIN_COUNT};
pub use error::ChartError;
pub use policy::DisplayPolicy;
pub use reports::ReportGenerator;
