pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod report;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use auth::{TokenChain, TokenProvider};
pub use config::AppConfig;
pub use error::ClientError;
pub use notify::{Notifier, TracingNotifier};
pub use report::ReportFlow;
pub use session::{ChatSession, ChatSnapshot, QueryOutcome, UploadOutcome};
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::{AnalysisReport, ChartKind, ChartSource, ConversationTurn, DatasetFile, Role};
