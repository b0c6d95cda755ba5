//! Chart source → renderer-ready chart.

use datasage_core::types::ChartSource;
use serde::{Deserialize, Serialize};

use crate::binning::{compute_histogram, DEFAULT_BIN_COUNT};
use crate::error::ChartError;

/// Chart types the renderer draws. Histograms are drawn as bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    Bar,
    Scatter,
    Heatmap,
}

/// One heatmap cell: column label and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatCell {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesData {
    Values(Vec<f64>),
    Counts(Vec<u64>),
    Points(Vec<[f64; 2]>),
    Cells(Vec<HeatCell>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Values(v) => v.len(),
            SeriesData::Counts(v) => v.len(),
            SeriesData::Points(v) => v.len(),
            SeriesData::Cells(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub data: SeriesData,
}

impl Series {
    fn new(name: impl Into<String>, data: SeriesData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Normalized chart: what an external renderer needs and nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderableChart {
    pub kind: RenderKind,
    pub title: String,
    pub series: Vec<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Adapts chart sources one at a time.
#[derive(Debug, Clone, Copy)]
pub struct ChartAdapter {
    bin_count: usize,
}

impl Default for ChartAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_BIN_COUNT)
    }
}

impl ChartAdapter {
    pub fn new(bin_count: usize) -> Self {
        Self { bin_count }
    }

    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// `Ok(None)` for kinds with no renderer form (box plots, unknown kinds).
    pub fn adapt(&self, source: &ChartSource) -> Result<Option<RenderableChart>, ChartError> {
        let chart = match source {
            ChartSource::Bar {
                title,
                values,
                labels,
            } => {
                if let Some(labels) = labels {
                    if labels.len() != values.len() {
                        return Err(ChartError::MalformedSeries(format!(
                            "{}: {} labels for {} values",
                            title,
                            labels.len(),
                            values.len()
                        )));
                    }
                }
                RenderableChart {
                    kind: RenderKind::Bar,
                    title: title.clone(),
                    series: vec![Series::new("Values", SeriesData::Values(values.clone()))],
                    categories: labels.clone(),
                }
            }
            ChartSource::Histogram { title, values } => {
                let histogram = compute_histogram(values, self.bin_count)?;
                RenderableChart {
                    kind: RenderKind::Bar,
                    title: title.clone(),
                    series: vec![Series::new("Frequency", SeriesData::Counts(histogram.frequencies))],
                    categories: Some(histogram.categories),
                }
            }
            ChartSource::Scatter { title, x, y } => {
                if x.len() != y.len() {
                    return Err(ChartError::MalformedSeries(format!(
                        "{}: x has {} points, y has {}",
                        title,
                        x.len(),
                        y.len()
                    )));
                }
                let points = x.iter().zip(y).map(|(&x, &y)| [x, y]).collect();
                RenderableChart {
                    kind: RenderKind::Scatter,
                    title: title.clone(),
                    series: vec![Series::new("Correlation", SeriesData::Points(points))],
                    categories: None,
                }
            }
            ChartSource::Heatmap { title, x, y, z } => {
                if z.len() != y.len() {
                    return Err(ChartError::MalformedSeries(format!(
                        "{}: {} rows for {} row labels",
                        title,
                        z.len(),
                        y.len()
                    )));
                }
                if let Some((i, row)) = z.iter().enumerate().find(|(_, row)| row.len() != x.len()) {
                    return Err(ChartError::MalformedSeries(format!(
                        "{}: row {} has {} cells for {} columns",
                        title,
                        i,
                        row.len(),
                        x.len()
                    )));
                }
                let series = y
                    .iter()
                    .zip(z)
                    .map(|(name, row)| {
                        let cells = x
                            .iter()
                            .zip(row)
                            .map(|(label, &value)| HeatCell {
                                x: label.clone(),
                                y: value,
                            })
                            .collect();
                        Series::new(name.clone(), SeriesData::Cells(cells))
                    })
                    .collect();
                RenderableChart {
                    kind: RenderKind::Heatmap,
                    title: title.clone(),
                    series,
                    categories: None,
                }
            }
            ChartSource::BoxPlot { .. } | ChartSource::Other { .. } => return Ok(None),
        };
        Ok(Some(chart))
    }
}
