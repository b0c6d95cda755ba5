use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Malformed series: {0}")]
    MalformedSeries(String),

    #[error("Invalid bin count: {0}")]
    InvalidBinCount(usize),
}
