use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid transition: cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("Upload failed: {0}")]
    UploadFailure(TransportError),

    #[error("Query failed: {0}")]
    QueryFailure(TransportError),

    #[error("Report generation failed: {0}")]
    ReportFailure(TransportError),

    #[error("A report request is already in flight")]
    ReportInFlight,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
