use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TenderError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Stored value is corrupt: {0}")]
    CorruptStoredValue(String),

    #[error("Export failed: {0}")]
    Export(#[from] ExportFailure),

    #[error("TenderError: {0}")]
    Custom(String),
}

/// Why an export attempt did not produce a download.
///
/// Cloneable so the exporter can keep the last failure in its state for the UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportFailure {
    #[error("backend responded with HTTP {status}")]
    RequestFailed { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("no response within {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("could not save the file: {0}")]
    Delivery(String),

    #[error("export was cancelled")]
    Cancelled,

    #[error("could not encode the result: {0}")]
    Encode(String),
}

impl ExportFailure {
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ExportFailure::Timeout(timeout)
        } else if let Some(status) = error.status() {
            ExportFailure::RequestFailed { status: status.as_u16() }
        } else {
            ExportFailure::Network(error.to_string())
        }
    }

    /// Whether pressing export again could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExportFailure::Encode(_))
    }
}

impl From<std::io::Error> for TenderError {
    fn from(error: std::io::Error) -> Self {
        TenderError::Io(Box::new(error))
    }
}
