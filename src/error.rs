use thiserror::Error;

/// Failures that abort a tap run.
///
/// Parse anomalies (short rows, extra values, malformed dates) are not errors;
/// rows pass through with whatever values they carry.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write message: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize message: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TapError>;
