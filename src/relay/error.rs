use std::time::Duration;

use thiserror::Error;

/// Error types for the retrieval pipeline
///
/// Only `MissingText` and `UnsupportedLanguage` are meant to reach a caller.
/// Every other variant describes a single tier attempt and is absorbed by the
/// retrying executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The request carried no text to look up
    #[error("Missing text parameter")]
    MissingText,
    /// Strict language validation rejected an ISO code
    #[error("Unsupported language code: {0}")]
    UnsupportedLanguage(String),
    /// Connection, DNS or TLS failure talking to the upstream service
    #[error("Network error: {0}")]
    Network(String),
    /// Upstream answered with a non-success HTTP status
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },
    /// Upstream payload did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
    /// Headless browser launch, navigation or extraction failure
    #[error("Browser error: {0}")]
    Browser(String),
    /// A tier attempt ran past its wall-clock budget
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Errors caused by the caller's input rather than by the pipeline.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RelayError::MissingText | RelayError::UnsupportedLanguage(_)
        )
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RelayError::Parse(err.to_string())
        } else {
            RelayError::Network(err.to_string())
        }
    }
}

/// Result type for pipeline operations
pub type RelayResult<T> = Result<T, RelayError>;
