//! Error types for the docflow-core library.

use thiserror::Error;

/// Main error type for the docflow library.
#[derive(Error, Debug)]
pub enum DocflowError {
    /// Network or authentication failure talking to storage or the job service.
    #[error("transport error: {0}")]
    Transport(String),

    /// A local file or folder does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed JSON or an unparseable URI.
    #[error("parse error: {0}")]
    Parse(String),

    /// An expected key is absent from a job output document.
    #[error("unexpected output shape: {0}")]
    DataShape(String),

    /// A job did not reach a terminal state within the configured wait.
    #[error("job {handle} still running after {waited_secs}s")]
    Timeout { handle: String, waited_secs: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for DocflowError {
    fn from(err: serde_json::Error) -> Self {
        DocflowError::Parse(err.to_string())
    }
}

impl DocflowError {
    /// Build a data-shape error for a missing key.
    pub fn missing(path: impl std::fmt::Display) -> Self {
        DocflowError::DataShape(format!("missing `{}`", path))
    }
}

/// Result type for the docflow library.
pub type Result<T> = std::result::Result<T, DocflowError>;
