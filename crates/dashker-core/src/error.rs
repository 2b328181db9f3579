//! Error types for `dashker` core library.

use thiserror::Error;

/// Result type alias using `dashker` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `dashker` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed multiplexed frame
    #[error("Malformed frame: {0}")]
    Frame(String),

    /// The runtime wrote an error onto its system stream
    #[error("Runtime reported an error: {0}")]
    RuntimeReported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
