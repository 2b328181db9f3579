//! Runtime client error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from talking to the container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("cannot connect to runtime at {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    /// The runtime answered with an error status.
    #[error("runtime returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode runtime response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("runtime stream failed: {0}")]
    Stream(String),

    #[error("connection upgrade failed: {0}")]
    Upgrade(String),

    #[error("invalid container id: {0:?}")]
    InvalidId(String),
}

impl RuntimeError {
    /// HTTP status reported by the runtime, if any.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}
