//! Record types produced by the demultiplexers.

use serde::Serialize;
use uuid::Uuid;

/// Output stream a record was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdin => "stdin",
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// One decoded log record, as pushed to clients.
///
/// `id` is generated locally for each record and carries no ordering or
/// deduplication meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Timestamp text as written by the runtime; empty when timestamps are off.
    pub timestamp: String,
    pub message: String,
    pub id: String,
    #[serde(skip)]
    pub stream: StreamKind,
}

impl LogRecord {
    pub fn new(stream: StreamKind, timestamp: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            message: message.into(),
            id: Uuid::new_v4().to_string(),
            stream,
        }
    }

    /// Compare everything except the generated id.
    pub fn same_content(&self, other: &Self) -> bool {
        self.stream == other.stream && self.timestamp == other.timestamp && self.message == other.message
    }
}
