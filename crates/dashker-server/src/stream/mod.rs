//! Streaming components relaying runtime I/O to client sessions.
//!
//! - [`LogRelay`]: historical + live logs, one JSON record per message
//! - [`TerminalProxy`]: bidirectional byte pumps for an interactive exec
//! - [`EventFilter`]: container lifecycle events (start/stop/destroy)
//! - [`StatsRelay`]: live resource usage samples

pub mod events;
pub mod liveness;
pub mod logs;
pub mod stats;
pub mod terminal;

use thiserror::Error;

use crate::runtime::RuntimeError;
use crate::session::SessionError;

pub use events::EventFilter;
pub use liveness::{Liveness, LivenessMonitor};
pub use logs::LogRelay;
pub use stats::StatsRelay;
pub use terminal::{TerminalProxy, Termination};

/// Why a stream ended abnormally.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("log decoding failed: {0}")]
    Decode(#[from] dashker_core::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}
