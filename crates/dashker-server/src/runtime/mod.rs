//! Container runtime access.
//!
//! [`RuntimeClient`] is the seam between the streaming components and the
//! container engine. [`DockerClient`] implements it over the Docker Engine
//! API; tests substitute a scripted fake.

mod docker;
mod error;
mod types;

use std::time::SystemTime;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

pub use docker::DockerClient;
pub use error::RuntimeError;
pub use types::*;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Raw byte source of a container's logs.
pub type LogStream = Box<dyn AsyncRead + Send + Unpin>;

pub type EventStream = BoxStream<'static, Result<RuntimeEvent>>;

pub type StatsStream = BoxStream<'static, Result<Value>>;

/// Full-duplex byte channel attached to an exec session.
pub trait ExecIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ExecIo for T {}

/// An attached exec session. Dropping it closes the attachment.
pub struct ExecSession {
    pub id: String,
    pub io: Box<dyn ExecIo>,
}

impl std::fmt::Debug for ExecSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecSession").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Operations dashker needs from a container runtime.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// Cheap reachability check.
    async fn ping(&self) -> Result<()>;

    async fn list_containers(&self, filter: &ContainerFilter) -> Result<Vec<ContainerSummary>>;

    async fn inspect(&self, id: &str) -> Result<ContainerInfo>;

    /// Historical output (per `options.tail`) followed by live output when
    /// `options.follow` is set.
    async fn open_log_stream(&self, id: &str, options: &LogOptions) -> Result<LogStream>;

    /// Create an exec session and attach to it.
    async fn open_exec_session(&self, id: &str, config: &ExecConfig) -> Result<ExecSession>;

    async fn inspect_exec(&self, exec_id: &str) -> Result<ExecState>;

    /// Lifecycle events published at or after `since`.
    async fn subscribe_events(&self, since: SystemTime) -> Result<EventStream>;

    /// Live resource usage samples, one JSON document each.
    async fn open_stats_stream(&self, id: &str) -> Result<StatsStream>;

    async fn start_container(&self, id: &str) -> Result<()>;

    async fn stop_container(&self, id: &str) -> Result<()>;

    async fn restart_container(&self, id: &str) -> Result<()>;

    async fn remove_container(&self, id: &str, force: bool) -> Result<()>;
}

/// Reject ids that could escape the runtime's URL path.
pub fn validate_id(id: &str) -> Result<&str> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        && id != "."
        && id != "..";
    if valid {
        Ok(id)
    } else {
        Err(RuntimeError::InvalidId(id.to_string()))
    }
}
