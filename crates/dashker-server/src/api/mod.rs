//! HTTP and WebSocket surface.

mod error;
pub mod routes;
pub mod sockets;

use std::sync::Arc;

use axum::extract::FromRef;
use tokio_util::sync::CancellationToken;

use dashker_core::Config;
use dashker_core::config::StreamConfig;

use crate::runtime::RuntimeClient;
use crate::session::OriginPolicy;

pub use error::ApiError;
pub use routes::build_router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<dyn RuntimeClient>,
    pub origins: OriginPolicy,
    pub streams: Arc<StreamConfig>,
    /// Cancelled on server shutdown so open sessions wind down.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(runtime: Arc<dyn RuntimeClient>, config: &Config, shutdown: CancellationToken) -> Self {
        Self {
            runtime,
            origins: OriginPolicy::new(&config.server.allowed_origins),
            streams: Arc::new(config.streams.clone()),
            shutdown,
        }
    }
}

impl FromRef<AppState> for OriginPolicy {
    fn from_ref(state: &AppState) -> Self {
        state.origins.clone()
    }
}
