//! dashker server
//!
//! Serves the container dashboard API: REST routes for listing and
//! lifecycle verbs, and WebSocket routes streaming logs, terminals,
//! stats and lifecycle events from the local container runtime.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dashker_core::Config;
use dashker_core::config::load_config;
use dashker_core::tracing_init::{default_filter, init_tracing};
use dashker_server::api::{AppState, build_router};
use dashker_server::runtime::{DockerClient, RuntimeClient};

#[derive(Parser, Debug)]
#[command(name = "dashker")]
#[command(version, about = "dashker - container dashboard server")]
struct Args {
    /// Configuration file (JSON), applied over the global settings file
    #[arg(long, env = "DASHKER_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    addr: Option<String>,

    /// Origin allowed to open socket sessions (repeatable)
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,

    /// Path to the container runtime's Unix socket
    #[arg(long)]
    docker_socket: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long, env = "DASHKER_LOG_JSON")]
    log_json: bool,
}

impl Args {
    /// CLI flags take precedence over every other source.
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = &self.addr {
            config.server.listen_addr.clone_from(addr);
        }
        if !self.allowed_origins.is_empty() {
            config.server.allowed_origins.clone_from(&self.allowed_origins);
        }
        if let Some(path) = &self.docker_socket {
            config.runtime.socket_path.clone_from(path);
        }
        if let Some(level) = &self.log_level {
            config.server.log_level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    init_tracing(&default_filter(&config.server.log_level), args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.listen_addr,
        socket = %config.runtime.socket_path.display(),
        origins = ?config.server.allowed_origins,
        "Starting dashker"
    );

    let runtime = Arc::new(
        DockerClient::from_config(&config.runtime).with_max_line_bytes(config.streams.max_frame_bytes),
    );
    if let Err(e) = runtime.ping().await {
        warn!(error = %e, "Container runtime not reachable yet; serving anyway");
    }

    let shutdown = CancellationToken::new();
    let state = AppState::new(runtime, &config, shutdown.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    info!(addr = %listener.local_addr()?, "Server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("dashker stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM and cancel open sessions.
async fn shutdown_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        () = sigterm => {
            info!("Received SIGTERM shutdown signal");
        }
    }
    shutdown.cancel();
}
