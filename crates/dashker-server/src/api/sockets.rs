//! WebSocket handlers, one streaming component per route.
//!
//! Every handler takes [`CheckedOrigin`] first, so handshakes from
//! origins outside the allow-list are refused before the upgrade.

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ApiError, AppState};
use crate::runtime::validate_id;
use crate::session::{self, CheckedOrigin, SocketSink, WsSink, cancel_on_close};
use crate::stream::{EventFilter, LogRelay, StatsRelay, StreamError, TerminalProxy};

/// `GET /ws/container/{id}/logs`
pub async fn logs(
    _origin: CheckedOrigin,
    Path(id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    validate_id(&id)?;
    Ok(ws.on_upgrade(move |socket| async move {
        let mut push = PushSession::open(socket, &state);
        let relay = LogRelay::new(state.runtime.clone(), &state.streams);
        let result = relay.run(&id, &mut push.sink, &push.cancel).await;
        log_outcome("logs", &id, &result);
        push.finish().await;
    }))
}

/// `GET /ws/container/{id}/stats`
pub async fn stats(
    _origin: CheckedOrigin,
    Path(id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    validate_id(&id)?;
    Ok(ws.on_upgrade(move |socket| async move {
        let mut push = PushSession::open(socket, &state);
        let relay = StatsRelay::new(state.runtime.clone());
        let result = relay.run(&id, &mut push.sink, &push.cancel).await;
        log_outcome("stats", &id, &result);
        push.finish().await;
    }))
}

/// `GET /ws/container/events`
pub async fn events(
    _origin: CheckedOrigin,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let mut push = PushSession::open(socket, &state);
        let filter = EventFilter::new(state.runtime.clone());
        let result = filter.run(&mut push.sink, &push.cancel).await;
        log_outcome("events", "", &result);
        push.finish().await;
    })
}

/// `GET /ws/container/{id}/terminal`
pub async fn terminal(
    _origin: CheckedOrigin,
    Path(id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    validate_id(&id)?;
    Ok(ws.on_upgrade(move |socket| async move {
        let (mut sink, source) = session::split(socket);
        let proxy = TerminalProxy::new(state.runtime.clone(), &state.streams);
        match proxy.attach(&id).await {
            Ok(exec) => {
                let cancel = state.shutdown.child_token();
                proxy.pump(&id, exec, sink, source, &cancel).await;
            }
            Err(e) => {
                warn!(container_id = %id, error = %e, "Terminal session failed to start");
                if let Err(e) = sink.close().await {
                    debug!(error = %e, "Failed to close client session");
                }
            }
        }
    }))
}

/// A push-only session: the client never sends data, but closing its
/// end cancels the stream.
struct PushSession {
    sink: WsSink,
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
}

impl PushSession {
    fn open(socket: WebSocket, state: &AppState) -> Self {
        let (sink, source) = session::split(socket);
        let cancel = state.shutdown.child_token();
        let watcher = cancel_on_close(source, cancel.clone());
        Self {
            sink,
            cancel,
            watcher,
        }
    }

    async fn finish(mut self) {
        self.cancel.cancel();
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "Failed to close client session");
        }
        self.watcher.abort();
    }
}

fn log_outcome(kind: &str, container_id: &str, result: &Result<u64, StreamError>) {
    match result {
        Ok(sent) => info!(kind, container_id, sent, "Stream ended"),
        Err(e) => warn!(kind, container_id, error = %e, "Stream failed"),
    }
}
