//! Shared fixtures for dashker-server integration tests.
#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::{StreamExt, stream};
use tokio::io::DuplexStream;
use tokio_util::sync::CancellationToken;

use dashker_core::Config;
use dashker_core::mux::{FrameKind, StreamKind, encode_frame};
use dashker_server::api::{AppState, build_router};
use dashker_server::runtime::{
    ContainerFilter, ContainerInfo, ContainerSummary, EventStream, ExecConfig, ExecSession,
    ExecState, LogOptions, LogStream, Result, RuntimeClient, RuntimeError, RuntimeEvent,
    StatsStream,
};

pub const DASHBOARD: &str = "http://localhost:3000";

/// Runtime stub with canned answers.
#[derive(Default)]
pub struct StubRuntime {
    pub containers: Vec<ContainerSummary>,
    pub logs: Vec<u8>,
    pub events: Vec<RuntimeEvent>,
    pub exec_io: Mutex<Option<DuplexStream>>,
    pub verb_status: Option<u16>,
    pub calls: Mutex<Vec<String>>,
}

impl StubRuntime {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn verb(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.verb_status {
            Some(404) => Err(RuntimeError::Api {
                status: 404,
                message: "No such container".into(),
            }),
            Some(status) => Err(RuntimeError::Api {
                status,
                message: "engine failure".into(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RuntimeClient for StubRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_containers(&self, filter: &ContainerFilter) -> Result<Vec<ContainerSummary>> {
        Ok(self
            .containers
            .iter()
            .filter(|c| filter.id.as_ref().is_none_or(|id| c.id.starts_with(id.as_str())))
            .cloned()
            .collect())
    }

    async fn inspect(&self, id: &str) -> Result<ContainerInfo> {
        Ok(serde_json::from_value(serde_json::json!({
            "Id": id,
            "State": { "Status": "running", "Running": true },
            "Config": { "Tty": false, "Image": "alpine" },
        }))
        .unwrap())
    }

    async fn open_log_stream(&self, _id: &str, _options: &LogOptions) -> Result<LogStream> {
        Ok(Box::new(std::io::Cursor::new(self.logs.clone())))
    }

    async fn open_exec_session(&self, _id: &str, _config: &ExecConfig) -> Result<ExecSession> {
        let io = self
            .exec_io
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| RuntimeError::Upgrade("exec unavailable".into()))?;
        Ok(ExecSession {
            id: "exec1".into(),
            io: Box::new(io),
        })
    }

    async fn inspect_exec(&self, _exec_id: &str) -> Result<ExecState> {
        Ok(ExecState {
            running: true,
            exit_code: None,
        })
    }

    async fn subscribe_events(&self, _since: SystemTime) -> Result<EventStream> {
        Ok(stream::iter(self.events.clone().into_iter().map(Ok)).boxed())
    }

    async fn open_stats_stream(&self, _id: &str) -> Result<StatsStream> {
        Ok(stream::empty().boxed())
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.verb(format!("start {id}"))
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        self.verb(format!("stop {id}"))
    }

    async fn restart_container(&self, id: &str) -> Result<()> {
        self.verb(format!("restart {id}"))
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        self.verb(format!("remove {id} force={force}"))
    }
}

pub fn summary(id: &str, name: &str) -> ContainerSummary {
    serde_json::from_value(serde_json::json!({
        "Id": id,
        "Names": [format!("/{name}")],
        "Image": "nginx:alpine",
        "State": "running",
        "Status": "Up 5 minutes",
        "Labels": { "tier": "web" },
    }))
    .unwrap()
}

pub fn event(kind: &str, action: &str, id: &str) -> RuntimeEvent {
    serde_json::from_value(serde_json::json!({
        "Type": kind,
        "Action": action,
        "Actor": { "ID": id, "Attributes": { "name": "web" } },
        "time": 1_700_000_000,
    }))
    .unwrap()
}

pub fn stdout_frames(messages: &[&str]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    for message in messages {
        let payload = format!("2024-01-01T00:00:00.000000000Z {message}");
        encode_frame(FrameKind::Stream(StreamKind::Stdout), payload.as_bytes(), &mut buf).unwrap();
    }
    buf.to_vec()
}

pub fn app_state(runtime: Arc<StubRuntime>) -> AppState {
    AppState::new(runtime, &Config::default(), CancellationToken::new())
}

/// Serve the full router on an ephemeral port.
pub async fn spawn_server(runtime: Arc<StubRuntime>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(app_state(runtime));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
