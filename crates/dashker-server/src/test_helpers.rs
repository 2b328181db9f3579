//! Shared test helpers: a scripted runtime and in-memory socket sessions.
#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, stream};
use serde_json::Value;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use dashker_core::mux::{FrameKind, StreamKind, encode_frame};

use crate::runtime::{
    ContainerFilter, ContainerInfo, ContainerSummary, EventStream, ExecConfig, ExecSession,
    ExecState, LogOptions, LogStream, Result, RuntimeClient, RuntimeError, RuntimeEvent,
    StatsStream,
};
use crate::session::{SessionError, SocketSink, SocketSource};

pub const TS: &str = "2024-01-01T00:00:00.000000000Z";

/// One timestamped stdout frame.
pub fn stdout_frame(message: &str) -> Bytes {
    let mut buf = BytesMut::new();
    encode_frame(
        FrameKind::Stream(StreamKind::Stdout),
        format!("{TS} {message}").as_bytes(),
        &mut buf,
    )
    .unwrap();
    buf.freeze()
}

pub fn event(kind: &str, action: &str, id: &str) -> RuntimeEvent {
    serde_json::from_value(serde_json::json!({
        "Type": kind,
        "Action": action,
        "Actor": { "ID": id, "Attributes": {} },
        "time": 1_700_000_000,
    }))
    .unwrap()
}

pub fn summary(id: &str, name: &str) -> ContainerSummary {
    serde_json::from_value(serde_json::json!({
        "Id": id,
        "Names": [format!("/{name}")],
        "Image": "alpine",
        "State": "running",
        "Status": "Up 1 minute",
    }))
    .unwrap()
}

/// Scripted [`RuntimeClient`].
#[derive(Default)]
pub struct FakeRuntime {
    pub containers: Vec<ContainerSummary>,
    pub tty: bool,
    /// Bytes served as the log stream unless `log_stream` is set.
    pub logs: Vec<u8>,
    pub log_stream: Mutex<Option<LogStream>>,
    /// Runtime side of the exec attachment.
    pub exec_io: Mutex<Option<DuplexStream>>,
    /// Answers to `inspect_exec`, in order; `Err` entries are query failures.
    /// Once drained every query reports a running process.
    pub exec_states: Mutex<VecDeque<std::result::Result<bool, String>>>,
    pub events: Mutex<Vec<Result<RuntimeEvent>>>,
    /// Keep the event stream open after the scripted events.
    pub events_stay_open: bool,
    pub stats: Vec<Value>,
    /// Status returned by lifecycle verbs; success when `None`.
    pub verb_status: Option<u16>,
    pub calls: Mutex<Vec<String>>,
    pub last_log_options: Mutex<Option<LogOptions>>,
    pub last_exec_config: Mutex<Option<ExecConfig>>,
}

impl FakeRuntime {
    pub fn with_logs(logs: impl Into<Vec<u8>>) -> Self {
        Self {
            logs: logs.into(),
            ..Self::default()
        }
    }

    pub fn with_exec_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = std::result::Result<bool, String>>,
    {
        Self {
            exec_states: Mutex::new(states.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.verb_status {
            Some(status) => Err(RuntimeError::Api {
                status,
                message: format!("scripted failure {status}"),
            }),
            None => Ok(()),
        }
    }

    fn not_found(id: &str) -> RuntimeError {
        RuntimeError::Api {
            status: 404,
            message: format!("No such container: {id}"),
        }
    }
}

#[async_trait]
impl RuntimeClient for FakeRuntime {
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
        if id == "missing" {
            return Err(Self::not_found(id));
        }
        Ok(serde_json::from_value(serde_json::json!({
            "Id": id,
            "Name": format!("/{id}"),
            "State": { "Status": "running", "Running": true },
            "Config": { "Tty": self.tty, "Image": "alpine" },
        }))
        .unwrap())
    }

    async fn open_log_stream(&self, id: &str, options: &LogOptions) -> Result<LogStream> {
        if id == "missing" {
            return Err(Self::not_found(id));
        }
        *self.last_log_options.lock().unwrap() = Some(*options);
        if let Some(stream) = self.log_stream.lock().unwrap().take() {
            return Ok(stream);
        }
        Ok(Box::new(std::io::Cursor::new(self.logs.clone())))
    }

    async fn open_exec_session(&self, id: &str, config: &ExecConfig) -> Result<ExecSession> {
        if id == "missing" {
            return Err(Self::not_found(id));
        }
        *self.last_exec_config.lock().unwrap() = Some(config.clone());
        let io = self
            .exec_io
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| RuntimeError::Upgrade("no scripted exec attachment".into()))?;
        Ok(ExecSession {
            id: "exec1".into(),
            io: Box::new(io),
        })
    }

    async fn inspect_exec(&self, _exec_id: &str) -> Result<ExecState> {
        let next = self.exec_states.lock().unwrap().pop_front();
        match next {
            Some(Ok(running)) => Ok(ExecState {
                running,
                exit_code: if running { None } else { Some(0) },
            }),
            Some(Err(message)) => Err(RuntimeError::Stream(message)),
            None => Ok(ExecState {
                running: true,
                exit_code: None,
            }),
        }
    }

    async fn subscribe_events(&self, _since: SystemTime) -> Result<EventStream> {
        let events: Vec<_> = std::mem::take(&mut *self.events.lock().unwrap());
        let scripted = stream::iter(events);
        if self.events_stay_open {
            Ok(scripted.chain(stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }

    async fn open_stats_stream(&self, id: &str) -> Result<StatsStream> {
        if id == "missing" {
            return Err(Self::not_found(id));
        }
        Ok(stream::iter(self.stats.clone().into_iter().map(Ok)).boxed())
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.record(format!("start {id}"))
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        self.record(format!("stop {id}"))
    }

    async fn restart_container(&self, id: &str) -> Result<()> {
        self.record(format!("restart {id}"))
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<()> {
        self.record(format!("remove {id} force={force}"))
    }
}

/// Message captured by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Bytes),
    Close,
}

impl Outbound {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            other => panic!("expected text message, got {other:?}"),
        }
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(self.text()).unwrap()
    }
}

/// Sink that forwards every message to a channel; fails once the receiver is dropped.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

pub fn channel_sink() -> (ChannelSink, mpsc::UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

impl ChannelSink {
    fn push(&self, message: Outbound) -> std::result::Result<(), SessionError> {
        self.tx
            .send(message)
            .map_err(|_| SessionError::Send("client gone".into()))
    }
}

#[async_trait]
impl SocketSink for ChannelSink {
    async fn send_text(&mut self, text: String) -> std::result::Result<(), SessionError> {
        self.push(Outbound::Text(text))
    }

    async fn send_binary(&mut self, data: Bytes) -> std::result::Result<(), SessionError> {
        self.push(Outbound::Binary(data))
    }

    async fn close(&mut self) -> std::result::Result<(), SessionError> {
        // Closing after the client left is fine.
        let _ = self.push(Outbound::Close);
        Ok(())
    }
}

/// Source fed from a channel; dropping the sender closes the session.
pub struct ChannelSource {
    rx: mpsc::Receiver<std::result::Result<Bytes, SessionError>>,
}

pub fn channel_source() -> (
    ChannelSource,
    mpsc::Sender<std::result::Result<Bytes, SessionError>>,
) {
    let (tx, rx) = mpsc::channel(16);
    (ChannelSource { rx }, tx)
}

#[async_trait]
impl SocketSource for ChannelSource {
    async fn recv(&mut self) -> Option<std::result::Result<Bytes, SessionError>> {
        self.rx.recv().await
    }
}
