//! Terminal proxy: an interactive exec session bridged to a client socket.
//!
//! Three tasks run per session: runtime output to client, client input to
//! runtime, and a liveness monitor. They share one cancellation token; the
//! first task to finish cancels it and the other two stop promptly.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dashker_core::config::StreamConfig;

use super::StreamError;
use super::liveness::{Liveness, LivenessMonitor};
use crate::runtime::{ExecConfig, ExecSession, RuntimeClient};
use crate::session::{SocketSink, SocketSource};

/// Why a terminal session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The runtime reported the shell as exited.
    ProcessExited,
    /// Liveness queries kept failing.
    LivenessLost,
    /// The exec channel reached end of stream.
    ExecClosed,
    /// Reading from or writing to the exec channel failed.
    ExecError,
    /// The client closed the session.
    ClientClosed,
    /// Reading from or writing to the client failed.
    SocketError,
    /// Cancelled from outside, e.g. server shutdown.
    Cancelled,
    /// A session task panicked.
    TaskFailed,
}

/// Bridges client sockets to exec sessions.
pub struct TerminalProxy {
    runtime: Arc<dyn RuntimeClient>,
    exec: ExecConfig,
    buffer_bytes: usize,
    liveness: LivenessMonitor,
}

impl TerminalProxy {
    pub fn new(runtime: Arc<dyn RuntimeClient>, config: &StreamConfig) -> Self {
        Self {
            runtime,
            exec: ExecConfig::interactive(config.exec_command.clone(), config.exec_user.clone()),
            buffer_bytes: config.terminal_buffer_bytes.max(1),
            liveness: LivenessMonitor::from_config(config),
        }
    }

    #[must_use]
    pub const fn with_liveness(mut self, liveness: LivenessMonitor) -> Self {
        self.liveness = liveness;
        self
    }

    pub const fn exec_config(&self) -> &ExecConfig {
        &self.exec
    }

    /// Attach to `container_id` and pump bytes until one side ends.
    ///
    /// Fails only if the exec session cannot be set up; once attached the
    /// outcome is reported as a [`Termination`].
    pub async fn run<K, S>(
        &self,
        container_id: &str,
        sink: K,
        source: S,
        cancel: &CancellationToken,
    ) -> Result<Termination, StreamError>
    where
        K: SocketSink + 'static,
        S: SocketSource + 'static,
    {
        let session = self.attach(container_id).await?;
        Ok(self.pump(container_id, session, sink, source, cancel).await)
    }

    /// Create and attach the exec session.
    pub async fn attach(&self, container_id: &str) -> Result<ExecSession, StreamError> {
        let session = self.runtime.open_exec_session(container_id, &self.exec).await?;
        info!(container_id, exec_id = %session.id, "Terminal session started");
        Ok(session)
    }

    /// Bridge an attached session to the client until one side ends.
    pub async fn pump<K, S>(
        &self,
        container_id: &str,
        session: ExecSession,
        sink: K,
        source: S,
        cancel: &CancellationToken,
    ) -> Termination
    where
        K: SocketSink + 'static,
        S: SocketSource + 'static,
    {
        let exec_id = session.id;
        let (exec_read, exec_write) = tokio::io::split(session.io);
        let token = cancel.child_token();
        let mut tasks = JoinSet::new();

        tasks.spawn(pump_output(exec_read, sink, self.buffer_bytes, token.clone()));
        tasks.spawn(pump_input(source, exec_write, token.clone()));

        let runtime = Arc::clone(&self.runtime);
        let monitor = self.liveness;
        let watch_id = exec_id.clone();
        let watch_token = token.clone();
        tasks.spawn(async move {
            match monitor.watch(runtime.as_ref(), &watch_id, &watch_token).await {
                Liveness::Exited { .. } => Termination::ProcessExited,
                Liveness::Unreachable { .. } => Termination::LivenessLost,
                Liveness::Cancelled => Termination::Cancelled,
            }
        });

        let termination = match tasks.join_next().await {
            Some(Ok(termination)) => termination,
            Some(Err(e)) => {
                warn!(exec_id = %exec_id, error = %e, "Terminal task failed");
                Termination::TaskFailed
            }
            None => Termination::Cancelled,
        };
        token.cancel();
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(exec_id = %exec_id, error = %e, "Terminal task failed during teardown");
            }
        }

        info!(container_id, exec_id = %exec_id, ?termination, "Terminal session ended");
        termination
    }
}

/// Runtime output to client, one binary message per read.
async fn pump_output<R, K>(
    mut exec: R,
    mut sink: K,
    buffer_bytes: usize,
    token: CancellationToken,
) -> Termination
where
    R: AsyncRead + Unpin,
    K: SocketSink,
{
    let mut buf = vec![0; buffer_bytes];
    let termination = loop {
        let read = tokio::select! {
            () = token.cancelled() => break Termination::Cancelled,
            read = exec.read(&mut buf) => read,
        };
        match read {
            Ok(0) => break Termination::ExecClosed,
            Ok(n) => {
                if let Err(e) = sink.send_binary(Bytes::copy_from_slice(&buf[..n])).await {
                    debug!(error = %e, "Terminal output write failed");
                    break Termination::SocketError;
                }
            }
            Err(e) => {
                debug!(error = %e, "Terminal output read failed");
                break Termination::ExecError;
            }
        }
    };
    if let Err(e) = sink.close().await {
        debug!(error = %e, "Failed to close client session");
    }
    termination
}

/// Client input to runtime, raw bytes.
async fn pump_input<S, W>(mut source: S, mut exec: W, token: CancellationToken) -> Termination
where
    S: SocketSource,
    W: AsyncWrite + Unpin,
{
    let termination = loop {
        let next = tokio::select! {
            () = token.cancelled() => break Termination::Cancelled,
            next = source.recv() => next,
        };
        let data = match next {
            None => break Termination::ClientClosed,
            Some(Err(e)) => {
                debug!(error = %e, "Terminal input read failed");
                break Termination::SocketError;
            }
            Some(Ok(data)) => data,
        };
        let written = tokio::select! {
            () = token.cancelled() => break Termination::Cancelled,
            written = exec.write_all(&data) => written,
        };
        if let Err(e) = written {
            debug!(error = %e, "Terminal input write failed");
            break Termination::ExecError;
        }
    };
    if let Err(e) = exec.shutdown().await {
        debug!(error = %e, "Failed to shut down exec input");
    }
    termination
}
