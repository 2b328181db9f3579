//! Client socket sessions.
//!
//! Streaming components write to a [`SocketSink`] and read from a
//! [`SocketSource`] rather than touching the WebSocket directly, so the
//! same code runs against in-memory sessions in tests.

mod origin;
mod ws;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use origin::{CheckedOrigin, OriginPolicy, OriginRejected};
pub use ws::{WsSink, WsSource, split};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to send to client: {0}")]
    Send(String),

    #[error("failed to receive from client: {0}")]
    Receive(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound half of a client session.
#[async_trait]
pub trait SocketSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError>;

    async fn send_binary(&mut self, data: Bytes) -> Result<(), SessionError>;

    /// Close the session. Closing twice is not an error.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Inbound half of a client session.
#[async_trait]
pub trait SocketSource: Send {
    /// Next data message, or `None` once the client has closed the session.
    async fn recv(&mut self) -> Option<Result<Bytes, SessionError>>;
}

/// Serialize `value` and send it as one text message.
pub async fn send_json<K, T>(sink: &mut K, value: &T) -> Result<(), SessionError>
where
    K: SocketSink + ?Sized,
    T: Serialize + Sync,
{
    let text = serde_json::to_string(value)?;
    sink.send_text(text).await
}

/// Drain `source` in the background and cancel `token` when the client goes away.
///
/// Used by push-only streams, which never expect client input but still
/// need to notice a closed session while blocked on the runtime.
pub fn cancel_on_close<S>(mut source: S, token: CancellationToken) -> JoinHandle<()>
where
    S: SocketSource + 'static,
{
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = token.cancelled() => return,
                next = source.recv() => match next {
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "Client session failed");
                        break;
                    }
                    None => {
                        debug!("Client closed session");
                        break;
                    }
                },
            }
        }
        token.cancel();
    })
}
