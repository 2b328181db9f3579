//! [`SocketSink`] / [`SocketSource`] over an axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use super::{SessionError, SocketSink, SocketSource};

pub struct WsSink {
    inner: SplitSink<WebSocket, Message>,
    closed: bool,
}

pub struct WsSource {
    inner: SplitStream<WebSocket>,
}

/// Split an upgraded socket into independently owned halves.
pub fn split(socket: WebSocket) -> (WsSink, WsSource) {
    let (sink, stream) = socket.split();
    (
        WsSink {
            inner: sink,
            closed: false,
        },
        WsSource { inner: stream },
    )
}

#[async_trait]
impl SocketSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        self.inner
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SessionError::Send(e.to_string()))
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), SessionError> {
        self.inner
            .send(Message::Binary(data))
            .await
            .map_err(|e| SessionError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner
            .close()
            .await
            .map_err(|e| SessionError::Send(e.to_string()))
    }
}

#[async_trait]
impl SocketSource for WsSource {
    async fn recv(&mut self) -> Option<Result<Bytes, SessionError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(Ok(Bytes::copy_from_slice(text.as_str().as_bytes())));
                }
                Ok(Message::Binary(data)) => return Some(Ok(data)),
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => return None,
                Err(e) => return Some(Err(SessionError::Receive(e.to_string()))),
            }
        }
    }
}
