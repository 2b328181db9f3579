//! Log relay: decode a container's log stream and push records to a client.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dashker_core::config::StreamConfig;
use dashker_core::mux::{FrameDecoder, LogRecord, demultiplex, split_lines};

use super::StreamError;
use crate::runtime::{LogOptions, RuntimeClient};
use crate::session::{SocketSink, send_json};

/// Relays one container's logs to one client session.
pub struct LogRelay {
    runtime: Arc<dyn RuntimeClient>,
    options: LogOptions,
    max_frame_bytes: usize,
}

impl LogRelay {
    pub fn new(runtime: Arc<dyn RuntimeClient>, config: &StreamConfig) -> Self {
        Self {
            runtime,
            options: LogOptions::follow_with_tail(config.log_tail),
            max_frame_bytes: config.max_frame_bytes,
        }
    }

    pub const fn options(&self) -> &LogOptions {
        &self.options
    }

    /// Stream records until the log source ends, an error occurs, or `cancel` fires.
    ///
    /// Returns the number of records sent.
    pub async fn run<K>(
        &self,
        container_id: &str,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<u64, StreamError>
    where
        K: SocketSink + ?Sized,
    {
        let (source, info) = tokio::try_join!(
            self.runtime.open_log_stream(container_id, &self.options),
            self.runtime.inspect(container_id),
        )?;

        if info.is_interactive() {
            debug!(container_id, "Relaying interactive log lines");
            forward(split_lines(source, self.max_frame_bytes), sink, cancel).await
        } else {
            debug!(container_id, "Relaying multiplexed log frames");
            let decoder =
                FrameDecoder::new(self.options.timestamps).with_max_payload(self.max_frame_bytes);
            forward(demultiplex(source, decoder), sink, cancel).await
        }
    }
}

async fn forward<S, K>(
    mut records: S,
    sink: &mut K,
    cancel: &CancellationToken,
) -> Result<u64, StreamError>
where
    S: Stream<Item = dashker_core::Result<LogRecord>> + Unpin,
    K: SocketSink + ?Sized,
{
    let mut sent = 0;
    loop {
        let next = tokio::select! {
            () = cancel.cancelled() => return Ok(sent),
            next = records.next() => next,
        };
        let Some(record) = next else {
            return Ok(sent);
        };
        send_json(sink, &record?).await?;
        sent += 1;
    }
}
