//! Stats relay: forward a container's live resource samples to a client.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::StreamError;
use crate::runtime::RuntimeClient;
use crate::session::{SocketSink, send_json};

pub struct StatsRelay {
    runtime: Arc<dyn RuntimeClient>,
}

impl StatsRelay {
    pub fn new(runtime: Arc<dyn RuntimeClient>) -> Self {
        Self { runtime }
    }

    /// Forward samples verbatim until the stream ends or `cancel` fires.
    pub async fn run<K>(
        &self,
        container_id: &str,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> Result<u64, StreamError>
    where
        K: SocketSink + ?Sized,
    {
        let mut samples = self.runtime.open_stats_stream(container_id).await?;
        let mut sent = 0;
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return Ok(sent),
                next = samples.next() => next,
            };
            let Some(sample) = next else {
                return Ok(sent);
            };
            send_json(sink, &sample?).await?;
            sent += 1;
        }
    }
}
