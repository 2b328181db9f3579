//! Event filter: forward container lifecycle events to a client.

use std::sync::Arc;
use std::time::SystemTime;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::StreamError;
use crate::runtime::{RuntimeClient, RuntimeEvent};
use crate::session::{SocketSink, send_json};

/// Actions forwarded for `container` events.
pub const FORWARDED_ACTIONS: [&str; 3] = ["start", "stop", "destroy"];

/// Whether `event` is a container start, stop or destroy.
pub fn is_forwarded(event: &RuntimeEvent) -> bool {
    event.kind == "container" && FORWARDED_ACTIONS.contains(&event.action.as_str())
}

/// Subscribes to runtime events from "now" and forwards the matching ones.
pub struct EventFilter {
    runtime: Arc<dyn RuntimeClient>,
}

impl EventFilter {
    pub fn new(runtime: Arc<dyn RuntimeClient>) -> Self {
        Self { runtime }
    }

    /// Returns the number of events forwarded once the subscription ends or
    /// `cancel` fires.
    pub async fn run<K>(&self, sink: &mut K, cancel: &CancellationToken) -> Result<u64, StreamError>
    where
        K: SocketSink + ?Sized,
    {
        let mut events = self.runtime.subscribe_events(SystemTime::now()).await?;
        let mut sent = 0;
        loop {
            let next = tokio::select! {
                () = cancel.cancelled() => return Ok(sent),
                next = events.next() => next,
            };
            let Some(event) = next else {
                return Ok(sent);
            };
            let event = event?;
            if !is_forwarded(&event) {
                trace!(kind = %event.kind, action = %event.action, "Dropping event");
                continue;
            }
            send_json(sink, &event).await?;
            sent += 1;
        }
    }
}
