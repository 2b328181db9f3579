//! Exec liveness monitor for terminal sessions.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashker_core::config::StreamConfig;

use crate::runtime::RuntimeClient;

/// Outcome of watching an exec session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The runtime reported the process as no longer running.
    Exited { exit_code: Option<i64> },
    /// Too many consecutive inspection failures.
    Unreachable { failures: u32 },
    Cancelled,
}

/// Polls exec state at a fixed interval.
///
/// Failed queries count towards `max_failures` only while consecutive: any
/// successful query resets the counter.
#[derive(Debug, Clone, Copy)]
pub struct LivenessMonitor {
    poll_interval: Duration,
    max_failures: u32,
}

impl LivenessMonitor {
    pub const fn new(poll_interval: Duration, max_failures: u32) -> Self {
        Self {
            poll_interval,
            max_failures,
        }
    }

    pub const fn from_config(config: &StreamConfig) -> Self {
        Self::new(
            Duration::from_millis(config.liveness_poll_interval_ms),
            config.liveness_max_failures,
        )
    }

    pub async fn watch(
        &self,
        runtime: &dyn RuntimeClient,
        exec_id: &str,
        cancel: &CancellationToken,
    ) -> Liveness {
        let mut failures = 0;
        loop {
            let state = tokio::select! {
                () = cancel.cancelled() => return Liveness::Cancelled,
                state = runtime.inspect_exec(exec_id) => state,
            };
            match state {
                Ok(state) if !state.running => {
                    debug!(exec_id, exit_code = ?state.exit_code, "Exec process exited");
                    return Liveness::Exited {
                        exit_code: state.exit_code,
                    };
                }
                Ok(_) => failures = 0,
                Err(e) => {
                    failures += 1;
                    debug!(exec_id, failures, error = %e, "Exec inspection failed");
                    if failures >= self.max_failures {
                        warn!(exec_id, failures, "Giving up on unreachable exec session");
                        return Liveness::Unreachable { failures };
                    }
                }
            }

            tokio::select! {
                () = cancel.cancelled() => return Liveness::Cancelled,
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
