//! Tracing setup for the `dashker` binary.
//!
//! Session lifecycles (log relays, terminals, event feeds) are logged as
//! structured events carrying `container_id` and `exec_id`, so operators
//! usually want JSON output when shipping logs and the compact text format
//! when running in a terminal. `RUST_LOG` always wins over the configured
//! level.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are enabled at the configured level.
const TARGETS: [&str; 3] = ["dashker_server", "dashker_core", "tower_http"];

/// Filter directive enabling dashker's own crates (and request tracing) at `level`.
pub fn default_filter(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset or unparsable.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry.with(fmt_layer.json()).init();
    } else {
        registry.with(fmt_layer).init();
    }
}
