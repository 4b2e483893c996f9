//! Structured logging setup emitting JSON lines.
//!
//! Events across the crate carry the fields `ev`, `code` and `dur_ms` so log
//! lines can be grouped by pipeline stage.

use tracing_subscriber::EnvFilter;

/// Install the global JSON subscriber.
///
/// `MAINTCAST_LOG` takes precedence over the configured level.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_env("MAINTCAST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(level));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .json()
        .try_init();
}
