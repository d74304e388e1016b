//! Tracing subscriber initialization.
//!
//! Callers that embed the engine (CLI, desktop shell, tests) initialize
//! once at startup; everything else just emits `tracing` events.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Filter resolution order: `FERRY_LOG` env var, then the provided
/// `default_filter`, then `"info"`. Safe to call more than once — later
/// calls are no-ops.
pub fn init_tracing(default_filter: Option<&str>) {
    let filter = EnvFilter::try_from_env("FERRY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or("info")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
