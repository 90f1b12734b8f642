//! Tracing subscriber setup for hosts embedding the runner.

use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to the
/// configured level. Returns `false` if a global subscriber already exists.
pub fn init_tracing(config: &RunnerConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
