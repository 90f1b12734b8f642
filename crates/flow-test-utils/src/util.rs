//! Utility functions for tests.

/// Initialize tracing for tests with a default configuration
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flow_core=debug,flow=info")
        .with_test_writer()
        .try_init();
}
