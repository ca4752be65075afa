//! Tracing/logging initialization.
//!
//! Logs are JSON lines with system timestamps and no targets. `RUST_LOG`
//! wins over the default directive when it is set and parses.

use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to `default_directive`.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the JSON subscriber. Returns `false` when one was already set.
pub fn init_with_default(default_directive: &str) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        ::tracing::debug!(default_directive, "tracing initialized");
    }
    installed
}
