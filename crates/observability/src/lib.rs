//! Process-wide tracing setup for the ledger binaries and tests.

/// Initialize tracing with the default `info` filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    self::tracing::init_with_default("info");
}

/// Tracing configuration (filters, JSON formatting).
pub mod tracing;
