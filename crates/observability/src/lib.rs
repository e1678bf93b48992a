//! Process-wide tracing setup shared by the binary and integration tests.

/// Initialize JSON tracing for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, formatters).
pub mod tracing;
