//! Tracing, logging and audit events (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Security audit events.
pub mod audit;

/// Tracing configuration (filters, layers).
pub mod tracing;
