//! Optional Observability Sinks
//!
//! Metrics and trace export are host concerns. Both are opt-in trait objects
//! set through the builder; when absent, every emission site checks for
//! `None` before building any payload, so the disabled path costs nothing.
//! Structured logging goes through `tracing` and carries identifiers and
//! counts only.

use std::time::Duration;

/// Counter/duration sink.
pub trait MetricsCollector: Send + Sync {
    /// Add `value` to the named counter.
    fn incr_counter(&self, name: &str, value: u64);
    /// Record an operation duration.
    fn observe_duration(&self, name: &str, duration: Duration);
}

/// Span export sink for operation-level tracing.
pub trait TraceExporter: Send + Sync {
    /// Export one finished span with key/value attributes.
    fn export_span(&self, name: &str, duration: Duration, attributes: &[(&str, String)]);
}

// ============================================================================
// TESTS
// ============================================================================
