//! Telemetry port. `emit` has no semantic effect on
//! the core; the default implementation forwards to `tracing` spans and a
//! handful of process-wide lock-free counters, following the `AtomicU64`
//! pattern in `arbiter::llm_provider::RetryMetrics`.

use std::sync::atomic::{AtomicU64, Ordering};

/// The only mutable globals in the core besides the read-only Applicability
/// Table.
#[derive(Debug, Default)]
pub struct Metrics {
    pub turns_total: AtomicU64,
    pub extraction_errors_total: AtomicU64,
    pub repository_errors_total: AtomicU64,
    pub sessions_completed_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_turn(&self) {
        self.turns_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extraction_error(&self) {
        self.extraction_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_repository_error(&self) {
        self.repository_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_completed(&self) {
        self.sessions_completed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            turns_total: self.turns_total.load(Ordering::Relaxed),
            extraction_errors_total: self.extraction_errors_total.load(Ordering::Relaxed),
            repository_errors_total: self.repository_errors_total.load(Ordering::Relaxed),
            sessions_completed_total: self.sessions_completed_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub turns_total: u64,
    pub extraction_errors_total: u64,
    pub repository_errors_total: u64,
    pub sessions_completed_total: u64,
}

/// Telemetry port: `emit(span_name, attrs)`. No semantic effect on the core;
/// implementations may forward to an external sink.
pub trait TelemetryPort: Send + Sync {
    fn emit(&self, span_name: &str, attrs: &[(&str, &str)]);
}

/// Default implementation: forwards to `tracing`.
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl TelemetryPort for TracingTelemetry {
    fn emit(&self, span_name: &str, attrs: &[(&str, &str)]) {
        let joined = attrs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(target: "configurator_core::telemetry", span = span_name, %joined);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_turn();
        metrics.record_turn();
        metrics.record_extraction_error();
        let snap = metrics.snapshot();
        assert_eq!(snap.turns_total, 2);
        assert_eq!(snap.extraction_errors_total, 1);
    }
}
