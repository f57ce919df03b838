use std::time::Duration;

use prometheus::{Encoder, TextEncoder};
use scarlet_retry::ErrorClass;
use scarlet_types::TaskKind;

use crate::metrics::*;

/// Records task lifecycle metrics into the default prometheus registry
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskMetrics;

impl TaskMetrics {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUEUE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_enqueued(&self, kind: TaskKind) {
        TASKS_ENQUEUED.with_label_values(&[kind.as_str()]).inc();
    }

    /// Record an enqueue refused by policy, e.g. `insufficient_balance`
    pub fn record_rejected(&self, kind: TaskKind, reason: &str) {
        TASKS_REJECTED
            .with_label_values(&[kind.as_str(), reason])
            .inc();
    }

    pub fn record_retried(&self, kind: TaskKind) {
        TASKS_RETRIED.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn set_pending(&self, count: usize) {
        PENDING_TASKS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXECUTION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_attempt_failure(&self, kind: TaskKind, class: ErrorClass) {
        TASK_ATTEMPT_FAILURES
            .with_label_values(&[kind.as_str(), class.as_str()])
            .inc();
    }

    /// Record a finished execution and how long it took
    pub fn record_outcome(&self, kind: TaskKind, succeeded: bool, duration: Duration) {
        let outcome = if succeeded { "succeeded" } else { "failed" };
        TASK_OUTCOMES
            .with_label_values(&[kind.as_str(), outcome])
            .inc();
        TASK_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(duration.as_millis() as f64);
    }

    pub fn record_refresh_failure(&self) {
        PORTFOLIO_REFRESH_FAILURES.inc();
    }

    /// Render every registered metric in the prometheus text format
    pub fn gather_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| TelemetryError::EncodingError(e.to_string()))
    }
}

/// Telemetry error types
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("encoding error: {0}")]
    EncodingError(String),
    #[error("invalid log filter: {0}")]
    FilterError(String),
    #[error("tracing initialization error: {0}")]
    InitError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_text() {
        let metrics = TaskMetrics::new();
        assert!(metrics.gather_text().is_ok());
    }

    #[test]
    fn test_record_queue_metrics() {
        let metrics = TaskMetrics::new();

        metrics.record_enqueued(TaskKind::Buy);
        metrics.record_rejected(TaskKind::Buy, "insufficient_balance");
        metrics.record_retried(TaskKind::Sell);
        metrics.set_pending(2);

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("scarlet_tasks_enqueued_total"));
        assert!(text.contains("reason=\"insufficient_balance\""));
        assert!(text.contains("scarlet_tasks_retried_total"));
        assert!(text.contains("scarlet_tasks_pending"));
    }

    #[test]
    fn test_record_execution_metrics() {
        let metrics = TaskMetrics::new();

        metrics.record_attempt_failure(TaskKind::CloseEmptyAccounts, ErrorClass::Bounded);
        metrics.record_attempt_failure(TaskKind::Sell, ErrorClass::Transient);
        metrics.record_outcome(TaskKind::Buy, true, Duration::from_millis(1200));
        metrics.record_refresh_failure();

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("scarlet_task_attempt_failures_total"));
        assert!(text.contains("class=\"transient\""));
        assert!(text.contains("outcome=\"succeeded\""));
        assert!(text.contains("scarlet_task_duration_ms"));
        assert!(text.contains("scarlet_portfolio_refresh_failures_total"));
    }
}
