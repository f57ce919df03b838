use scarlet_types::{TaskId, TaskKind};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::collector::TelemetryError;

/// Install the global subscriber. `RUST_LOG` takes precedence over `filter`.
pub fn init_tracing(filter: &str, json: bool) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::try_new(filter)
            .map_err(|e| TelemetryError::FilterError(e.to_string()))?,
    };

    let json_layer = json.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .json()
    });
    let text_layer = (!json).then(|| fmt::layer().with_target(true).with_level(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| TelemetryError::InitError(e.to_string()))?;

    Ok(())
}

/// Correlation ID tying together every log line of one task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    /// Generate a new correlation ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the correlation ID as a string
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one task execution
#[derive(Debug, Clone)]
pub struct TaskSpan {
    pub correlation_id: CorrelationId,
    pub task_id: TaskId,
    pub kind: TaskKind,
}

impl TaskSpan {
    pub fn new(task_id: TaskId, kind: TaskKind) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            task_id,
            kind,
        }
    }

    /// The `task` span; attach it to the execution future with `Instrument`
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "task",
            correlation_id = %self.correlation_id,
            task_id = %self.task_id,
            kind = self.kind.as_str(),
        )
    }
}

/// Log an error with task context as it propagates
pub trait ErrorContext {
    fn with_correlation_id(self, correlation_id: CorrelationId) -> Self;

    fn with_task_id(self, task_id: &TaskId) -> Self;
}

impl<T, E> ErrorContext for Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_correlation_id(self, correlation_id: CorrelationId) -> Self {
        self.map_err(|e| {
            tracing::error!(
                correlation_id = %correlation_id,
                error = %e,
                "error occurred"
            );
            e
        })
    }

    fn with_task_id(self, task_id: &TaskId) -> Self {
        self.map_err(|e| {
            tracing::error!(
                task_id = %task_id,
                error = %e,
                "error occurred"
            );
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_id_generation() {
        let id1 = CorrelationId::new();
        let id2 = CorrelationId::new();

        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_task_span_creation() {
        let task_id = TaskId::new();
        let span = TaskSpan::new(task_id, TaskKind::Sell);

        assert_eq!(span.task_id, task_id);
        assert_eq!(span.kind, TaskKind::Sell);
        let _ = span.span();
    }

    #[test]
    fn test_invalid_filter_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let result = init_tracing("scarlet=loudest", false);
        assert!(matches!(result, Err(TelemetryError::FilterError(_))));
    }

    #[test]
    fn test_error_context_passes_error_through() {
        let result: Result<(), String> = Err("boom".to_string());
        assert_eq!(result.with_task_id(&TaskId::new()).unwrap_err(), "boom");
    }
}
