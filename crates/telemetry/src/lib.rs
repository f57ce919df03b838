//! Metrics and structured logging for the Scarlet wallet back-end
//!
//! Task lifecycle counters are registered once in the default prometheus
//! registry and rendered in the text exposition format by
//! [`TaskMetrics::gather_text`]. [`init_tracing`] installs the process-wide
//! subscriber; every task execution runs inside a span carrying a
//! [`CorrelationId`].

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{TaskMetrics, TelemetryError};
pub use tracing::{init_tracing, CorrelationId, ErrorContext, TaskSpan};
