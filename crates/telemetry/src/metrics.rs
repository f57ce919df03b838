use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // QUEUE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Tasks accepted into the pending list, by kind
    pub static ref TASKS_ENQUEUED: IntCounterVec = register_int_counter_vec!(
        "scarlet_tasks_enqueued_total",
        "Total tasks accepted into the pending list",
        &["kind"]
    )
    .unwrap();

    /// Tasks refused at enqueue, by kind and reason
    pub static ref TASKS_REJECTED: IntCounterVec = register_int_counter_vec!(
        "scarlet_tasks_rejected_total",
        "Total tasks refused by the enqueue guard",
        &["kind", "reason"]
    )
    .unwrap();

    /// Manual retries of failed tasks
    pub static ref TASKS_RETRIED: IntCounterVec = register_int_counter_vec!(
        "scarlet_tasks_retried_total",
        "Total failed tasks re-executed by the user",
        &["kind"]
    )
    .unwrap();

    /// Current length of the pending list
    pub static ref PENDING_TASKS: IntGauge = register_int_gauge!(
        "scarlet_tasks_pending",
        "Current number of pending tasks"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // EXECUTION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Finished executions by kind and outcome (succeeded, failed)
    pub static ref TASK_OUTCOMES: IntCounterVec = register_int_counter_vec!(
        "scarlet_task_outcomes_total",
        "Total finished task executions by outcome",
        &["kind", "outcome"]
    )
    .unwrap();

    /// Failed attempts by error class (transient, bounded)
    pub static ref TASK_ATTEMPT_FAILURES: IntCounterVec = register_int_counter_vec!(
        "scarlet_task_attempt_failures_total",
        "Total failed attempts by error class",
        &["kind", "class"]
    )
    .unwrap();

    /// Wall time of one execution including retries
    pub static ref TASK_DURATION: HistogramVec = register_histogram_vec!(
        "scarlet_task_duration_ms",
        "Task execution duration in milliseconds",
        &["kind"],
        vec![250.0, 1000.0, 5000.0, 15000.0, 30000.0, 60000.0, 300000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // PORTFOLIO METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Portfolio refreshes that failed
    pub static ref PORTFOLIO_REFRESH_FAILURES: IntCounter = register_int_counter!(
        "scarlet_portfolio_refresh_failures_total",
        "Total portfolio refreshes that failed"
    )
    .unwrap();
}
