use scarlet_types::{TaskId, TaskKind};
use tokio::sync::broadcast;

/// Events buffered per subscriber before the slowest one starts lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Queue state transitions published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Enqueued { task_id: TaskId, kind: TaskKind },
    /// Refused by the enqueue guard; nothing was stored
    Rejected { kind: TaskKind, reason: String },
    Retried { task_id: TaskId },
    Removed { task_id: TaskId },
    Completed { task_id: TaskId, transaction_hash: String },
    /// Retry budget exhausted; the task stays pending with `failed` set
    Failed { task_id: TaskId, attempts: u32 },
    /// Execution finished after the task was removed
    Discarded { task_id: TaskId },
    PortfolioRefreshed { lamports: u64 },
}

/// Broadcast channel shared by the controller and the executor
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TaskEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }

    /// Publishing with no subscribers is not an error
    pub fn publish(&self, event: TaskEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
