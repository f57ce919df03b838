use scarlet_store::{StoreError, TaskStore};
use scarlet_telemetry::TaskMetrics;
use scarlet_types::{RecentTask, Task, TaskId, TaskKind, RECENT_CAPACITY};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::{EventBus, TaskEvent};
use crate::executor::{TaskExecutor, TaskOutcome};
use crate::guard::EnqueueGuard;
use crate::recovery::{recover_queue, RecoveredQueue};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("execution task aborted: {0}")]
    Join(String),
}

#[derive(Debug, Default)]
struct QueueState {
    /// Newest first
    pending: Vec<Task>,
    /// Most recent first, at most `RECENT_CAPACITY`
    recent: Vec<RecentTask>,
}

impl QueueState {
    fn contains(&self, id: &TaskId) -> bool {
        self.pending.iter().any(|t| t.id == *id) || self.recent.iter().any(|t| t.id == *id)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.pending.iter().position(|t| t.id == *id)
    }
}

/// Awaitable completion of one spawned execution
#[derive(Debug)]
pub struct TaskHandle {
    task_id: TaskId,
    join: JoinHandle<TaskOutcome>,
}

impl TaskHandle {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Wait for the execution and its queue update to finish
    pub async fn wait(self) -> Result<TaskOutcome, QueueError> {
        self.join
            .await
            .map_err(|e| QueueError::Join(e.to_string()))
    }
}

struct Inner {
    state: Mutex<QueueState>,
    store: TaskStore,
    executor: Arc<TaskExecutor>,
    guard: EnqueueGuard,
    metrics: TaskMetrics,
}

/// Owner of the pending and recent task lists.
///
/// Every mutation runs inside one async critical section and is persisted
/// before the in-memory state changes, so a failed write leaves both the store
/// and the queue as they were.
#[derive(Clone)]
pub struct TaskQueueController {
    inner: Arc<Inner>,
}

impl TaskQueueController {
    /// Controller over an empty queue
    pub fn new(store: TaskStore, executor: Arc<TaskExecutor>, guard: EnqueueGuard) -> Self {
        Self::with_queue(store, executor, guard, RecoveredQueue::default())
    }

    /// Controller over the lists left by the previous session. Restored
    /// pending tasks are marked failed and are not executed until retried.
    pub async fn restore(
        store: TaskStore,
        executor: Arc<TaskExecutor>,
        guard: EnqueueGuard,
    ) -> Result<Self, QueueError> {
        let queue = recover_queue(&store).await?;
        Ok(Self::with_queue(store, executor, guard, queue))
    }

    fn with_queue(
        store: TaskStore,
        executor: Arc<TaskExecutor>,
        guard: EnqueueGuard,
        queue: RecoveredQueue,
    ) -> Self {
        let metrics = TaskMetrics::new();
        metrics.set_pending(queue.pending.len());

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState {
                    pending: queue.pending,
                    recent: queue.recent,
                }),
                store,
                executor,
                guard,
                metrics,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events().subscribe()
    }

    pub fn guard(&self) -> &EnqueueGuard {
        &self.inner.guard
    }

    pub fn executor(&self) -> &Arc<TaskExecutor> {
        &self.inner.executor
    }

    fn events(&self) -> &EventBus {
        self.inner.executor.events()
    }

    /// Add `task` to the front of the pending list and start executing it.
    ///
    /// Returns `Ok(None)` without touching the store when the guard rejects
    /// the task or its id is already known.
    pub async fn enqueue(&self, task: Task) -> Result<Option<TaskHandle>, QueueError> {
        let balance = self.inner.executor.portfolio().balance().await;
        if let Err(rejection) = self.inner.guard.check(&task, balance) {
            info!(task_id = %task.id, kind = ?task.kind, reason = %rejection, "task rejected");
            self.inner
                .metrics
                .record_rejected(task.kind, rejection.reason());
            self.events().publish(TaskEvent::Rejected {
                kind: task.kind,
                reason: rejection.to_string(),
            });
            return Ok(None);
        }

        let mut state = self.inner.state.lock().await;
        if state.contains(&task.id) {
            debug!(task_id = %task.id, "ignoring duplicate task");
            return Ok(None);
        }

        let mut pending = state.pending.clone();
        pending.insert(0, task.clone());
        self.inner.store.save_all(&pending, &state.recent).await?;
        state.pending = pending;

        info!(task_id = %task.id, kind = ?task.kind, pending = state.pending.len(), "task enqueued");
        self.inner.metrics.record_enqueued(task.kind);
        self.inner.metrics.set_pending(state.pending.len());
        self.events().publish(TaskEvent::Enqueued {
            task_id: task.id,
            kind: task.kind,
        });

        Ok(Some(self.spawn_execution(task)))
    }

    /// Re-execute a failed task. Anything else is a no-op.
    pub async fn retry(&self, id: &TaskId) -> Result<Option<TaskHandle>, QueueError> {
        let mut state = self.inner.state.lock().await;
        let Some(index) = state.position(id).filter(|&i| state.pending[i].failed) else {
            debug!(task_id = %id, "retry ignored, task is not a failed pending task");
            return Ok(None);
        };

        let mut pending = state.pending.clone();
        pending[index].failed = false;
        let task = pending[index].clone();
        self.inner.store.save_all(&pending, &state.recent).await?;
        state.pending = pending;

        info!(task_id = %id, kind = ?task.kind, "retrying task");
        self.inner.metrics.record_retried(task.kind);
        self.events().publish(TaskEvent::Retried { task_id: *id });

        Ok(Some(self.spawn_execution(task)))
    }

    /// Drop a task from the pending list. An in-flight execution keeps
    /// running and its completion is discarded. Returns whether it was present.
    pub async fn remove(&self, id: &TaskId) -> Result<bool, QueueError> {
        let mut state = self.inner.state.lock().await;
        let Some(index) = state.position(id) else {
            return Ok(false);
        };

        let mut pending = state.pending.clone();
        pending.remove(index);
        self.inner.store.save_all(&pending, &state.recent).await?;
        state.pending = pending;

        info!(task_id = %id, "task removed");
        self.inner.metrics.set_pending(state.pending.len());
        self.events().publish(TaskEvent::Removed { task_id: *id });
        Ok(true)
    }

    pub async fn pending(&self) -> Vec<Task> {
        self.inner.state.lock().await.pending.clone()
    }

    pub async fn recent(&self) -> Vec<RecentTask> {
        self.inner.state.lock().await.recent.clone()
    }

    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        let state = self.inner.state.lock().await;
        state.position(id).map(|i| state.pending[i].clone())
    }

    /// Largest buy the guard admits at the cached balance
    pub async fn max_buy_amount(&self) -> rust_decimal::Decimal {
        let balance = self.inner.executor.portfolio().balance().await;
        self.inner.guard.max_buy_amount(balance)
    }

    fn spawn_execution(&self, task: Task) -> TaskHandle {
        let controller = self.clone();
        let task_id = task.id;

        let join = tokio::spawn(async move {
            let outcome = controller.inner.executor.run(&task).await;
            controller.apply_completion(&task.id, task.kind, &outcome).await;
            outcome
        });

        TaskHandle { task_id, join }
    }

    /// Fold an execution outcome into the queue.
    ///
    /// The in-memory lists are updated even if the write fails, since the
    /// on-chain effect has already happened; the next successful write
    /// persists them.
    async fn apply_completion(&self, id: &TaskId, kind: TaskKind, outcome: &TaskOutcome) {
        let mut state = self.inner.state.lock().await;
        let Some(index) = state.position(id) else {
            debug!(task_id = %id, "discarding completion of removed task");
            self.events().publish(TaskEvent::Discarded { task_id: *id });
            return;
        };

        let event = match outcome {
            TaskOutcome::Succeeded {
                transaction_hash, ..
            } => {
                let task = state.pending.remove(index);
                state.recent.insert(0, task.into_recent(transaction_hash.clone()));
                state.recent.truncate(RECENT_CAPACITY);
                info!(task_id = %id, kind = ?kind, signature = %transaction_hash, "task completed");
                TaskEvent::Completed {
                    task_id: *id,
                    transaction_hash: transaction_hash.clone(),
                }
            }
            TaskOutcome::Exhausted { attempts, .. } => {
                state.pending[index].failed = true;
                warn!(task_id = %id, kind = ?kind, attempts, "task failed");
                TaskEvent::Failed {
                    task_id: *id,
                    attempts: *attempts,
                }
            }
        };

        if let Err(e) = self
            .inner
            .store
            .save_all(&state.pending, &state.recent)
            .await
        {
            error!(task_id = %id, error = %e, "failed to persist task completion");
        }

        self.inner.metrics.set_pending(state.pending.len());
        self.events().publish(event);
    }
}
