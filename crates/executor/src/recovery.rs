use scarlet_store::{StoreError, TaskStore};
use scarlet_types::{RecentTask, Task};
use std::collections::HashSet;
use tracing::{info, warn};

/// Queue state reloaded after a restart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveredQueue {
    pub pending: Vec<Task>,
    pub recent: Vec<RecentTask>,
}

/// Load both lists and mark every pending task failed.
///
/// An execution cannot survive a restart, so every restored task waits for an
/// explicit retry. A pending entry whose id is already in the recent list is
/// dropped. The repaired lists are written back before returning.
pub async fn recover_queue(store: &TaskStore) -> Result<RecoveredQueue, StoreError> {
    let recent = store.load_recent().await?;
    let completed: HashSet<_> = recent.iter().map(|t| t.id).collect();

    let mut pending = Vec::new();
    for mut task in store.load_pending().await? {
        if completed.contains(&task.id) {
            warn!(task_id = %task.id, "dropping pending task already recorded as completed");
            continue;
        }
        task.failed = true;
        pending.push(task);
    }

    store.save_all(&pending, &recent).await?;

    info!(
        pending = pending.len(),
        recent = recent.len(),
        "restored task queue"
    );
    Ok(RecoveredQueue { pending, recent })
}
