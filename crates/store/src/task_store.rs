use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use scarlet_types::{RecentTask, Task, TaskId, TaskKind, RECENT_CAPACITY};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::kv::KeyValueStore;

pub const PENDING_KEY: &str = "pendingTasks";
pub const RECENT_KEY: &str = "recentTasks";

/// Keys written by earlier releases as bare JSON arrays
pub const LEGACY_PENDING_KEY: &str = "tasks";
pub const LEGACY_RECENT_KEY: &str = "recent_tasks";

/// Current envelope version. Version 0 is the bare-array legacy layout.
pub const TASK_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    version: u32,
    tasks: Vec<T>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    tasks: &'a [T],
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum LegacyKind {
    Buy,
    Sell,
    CloseEmpty,
}

impl From<LegacyKind> for TaskKind {
    fn from(kind: LegacyKind) -> Self {
        match kind {
            LegacyKind::Buy => TaskKind::Buy,
            LegacyKind::Sell => TaskKind::Sell,
            LegacyKind::CloseEmpty => TaskKind::CloseEmptyAccounts,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LegacyTask {
    uuid: String,
    #[serde(rename = "type")]
    kind: LegacyKind,
    #[serde(default)]
    ca: String,
    amount: serde_json::Number,
    decimals: u64,
    #[serde(default)]
    slippage: u16,
    #[serde(default)]
    failed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecentTask {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(rename = "type")]
    kind: LegacyKind,
    #[serde(default)]
    ca: String,
    amount: serde_json::Number,
    decimals: u64,
    #[serde(default)]
    slippage: u16,
    tx_hash: String,
}

fn legacy_amount(n: &serde_json::Number) -> Decimal {
    if let Some(u) = n.as_u64() {
        Decimal::from(u)
    } else if let Some(i) = n.as_i64() {
        Decimal::from(i)
    } else {
        n.as_f64().and_then(Decimal::from_f64).unwrap_or_default()
    }
}

fn legacy_id(uuid: &str) -> TaskId {
    TaskId::from_str(uuid).unwrap_or_else(|_| {
        warn!(uuid, "legacy task id is not a uuid, assigning a new one");
        TaskId::new()
    })
}

impl From<LegacyTask> for Task {
    fn from(legacy: LegacyTask) -> Self {
        Task {
            id: legacy_id(&legacy.uuid),
            kind: legacy.kind.into(),
            target_address: legacy.ca,
            amount: legacy_amount(&legacy.amount),
            unit_scale: legacy.decimals,
            slippage_tolerance_bps: legacy.slippage,
            failed: legacy.failed,
        }
    }
}

impl From<LegacyRecentTask> for RecentTask {
    fn from(legacy: LegacyRecentTask) -> Self {
        RecentTask {
            id: legacy.uuid.as_deref().map_or_else(TaskId::new, legacy_id),
            kind: legacy.kind.into(),
            target_address: legacy.ca,
            amount: legacy_amount(&legacy.amount),
            unit_scale: legacy.decimals,
            slippage_tolerance_bps: legacy.slippage,
            transaction_hash: legacy.tx_hash,
        }
    }
}

/// Typed view over the key-value store for the two task lists
#[derive(Clone)]
pub struct TaskStore {
    kv: Arc<dyn KeyValueStore>,
}

impl TaskStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    pub async fn load_pending(&self) -> Result<Vec<Task>, StoreError> {
        self.load::<Task, LegacyTask>(PENDING_KEY, LEGACY_PENDING_KEY)
            .await
    }

    /// Recent tasks, most recent first, capped at the recent capacity
    pub async fn load_recent(&self) -> Result<Vec<RecentTask>, StoreError> {
        let mut recent = self
            .load::<RecentTask, LegacyRecentTask>(RECENT_KEY, LEGACY_RECENT_KEY)
            .await?;
        recent.truncate(RECENT_CAPACITY);
        Ok(recent)
    }

    pub async fn save_pending(&self, tasks: &[Task]) -> Result<(), StoreError> {
        self.kv.set(PENDING_KEY, &encode(tasks)?).await
    }

    pub async fn save_recent(&self, tasks: &[RecentTask]) -> Result<(), StoreError> {
        self.kv.set(RECENT_KEY, &encode(tasks)?).await
    }

    /// Write both lists as one batch
    pub async fn save_all(&self, pending: &[Task], recent: &[RecentTask]) -> Result<(), StoreError> {
        self.kv
            .set_many(&[(PENDING_KEY, encode(pending)?), (RECENT_KEY, encode(recent)?)])
            .await
    }

    async fn load<T, L>(&self, key: &str, legacy_key: &str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
        L: DeserializeOwned + Into<T>,
    {
        let (source, raw) = match self.kv.get(key).await? {
            Some(raw) => (key, raw),
            None => match self.kv.get(legacy_key).await? {
                Some(raw) => (legacy_key, raw),
                None => return Ok(Vec::new()),
            },
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tasks = decode::<T, L>(source, &raw)?;
        debug!(key = source, count = tasks.len(), "loaded task list");
        Ok(tasks)
    }
}

fn encode<T: Serialize>(tasks: &[T]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(&EnvelopeRef {
        version: TASK_SCHEMA_VERSION,
        tasks,
    })?)
}

fn decode<T, L>(key: &str, raw: &str) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    L: DeserializeOwned + Into<T>,
{
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => {
            debug!(key, "upgrading schema version 0 task list");
            items
                .into_iter()
                .map(|item| Ok(serde_json::from_value::<L>(item)?.into()))
                .collect()
        }
        value => {
            let envelope: Envelope<T> = serde_json::from_value(value)?;
            if envelope.version != TASK_SCHEMA_VERSION {
                return Err(StoreError::UnsupportedVersion {
                    key: key.to_string(),
                    version: envelope.version,
                });
            }
            Ok(envelope.tasks)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryStore;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn store() -> (InMemoryStore, TaskStore) {
        let kv = InMemoryStore::new();
        let tasks = TaskStore::new(Arc::new(kv.clone()));
        (kv, tasks)
    }

    #[tokio::test]
    async fn test_empty_store_loads_empty_lists() {
        let (_, tasks) = store();
        assert!(tasks.load_pending().await.unwrap().is_empty());
        assert!(tasks.load_recent().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_pending() {
        let (kv, tasks) = store();
        let pending = vec![
            Task::buy("mintA", dec("0.5"), 50),
            Task::close_empty_accounts(),
        ];

        tasks.save_pending(&pending).await.unwrap();
        assert_eq!(tasks.load_pending().await.unwrap(), pending);

        let raw = kv.get(PENDING_KEY).await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["tasks"][1]["kind"], "closeEmptyAccounts");
    }

    #[tokio::test]
    async fn test_save_all_writes_both_lists_once() {
        let (kv, tasks) = store();
        let task = Task::buy("mintA", dec("1"), 50);
        let recent = vec![task.clone().into_recent("sig")];

        tasks.save_all(&[], &recent).await.unwrap();

        assert_eq!(kv.write_count(), 1);
        assert!(tasks.load_pending().await.unwrap().is_empty());
        assert_eq!(tasks.load_recent().await.unwrap(), recent);
    }

    #[tokio::test]
    async fn test_unknown_version_rejected() {
        let (kv, tasks) = store();
        kv.set(PENDING_KEY, r#"{"version":7,"tasks":[]}"#)
            .await
            .unwrap();

        assert!(matches!(
            tasks.load_pending().await,
            Err(StoreError::UnsupportedVersion { version: 7, .. })
        ));
    }

    #[tokio::test]
    async fn test_legacy_pending_array_is_upgraded() {
        let (kv, tasks) = store();
        let raw = r#"[
            {"uuid":"6f1c1f5e-2a4b-4c39-9c1e-0b7d3c5d9a10","type":"buy","ca":"mintA",
             "amount":0.25,"decimals":1000000000,"slippage":50,"failed":false},
            {"uuid":"0d5e6c2b-9a8f-4e3d-8c7b-6a5f4e3d2c1b","type":"closeEmpty","ca":"",
             "amount":0,"decimals":0,"slippage":0,"failed":true}
        ]"#;
        kv.set(LEGACY_PENDING_KEY, raw).await.unwrap();

        let pending = tasks.load_pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(
            pending[0].id.to_string(),
            "6f1c1f5e-2a4b-4c39-9c1e-0b7d3c5d9a10"
        );
        assert_eq!(pending[0].kind, TaskKind::Buy);
        assert_eq!(pending[0].amount, dec("0.25"));
        assert_eq!(pending[0].unit_scale, 1_000_000_000);
        assert_eq!(pending[0].slippage_tolerance_bps, 50);
        assert_eq!(pending[1].kind, TaskKind::CloseEmptyAccounts);
        assert!(pending[1].failed);
    }

    #[tokio::test]
    async fn test_legacy_recent_array_is_upgraded_and_capped() {
        let (kv, tasks) = store();
        let entries: Vec<String> = (0..7)
            .map(|i| {
                format!(
                    r#"{{"type":"sell","ca":"mint{i}","amount":{i},"decimals":1000000,"txHash":"hash{i}"}}"#
                )
            })
            .collect();
        kv.set(LEGACY_RECENT_KEY, &format!("[{}]", entries.join(",")))
            .await
            .unwrap();

        let recent = tasks.load_recent().await.unwrap();
        assert_eq!(recent.len(), RECENT_CAPACITY);
        assert_eq!(recent[0].transaction_hash, "hash0");
        assert_eq!(recent[0].kind, TaskKind::Sell);
        assert_eq!(recent[4].amount, dec("4"));
    }

    #[tokio::test]
    async fn test_legacy_recent_keeps_id_and_slippage() {
        let (kv, tasks) = store();
        let raw = r#"[{"uuid":"5f0c7a52-3d0b-4f7e-9a51-2d1c3b4a5e6f","type":"buy","ca":"mintA",
            "amount":0.5,"decimals":1000000000,"slippage":75,"failed":false,"txHash":"sig"}]"#;
        kv.set(LEGACY_RECENT_KEY, raw).await.unwrap();

        let recent = tasks.load_recent().await.unwrap();
        assert_eq!(
            recent[0].id.to_string(),
            "5f0c7a52-3d0b-4f7e-9a51-2d1c3b4a5e6f"
        );
        assert_eq!(recent[0].slippage_tolerance_bps, 75);
    }

    #[tokio::test]
    async fn test_current_key_wins_over_legacy_key() {
        let (kv, tasks) = store();
        kv.set(LEGACY_PENDING_KEY, "[]").await.unwrap();
        let pending = vec![Task::buy("mintA", dec("0.1"), 10)];
        tasks.save_pending(&pending).await.unwrap();

        assert_eq!(tasks.load_pending().await.unwrap(), pending);
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_an_error() {
        let (kv, tasks) = store();
        kv.set(PENDING_KEY, "{broken").await.unwrap();
        assert!(matches!(
            tasks.load_pending().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
