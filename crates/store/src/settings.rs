use scarlet_retry::budget::DEFAULT_RETRY_COUNT;
use scarlet_retry::RetryBudget;
use std::sync::Arc;
use tracing::warn;

use crate::error::StoreError;
use crate::kv::KeyValueStore;

pub const PASSWORD_KEY: &str = "password";
pub const IV_KEY: &str = "iv";
pub const NODE_KEY: &str = "node";
pub const RETRY_COUNT_KEY: &str = "retryCount";

/// Wallet settings kept next to the task lists
#[derive(Clone)]
pub struct Settings {
    kv: Arc<dyn KeyValueStore>,
}

impl Settings {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Credential check value
    pub async fn password(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(PASSWORD_KEY).await
    }

    pub async fn set_password(&self, password: &str) -> Result<(), StoreError> {
        self.kv.set(PASSWORD_KEY, password).await
    }

    pub async fn clear_password(&self) -> Result<(), StoreError> {
        self.kv.remove(PASSWORD_KEY).await
    }

    /// Nonce used when the secret was encrypted
    pub async fn iv(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(IV_KEY).await
    }

    pub async fn set_iv(&self, iv: &str) -> Result<(), StoreError> {
        self.kv.set(IV_KEY, iv).await
    }

    /// Encrypted secret stored under its label
    pub async fn secret(&self, label: &str) -> Result<Option<String>, StoreError> {
        self.kv.get(label).await
    }

    pub async fn set_secret(&self, label: &str, secret: &str) -> Result<(), StoreError> {
        self.kv.set(label, secret).await
    }

    /// Custom RPC endpoint; `None` when unset or blank
    pub async fn node(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .kv
            .get(NODE_KEY)
            .await?
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()))
    }

    pub async fn set_node(&self, node: &str) -> Result<(), StoreError> {
        self.kv.set(NODE_KEY, node).await
    }

    /// Raw retry setting, `3` when unset or unparseable
    pub async fn retry_count(&self) -> Result<i64, StoreError> {
        let Some(raw) = self.kv.get(RETRY_COUNT_KEY).await? else {
            return Ok(DEFAULT_RETRY_COUNT);
        };

        match raw.trim().parse::<i64>() {
            Ok(count) => Ok(count),
            Err(_) => {
                warn!(value = %raw, "ignoring unparseable retryCount setting");
                Ok(DEFAULT_RETRY_COUNT)
            }
        }
    }

    pub async fn set_retry_count(&self, count: i64) -> Result<(), StoreError> {
        self.kv.set(RETRY_COUNT_KEY, &count.to_string()).await
    }

    pub async fn retry_budget(&self) -> Result<RetryBudget, StoreError> {
        Ok(RetryBudget::from_setting(self.retry_count().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryStore;

    fn settings() -> (InMemoryStore, Settings) {
        let kv = InMemoryStore::new();
        (kv.clone(), Settings::new(Arc::new(kv)))
    }

    #[tokio::test]
    async fn test_retry_count_defaults_to_three() {
        let (_, settings) = settings();
        assert_eq!(settings.retry_count().await.unwrap(), 3);
        assert_eq!(
            settings.retry_budget().await.unwrap(),
            RetryBudget::Limited(3)
        );
    }

    #[tokio::test]
    async fn test_unlimited_retry_count() {
        let (_, settings) = settings();
        settings.set_retry_count(-1).await.unwrap();
        assert_eq!(settings.retry_budget().await.unwrap(), RetryBudget::Unlimited);
    }

    #[tokio::test]
    async fn test_unparseable_retry_count_falls_back() {
        let (kv, settings) = settings();
        kv.set(RETRY_COUNT_KEY, "lots").await.unwrap();
        assert_eq!(settings.retry_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_blank_node_is_none() {
        let (_, settings) = settings();
        assert_eq!(settings.node().await.unwrap(), None);

        settings.set_node("  ").await.unwrap();
        assert_eq!(settings.node().await.unwrap(), None);

        settings.set_node("https://my.rpc").await.unwrap();
        assert_eq!(
            settings.node().await.unwrap().as_deref(),
            Some("https://my.rpc")
        );
    }

    #[tokio::test]
    async fn test_password_and_secret() {
        let (_, settings) = settings();
        settings.set_password("hash").await.unwrap();
        settings.set_iv("nonce").await.unwrap();
        settings.set_secret("main.key", "cipher").await.unwrap();

        assert_eq!(settings.password().await.unwrap().as_deref(), Some("hash"));
        assert_eq!(settings.iv().await.unwrap().as_deref(), Some("nonce"));
        assert_eq!(
            settings.secret("main.key").await.unwrap().as_deref(),
            Some("cipher")
        );

        settings.clear_password().await.unwrap();
        assert_eq!(settings.password().await.unwrap(), None);
    }
}
