use scarlet::config::{AppConfig, StorageBackend, StorageConfig};
use scarlet::{executor_config, load_keypair, open_store, Wallet};
use scarlet_network::CanonicalCodec;
use scarlet_store::{JsonFileStore, KeyValueStore, Settings, TaskStore};
use scarlet_types::{Keypair, Signer, Task, USDC_MINT};
use std::sync::Arc;
use tempfile::TempDir;

fn storage(backend: StorageBackend, dir: &TempDir, file: &str) -> StorageConfig {
    StorageConfig {
        backend,
        path: Some(dir.path().join(file)),
    }
}

#[tokio::test]
async fn test_json_backend_persists_across_opens() {
    let dir = TempDir::new().unwrap();
    let config = storage(StorageBackend::Json, &dir, "wallet/store.json");

    let task = Task::buy(USDC_MINT, rust_decimal::Decimal::ONE, 50);
    {
        let kv = open_store(&config).await.unwrap();
        TaskStore::new(kv).save_all(&[task.clone()], &[]).await.unwrap();
    }

    let kv = open_store(&config).await.unwrap();
    let pending = TaskStore::new(kv).load_pending().await.unwrap();
    assert_eq!(pending, vec![task]);
}

#[tokio::test]
async fn test_sqlite_backend_persists_across_opens() {
    let dir = TempDir::new().unwrap();
    let config = storage(StorageBackend::Sqlite, &dir, "store.db");

    {
        let kv = open_store(&config).await.unwrap();
        Settings::new(kv).set_retry_count(-1).await.unwrap();
    }

    let kv = open_store(&config).await.unwrap();
    assert_eq!(Settings::new(kv).retry_count().await.unwrap(), -1);
}

#[tokio::test]
async fn test_file_backend_without_path_is_rejected() {
    let config = StorageConfig {
        backend: StorageBackend::Json,
        path: None,
    };
    assert!(open_store(&config).await.is_err());
}

#[tokio::test]
async fn test_bootstrap_prefers_stored_node() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.storage = storage(StorageBackend::Json, &dir, "store.json");
    config.network.request_timeout_ms = 200;

    let path = config.storage.path.clone().unwrap();
    {
        let kv = JsonFileStore::open(&path).await.unwrap();
        kv.set("node", "http://127.0.0.1:9").await.unwrap();
    }

    // the unreachable node only costs the initial portfolio refresh
    let wallet = Wallet::bootstrap(
        &config,
        Arc::new(Keypair::from_secret_bytes([3u8; 32])),
        Arc::new(CanonicalCodec),
    )
    .await
    .unwrap();

    assert_eq!(wallet.rpc_url(), "http://127.0.0.1:9");
    assert_eq!(wallet.settings().retry_count().await.unwrap(), 3);
    assert_eq!(wallet.controller().max_buy_amount().await, rust_decimal::Decimal::ZERO);
}

#[tokio::test]
async fn test_bootstrap_rejects_invalid_config() {
    let mut config = AppConfig::default();
    config.network.rpc_url = "ftp://example.com".to_string();

    let result = Wallet::bootstrap(
        &config,
        Arc::new(Keypair::from_secret_bytes([3u8; 32])),
        Arc::new(CanonicalCodec),
    )
    .await;
    assert!(result.is_err());
}

#[test]
fn test_executor_config_follows_app_config() {
    let mut config = AppConfig::default();
    config.priority_fee.micro_lamports = 75_000;
    config.execution.bounded_delay_ms = 250;

    let executor = executor_config(&config).unwrap();
    assert_eq!(executor.compute_unit_price, 75_000);
    assert_eq!(executor.compute_unit_limit, 200_000);
    assert_eq!(
        executor.policy.bounded_delay,
        std::time::Duration::from_millis(250)
    );

    config.fees.platform_collector = "not-a-key".to_string();
    assert!(executor_config(&config).is_err());
}

#[test]
fn test_load_keypair_from_base58_file() {
    let dir = TempDir::new().unwrap();
    let keypair = Keypair::from_secret_bytes([5u8; 32]);
    let path = dir.path().join("id.txt");
    std::fs::write(&path, format!("{}\n", bs58::encode(keypair.to_keypair_bytes()).into_string())).unwrap();

    let loaded = load_keypair(&path).unwrap();
    assert_eq!(loaded.pubkey(), keypair.pubkey());

    assert!(load_keypair(&dir.path().join("missing.txt")).is_err());
}
