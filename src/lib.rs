//! Scarlet wallet back-end
//!
//! Wires the configuration, the task store, the Solana RPC client and the
//! Jupiter gateway into a [`TaskQueueController`]. Each concern lives in its
//! own workspace crate; this crate only assembles them.

use anyhow::{Context, Result};
use scarlet_config::{validate_config, AppConfig, LoggingConfig, StorageBackend, StorageConfig};
use scarlet_executor::{
    EnqueueGuard, ExecutorConfig, Portfolio, TaskExecutor, TaskQueueController,
};
use scarlet_gateway::{FeeSchedule, JupiterClient, QuoteGateway};
use scarlet_network::{NetworkService, RpcClient, TransactionCodec};
use scarlet_retry::RetryPolicy;
use scarlet_store::settings::RETRY_COUNT_KEY;
use scarlet_store::{InMemoryStore, JsonFileStore, KeyValueStore, Settings, SqliteStore, TaskStore};
use scarlet_types::{Keypair, Pubkey, Signer};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

pub use scarlet_config as config;
pub use scarlet_executor as executor;
pub use scarlet_types as types;

/// A running wallet: the task queue plus the collaborators it was built from
pub struct Wallet {
    controller: TaskQueueController,
    settings: Settings,
    rpc_url: String,
}

impl Wallet {
    /// Build a wallet talking to the configured RPC node and aggregator.
    ///
    /// A custom `node` in the settings store replaces `network.rpc_url`.
    pub async fn bootstrap(
        config: &AppConfig,
        signer: Arc<dyn Signer>,
        codec: Arc<dyn TransactionCodec>,
    ) -> Result<Self> {
        validate_config(config)?;

        let kv = open_store(&config.storage).await?;
        let settings = Settings::new(Arc::clone(&kv));
        let rpc_url = match settings.node().await? {
            Some(node) => {
                info!(node = %node, "using custom rpc endpoint");
                node
            }
            None => config.network.rpc_url.clone(),
        };

        let network = RpcClient::with_timeout(rpc_url.as_str(), config.network.request_timeout())?
            .with_commitment(config.network.commitment.as_str())
            .with_confirm_backoff(
                config.network.confirm_poll_initial(),
                config.network.confirm_poll_max(),
            );
        let gateway =
            JupiterClient::with_timeout(config.gateway.base_url.as_str(), config.gateway.timeout())?;

        let mut wallet =
            Self::assemble(config, kv, Arc::new(network), Arc::new(gateway), codec, signer)
                .await?;
        wallet.rpc_url = rpc_url;
        Ok(wallet)
    }

    /// Build a wallet over caller-supplied collaborators
    pub async fn assemble(
        config: &AppConfig,
        kv: Arc<dyn KeyValueStore>,
        network: Arc<dyn NetworkService>,
        gateway: Arc<dyn QuoteGateway>,
        codec: Arc<dyn TransactionCodec>,
        signer: Arc<dyn Signer>,
    ) -> Result<Self> {
        let settings = Settings::new(Arc::clone(&kv));
        if kv.get(RETRY_COUNT_KEY).await?.is_none() {
            settings
                .set_retry_count(config.execution.default_retry_count)
                .await?;
        }

        let portfolio = Arc::new(Portfolio::new(
            Arc::clone(&network),
            signer.pubkey(),
            config.execution.portfolio_refresh_interval(),
        ));
        if let Err(e) = portfolio.refresh(true).await {
            warn!(error = %e, "initial portfolio refresh failed, buys are refused until it succeeds");
        }

        let executor = TaskExecutor::new(
            gateway,
            network,
            codec,
            signer,
            settings.clone(),
            portfolio,
        )
        .with_config(executor_config(config)?);

        let controller = TaskQueueController::restore(
            TaskStore::new(kv),
            Arc::new(executor),
            EnqueueGuard::new(config.execution.rent_safety_margin),
        )
        .await?;

        Ok(Self {
            controller,
            settings,
            rpc_url: config.network.rpc_url.clone(),
        })
    }

    pub fn controller(&self) -> &TaskQueueController {
        &self.controller
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// RPC endpoint in use
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

/// Executor settings derived from the application config
pub fn executor_config(config: &AppConfig) -> Result<ExecutorConfig> {
    let platform_collector = Pubkey::from_str(&config.fees.platform_collector)
        .context("fees.platform_collector")?;
    let aggregator_collector = Pubkey::from_str(&config.fees.aggregator_collector)
        .context("fees.aggregator_collector")?;

    Ok(ExecutorConfig {
        fees: FeeSchedule::new(
            config.fees.platform_fee_bps,
            config.fees.aggregator_share,
            platform_collector,
            aggregator_collector,
        ),
        compute_unit_price: config.priority_fee.micro_lamports,
        compute_unit_limit: config.priority_fee.compute_unit_limit,
        policy: RetryPolicy::new(
            config.execution.transient_delay(),
            config.execution.bounded_delay(),
        ),
    })
}

/// Open the configured key-value backend
pub async fn open_store(storage: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match (storage.backend, &storage.path) {
        (StorageBackend::Memory, _) => Arc::new(InMemoryStore::new()),
        (StorageBackend::Json, Some(path)) => Arc::new(
            JsonFileStore::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        (StorageBackend::Sqlite, Some(path)) => Arc::new(
            SqliteStore::new(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        (backend, None) => anyhow::bail!("storage backend {backend:?} requires a path"),
    };

    info!(backend = ?storage.backend, "opened task store");
    Ok(store)
}

/// Install the global tracing subscriber described by `logging`
pub fn init_logging(logging: &LoggingConfig) -> Result<()> {
    scarlet_telemetry::init_tracing(&logging.filter, logging.json)?;
    Ok(())
}

/// Read a base58-encoded keypair from a file
pub fn load_keypair(path: &Path) -> Result<Keypair> {
    let secret = std::fs::read_to_string(path)
        .with_context(|| format!("reading keypair from {}", path.display()))?;
    Ok(Keypair::from_base58_secret(&secret)?)
}
