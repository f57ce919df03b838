use scarlet_gateway::MockGateway;
use scarlet_network::{CanonicalCodec, MockNetwork};
use scarlet_retry::RetryPolicy;
use scarlet_store::{InMemoryStore, KeyValueStore, Settings, TaskStore};
use scarlet_types::{Keypair, Pubkey, Signer};
use std::sync::Arc;

use crate::controller::TaskQueueController;
use crate::executor::{ExecutorConfig, TaskExecutor};
use crate::guard::EnqueueGuard;
use crate::portfolio::{Portfolio, DEFAULT_REFRESH_INTERVAL};

/// Mock collaborators wired into an executor with no retry delays
pub struct Harness {
    pub gateway: MockGateway,
    pub network: MockNetwork,
    pub kv: InMemoryStore,
    pub keypair: Arc<Keypair>,
    pub executor: Arc<TaskExecutor>,
}

impl Harness {
    pub async fn new() -> Self {
        let gateway = MockGateway::new();
        let network = MockNetwork::new();
        let kv = InMemoryStore::new();
        let keypair = Arc::new(Keypair::from_secret_bytes([42u8; 32]));
        let kv_handle: Arc<dyn KeyValueStore> = Arc::new(kv.clone());

        let portfolio = Arc::new(Portfolio::new(
            Arc::new(network.clone()),
            keypair.pubkey(),
            DEFAULT_REFRESH_INTERVAL,
        ));
        let executor = TaskExecutor::new(
            Arc::new(gateway.clone()),
            Arc::new(network.clone()),
            Arc::new(CanonicalCodec),
            keypair.clone(),
            Settings::new(kv_handle),
            portfolio,
        )
        .with_config(ExecutorConfig {
            policy: RetryPolicy::immediate(),
            ..ExecutorConfig::default()
        });

        Self {
            gateway,
            network,
            kv,
            keypair,
            executor: Arc::new(executor),
        }
    }

    pub fn settings(&self) -> Settings {
        self.executor.settings().clone()
    }

    pub fn task_store(&self) -> TaskStore {
        TaskStore::new(Arc::new(self.kv.clone()))
    }

    pub fn keypair_pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Controller over an empty queue with the given cached balance in lamports
    pub async fn controller(&self, lamports: u64) -> TaskQueueController {
        self.network.set_balance(lamports);
        self.executor
            .portfolio()
            .refresh(true)
            .await
            .expect("mock refresh");
        TaskQueueController::new(
            self.task_store(),
            Arc::clone(&self.executor),
            EnqueueGuard::default(),
        )
    }
}
