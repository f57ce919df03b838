use scarlet_gateway::{FeeSchedule, GatewayError, QuoteGateway};
use scarlet_network::{
    close_instructions, find_empty_token_accounts, sign_transaction, Confirmation, NetworkError,
    NetworkService, TransactionCodec,
};
use scarlet_retry::{ErrorClass, RetryBudget, RetryPolicy};
use scarlet_store::Settings;
use scarlet_telemetry::{ErrorContext, TaskMetrics, TaskSpan};
use scarlet_types::{
    AmountError, Instruction, Signature, Signer, Task, TaskKind, TradeDirection, Transaction,
    MEMO_TEXT,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn, Instrument};

use crate::events::{EventBus, TaskEvent};
use crate::portfolio::Portfolio;

/// Price per compute unit attached to account-closing transactions
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 50_000;
/// Compute unit limit attached to account-closing transactions
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

/// Execution stage tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    Quoting,
    BuildingSwap,
    AddingFees,
    DiscoveringAccounts,
    Signing,
    Submitting,
    Confirming,
}

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("no route available for {input} -> {output}")]
    QuoteUnavailable { input: String, output: String },

    #[error("transaction failed on chain: {0}")]
    OnChain(String),

    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),
}

impl AttemptError {
    /// Only a swap rejected by pre-flight simulation is retried for free
    pub fn class(&self, kind: TaskKind) -> ErrorClass {
        match self {
            AttemptError::Network(e) if kind.is_swap() && e.is_simulation_failure() => {
                ErrorClass::Transient
            }
            _ => ErrorClass::Bounded,
        }
    }
}

/// Final result of one execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded {
        transaction_hash: String,
        attempts: u32,
    },
    /// Retry budget ran out
    Exhausted { attempts: u32, last_error: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Succeeded { attempts, .. } | TaskOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub fees: FeeSchedule,
    /// Micro-lamports per compute unit for account closing
    pub compute_unit_price: u64,
    pub compute_unit_limit: u32,
    pub policy: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            compute_unit_price: DEFAULT_COMPUTE_UNIT_PRICE,
            compute_unit_limit: DEFAULT_COMPUTE_UNIT_LIMIT,
            policy: RetryPolicy::default(),
        }
    }
}

/// Drives one task at a time through the gateway and the network.
///
/// Attempts within a task are sequential. Gateway and network errors never
/// escape: they are classified, counted against the retry budget and folded
/// into the returned [`TaskOutcome`].
pub struct TaskExecutor {
    gateway: Arc<dyn QuoteGateway>,
    network: Arc<dyn NetworkService>,
    codec: Arc<dyn TransactionCodec>,
    signer: Arc<dyn Signer>,
    settings: Settings,
    portfolio: Arc<Portfolio>,
    events: EventBus,
    metrics: TaskMetrics,
    config: ExecutorConfig,
}

impl TaskExecutor {
    pub fn new(
        gateway: Arc<dyn QuoteGateway>,
        network: Arc<dyn NetworkService>,
        codec: Arc<dyn TransactionCodec>,
        signer: Arc<dyn Signer>,
        settings: Settings,
        portfolio: Arc<Portfolio>,
    ) -> Self {
        Self {
            gateway,
            network,
            codec,
            signer,
            settings,
            portfolio,
            events: EventBus::default(),
            metrics: TaskMetrics::new(),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn portfolio(&self) -> &Arc<Portfolio> {
        &self.portfolio
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `task` until it succeeds or its retry budget is spent, then
    /// trigger a background portfolio refresh
    pub async fn run(&self, task: &Task) -> TaskOutcome {
        let span = TaskSpan::new(task.id, task.kind);
        let outcome = self.execute(task).instrument(span.span()).await;
        self.spawn_refresh(task);
        outcome
    }

    async fn execute(&self, task: &Task) -> TaskOutcome {
        let started = Instant::now();
        let mut budget = self.current_budget(RetryBudget::default()).await;
        let mut failures = 0u32;
        let mut attempts = 0u32;
        let mut last_error = String::new();

        info!(
            task_id = %task.id,
            kind = ?task.kind,
            target = %task.target_address,
            amount = %task.amount,
            budget = ?budget,
            "executing task"
        );

        while budget.allows(failures) {
            attempts += 1;
            let result = match task.kind.direction() {
                Some(direction) => self.attempt_swap(task, direction).await,
                None => self.attempt_close().await,
            };

            match result {
                Ok(signature) => {
                    info!(task_id = %task.id, attempt = attempts, signature = %signature, "task confirmed");
                    self.metrics
                        .record_outcome(task.kind, true, started.elapsed());
                    return TaskOutcome::Succeeded {
                        transaction_hash: signature.to_string(),
                        attempts,
                    };
                }
                Err(e) => {
                    let class = e.class(task.kind);
                    if class.consumes_budget() {
                        failures += 1;
                    }
                    self.metrics.record_attempt_failure(task.kind, class);
                    warn!(
                        task_id = %task.id,
                        attempt = attempts,
                        failures,
                        class = class.as_str(),
                        error = %e,
                        "attempt failed"
                    );
                    last_error = e.to_string();

                    budget = self.current_budget(budget).await;
                    if budget.allows(failures) {
                        self.config.policy.wait(class).await;
                    }
                }
            }
        }

        warn!(task_id = %task.id, attempts, failures, "retry budget exhausted");
        self.metrics
            .record_outcome(task.kind, false, started.elapsed());
        TaskOutcome::Exhausted {
            attempts,
            last_error,
        }
    }

    /// The stored budget, or `fallback` when the store cannot be read
    async fn current_budget(&self, fallback: RetryBudget) -> RetryBudget {
        match self.settings.retry_budget().await {
            Ok(budget) => budget,
            Err(e) => {
                warn!(error = %e, "failed to read retry budget, keeping previous value");
                fallback
            }
        }
    }

    async fn attempt_swap(
        &self,
        task: &Task,
        direction: TradeDirection,
    ) -> Result<Signature, AttemptError> {
        let amount = task.base_amount()?;
        let input = direction.input_mint(&task.target_address);
        let output = direction.output_mint(&task.target_address);

        debug!(task_id = %task.id, stage = ?ExecutionStage::Quoting, gateway = self.gateway.id(), amount, "requesting quote");
        let quote = self
            .gateway
            .get_quote(input, output, amount, task.slippage_tolerance_bps)
            .await?
            .ok_or_else(|| AttemptError::QuoteUnavailable {
                input: input.to_string(),
                output: output.to_string(),
            })?;

        debug!(task_id = %task.id, stage = ?ExecutionStage::BuildingSwap, out_amount = quote.out_amount, "building swap");
        let wallet = self.signer.pubkey();
        let swap = self.gateway.build_swap_transaction(&quote, &wallet).await?;

        let split = self.config.fees.split_for_quote(&quote, direction);
        debug!(
            task_id = %task.id,
            stage = ?ExecutionStage::AddingFees,
            platform_fee = split.platform,
            aggregator_fee = split.aggregator,
            "adding platform fee"
        );
        let mut transaction = Transaction::from_message(wallet, swap.message);
        for instruction in self.config.fees.transfer_instructions(&wallet, split) {
            transaction.push(instruction);
        }
        transaction.push(Instruction::memo(MEMO_TEXT, &wallet));

        self.submit_and_confirm(transaction).await
    }

    async fn attempt_close(&self) -> Result<Signature, AttemptError> {
        let owner = self.signer.pubkey();

        debug!(stage = ?ExecutionStage::DiscoveringAccounts, owner = %owner, "looking for empty token accounts");
        let empty = find_empty_token_accounts(self.network.as_ref(), &owner).await?;

        let mut transaction = Transaction::new(owner);
        transaction.push(Instruction::set_compute_unit_price(
            self.config.compute_unit_price,
        ));
        transaction.push(Instruction::set_compute_unit_limit(
            self.config.compute_unit_limit,
        ));
        for instruction in close_instructions(&empty, &owner) {
            transaction.push(instruction);
        }

        info!(accounts = empty.len(), "closing empty token accounts");
        self.submit_and_confirm(transaction).await
    }

    async fn submit_and_confirm(&self, transaction: Transaction) -> Result<Signature, AttemptError> {
        let block = self.network.latest_block_reference().await?;

        debug!(stage = ?ExecutionStage::Signing, blockhash = %block.blockhash, "signing transaction");
        let signed = sign_transaction(
            self.codec.as_ref(),
            self.signer.as_ref(),
            transaction.with_block(block.clone()),
        )?;

        debug!(stage = ?ExecutionStage::Submitting, signature = %signed.signature, "submitting transaction");
        let signature = self.network.submit(&signed).await?;

        debug!(stage = ?ExecutionStage::Confirming, signature = %signature, "awaiting confirmation");
        match self.network.confirm(&signature, &block).await? {
            Confirmation::Succeeded => Ok(signature),
            Confirmation::Failed(error) => Err(AttemptError::OnChain(error)),
        }
    }

    fn spawn_refresh(&self, task: &Task) {
        let portfolio = Arc::clone(&self.portfolio);
        let events = self.events.clone();
        let metrics = self.metrics;
        let task_id = task.id;

        tokio::spawn(async move {
            match portfolio.refresh(true).await.with_task_id(&task_id) {
                Ok(Some(snapshot)) => events.publish(TaskEvent::PortfolioRefreshed {
                    lamports: snapshot.lamports,
                }),
                Ok(None) => {}
                Err(_) => metrics.record_refresh_failure(),
            }
        });
    }
}
