//! Core configuration structures for the Scarlet wallet back-end

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Solana RPC endpoint and confirmation behaviour
    #[serde(default)]
    pub network: NetworkConfig,

    /// Swap aggregator endpoint
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Platform fee charged on swaps
    #[serde(default)]
    pub fees: FeeConfig,

    /// Fixed priority fee for account-closing transactions
    #[serde(default)]
    pub priority_fee: PriorityFeeConfig,

    /// Task execution and enqueue policy
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Which stored secret signs transactions
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Where pending and recent tasks are persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log filter and output format
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint. A `node` value in the settings store replaces it.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Commitment level waited for when confirming
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// HTTP request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// First delay between signature status polls
    #[serde(default = "default_confirm_poll_initial_ms")]
    pub confirm_poll_initial_ms: u64,

    /// Upper bound on the delay between signature status polls
    #[serde(default = "default_confirm_poll_max_ms")]
    pub confirm_poll_max_ms: u64,
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn confirm_poll_initial(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_initial_ms)
    }

    pub fn confirm_poll_max(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_max_ms)
    }
}

/// Quote/swap aggregator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Aggregator API base URL
    #[serde(default = "default_gateway_url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub timeout_ms: u64,
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Fee configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Platform fee in basis points of the native swap amount
    #[serde(default = "default_platform_fee_bps")]
    pub platform_fee_bps: u32,

    /// Fraction of the fee paid to the aggregator (0.025 = 2.5 %)
    #[serde(default = "default_aggregator_share")]
    pub aggregator_share: Decimal,

    /// Base58 address receiving the platform share
    #[serde(default = "default_platform_collector")]
    pub platform_collector: String,

    /// Base58 address receiving the aggregator share
    #[serde(default = "default_aggregator_collector")]
    pub aggregator_collector: String,
}

/// Compute budget attached to account-closing transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityFeeConfig {
    /// Price per compute unit in micro-lamports
    #[serde(default = "default_micro_lamports")]
    pub micro_lamports: u64,

    /// Compute unit limit
    #[serde(default = "default_compute_unit_limit")]
    pub compute_unit_limit: u32,
}

/// Execution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Retry budget written to the settings store when none is set.
    /// `-1` means unlimited.
    #[serde(default = "default_retry_count")]
    pub default_retry_count: i64,

    /// Delay before retrying after a simulation failure
    #[serde(default)]
    pub transient_delay_ms: u64,

    /// Delay before retrying after a budget-consuming failure
    #[serde(default = "default_bounded_delay_ms")]
    pub bounded_delay_ms: u64,

    /// SOL kept back from buys to cover rent and fees
    #[serde(default = "default_rent_safety_margin")]
    pub rent_safety_margin: Decimal,

    /// Minimum interval between non-forced portfolio refreshes
    #[serde(default = "default_portfolio_refresh_secs")]
    pub portfolio_refresh_secs: u64,
}

impl ExecutionConfig {
    pub fn transient_delay(&self) -> Duration {
        Duration::from_millis(self.transient_delay_ms)
    }

    pub fn bounded_delay(&self) -> Duration {
        Duration::from_millis(self.bounded_delay_ms)
    }

    pub fn portfolio_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.portfolio_refresh_secs)
    }
}

/// Wallet configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Settings-store label of the encrypted secret
    #[serde(default = "default_secret_label")]
    pub secret_label: String,

    /// Optional file holding a base58 keypair, used instead of the store
    #[serde(default)]
    pub keypair_path: Option<PathBuf>,
}

/// Storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Json,
    Sqlite,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// File path for the `json` and `sqlite` backends
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_confirm_poll_initial_ms() -> u64 {
    250
}

fn default_confirm_poll_max_ms() -> u64 {
    2_000
}

fn default_gateway_url() -> String {
    "https://quote-api.jup.ag/v6".to_string()
}

fn default_platform_fee_bps() -> u32 {
    20 // 0.2%
}

fn default_aggregator_share() -> Decimal {
    Decimal::new(25, 3)
}

fn default_platform_collector() -> String {
    "BwUfN6xYAjAEk1278L6GoQTCSfVAXdiPQMraheqhUC3e".to_string()
}

fn default_aggregator_collector() -> String {
    "462rcS83W27gP4ZkAPja93we1f9FGFcErh9ANqVd6t6e".to_string()
}

fn default_micro_lamports() -> u64 {
    50_000
}

fn default_compute_unit_limit() -> u32 {
    200_000
}

fn default_retry_count() -> i64 {
    3
}

fn default_bounded_delay_ms() -> u64 {
    100
}

fn default_rent_safety_margin() -> Decimal {
    Decimal::new(6, 3)
}

fn default_portfolio_refresh_secs() -> u64 {
    60
}

fn default_secret_label() -> String {
    "wallet".to_string()
}

fn default_log_filter() -> String {
    "info,scarlet=debug".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            request_timeout_ms: default_request_timeout_ms(),
            confirm_poll_initial_ms: default_confirm_poll_initial_ms(),
            confirm_poll_max_ms: default_confirm_poll_max_ms(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: default_platform_fee_bps(),
            aggregator_share: default_aggregator_share(),
            platform_collector: default_platform_collector(),
            aggregator_collector: default_aggregator_collector(),
        }
    }
}

impl Default for PriorityFeeConfig {
    fn default() -> Self {
        Self {
            micro_lamports: default_micro_lamports(),
            compute_unit_limit: default_compute_unit_limit(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_retry_count: default_retry_count(),
            transient_delay_ms: 0,
            bounded_delay_ms: default_bounded_delay_ms(),
            rent_safety_margin: default_rent_safety_margin(),
            portfolio_refresh_secs: default_portfolio_refresh_secs(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            secret_label: default_secret_label(),
            keypair_path: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.fees.platform_fee_bps, 20);
        assert_eq!(config.fees.aggregator_share.to_string(), "0.025");
        assert_eq!(config.priority_fee.micro_lamports, 50_000);
        assert_eq!(config.priority_fee.compute_unit_limit, 200_000);
        assert_eq!(config.execution.default_retry_count, 3);
        assert_eq!(config.execution.rent_safety_margin.to_string(), "0.006");
        assert_eq!(config.execution.bounded_delay(), Duration::from_millis(100));
        assert_eq!(config.execution.transient_delay(), Duration::ZERO);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
