//! Configuration validation

use crate::{AppConfig, ConfigError, Result, StorageBackend};
use rust_decimal::Decimal;
use scarlet_types::Pubkey;
use std::str::FromStr;

/// Solana caps a transaction at 1.4M compute units
const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Network
    if let Err(e) = validate_url(&config.network.rpc_url) {
        errors.push(ValidationError::new("network.rpc_url", e));
    }

    if let Err(e) = validate_commitment(&config.network.commitment) {
        errors.push(e);
    }

    if config.network.request_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "network.request_timeout_ms",
            "must be greater than 0",
        ));
    }

    if config.network.confirm_poll_initial_ms == 0 {
        errors.push(ValidationError::new(
            "network.confirm_poll_initial_ms",
            "must be greater than 0",
        ));
    }

    if config.network.confirm_poll_max_ms < config.network.confirm_poll_initial_ms {
        errors.push(ValidationError::new(
            "network.confirm_poll_max_ms",
            "must be >= confirm_poll_initial_ms",
        ));
    }

    // Gateway
    if let Err(e) = validate_url(&config.gateway.base_url) {
        errors.push(ValidationError::new("gateway.base_url", e));
    }

    if config.gateway.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "gateway.timeout_ms",
            "must be greater than 0",
        ));
    }

    // Fees
    if config.fees.platform_fee_bps > 10000 {
        errors.push(ValidationError::new(
            "fees.platform_fee_bps",
            "must be <= 10000 (100%)",
        ));
    }

    if config.fees.aggregator_share < Decimal::ZERO || config.fees.aggregator_share > Decimal::ONE {
        errors.push(ValidationError::new(
            "fees.aggregator_share",
            "must be between 0 and 1",
        ));
    }

    if let Err(e) = validate_pubkey(&config.fees.platform_collector) {
        errors.push(ValidationError::new("fees.platform_collector", e));
    }

    if let Err(e) = validate_pubkey(&config.fees.aggregator_collector) {
        errors.push(ValidationError::new("fees.aggregator_collector", e));
    }

    // Priority fee
    if config.priority_fee.compute_unit_limit == 0
        || config.priority_fee.compute_unit_limit > MAX_COMPUTE_UNIT_LIMIT
    {
        errors.push(ValidationError::new(
            "priority_fee.compute_unit_limit",
            format!("must be between 1 and {MAX_COMPUTE_UNIT_LIMIT}"),
        ));
    }

    // Execution
    if config.execution.default_retry_count < -1 {
        errors.push(ValidationError::new(
            "execution.default_retry_count",
            "must be -1 (unlimited) or >= 0",
        ));
    }

    if config.execution.rent_safety_margin < Decimal::ZERO {
        errors.push(ValidationError::new(
            "execution.rent_safety_margin",
            "must not be negative",
        ));
    }

    // Wallet
    if config.wallet.secret_label.trim().is_empty() {
        errors.push(ValidationError::new(
            "wallet.secret_label",
            "secret label is required",
        ));
    }

    // Storage
    if config.storage.backend != StorageBackend::Memory && config.storage.path.is_none() {
        errors.push(ValidationError::new(
            "storage.path",
            "path is required for file-backed storage",
        ));
    }

    // Logging
    if config.logging.filter.trim().is_empty() {
        errors.push(ValidationError::new(
            "logging.filter",
            "filter must not be empty",
        ));
    }

    // Return all errors if any were found
    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    Ok(())
}

/// Validate a base58 account address
pub fn validate_pubkey(address: &str) -> std::result::Result<(), String> {
    Pubkey::from_str(address)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

fn validate_commitment(commitment: &str) -> std::result::Result<(), ValidationError> {
    match commitment {
        "processed" | "confirmed" | "finalized" => Ok(()),
        _ => Err(ValidationError::new(
            "network.commitment",
            format!(
                "invalid commitment '{commitment}', must be one of: processed, confirmed, finalized"
            ),
        )),
    }
}
