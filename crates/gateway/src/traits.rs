use async_trait::async_trait;
use scarlet_types::{Pubkey, TradeDirection};
use serde_json::Value;

use crate::GatewayError;

/// Priced route returned by the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub input_mint: String,
    pub output_mint: String,
    /// Base units offered
    pub in_amount: u64,
    /// Base units expected back
    pub out_amount: u64,
    pub slippage_bps: u16,
    /// Untouched response body, handed back when building the swap
    pub raw: Value,
}

impl Quote {
    /// Amount in native base units the platform fee is charged on
    pub fn fee_base(&self, direction: TradeDirection) -> u64 {
        match direction {
            TradeDirection::Buy => self.in_amount,
            TradeDirection::Sell => self.out_amount,
        }
    }
}

/// Serialized swap message returned by the aggregator, ready for fee augmentation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapTransaction {
    pub message: Vec<u8>,
    pub last_valid_block_height: Option<u64>,
    pub prioritization_fee_lamports: Option<u64>,
}

/// Quote and swap-building capability of a third-party aggregator
#[async_trait]
pub trait QuoteGateway: Send + Sync {
    /// Identifier used in logs
    fn id(&self) -> &str;

    /// Exact-in quote. A zero amount yields `Ok(None)` without a remote call.
    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>, GatewayError>;

    /// Signable swap for `wallet` with dynamic compute limit and automatic priority fee
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        wallet: &Pubkey,
    ) -> Result<SwapTransaction, GatewayError>;
}
