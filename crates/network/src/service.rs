use async_trait::async_trait;
use rust_decimal::Decimal;
use scarlet_types::{BlockReference, Pubkey, Signature, SignedTransaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NetworkError;

/// Final state of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Succeeded,
    /// Landed on chain with an execution error
    Failed(String),
}

impl Confirmation {
    pub fn is_success(&self) -> bool {
        matches!(self, Confirmation::Succeeded)
    }
}

/// SPL token account owned by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub address: Pubkey,
    pub mint: String,
    pub owner: Pubkey,
    /// Token program that owns the account
    pub program: Pubkey,
    /// Base units
    pub amount: u64,
    pub decimals: u8,
    pub frozen: bool,
}

impl TokenAccount {
    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Balance in human units
    pub fn ui_amount(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.amount as i128, self.decimals as u32)
    }
}

/// Account as returned by a `jsonParsed` account query
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAccount {
    pub address: Pubkey,
    pub lamports: u64,
    /// Program owning the account
    pub owner: Pubkey,
    pub data: Value,
}

/// Blockchain submission and query capability
#[async_trait]
pub trait NetworkService: Send + Sync {
    async fn latest_block_reference(&self) -> Result<BlockReference, NetworkError>;

    /// Send a signed transaction, returning its signature
    async fn submit(&self, transaction: &SignedTransaction) -> Result<Signature, NetworkError>;

    /// Wait until `signature` lands or `block` expires
    async fn confirm(
        &self,
        signature: &Signature,
        block: &BlockReference,
    ) -> Result<Confirmation, NetworkError>;

    /// Native balance in lamports
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, NetworkError>;

    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        program: &Pubkey,
    ) -> Result<Vec<TokenAccount>, NetworkError>;

    async fn get_parsed_account(
        &self,
        address: &Pubkey,
    ) -> Result<Option<ParsedAccount>, NetworkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_token_account_ui_amount() {
        let account = TokenAccount {
            address: Pubkey::new([1u8; 32]),
            mint: "mint".to_string(),
            owner: Pubkey::new([2u8; 32]),
            program: Pubkey::new([3u8; 32]),
            amount: 1_234_567,
            decimals: 6,
            frozen: false,
        };

        assert_eq!(account.ui_amount(), Decimal::from_str("1.234567").unwrap());
        assert!(!account.is_empty());
    }
}
