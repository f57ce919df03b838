use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Wrapped native SOL mint
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const MEMO_PROGRAM: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
pub const COMPUTE_BUDGET_PROGRAM: &str = "ComputeBudget111111111111111111111111111111";

lazy_static! {
    pub static ref SYSTEM_PROGRAM_ID: Pubkey =
        Pubkey::from_str(SYSTEM_PROGRAM).expect("system program id is valid base58");
    pub static ref TOKEN_PROGRAM_ID: Pubkey =
        Pubkey::from_str(TOKEN_PROGRAM).expect("token program id is valid base58");
    pub static ref TOKEN_2022_PROGRAM_ID: Pubkey =
        Pubkey::from_str(TOKEN_2022_PROGRAM).expect("token-2022 program id is valid base58");
    pub static ref MEMO_PROGRAM_ID: Pubkey =
        Pubkey::from_str(MEMO_PROGRAM).expect("memo program id is valid base58");
    pub static ref COMPUTE_BUDGET_PROGRAM_ID: Pubkey = Pubkey::from_str(COMPUTE_BUDGET_PROGRAM)
        .expect("compute budget program id is valid base58");
}

#[derive(Debug, Error, PartialEq)]
pub enum PubkeyError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("invalid length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// 32-byte account address, displayed as base58
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = PubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| PubkeyError::InvalidBase58(e.to_string()))?;
        let len = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| PubkeyError::InvalidLength(len))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Direction of a swap relative to the native currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Native currency in, token out
    Buy,
    /// Token in, native currency out
    Sell,
}

impl TradeDirection {
    pub fn input_mint<'a>(&self, token_mint: &'a str) -> &'a str {
        match self {
            TradeDirection::Buy => NATIVE_MINT,
            TradeDirection::Sell => token_mint,
        }
    }

    pub fn output_mint<'a>(&self, token_mint: &'a str) -> &'a str {
        match self {
            TradeDirection::Buy => token_mint,
            TradeDirection::Sell => NATIVE_MINT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pubkey_round_trips_through_base58() {
        let key = Pubkey::from_str(USDC_MINT).unwrap();
        assert_eq!(key.to_string(), USDC_MINT);
    }

    #[test]
    fn test_system_program_is_all_zeroes() {
        assert_eq!(SYSTEM_PROGRAM_ID.to_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_pubkey_rejects_wrong_length() {
        assert!(matches!(
            Pubkey::from_str("abc"),
            Err(PubkeyError::InvalidLength(_))
        ));
        assert!(matches!(
            Pubkey::from_str("0OIl"),
            Err(PubkeyError::InvalidBase58(_))
        ));
    }

    #[test]
    fn test_trade_direction_mints() {
        let mint = "BONK";
        assert_eq!(TradeDirection::Buy.input_mint(mint), NATIVE_MINT);
        assert_eq!(TradeDirection::Buy.output_mint(mint), "BONK");
        assert_eq!(TradeDirection::Sell.input_mint(mint), "BONK");
        assert_eq!(TradeDirection::Sell.output_mint(mint), NATIVE_MINT);
    }
}
