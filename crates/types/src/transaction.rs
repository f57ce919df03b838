use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::token::{
    Pubkey, COMPUTE_BUDGET_PROGRAM_ID, MEMO_PROGRAM_ID, SYSTEM_PROGRAM_ID,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    /// Compute-budget `SetComputeUnitPrice`
    pub fn set_compute_unit_price(micro_lamports: u64) -> Self {
        let mut data = Vec::with_capacity(9);
        data.push(3);
        data.extend_from_slice(&micro_lamports.to_le_bytes());
        Self {
            program_id: *COMPUTE_BUDGET_PROGRAM_ID,
            accounts: vec![],
            data,
        }
    }

    /// Compute-budget `SetComputeUnitLimit`
    pub fn set_compute_unit_limit(units: u32) -> Self {
        let mut data = Vec::with_capacity(5);
        data.push(2);
        data.extend_from_slice(&units.to_le_bytes());
        Self {
            program_id: *COMPUTE_BUDGET_PROGRAM_ID,
            accounts: vec![],
            data,
        }
    }

    /// System-program transfer of `lamports` from `from` to `to`
    pub fn transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Self {
        let mut data = Vec::with_capacity(12);
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&lamports.to_le_bytes());
        Self {
            program_id: *SYSTEM_PROGRAM_ID,
            accounts: vec![
                AccountMeta::writable(*from, true),
                AccountMeta::writable(*to, false),
            ],
            data,
        }
    }

    pub fn memo(text: &str, signer: &Pubkey) -> Self {
        Self {
            program_id: *MEMO_PROGRAM_ID,
            accounts: vec![AccountMeta::writable(*signer, true)],
            data: text.as_bytes().to_vec(),
        }
    }

    /// Token `CloseAccount`, crediting the rent to `destination`
    pub fn close_account(
        token_program: &Pubkey,
        account: &Pubkey,
        destination: &Pubkey,
        owner: &Pubkey,
    ) -> Self {
        Self {
            program_id: *token_program,
            accounts: vec![
                AccountMeta::writable(*account, false),
                AccountMeta::writable(*destination, false),
                AccountMeta::readonly(*owner, true),
            ],
            data: vec![9],
        }
    }

    pub fn is_close_account(&self) -> bool {
        self.data.first() == Some(&9) && self.data.len() == 1
    }
}

/// Recent blockhash plus the last block height at which it is valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReference {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// An unsigned transaction.
///
/// `base_message` carries the serialized message an aggregator returned, when the
/// transaction was built remotely; `instructions` are appended to it by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub fee_payer: Pubkey,
    pub base_message: Option<Vec<u8>>,
    pub instructions: Vec<Instruction>,
    pub recent_block: Option<BlockReference>,
}

impl Transaction {
    pub fn new(fee_payer: Pubkey) -> Self {
        Self {
            fee_payer,
            ..Default::default()
        }
    }

    pub fn from_message(fee_payer: Pubkey, message: Vec<u8>) -> Self {
        Self {
            fee_payer,
            base_message: Some(message),
            ..Default::default()
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn with_block(mut self, block: BlockReference) -> Self {
        self.recent_block = Some(block);
        self
    }

    pub fn close_instruction_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|ix| ix.is_close_account())
            .count()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("invalid length: expected 64 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("signature does not verify")]
    VerificationFailed,
}

/// Ed25519 signature; its base58 form is the transaction hash
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.0
    }

    pub fn verify(&self, pubkey: &Pubkey, message: &[u8]) -> Result<(), SignatureError> {
        let key = VerifyingKey::from_bytes(pubkey.as_bytes())
            .map_err(|_| SignatureError::InvalidPublicKey)?;
        let sig = DalekSignature::from_bytes(&self.0);
        key.verify(message, &sig)
            .map_err(|_| SignatureError::VerificationFailed)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SignatureError::InvalidBase58(e.to_string()))?;
        let len = bytes.len();
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| SignatureError::InvalidLength(len))?;
        Ok(Self(array))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A signed transaction ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
    /// Serialized wire form
    pub wire: Vec<u8>,
}
