use ed25519_dalek::{Signer as DalekSigner, SigningKey};
use std::fmt;
use thiserror::Error;

use crate::token::Pubkey;
use crate::transaction::Signature;

#[derive(Debug, Error, PartialEq)]
pub enum KeypairError {
    #[error("invalid base58 secret: {0}")]
    InvalidBase58(String),

    #[error("invalid secret length: expected 32 or 64 bytes, got {0}")]
    InvalidLength(usize),

    #[error("public half does not match secret")]
    MismatchedPublicKey,
}

/// Signs transaction messages on behalf of the wallet
pub trait Signer: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    fn sign_message(&self, message: &[u8]) -> Signature;
}

/// Ed25519 wallet keypair
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    /// Accepts a 32-byte seed or the 64-byte `secret || public` layout wallets export
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        match bytes.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(bytes);
                Ok(Self::from_secret_bytes(seed))
            }
            64 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes[..32]);
                let keypair = Self::from_secret_bytes(seed);
                if keypair.pubkey().as_bytes()[..] != bytes[32..] {
                    return Err(KeypairError::MismatchedPublicKey);
                }
                Ok(keypair)
            }
            len => Err(KeypairError::InvalidLength(len)),
        }
    }

    pub fn from_base58_secret(secret: &str) -> Result<Self, KeypairError> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| KeypairError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// 64-byte `secret || public` form
    pub fn to_keypair_bytes(&self) -> [u8; 64] {
        self.signing_key.to_keypair_bytes()
    }
}

impl Signer for Keypair {
    fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::from_secret_bytes([42u8; 32]);
        let sig = keypair.sign_message(b"message");
        assert!(sig.verify(&keypair.pubkey(), b"message").is_ok());
    }

    #[test]
    fn test_base58_secret_round_trip() {
        let keypair = Keypair::from_secret_bytes([5u8; 32]);
        let encoded = bs58::encode(keypair.to_keypair_bytes()).into_string();

        let decoded = Keypair::from_base58_secret(&encoded).unwrap();
        assert_eq!(decoded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_mismatched_public_half_rejected() {
        let mut bytes = Keypair::from_secret_bytes([5u8; 32]).to_keypair_bytes();
        bytes[63] ^= 0xff;
        assert_eq!(
            Keypair::from_bytes(&bytes).unwrap_err(),
            KeypairError::MismatchedPublicKey
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let keypair = Keypair::from_secret_bytes([1u8; 32]);
        let debug = format!("{keypair:?}");
        assert!(debug.contains("pubkey"));
        assert!(!debug.contains("signing_key"));
    }
}
