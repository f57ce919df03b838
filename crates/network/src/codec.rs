use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scarlet_types::{Instruction, Pubkey, Signature, SignedTransaction, Signer, Transaction};
use serde::Serialize;

use crate::NetworkError;

/// Turns transactions into bytes. Implementations wrap a real transaction
/// encoding library; the executor only needs these two capabilities.
pub trait TransactionCodec: Send + Sync {
    /// Bytes the wallet signs
    fn message_bytes(&self, transaction: &Transaction) -> Result<Vec<u8>, NetworkError>;

    /// Bytes sent to the network
    fn wire_bytes(
        &self,
        transaction: &Transaction,
        signature: &Signature,
    ) -> Result<Vec<u8>, NetworkError>;
}

/// Compile, sign, and serialize in one step
pub fn sign_transaction(
    codec: &dyn TransactionCodec,
    signer: &dyn Signer,
    transaction: Transaction,
) -> Result<SignedTransaction, NetworkError> {
    if transaction.recent_block.is_none() {
        return Err(NetworkError::Encoding(
            "transaction has no recent block reference".to_string(),
        ));
    }

    let message = codec.message_bytes(&transaction)?;
    let signature = signer.sign_message(&message);
    let wire = codec.wire_bytes(&transaction, &signature)?;

    Ok(SignedTransaction {
        transaction,
        signature,
        wire,
    })
}

#[derive(Serialize)]
struct CanonicalMessage<'a> {
    fee_payer: &'a Pubkey,
    blockhash: &'a str,
    base_message: Option<String>,
    instructions: &'a [Instruction],
}

/// Deterministic JSON encoding used for offline signing and tests.
///
/// Wire layout: one signature count byte, the 64-byte signature, then the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalCodec;

impl TransactionCodec for CanonicalCodec {
    fn message_bytes(&self, transaction: &Transaction) -> Result<Vec<u8>, NetworkError> {
        let blockhash = transaction
            .recent_block
            .as_ref()
            .map(|b| b.blockhash.as_str())
            .unwrap_or_default();

        let message = CanonicalMessage {
            fee_payer: &transaction.fee_payer,
            blockhash,
            base_message: transaction.base_message.as_ref().map(|m| STANDARD.encode(m)),
            instructions: &transaction.instructions,
        };

        serde_json::to_vec(&message).map_err(|e| NetworkError::Encoding(e.to_string()))
    }

    fn wire_bytes(
        &self,
        transaction: &Transaction,
        signature: &Signature,
    ) -> Result<Vec<u8>, NetworkError> {
        let message = self.message_bytes(transaction)?;
        let mut wire = Vec::with_capacity(1 + 64 + message.len());
        wire.push(1);
        wire.extend_from_slice(&signature.to_bytes());
        wire.extend_from_slice(&message);
        Ok(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scarlet_types::{BlockReference, Keypair};

    fn block() -> BlockReference {
        BlockReference {
            blockhash: "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N".to_string(),
            last_valid_block_height: 100,
        }
    }

    #[test]
    fn test_sign_transaction_signature_verifies() {
        let keypair = Keypair::from_secret_bytes([3u8; 32]);
        let mut tx = Transaction::new(keypair.pubkey()).with_block(block());
        tx.push(Instruction::set_compute_unit_limit(200_000));

        let signed = sign_transaction(&CanonicalCodec, &keypair, tx).unwrap();
        let message = CanonicalCodec.message_bytes(&signed.transaction).unwrap();

        assert!(signed.signature.verify(&keypair.pubkey(), &message).is_ok());
        assert_eq!(signed.wire[0], 1);
        assert_eq!(&signed.wire[1..65], &signed.signature.to_bytes());
        assert_eq!(&signed.wire[65..], &message[..]);
    }

    #[test]
    fn test_sign_requires_block_reference() {
        let keypair = Keypair::from_secret_bytes([3u8; 32]);
        let tx = Transaction::new(keypair.pubkey());
        assert!(matches!(
            sign_transaction(&CanonicalCodec, &keypair, tx),
            Err(NetworkError::Encoding(_))
        ));
    }

    #[test]
    fn test_message_changes_with_blockhash() {
        let payer = Pubkey::new([1u8; 32]);
        let a = Transaction::new(payer).with_block(block());
        let b = Transaction::new(payer).with_block(BlockReference {
            blockhash: "other".to_string(),
            last_valid_block_height: 100,
        });

        assert_ne!(
            CanonicalCodec.message_bytes(&a).unwrap(),
            CanonicalCodec.message_bytes(&b).unwrap()
        );
    }
}
