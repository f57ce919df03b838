use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scarlet_retry::ExponentialBackoff;
use scarlet_types::{BlockReference, Pubkey, Signature, SignedTransaction};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::accounts::parse_token_account;
use crate::service::{Confirmation, NetworkService, ParsedAccount, TokenAccount};
use crate::NetworkError;

pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Solana JSON-RPC client
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
    commitment: String,
    confirm_initial: Duration,
    confirm_max: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            commitment: "confirmed".to_string(),
            confirm_initial: Duration::from_millis(250),
            confirm_max: Duration::from_secs(2),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn mainnet() -> Self {
        Self::new(MAINNET_RPC_URL)
    }

    /// Client whose HTTP requests give up after `timeout`
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            ..Self::new(url)
        })
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    /// Polling schedule used while confirming
    pub fn with_confirm_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.confirm_initial = initial;
        self.confirm_max = max;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, NetworkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        trace!(method, id, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(method, status = %status, "rpc HTTP error");
            return Err(NetworkError::ConnectionFailed(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

        decode_rpc_response(body)
    }

    async fn block_height(&self) -> Result<u64, NetworkError> {
        self.call("getBlockHeight", json!([{ "commitment": self.commitment }]))
            .await
    }

    async fn signature_status(&self, signature: &Signature) -> Result<Option<Confirmation>, NetworkError> {
        let statuses: RpcContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;

        Ok(statuses
            .value
            .into_iter()
            .next()
            .flatten()
            .and_then(|status| status.confirmation(&self.commitment)))
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestBlockhash {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<Value>,
    confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// `None` while the signature has not reached the requested commitment
    fn confirmation(&self, commitment: &str) -> Option<Confirmation> {
        let reached = match (self.confirmation_status.as_deref(), commitment) {
            (Some("finalized"), _) => true,
            (Some("confirmed"), "confirmed" | "processed") => true,
            (Some("processed"), "processed") => true,
            _ => false,
        };

        if !reached {
            return None;
        }

        Some(match &self.err {
            None | Some(Value::Null) => Confirmation::Succeeded,
            Some(err) => Confirmation::Failed(err.to_string()),
        })
    }
}

fn decode_rpc_response<T: DeserializeOwned>(mut body: Value) -> Result<T, NetworkError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let error: RpcErrorObject = serde_json::from_value(error.clone())
            .map_err(|e| NetworkError::InvalidResponse(format!("invalid rpc error: {e}")))?;
        return Err(NetworkError::from_rpc(error.code, error.message));
    }

    let result = body
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| NetworkError::InvalidResponse("missing result".to_string()))?;

    serde_json::from_value(result).map_err(|e| NetworkError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl NetworkService for RpcClient {
    async fn latest_block_reference(&self) -> Result<BlockReference, NetworkError> {
        let latest: RpcContext<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([{ "commitment": self.commitment }]))
            .await?;

        Ok(BlockReference {
            blockhash: latest.value.blockhash,
            last_valid_block_height: latest.value.last_valid_block_height,
        })
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<Signature, NetworkError> {
        let encoded = STANDARD.encode(&transaction.wire);
        let signature: String = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment,
                }]),
            )
            .await?;

        debug!(signature = %signature, "transaction submitted");
        Signature::from_str(&signature).map_err(|e| NetworkError::InvalidResponse(e.to_string()))
    }

    async fn confirm(
        &self,
        signature: &Signature,
        block: &BlockReference,
    ) -> Result<Confirmation, NetworkError> {
        let mut backoff = ExponentialBackoff::new(self.confirm_initial, self.confirm_max);

        loop {
            if let Some(confirmation) = self.signature_status(signature).await? {
                debug!(signature = %signature, polls = backoff.polls(), "signature reached commitment");
                return Ok(confirmation);
            }

            if self.block_height().await? > block.last_valid_block_height {
                return Err(NetworkError::BlockHeightExceeded {
                    signature: signature.to_string(),
                });
            }

            tokio::time::sleep(backoff.next_delay()).await;
        }
    }

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, NetworkError> {
        let balance: RpcContext<u64> = self
            .call(
                "getBalance",
                json!([owner.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        Ok(balance.value)
    }

    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        program: &Pubkey,
    ) -> Result<Vec<TokenAccount>, NetworkError> {
        let accounts: RpcContext<Vec<Value>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "programId": program.to_string() },
                    { "encoding": "jsonParsed", "commitment": self.commitment }
                ]),
            )
            .await?;

        accounts
            .value
            .into_iter()
            .map(|value| parse_token_account(program, value))
            .collect()
    }

    async fn get_parsed_account(
        &self,
        address: &Pubkey,
    ) -> Result<Option<ParsedAccount>, NetworkError> {
        let account: RpcContext<Option<Value>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), { "encoding": "jsonParsed", "commitment": self.commitment }]),
            )
            .await?;

        account
            .value
            .map(|value| parse_account_info(address, value))
            .transpose()
    }
}

fn parse_account_info(address: &Pubkey, mut value: Value) -> Result<ParsedAccount, NetworkError> {
    let lamports = value
        .get("lamports")
        .and_then(Value::as_u64)
        .ok_or_else(|| NetworkError::InvalidResponse("missing lamports".to_string()))?;
    let owner = value
        .get("owner")
        .and_then(Value::as_str)
        .ok_or_else(|| NetworkError::InvalidResponse("missing owner".to_string()))
        .and_then(|o| {
            Pubkey::from_str(o).map_err(|e| NetworkError::InvalidResponse(e.to_string()))
        })?;
    let data = value.get_mut("data").map(Value::take).unwrap_or(Value::Null);

    Ok(ParsedAccount {
        address: *address,
        lamports,
        owner,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_result() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": {"context": {"slot": 1}, "value": 42}});
        let decoded: RpcContext<u64> = decode_rpc_response(body).unwrap();
        assert_eq!(decoded.value, 42);
    }

    #[test]
    fn test_decode_simulation_error() {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": -32002,
                "message": "Transaction simulation failed: Error processing Instruction 2: custom program error: 0x1771"
            }
        });
        let result: Result<String, _> = decode_rpc_response(body);
        assert!(result.unwrap_err().is_simulation_failure());
    }

    #[test]
    fn test_decode_other_error() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32005, "message": "Node is unhealthy"}});
        let result: Result<String, _> = decode_rpc_response(body);
        assert_eq!(
            result.unwrap_err(),
            NetworkError::Rpc {
                code: -32005,
                message: "Node is unhealthy".to_string()
            }
        );
    }

    #[test]
    fn test_decode_missing_result() {
        let result: Result<u64, _> = decode_rpc_response(json!({"jsonrpc": "2.0", "id": 1}));
        assert!(matches!(result, Err(NetworkError::InvalidResponse(_))));
    }

    #[test]
    fn test_signature_status_commitment() {
        let status = SignatureStatus {
            err: None,
            confirmation_status: Some("processed".to_string()),
        };
        assert_eq!(status.confirmation("confirmed"), None);

        let status = SignatureStatus {
            err: None,
            confirmation_status: Some("confirmed".to_string()),
        };
        assert_eq!(status.confirmation("confirmed"), Some(Confirmation::Succeeded));
        assert_eq!(status.confirmation("finalized"), None);

        let status = SignatureStatus {
            err: Some(json!({"InstructionError": [2, {"Custom": 6001}]})),
            confirmation_status: Some("finalized".to_string()),
        };
        assert!(matches!(
            status.confirmation("confirmed"),
            Some(Confirmation::Failed(_))
        ));
    }

    #[test]
    fn test_parse_account_info() {
        let address = Pubkey::new([7u8; 32]);
        let value = json!({
            "lamports": 2039280,
            "owner": scarlet_types::TOKEN_PROGRAM,
            "data": {"program": "spl-token", "parsed": {}},
            "executable": false
        });

        let account = parse_account_info(&address, value).unwrap();
        assert_eq!(account.lamports, 2_039_280);
        assert_eq!(account.owner.to_string(), scarlet_types::TOKEN_PROGRAM);
        assert_eq!(account.data["program"], "spl-token");
    }

    #[test]
    fn test_builder_options() {
        let client = RpcClient::new("http://localhost:8899")
            .with_commitment("finalized")
            .with_confirm_backoff(Duration::from_millis(10), Duration::from_millis(20));
        assert_eq!(client.url(), "http://localhost:8899");
        assert_eq!(client.commitment, "finalized");
    }
}
