use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scarlet_types::Pubkey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::traits::{Quote, QuoteGateway, SwapTransaction};
use crate::GatewayError;

pub const JUPITER_MAINNET_URL: &str = "https://quote-api.jup.ag/v6";

/// Jupiter v6 quote/swap API client
pub struct JupiterClient {
    base_url: String,
    client: reqwest::Client,
}

impl JupiterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn mainnet() -> Self {
        Self::new(JUPITER_MAINNET_URL)
    }

    /// Client whose requests give up after `timeout`
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Setup(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, GatewayError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "jupiter API error");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("failed to parse response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    input_mint: String,
    output_mint: String,
    in_amount: String,
    out_amount: String,
    slippage_bps: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a Value,
    user_public_key: String,
    dynamic_compute_unit_limit: bool,
    prioritization_fee_lamports: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
    last_valid_block_height: Option<u64>,
    prioritization_fee_lamports: Option<u64>,
}

pub(crate) fn parse_quote(raw: Value) -> Result<Option<Quote>, GatewayError> {
    if raw.get("error").is_some() {
        debug!(response = %raw, "jupiter returned no route");
        return Ok(None);
    }

    let parsed: QuoteResponse = serde_json::from_value(raw.clone())
        .map_err(|e| GatewayError::Decode(format!("invalid quote: {e}")))?;

    let parse_amount = |field: &str, value: &str| {
        value
            .parse::<u64>()
            .map_err(|e| GatewayError::Decode(format!("invalid {field}: {e}")))
    };

    Ok(Some(Quote {
        in_amount: parse_amount("inAmount", &parsed.in_amount)?,
        out_amount: parse_amount("outAmount", &parsed.out_amount)?,
        input_mint: parsed.input_mint,
        output_mint: parsed.output_mint,
        slippage_bps: parsed.slippage_bps,
        raw,
    }))
}

pub(crate) fn parse_swap(raw: Value) -> Result<SwapTransaction, GatewayError> {
    let parsed: SwapResponse = serde_json::from_value(raw)
        .map_err(|e| GatewayError::Decode(format!("invalid swap response: {e}")))?;

    let message = STANDARD
        .decode(parsed.swap_transaction.as_bytes())
        .map_err(|e| GatewayError::Decode(format!("invalid base64 transaction: {e}")))?;

    Ok(SwapTransaction {
        message,
        last_valid_block_height: parsed.last_valid_block_height,
        prioritization_fee_lamports: parsed.prioritization_fee_lamports,
    })
}

#[async_trait]
impl QuoteGateway for JupiterClient {
    fn id(&self) -> &str {
        "jupiter"
    }

    async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Option<Quote>, GatewayError> {
        if amount == 0 {
            return Ok(None);
        }

        let url = format!("{}/quote", self.base_url);
        debug!(%url, input_mint, output_mint, amount, slippage_bps, "requesting quote");

        let amount = amount.to_string();
        let slippage = slippage_bps.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", input_mint),
                ("outputMint", output_mint),
                ("amount", amount.as_str()),
                ("swapMode", "ExactIn"),
                ("slippageBps", slippage.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        parse_quote(Self::read_json(response).await?)
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        wallet: &Pubkey,
    ) -> Result<SwapTransaction, GatewayError> {
        let url = format!("{}/swap", self.base_url);
        let request = SwapRequest {
            quote_response: &quote.raw,
            user_public_key: wallet.to_string(),
            dynamic_compute_unit_limit: true,
            prioritization_fee_lamports: "auto",
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::RequestFailed(e.to_string()))?;

        parse_swap(Self::read_json(response).await?)
    }
}
