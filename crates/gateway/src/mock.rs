use async_trait::async_trait;
use scarlet_types::Pubkey;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::traits::{Quote, QuoteGateway, SwapTransaction};
use crate::GatewayError;

/// Scripted reply for one quote request
#[derive(Debug, Clone)]
pub enum MockQuote {
    /// Quote whose output equals `amount × rate`
    Priced { rate_num: u64, rate_den: u64 },
    Unavailable,
    Fail(GatewayError),
}

#[derive(Default)]
struct MockState {
    script: VecDeque<MockQuote>,
    quote_calls: Vec<(String, String, u64, u16)>,
    swap_calls: usize,
    swap_failures: VecDeque<GatewayError>,
}

/// In-process gateway for tests. Quotes 1:1 unless scripted otherwise.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies consumed in order by subsequent quote requests
    pub fn script(&self, replies: impl IntoIterator<Item = MockQuote>) {
        if let Ok(mut state) = self.state.lock() {
            state.script.extend(replies);
        }
    }

    /// Queue failures for subsequent swap builds
    pub fn fail_swaps(&self, errors: impl IntoIterator<Item = GatewayError>) {
        if let Ok(mut state) = self.state.lock() {
            state.swap_failures.extend(errors);
        }
    }

    pub fn quote_calls(&self) -> Vec<(String, String, u64, u16)> {
        self.state
            .lock()
            .map(|s| s.quote_calls.clone())
            .unwrap_or_default()
    }

    pub fn swap_calls(&self) -> usize {
        self.state.lock().map(|s| s.swap_calls).unwrap_or(0)
    }
}

#[async_trait]
impl QuoteGateway for MockGateway {
    fn id(&self) -> &str {
        "mock"
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

        let reply = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| GatewayError::RequestFailed("mock poisoned".to_string()))?;
            state.quote_calls.push((
                input_mint.to_string(),
                output_mint.to_string(),
                amount,
                slippage_bps,
            ));
            state.script.pop_front().unwrap_or(MockQuote::Priced {
                rate_num: 1,
                rate_den: 1,
            })
        };

        match reply {
            MockQuote::Priced { rate_num, rate_den } => {
                let out_amount = (amount as u128 * rate_num as u128 / rate_den.max(1) as u128)
                    .min(u64::MAX as u128) as u64;
                Ok(Some(Quote {
                    input_mint: input_mint.to_string(),
                    output_mint: output_mint.to_string(),
                    in_amount: amount,
                    out_amount,
                    slippage_bps,
                    raw: json!({
                        "inputMint": input_mint,
                        "outputMint": output_mint,
                        "inAmount": amount.to_string(),
                        "outAmount": out_amount.to_string(),
                        "slippageBps": slippage_bps,
                    }),
                }))
            }
            MockQuote::Unavailable => Ok(None),
            MockQuote::Fail(e) => Err(e),
        }
    }

    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        wallet: &Pubkey,
    ) -> Result<SwapTransaction, GatewayError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| GatewayError::RequestFailed("mock poisoned".to_string()))?;
        state.swap_calls += 1;
        if let Some(e) = state.swap_failures.pop_front() {
            return Err(e);
        }

        let mut message = wallet.to_bytes().to_vec();
        message.extend_from_slice(&quote.in_amount.to_le_bytes());
        Ok(SwapTransaction {
            message,
            last_valid_block_height: None,
            prioritization_fee_lamports: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_quote_is_one_to_one() {
        let gateway = MockGateway::new();
        let quote = gateway.get_quote("a", "b", 1_000, 50).await.unwrap().unwrap();
        assert_eq!(quote.out_amount, 1_000);
        assert_eq!(gateway.quote_calls(), vec![("a".into(), "b".into(), 1_000, 50)]);
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let gateway = MockGateway::new();
        gateway.script([
            MockQuote::Unavailable,
            MockQuote::Fail(GatewayError::QuoteUnavailable),
            MockQuote::Priced {
                rate_num: 3,
                rate_den: 2,
            },
        ]);

        assert_eq!(gateway.get_quote("a", "b", 10, 1).await, Ok(None));
        assert!(gateway.get_quote("a", "b", 10, 1).await.is_err());
        let quote = gateway.get_quote("a", "b", 10, 1).await.unwrap().unwrap();
        assert_eq!(quote.out_amount, 15);
    }

    #[tokio::test]
    async fn test_zero_amount_not_recorded() {
        let gateway = MockGateway::new();
        assert_eq!(gateway.get_quote("a", "b", 0, 1).await, Ok(None));
        assert!(gateway.quote_calls().is_empty());
    }

    #[tokio::test]
    async fn test_swap_failures() {
        let gateway = MockGateway::new();
        gateway.fail_swaps([GatewayError::Status {
            status: 500,
            body: "boom".into(),
        }]);
        let quote = gateway.get_quote("a", "b", 10, 1).await.unwrap().unwrap();
        let wallet = Pubkey::new([2u8; 32]);

        assert!(gateway.build_swap_transaction(&quote, &wallet).await.is_err());
        assert!(gateway.build_swap_transaction(&quote, &wallet).await.is_ok());
        assert_eq!(gateway.swap_calls(), 2);
    }
}
