use async_trait::async_trait;
use scarlet_types::{BlockReference, Pubkey, Signature, SignedTransaction};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::service::{Confirmation, NetworkService, ParsedAccount, TokenAccount};
use crate::NetworkError;

/// Scripted result of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum MockSubmit {
    /// Accepted and confirmed without error
    Confirm,
    /// Accepted, then confirmed with an on-chain error
    OnChainError(String),
    /// Rejected by pre-flight simulation
    SimulationFailure,
    /// Rejected by the node for another reason
    RpcError(String),
}

struct MockState {
    balance: u64,
    balance_error: Option<NetworkError>,
    token_accounts: HashMap<Pubkey, Vec<TokenAccount>>,
    accounts: HashMap<Pubkey, ParsedAccount>,
    script: VecDeque<MockSubmit>,
    default_outcome: MockSubmit,
    submissions: Vec<SignedTransaction>,
    pending: HashMap<Signature, MockSubmit>,
    block_height: u64,
    block_requests: usize,
    balance_requests: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            balance: 0,
            balance_error: None,
            token_accounts: HashMap::new(),
            accounts: HashMap::new(),
            script: VecDeque::new(),
            default_outcome: MockSubmit::Confirm,
            submissions: Vec::new(),
            pending: HashMap::new(),
            block_height: 1_000,
            block_requests: 0,
            balance_requests: 0,
        }
    }
}

/// In-process network for tests. Confirms every submission unless scripted.
#[derive(Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<MockState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> Result<R, NetworkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| NetworkError::ConnectionFailed("mock poisoned".to_string()))?;
        Ok(f(&mut state))
    }

    pub fn set_balance(&self, lamports: u64) {
        let _ = self.with_state(|s| s.balance = lamports);
    }

    /// Make balance queries fail until cleared with `None`
    pub fn fail_balance(&self, error: Option<NetworkError>) {
        let _ = self.with_state(|s| s.balance_error = error);
    }

    pub fn set_token_accounts(&self, program: &Pubkey, accounts: Vec<TokenAccount>) {
        let _ = self.with_state(|s| {
            s.token_accounts.insert(*program, accounts);
        });
    }

    pub fn set_account(&self, account: ParsedAccount) {
        let _ = self.with_state(|s| {
            s.accounts.insert(account.address, account);
        });
    }

    /// Outcomes consumed in order by subsequent submissions
    pub fn script(&self, outcomes: impl IntoIterator<Item = MockSubmit>) {
        let _ = self.with_state(|s| s.script.extend(outcomes));
    }

    /// Outcome used once the script is exhausted
    pub fn set_default_outcome(&self, outcome: MockSubmit) {
        let _ = self.with_state(|s| s.default_outcome = outcome);
    }

    /// Every transaction passed to `submit`, including rejected ones
    pub fn submissions(&self) -> Vec<SignedTransaction> {
        self.with_state(|s| s.submissions.clone()).unwrap_or_default()
    }

    pub fn submission_count(&self) -> usize {
        self.with_state(|s| s.submissions.len()).unwrap_or(0)
    }

    pub fn block_requests(&self) -> usize {
        self.with_state(|s| s.block_requests).unwrap_or(0)
    }

    pub fn balance_requests(&self) -> usize {
        self.with_state(|s| s.balance_requests).unwrap_or(0)
    }
}

#[async_trait]
impl NetworkService for MockNetwork {
    async fn latest_block_reference(&self) -> Result<BlockReference, NetworkError> {
        self.with_state(|s| {
            s.block_requests += 1;
            s.block_height += 1;
            BlockReference {
                blockhash: format!("blockhash-{}", s.block_height),
                last_valid_block_height: s.block_height + 150,
            }
        })
    }

    async fn submit(&self, transaction: &SignedTransaction) -> Result<Signature, NetworkError> {
        let outcome = self.with_state(|s| {
            s.submissions.push(transaction.clone());
            s.script
                .pop_front()
                .unwrap_or_else(|| s.default_outcome.clone())
        })?;

        match outcome {
            MockSubmit::SimulationFailure => Err(NetworkError::from_rpc(
                -32002,
                "Transaction simulation failed: Blockhash not found",
            )),
            MockSubmit::RpcError(message) => Err(NetworkError::from_rpc(-32005, message)),
            accepted => {
                let signature = transaction.signature;
                self.with_state(|s| {
                    s.pending.insert(signature, accepted);
                })?;
                Ok(signature)
            }
        }
    }

    async fn confirm(
        &self,
        signature: &Signature,
        _block: &BlockReference,
    ) -> Result<Confirmation, NetworkError> {
        let outcome = self.with_state(|s| s.pending.remove(signature))?;
        match outcome {
            Some(MockSubmit::OnChainError(err)) => Ok(Confirmation::Failed(err)),
            Some(_) => Ok(Confirmation::Succeeded),
            None => Err(NetworkError::BlockHeightExceeded {
                signature: signature.to_string(),
            }),
        }
    }

    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64, NetworkError> {
        self.with_state(|s| {
            s.balance_requests += 1;
            match &s.balance_error {
                Some(e) => Err(e.clone()),
                None => Ok(s.balance),
            }
        })?
    }

    async fn get_token_accounts(
        &self,
        _owner: &Pubkey,
        program: &Pubkey,
    ) -> Result<Vec<TokenAccount>, NetworkError> {
        self.with_state(|s| s.token_accounts.get(program).cloned().unwrap_or_default())
    }

    async fn get_parsed_account(
        &self,
        address: &Pubkey,
    ) -> Result<Option<ParsedAccount>, NetworkError> {
        self.with_state(|s| s.accounts.get(address).cloned())
    }
}
