pub mod accounts;
pub mod codec;
pub mod error;
pub mod mock;
pub mod rpc;
pub mod service;

pub use accounts::{close_instructions, find_empty_token_accounts, token_programs};
pub use codec::{sign_transaction, CanonicalCodec, TransactionCodec};
pub use error::NetworkError;
pub use mock::{MockNetwork, MockSubmit};
pub use rpc::{RpcClient, MAINNET_RPC_URL};
pub use service::{Confirmation, NetworkService, ParsedAccount, TokenAccount};
