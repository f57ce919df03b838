pub mod amount;
pub mod signer;
pub mod task;
pub mod token;
pub mod transaction;

pub use amount::*;
pub use signer::*;
pub use task::*;
pub use token::*;
pub use transaction::*;

/// Memo attached to every swap the wallet submits
pub const MEMO_TEXT: &str = "Scarlet";
