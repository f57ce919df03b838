//! Retry primitives for the Scarlet task executor
//!
//! - `RetryBudget`: how many bounded failures a task may absorb, decoded from the
//!   `retryCount` setting where `-1` means unlimited
//! - `RetryPolicy`: delay applied after each class of failure
//! - `ExponentialBackoff`: polling schedule used while waiting for confirmations

pub mod backoff;
pub mod budget;

pub use backoff::ExponentialBackoff;
pub use budget::{ErrorClass, RetryBudget, RetryPolicy};
