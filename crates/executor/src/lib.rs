//! Task queue and retry executor
//!
//! [`TaskQueueController`] owns the pending and recent lists, persists them
//! after every mutation and fans execution out to [`TaskExecutor`], which
//! drives one task through quoting, fee augmentation, submission and
//! confirmation under the configured retry budget.

pub mod controller;
pub mod events;
pub mod executor;
pub mod guard;
pub mod portfolio;
pub mod recovery;

#[cfg(test)]
mod test_support;

pub use controller::{QueueError, TaskHandle, TaskQueueController};
pub use events::{EventBus, TaskEvent};
pub use executor::{AttemptError, ExecutionStage, ExecutorConfig, TaskExecutor, TaskOutcome};
pub use guard::{EnqueueGuard, GuardRejection};
pub use portfolio::{Holding, Portfolio, PortfolioSnapshot};
pub use recovery::{recover_queue, RecoveredQueue};
