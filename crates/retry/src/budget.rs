use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Setting value meaning "retry forever"
pub const UNLIMITED_SENTINEL: i64 = -1;

/// Budget used when no setting is stored
pub const DEFAULT_RETRY_COUNT: i64 = 3;

/// Number of bounded failures a task may absorb before it is marked failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryBudget {
    Limited(u32),
    Unlimited,
}

impl RetryBudget {
    /// Decode the stored integer. `-1` is unlimited; any other negative value allows nothing.
    pub fn from_setting(value: i64) -> Self {
        match value {
            UNLIMITED_SENTINEL => RetryBudget::Unlimited,
            v if v < 0 => RetryBudget::Limited(0),
            v => RetryBudget::Limited(u32::try_from(v).unwrap_or(u32::MAX)),
        }
    }

    pub fn to_setting(&self) -> i64 {
        match self {
            RetryBudget::Limited(n) => *n as i64,
            RetryBudget::Unlimited => UNLIMITED_SENTINEL,
        }
    }

    /// Whether another attempt may start after `failures` bounded failures
    pub fn allows(&self, failures: u32) -> bool {
        match self {
            RetryBudget::Limited(max) => failures < *max,
            RetryBudget::Unlimited => true,
        }
    }

    pub fn remaining(&self, failures: u32) -> Option<u32> {
        match self {
            RetryBudget::Limited(max) => Some(max.saturating_sub(failures)),
            RetryBudget::Unlimited => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, RetryBudget::Unlimited)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::from_setting(DEFAULT_RETRY_COUNT)
    }
}

/// How a failed attempt is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Pre-flight simulation failure: retried for free
    Transient,
    /// Anything else: spends one unit of budget
    Bounded,
}

impl ErrorClass {
    pub fn consumes_budget(&self) -> bool {
        matches!(self, ErrorClass::Bounded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Bounded => "bounded",
        }
    }
}

/// Delay before the next attempt, per failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub transient_delay: Duration,
    pub bounded_delay: Duration,
}

impl RetryPolicy {
    pub fn new(transient_delay: Duration, bounded_delay: Duration) -> Self {
        Self {
            transient_delay,
            bounded_delay,
        }
    }

    /// No waiting between attempts
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn delay_for(&self, class: ErrorClass) -> Duration {
        match class {
            ErrorClass::Transient => self.transient_delay,
            ErrorClass::Bounded => self.bounded_delay,
        }
    }

    /// Sleep for the class delay; a zero delay still yields to the scheduler
    pub async fn wait(&self, class: ErrorClass) {
        let delay = self.delay_for(class);
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::from_millis(100))
    }
}
