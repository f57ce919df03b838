use rust_decimal::Decimal;
use scarlet_types::{ceil_to_lamports, Task, TaskKind};
use thiserror::Error;

/// SOL held back from buys to pay rent and fees
pub const DEFAULT_RENT_SAFETY_MARGIN: Decimal = Decimal::from_parts(6, 0, 0, false, 3);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardRejection {
    #[error("buy of {amount} exceeds spendable balance {spendable}")]
    InsufficientBalance { amount: Decimal, spendable: Decimal },

    #[error("negative amount {0}")]
    NegativeAmount(Decimal),
}

impl GuardRejection {
    /// Metric label
    pub fn reason(&self) -> &'static str {
        match self {
            GuardRejection::InsufficientBalance { .. } => "insufficient_balance",
            GuardRejection::NegativeAmount(_) => "negative_amount",
        }
    }
}

/// Admission check applied before a task enters the pending list.
///
/// Buys are checked against the cached wallet balance only; other pending buys
/// are not reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueGuard {
    rent_safety_margin: Decimal,
}

impl EnqueueGuard {
    pub fn new(rent_safety_margin: Decimal) -> Self {
        Self { rent_safety_margin }
    }

    pub fn rent_safety_margin(&self) -> Decimal {
        self.rent_safety_margin
    }

    /// `balance` is the wallet's native balance in SOL
    pub fn check(&self, task: &Task, balance: Decimal) -> Result<(), GuardRejection> {
        if task.amount.is_sign_negative() && !task.amount.is_zero() {
            return Err(GuardRejection::NegativeAmount(task.amount));
        }

        if task.kind == TaskKind::Buy {
            let spendable = balance - self.rent_safety_margin;
            if task.amount > spendable {
                return Err(GuardRejection::InsufficientBalance {
                    amount: task.amount,
                    spendable,
                });
            }
        }

        Ok(())
    }

    /// Largest buy the guard currently admits, rounded up to lamport precision
    pub fn max_buy_amount(&self, balance: Decimal) -> Decimal {
        ceil_to_lamports(balance - self.rent_safety_margin).max(Decimal::ZERO)
    }
}

impl Default for EnqueueGuard {
    fn default() -> Self {
        Self::new(DEFAULT_RENT_SAFETY_MARGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sol(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn test_default_margin() {
        assert_eq!(DEFAULT_RENT_SAFETY_MARGIN, sol("0.006"));
    }

    #[test]
    fn test_buy_within_balance() {
        let guard = EnqueueGuard::default();
        let task = Task::buy("mint", sol("0.5"), 50);
        assert!(guard.check(&task, sol("1.0")).is_ok());
    }

    #[test]
    fn test_buy_of_whole_balance_rejected() {
        let guard = EnqueueGuard::default();
        let task = Task::buy("mint", sol("1.0"), 50);
        assert_eq!(
            guard.check(&task, sol("1.0")),
            Err(GuardRejection::InsufficientBalance {
                amount: sol("1.0"),
                spendable: sol("0.994"),
            })
        );
    }

    #[test]
    fn test_buy_exactly_spendable_admitted() {
        let guard = EnqueueGuard::default();
        let task = Task::buy("mint", sol("0.994"), 50);
        assert!(guard.check(&task, sol("1.0")).is_ok());
    }

    #[test]
    fn test_sell_not_balance_checked() {
        let guard = EnqueueGuard::default();
        let task = Task::sell("mint", sol("1000"), 6, 50);
        assert!(guard.check(&task, Decimal::ZERO).is_ok());
        assert!(guard.check(&Task::close_empty_accounts(), Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let guard = EnqueueGuard::default();
        let task = Task::sell("mint", sol("-1"), 6, 50);
        let rejection = guard.check(&task, sol("10")).unwrap_err();
        assert_eq!(rejection.reason(), "negative_amount");
    }

    #[test]
    fn test_max_buy_amount() {
        let guard = EnqueueGuard::default();
        assert_eq!(guard.max_buy_amount(sol("1.0")), sol("0.994"));
        assert_eq!(guard.max_buy_amount(sol("0.0000000015")), Decimal::ZERO);
        assert_eq!(guard.max_buy_amount(sol("0.0060000015")), sol("0.000000002"));
    }
}
