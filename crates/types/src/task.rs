use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::amount::{to_base_units, unit_scale_for_decimals, AmountError, LAMPORTS_PER_SOL};
use crate::token::TradeDirection;

/// Maximum number of entries kept in the recent list
pub const RECENT_CAPACITY: usize = 5;

/// Unique task identifier (UUID v4)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    Buy,
    Sell,
    CloseEmptyAccounts,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Buy => "buy",
            TaskKind::Sell => "sell",
            TaskKind::CloseEmptyAccounts => "closeEmptyAccounts",
        }
    }

    /// Swap direction, if this kind is a swap
    pub fn direction(&self) -> Option<TradeDirection> {
        match self {
            TaskKind::Buy => Some(TradeDirection::Buy),
            TaskKind::Sell => Some(TradeDirection::Sell),
            TaskKind::CloseEmptyAccounts => None,
        }
    }

    pub fn is_swap(&self) -> bool {
        self.direction().is_some()
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work owned by the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Token mint; empty for `closeEmptyAccounts`
    pub target_address: String,
    /// Human units
    pub amount: Decimal,
    /// Multiplier from human to base units
    pub unit_scale: u64,
    pub slippage_tolerance_bps: u16,
    #[serde(default)]
    pub failed: bool,
}

impl Task {
    /// Spend `amount` SOL on the token at `mint`
    pub fn buy(mint: impl Into<String>, amount: Decimal, slippage_tolerance_bps: u16) -> Self {
        Self {
            id: TaskId::new(),
            kind: TaskKind::Buy,
            target_address: mint.into(),
            amount,
            unit_scale: LAMPORTS_PER_SOL,
            slippage_tolerance_bps,
            failed: false,
        }
    }

    /// Sell `amount` of the token at `mint`
    pub fn sell(
        mint: impl Into<String>,
        amount: Decimal,
        decimals: u8,
        slippage_tolerance_bps: u16,
    ) -> Self {
        Self {
            id: TaskId::new(),
            kind: TaskKind::Sell,
            target_address: mint.into(),
            amount,
            unit_scale: unit_scale_for_decimals(decimals),
            slippage_tolerance_bps,
            failed: false,
        }
    }

    /// Sell a percentage of a holding. At 100 the whole holding is sold without rounding.
    /// A percentage outside `(0, 100]` is rejected.
    pub fn sell_percentage(
        mint: impl Into<String>,
        holding: Decimal,
        decimals: u8,
        percent: Decimal,
        slippage_tolerance_bps: u16,
    ) -> Result<Self, AmountError> {
        if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(AmountError::InvalidPercentage(percent));
        }

        let amount = if percent == Decimal::ONE_HUNDRED {
            holding
        } else {
            holding * percent / Decimal::ONE_HUNDRED
        };
        Ok(Self::sell(mint, amount, decimals, slippage_tolerance_bps))
    }

    pub fn close_empty_accounts() -> Self {
        Self {
            id: TaskId::new(),
            kind: TaskKind::CloseEmptyAccounts,
            target_address: String::new(),
            amount: Decimal::ZERO,
            unit_scale: 1,
            slippage_tolerance_bps: 0,
            failed: false,
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    pub fn base_amount(&self) -> Result<u64, AmountError> {
        to_base_units(self.amount, self.unit_scale)
    }

    /// Record of a confirmed execution
    pub fn into_recent(self, transaction_hash: impl Into<String>) -> RecentTask {
        let (target_address, amount) = match self.kind {
            TaskKind::CloseEmptyAccounts => (String::new(), Decimal::ZERO),
            _ => (self.target_address, self.amount),
        };

        RecentTask {
            id: self.id,
            kind: self.kind,
            target_address,
            amount,
            unit_scale: self.unit_scale,
            slippage_tolerance_bps: self.slippage_tolerance_bps,
            transaction_hash: transaction_hash.into(),
        }
    }
}

/// A confirmed task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub target_address: String,
    pub amount: Decimal,
    pub unit_scale: u64,
    pub slippage_tolerance_bps: u16,
    pub transaction_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = Task::buy("mint", dec("1"), 50);
        let b = Task::buy("mint", dec("1"), 50);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_kind_serializes_camel_case() {
        let json = serde_json::to_string(&TaskKind::CloseEmptyAccounts).unwrap();
        assert_eq!(json, "\"closeEmptyAccounts\"");
        assert_eq!(TaskKind::Buy.to_string(), "buy");
    }

    #[test]
    fn test_task_serialization_shape() {
        let task = Task::buy("mint", dec("0.5"), 100);
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["kind"], "buy");
        assert_eq!(value["targetAddress"], "mint");
        assert_eq!(value["unitScale"], LAMPORTS_PER_SOL);
        assert_eq!(value["slippageToleranceBps"], 100);
        assert_eq!(value["failed"], false);
        assert_eq!(value["id"], task.id.to_string());
    }

    #[test]
    fn test_base_amount() {
        let task = Task::sell("mint", dec("12.345678"), 6, 50);
        assert_eq!(task.base_amount(), Ok(12_345_678));

        let buy = Task::buy("mint", dec("0.1"), 50);
        assert_eq!(buy.base_amount(), Ok(100_000_000));
    }

    #[test]
    fn test_sell_percentage() {
        let holding = dec("1234.567891");
        let all = Task::sell_percentage("mint", holding, 6, dec("100"), 50).unwrap();
        assert_eq!(all.amount, holding);

        let half = Task::sell_percentage("mint", dec("10"), 6, dec("50"), 50).unwrap();
        assert_eq!(half.amount, dec("5"));
    }

    #[test]
    fn test_sell_percentage_out_of_range_rejected() {
        for percent in ["150", "100.01", "0", "-5"] {
            assert_eq!(
                Task::sell_percentage("mint", dec("10"), 6, dec(percent), 50),
                Err(AmountError::InvalidPercentage(dec(percent)))
            );
        }
    }

    #[test]
    fn test_close_into_recent_clears_target_and_amount() {
        let task = Task::close_empty_accounts();
        let id = task.id;
        let recent = task.into_recent("sig");

        assert_eq!(recent.id, id);
        assert_eq!(recent.target_address, "");
        assert_eq!(recent.amount, Decimal::ZERO);
        assert_eq!(recent.transaction_hash, "sig");
    }

    #[test]
    fn test_swap_into_recent_keeps_fields() {
        let task = Task::buy("mint", dec("0.25"), 30);
        let recent = task.clone().into_recent("hash");

        assert_eq!(recent.target_address, "mint");
        assert_eq!(recent.amount, dec("0.25"));
        assert_eq!(recent.kind, TaskKind::Buy);
    }

    #[test]
    fn test_failed_defaults_to_false() {
        let task = Task::close_empty_accounts();
        let mut value = serde_json::to_value(&task).unwrap();
        value.as_object_mut().unwrap().remove("failed");

        let decoded: Task = serde_json::from_value(value).unwrap();
        assert!(!decoded.failed);
    }
}
