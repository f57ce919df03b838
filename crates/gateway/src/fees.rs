//! Platform fee charged on every swap.
//!
//! The fee is `base × platform_fee_bps / 10_000`, where the base is the native
//! amount of the quote (input for buys, output for sells). It is split between
//! the platform collector and the aggregator's collector, each share rounded up
//! to a whole lamport, and paid with two system transfers appended to the swap.

use lazy_static::lazy_static;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use scarlet_types::{Instruction, Pubkey, TradeDirection};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::traits::Quote;

pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 20;
pub const DEFAULT_PLATFORM_COLLECTOR: &str = "BwUfN6xYAjAEk1278L6GoQTCSfVAXdiPQMraheqhUC3e";
pub const DEFAULT_AGGREGATOR_COLLECTOR: &str = "462rcS83W27gP4ZkAPja93we1f9FGFcErh9ANqVd6t6e";

lazy_static! {
    /// 2.5 % of the fee goes to the aggregator
    pub static ref DEFAULT_AGGREGATOR_SHARE: Decimal = Decimal::new(25, 3);
    static ref PLATFORM_COLLECTOR_ID: Pubkey = Pubkey::from_str(DEFAULT_PLATFORM_COLLECTOR)
        .expect("platform collector is valid base58");
    static ref AGGREGATOR_COLLECTOR_ID: Pubkey = Pubkey::from_str(DEFAULT_AGGREGATOR_COLLECTOR)
        .expect("aggregator collector is valid base58");
}

const BPS_DENOMINATOR: u32 = 10_000;

/// Lamports owed to each collector for one swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSplit {
    pub platform: u64,
    pub aggregator: u64,
}

impl FeeSplit {
    pub fn total(&self) -> u64 {
        self.platform.saturating_add(self.aggregator)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeSchedule {
    pub platform_fee_bps: u32,
    pub aggregator_share: Decimal,
    pub platform_collector: Pubkey,
    pub aggregator_collector: Pubkey,
}

impl FeeSchedule {
    pub fn new(
        platform_fee_bps: u32,
        aggregator_share: Decimal,
        platform_collector: Pubkey,
        aggregator_collector: Pubkey,
    ) -> Self {
        Self {
            platform_fee_bps,
            aggregator_share,
            platform_collector,
            aggregator_collector,
        }
    }

    pub fn split(&self, base_amount: u64) -> FeeSplit {
        let fee = Decimal::from(base_amount) * Decimal::from(self.platform_fee_bps)
            / Decimal::from(BPS_DENOMINATOR);

        FeeSplit {
            platform: ceil_lamports(fee * (Decimal::ONE - self.aggregator_share)),
            aggregator: ceil_lamports(fee * self.aggregator_share),
        }
    }

    pub fn split_for_quote(&self, quote: &Quote, direction: TradeDirection) -> FeeSplit {
        self.split(quote.fee_base(direction))
    }

    /// The two fee transfers, platform first
    pub fn transfer_instructions(&self, payer: &Pubkey, split: FeeSplit) -> Vec<Instruction> {
        vec![
            Instruction::transfer(payer, &self.platform_collector, split.platform),
            Instruction::transfer(payer, &self.aggregator_collector, split.aggregator),
        ]
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(
            DEFAULT_PLATFORM_FEE_BPS,
            *DEFAULT_AGGREGATOR_SHARE,
            *PLATFORM_COLLECTOR_ID,
            *AGGREGATOR_COLLECTOR_ID,
        )
    }
}

fn ceil_lamports(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::ToPositiveInfinity)
        .to_u64()
        .unwrap_or(u64::MAX)
}
