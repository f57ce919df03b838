use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Decimals of the native currency
pub const NATIVE_DECIMALS: u32 = 9;

#[derive(Debug, Error, PartialEq)]
pub enum AmountError {
    #[error("amount is negative: {0}")]
    Negative(Decimal),

    #[error("amount does not fit in base units: {0}")]
    Overflow(Decimal),

    #[error("percentage must be in (0, 100]: {0}")]
    InvalidPercentage(Decimal),
}

/// Convert a human-readable amount to base units, rounding half away from zero
pub fn to_base_units(amount: Decimal, unit_scale: u64) -> Result<u64, AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(amount));
    }

    let scaled = amount
        .checked_mul(Decimal::from(unit_scale))
        .ok_or(AmountError::Overflow(amount))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    scaled.to_u64().ok_or(AmountError::Overflow(amount))
}

/// Multiplier for a token with the given number of decimals
pub fn unit_scale_for_decimals(decimals: u8) -> u64 {
    10u64.saturating_pow(decimals as u32)
}

pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

/// Round a SOL amount up to lamport precision
pub fn ceil_to_lamports(sol: Decimal) -> Decimal {
    sol.round_dp_with_strategy(NATIVE_DECIMALS, RoundingStrategy::ToPositiveInfinity)
}

/// Convert a slippage percentage (e.g. `0.5`) to basis points, rounding up.
/// Negative input gives 0; values past `u16::MAX` bps saturate.
pub fn slippage_bps_from_percent(percent: Decimal) -> u16 {
    if percent.is_sign_negative() {
        return 0;
    }

    (percent * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::ToPositiveInfinity)
        .to_u16()
        .unwrap_or(u16::MAX)
}
