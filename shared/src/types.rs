//! Common numeric helpers used across the settlement engine

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for factors, percentages and kilograms
pub const MONEY_SCALE: u32 = 2;

/// Round to two decimals, half away from zero (standard currency rounding)
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Clamp a value into an inclusive range
pub fn clamp(value: Decimal, min: Decimal, max: Decimal) -> Decimal {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Percentage of a quantity, e.g. `percent_of(30000, 2.25) == 675`
pub fn percent_of(quantity: Decimal, percent: Decimal) -> Decimal {
    quantity * percent / Decimal::ONE_HUNDRED
}
