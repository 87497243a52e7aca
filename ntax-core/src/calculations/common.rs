//! Common utility functions for tax calculations.
//!
//! This module provides shared functionality used across the calculators,
//! including rounding and effective-rate derivation.

use rust_decimal::Decimal;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero). Currency normalization uses
/// its own half-even rule; this one applies to computed tax amounts.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use ntax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Derives an effective rate as a percentage of `base`, zero-guarded.
///
/// Returns zero when `base` is zero or negative, so a liability against an
/// empty gross income never divides by zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use ntax_core::calculations::common::effective_rate;
///
/// assert_eq!(effective_rate(dec!(330000), dec!(3000000)), dec!(11.00));
/// assert_eq!(effective_rate(dec!(100), dec!(0)), dec!(0));
/// ```
pub fn effective_rate(
    liability: Decimal,
    base: Decimal,
) -> Decimal {
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_half_up(liability / base * Decimal::ONE_HUNDRED)
}
