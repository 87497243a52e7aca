//! Currency normalization into the reporting currency (NGN).
//!
//! The engine never fetches live rates. A rate is sourced once, at record
//! creation, by an external provider and supplied here by the caller. The
//! conversion is exact `Decimal` multiplication with one rounding step at
//! this boundary (half-even to two reporting-currency decimal places);
//! nothing downstream re-rounds the result.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use ntax_core::currency::{self, Currency};
//!
//! let ngn = currency::normalize(dec!(1000), Currency::Usd, Some(dec!(1550))).unwrap();
//! assert_eq!(ngn, dec!(1550000.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported transaction currencies. NGN is the reporting currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Ngn,
    Usd,
    Gbp,
    Eur,
    Btc,
    Usdt,
    Eth,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ngn => "NGN",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Eur => "EUR",
            Self::Btc => "BTC",
            Self::Usdt => "USDT",
            Self::Eth => "ETH",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors from currency normalization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    /// A non-NGN amount arrived without a stored exchange rate. Fatal:
    /// silently assuming a rate would be a correctness violation.
    #[error("{0} amount has no stored exchange rate")]
    CurrencyMismatch(Currency),

    /// The supplied exchange rate is zero or negative.
    #[error("exchange rate must be positive, got {0}")]
    InvalidRate(Decimal),
}

/// Converts `amount` in `currency` to NGN using the caller-supplied rate.
///
/// NGN amounts pass through (any supplied rate must be 1). The result is
/// rounded half-even to two decimal places, exactly once.
///
/// # Errors
///
/// * [`CurrencyError::CurrencyMismatch`] for a non-NGN amount with no rate.
/// * [`CurrencyError::InvalidRate`] when the rate is zero or negative, or an NGN
///   amount carries a rate other than 1.
pub fn normalize(
    amount: Decimal,
    currency: Currency,
    rate: Option<Decimal>,
) -> Result<Decimal, CurrencyError> {
    let rate = match (currency, rate) {
        (Currency::Ngn, None) => Decimal::ONE,
        (Currency::Ngn, Some(r)) if r == Decimal::ONE => Decimal::ONE,
        (Currency::Ngn, Some(r)) => return Err(CurrencyError::InvalidRate(r)),
        (c, None) => return Err(CurrencyError::CurrencyMismatch(c)),
        (_, Some(r)) if r <= Decimal::ZERO => return Err(CurrencyError::InvalidRate(r)),
        (_, Some(r)) => r,
    };

    Ok(round_reporting(amount * rate))
}

/// Realized or unrealized gain between two legs of a foreign-currency
/// position, both already normalized to NGN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForexGainLoss {
    pub acquisition_ngn: Decimal,
    pub disposal_ngn: Decimal,
    pub gain: Decimal,
    pub realized: bool,
}

/// Computes the NGN gain (positive) or loss (negative) between an
/// acquisition and a disposal leg. Both legs must already have been through
/// [`normalize`]; no further rounding happens here.
pub fn forex_gain_loss(
    acquisition_ngn: Decimal,
    disposal_ngn: Decimal,
    realized: bool,
) -> ForexGainLoss {
    ForexGainLoss {
        acquisition_ngn,
        disposal_ngn,
        gain: disposal_ngn - acquisition_ngn,
        realized,
    }
}

/// The single rounding rule applied at the normalization boundary:
/// half-even to two decimal places.
pub fn round_reporting(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn normalize_ngn_without_rate_passes_through() {
        let result = normalize(dec!(1234.56), Currency::Ngn, None);

        assert_eq!(result, Ok(dec!(1234.56)));
    }

    #[test]
    fn normalize_ngn_with_unit_rate_passes_through() {
        let result = normalize(dec!(500), Currency::Ngn, Some(dec!(1)));

        assert_eq!(result, Ok(dec!(500.00)));
    }

    #[test]
    fn normalize_ngn_with_non_unit_rate_is_rejected() {
        let result = normalize(dec!(500), Currency::Ngn, Some(dec!(1550)));

        assert_eq!(result, Err(CurrencyError::InvalidRate(dec!(1550))));
    }

    #[test]
    fn normalize_usd_multiplies_by_rate() {
        let result = normalize(dec!(250), Currency::Usd, Some(dec!(1550.25)));

        assert_eq!(result, Ok(dec!(387562.50)));
    }

    #[test]
    fn normalize_missing_rate_is_currency_mismatch() {
        let result = normalize(dec!(250), Currency::Gbp, None);

        assert_eq!(result, Err(CurrencyError::CurrencyMismatch(Currency::Gbp)));
    }

    #[test]
    fn normalize_rejects_zero_rate() {
        let result = normalize(dec!(250), Currency::Usd, Some(dec!(0)));

        assert_eq!(result, Err(CurrencyError::InvalidRate(dec!(0))));
    }

    #[test]
    fn normalize_rejects_negative_rate() {
        let result = normalize(dec!(250), Currency::Usd, Some(dec!(-1550)));

        assert_eq!(result, Err(CurrencyError::InvalidRate(dec!(-1550))));
    }

    #[test]
    fn rounding_is_half_even_at_the_boundary() {
        // 0.125 rounds to 0.12 (even), 0.135 rounds to 0.14 (even).
        assert_eq!(round_reporting(dec!(0.125)), dec!(0.12));
        assert_eq!(round_reporting(dec!(0.135)), dec!(0.14));
    }

    #[test]
    fn normalize_rounds_exactly_once() {
        // 1.005 * 1 would re-round differently if applied twice.
        let result = normalize(dec!(0.335), Currency::Usd, Some(dec!(1))).unwrap();

        assert_eq!(result, dec!(0.34));
    }

    #[test]
    fn negative_amounts_convert_like_positive_ones() {
        let result = normalize(dec!(-100), Currency::Usd, Some(dec!(1550)));

        assert_eq!(result, Ok(dec!(-155000.00)));
    }

    #[test]
    fn forex_gain_is_disposal_minus_acquisition() {
        let acq = normalize(dec!(1000), Currency::Usd, Some(dec!(1400))).unwrap();
        let disp = normalize(dec!(1000), Currency::Usd, Some(dec!(1550))).unwrap();

        let result = forex_gain_loss(acq, disp, true);

        assert_eq!(result.gain, dec!(150000.00));
        assert!(result.realized);
    }

    #[test]
    fn forex_loss_is_negative() {
        let result = forex_gain_loss(dec!(200000.00), dec!(180000.00), false);

        assert_eq!(result.gain, dec!(-20000.00));
    }
}
