//! Withholding Tax calculation over the (payment type, recipient type) rate
//! map.
//!
//! Each payment's rate is looked up from the year's rate table; a pair with
//! no registered rate fails the run with
//! [`WhtError::UnmappedWithholdingCategory`], never a guessed or default
//! rate, since withholding misapplication has legal consequence.
//!
//! Payments are aggregated per distinct (payment type, recipient type) pair
//! in a fixed order, so the breakdown has one line per pair actually present
//! and identical inputs always produce byte-identical output.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use rust_decimal_macros::dec;
//! use ntax_core::calculations::{WhtCalculator, WhtPayment};
//! use ntax_core::rules::{RecipientType, WhtPaymentType, WhtTable};
//!
//! let mut rates = BTreeMap::new();
//! rates.insert((WhtPaymentType::Dividend, RecipientType::Company), dec!(0.10));
//! let table = WhtTable { rates };
//!
//! let result = WhtCalculator::new(&table).calculate(&[WhtPayment {
//!     payment_type: WhtPaymentType::Dividend,
//!     recipient_type: RecipientType::Company,
//!     gross_amount: dec!(1000000),
//! }]).unwrap();
//!
//! assert_eq!(result.total_withheld, dec!(100000.00));
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::models::BreakdownLine;
use crate::rules::{RecipientType, WhtPaymentType, WhtTable};

/// Errors that can occur during WHT calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WhtError {
    /// No rate registered for this (payment type, recipient type) pair.
    #[error(
        "no withholding rate registered for {} paid to {}",
        payment_type.as_str(),
        recipient_type.as_str()
    )]
    UnmappedWithholdingCategory {
        payment_type: WhtPaymentType,
        recipient_type: RecipientType,
    },

    #[error("gross amount cannot be negative, got {0}")]
    NegativeGrossAmount(Decimal),
}

/// One payment subject to withholding at source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhtPayment {
    pub payment_type: WhtPaymentType,
    pub recipient_type: RecipientType,
    pub gross_amount: Decimal,
}

/// Result of one WHT run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhtResult {
    pub total_gross: Decimal,
    pub total_withheld: Decimal,
    /// Gross less withheld across all payments.
    pub total_net: Decimal,
    /// One line per distinct (payment type, recipient type) pair present.
    pub breakdown: Vec<BreakdownLine>,
}

/// Withholding tax calculator over a year's rate table.
#[derive(Debug, Clone)]
pub struct WhtCalculator<'a> {
    table: &'a WhtTable,
}

impl<'a> WhtCalculator<'a> {
    pub fn new(table: &'a WhtTable) -> Self {
        Self { table }
    }

    /// Rate for a single pair.
    ///
    /// # Errors
    ///
    /// Returns [`WhtError::UnmappedWithholdingCategory`] when the pair has no
    /// registered rate.
    pub fn rate(
        &self,
        payment_type: WhtPaymentType,
        recipient_type: RecipientType,
    ) -> Result<Decimal, WhtError> {
        self.table.rate(payment_type, recipient_type).ok_or(
            WhtError::UnmappedWithholdingCategory {
                payment_type,
                recipient_type,
            },
        )
    }

    /// Computes withholding over a batch of payments.
    ///
    /// The whole run fails on the first unmapped pair or negative amount;
    /// partial results are never returned.
    pub fn calculate(&self, payments: &[WhtPayment]) -> Result<WhtResult, WhtError> {
        // Aggregate per pair in BTreeMap order so the breakdown is stable
        // regardless of input order within a pair.
        let mut grouped: BTreeMap<(WhtPaymentType, RecipientType), Decimal> = BTreeMap::new();

        for payment in payments {
            if payment.gross_amount < Decimal::ZERO {
                return Err(WhtError::NegativeGrossAmount(payment.gross_amount));
            }
            // Fail loudly before aggregating anything for the pair.
            self.rate(payment.payment_type, payment.recipient_type)?;
            *grouped
                .entry((payment.payment_type, payment.recipient_type))
                .or_default() += payment.gross_amount;
        }

        let mut breakdown = Vec::with_capacity(grouped.len());
        let mut total_gross = Decimal::ZERO;
        let mut total_withheld = Decimal::ZERO;

        for ((payment_type, recipient_type), gross) in grouped {
            let rate = self.rate(payment_type, recipient_type)?;
            let withheld = round_half_up(gross * rate);
            breakdown.push(BreakdownLine::new(
                format!("{} / {}", payment_type.as_str(), recipient_type.as_str()),
                gross,
                rate,
                withheld,
            ));
            total_gross += gross;
            total_withheld += withheld;
        }

        Ok(WhtResult {
            total_gross,
            total_withheld,
            total_net: total_gross - total_withheld,
            breakdown,
        })
    }
}
