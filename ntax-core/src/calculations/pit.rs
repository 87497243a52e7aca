//! Personal Income Tax calculations under the progressive band schedule.
//!
//! Annual gross income less verified deductions gives the taxable base, which
//! is then pushed through the year's marginal bands: each band taxes only the
//! portion of the base falling inside it.
//!
//! # Band walk
//!
//! Breakdown lines are emitted in ascending band order. A band whose lower
//! edge the base exactly reaches gets an explicit zero-amount line; bands the
//! base never reaches are omitted entirely. The returned liability is the
//! exact sum of the line amounts.
//!
//! # Exemptions and reliefs
//!
//! * Gross income at or below the table's minimum-wage exemption threshold is
//!   fully exempt: zero liability, empty breakdown, flagged on the result.
//! * An `AnnualRentPaid` deduction is valued as rent relief, a capped
//!   fraction of the rent, both from the rule table. All other deduction
//!   types count at face value.
//! * Deductions exceeding gross income floor the taxable base at zero (a
//!   warning is logged; this is not an error, since deductions legitimately
//!   may exceed income).
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use ntax_core::calculations::{PitCalculator, PitInput};
//! use ntax_core::rules::{PitTable, TaxBand};
//!
//! let table = PitTable {
//!     bands: vec![
//!         TaxBand { upper_bound: Some(dec!(800000)), rate: dec!(0) },
//!         TaxBand { upper_bound: Some(dec!(3000000)), rate: dec!(0.15) },
//!         TaxBand { upper_bound: None, rate: dec!(0.18) },
//!     ],
//!     minimum_wage_exemption: dec!(840000),
//!     rent_relief_rate: dec!(0.20),
//!     rent_relief_cap: dec!(500000),
//! };
//!
//! let calculator = PitCalculator::new(&table);
//! let result = calculator.calculate(&PitInput {
//!     gross_income: dec!(3000000),
//!     deductions: vec![],
//!     is_minimum_wage_earner: false,
//! }).unwrap();
//!
//! // 800,000 at 0% + 2,200,000 at 15%, plus a zero line for the top band
//! // whose lower edge the base exactly reaches.
//! assert_eq!(result.liability, dec!(330000.00));
//! assert_eq!(result.breakdown.len(), 3);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{effective_rate, round_half_up};
use crate::models::{BreakdownLine, Deduction, DeductionType};
use crate::rules::PitTable;

/// Errors that can occur during PIT calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PitError {
    /// Gross income below zero is a data error, not a tax situation.
    #[error("gross income cannot be negative, got {0}")]
    NegativeGrossIncome(Decimal),

    /// A deduction claims a negative amount.
    #[error("deduction amount cannot be negative, got {0}")]
    NegativeDeduction(Decimal),
}

/// Input for one PIT run. The caller decides which deductions are admissible
/// (verified-only for filings; scenarios may relax this).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitInput {
    pub gross_income: Decimal,
    pub deductions: Vec<Deduction>,
    /// Declared minimum-wage earner, exempt regardless of the income test.
    pub is_minimum_wage_earner: bool,
}

/// How one claimed deduction was valued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionDetail {
    pub deduction_type: DeductionType,
    pub claimed: Decimal,
    /// The amount actually allowed against the base (rent relief is capped).
    pub allowed: Decimal,
}

/// Result of one PIT run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitResult {
    pub gross_income: Decimal,
    pub total_deductions: Decimal,
    pub deduction_details: Vec<DeductionDetail>,
    pub taxable_income: Decimal,
    pub liability: Decimal,
    /// Percentage of gross income, zero-guarded.
    pub effective_rate: Decimal,
    pub breakdown: Vec<BreakdownLine>,
    pub minimum_wage_exempt: bool,
}

/// Progressive personal income tax calculator over a year's band table.
#[derive(Debug, Clone)]
pub struct PitCalculator<'a> {
    table: &'a PitTable,
}

impl<'a> PitCalculator<'a> {
    pub fn new(table: &'a PitTable) -> Self {
        Self { table }
    }

    /// Runs the full PIT computation.
    ///
    /// # Errors
    ///
    /// Returns [`PitError`] when gross income or a deduction amount is
    /// negative. A taxable base driven negative by deductions is floored to
    /// zero with a logged warning, not an error.
    pub fn calculate(&self, input: &PitInput) -> Result<PitResult, PitError> {
        if input.gross_income < Decimal::ZERO {
            return Err(PitError::NegativeGrossIncome(input.gross_income));
        }

        if input.is_minimum_wage_earner
            || input.gross_income <= self.table.minimum_wage_exemption
        {
            return Ok(PitResult {
                gross_income: input.gross_income,
                total_deductions: Decimal::ZERO,
                deduction_details: vec![],
                taxable_income: Decimal::ZERO,
                liability: Decimal::ZERO,
                effective_rate: Decimal::ZERO,
                breakdown: vec![],
                minimum_wage_exempt: true,
            });
        }

        let deduction_details = self.value_deductions(&input.deductions)?;
        let total_deductions: Decimal = deduction_details.iter().map(|d| d.allowed).sum();

        let raw_base = input.gross_income - total_deductions;
        let taxable_income = if raw_base < Decimal::ZERO {
            warn!(
                base = %raw_base,
                "taxable base negative after deductions, flooring to zero"
            );
            Decimal::ZERO
        } else {
            raw_base
        };

        let breakdown = self.band_breakdown(taxable_income);
        let liability: Decimal = breakdown.iter().map(|line| line.amount).sum();

        Ok(PitResult {
            gross_income: input.gross_income,
            total_deductions,
            deduction_details,
            taxable_income,
            liability,
            effective_rate: effective_rate(liability, input.gross_income),
            breakdown,
            minimum_wage_exempt: false,
        })
    }

    /// Values each claimed deduction. Rent paid becomes rent relief: the
    /// table's fraction of the claim, capped.
    fn value_deductions(
        &self,
        deductions: &[Deduction],
    ) -> Result<Vec<DeductionDetail>, PitError> {
        deductions
            .iter()
            .map(|deduction| {
                if deduction.amount < Decimal::ZERO {
                    return Err(PitError::NegativeDeduction(deduction.amount));
                }
                let allowed = match deduction.deduction_type {
                    DeductionType::AnnualRentPaid => {
                        let relief = deduction.amount * self.table.rent_relief_rate;
                        round_half_up(relief.min(self.table.rent_relief_cap))
                    }
                    _ => deduction.amount,
                };
                Ok(DeductionDetail {
                    deduction_type: deduction.deduction_type,
                    claimed: deduction.amount,
                    allowed,
                })
            })
            .collect()
    }

    /// Walks the bands in ascending order, taxing the slice of the base that
    /// falls inside each. A band whose lower edge equals the base contributes
    /// an explicit zero line; bands beyond the base are omitted.
    fn band_breakdown(&self, taxable_income: Decimal) -> Vec<BreakdownLine> {
        let mut lines = Vec::new();
        let mut lower = Decimal::ZERO;

        for band in &self.table.bands {
            if taxable_income < lower {
                break;
            }

            let (taxable_in_band, label) = match band.upper_bound {
                Some(upper) => (
                    taxable_income.min(upper) - lower,
                    format!("₦{lower} – ₦{upper}"),
                ),
                None => (taxable_income - lower, format!("Above ₦{lower}")),
            };

            lines.push(BreakdownLine::new(
                label,
                taxable_in_band,
                band.rate,
                round_half_up(taxable_in_band * band.rate),
            ));

            match band.upper_bound {
                Some(upper) => lower = upper,
                None => break,
            }
        }

        lines
    }
}
