//! Company Income Tax and Development Levy calculations.
//!
//! Companies at or below the small-company turnover threshold are exempt:
//! the exempt rate (documented as 0%) applies and no development levy is
//! charged. All other companies pay the standard flat rate on assessable
//! profit plus the development levy on the same base, reported as two
//! distinct breakdown lines, because they are distinct statutory obligations
//! with independent bases in principle, even when both use assessable profit
//! in the current rule tables.
//!
//! MNE-scale companies (turnover at or above the table's MNE threshold, or
//! declared MNEs) are additionally subject to a minimum combined effective
//! rate; when the standard computation falls short, the CIT line is topped up
//! so the total meets the floor.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use ntax_core::calculations::{CitCalculator, CitInput};
//! use ntax_core::rules::CitTable;
//!
//! let table = CitTable {
//!     small_company_threshold: dec!(25000000),
//!     large_company_threshold: dec!(100000000),
//!     mne_turnover_threshold: dec!(20000000000),
//!     exempt_rate: dec!(0),
//!     standard_rate: dec!(0.30),
//!     development_levy_rate: dec!(0.04),
//!     minimum_effective_rate: dec!(0.15),
//! };
//!
//! let calculator = CitCalculator::new(&table);
//! let result = calculator.calculate(&CitInput {
//!     annual_turnover: dec!(40000000),
//!     gross_profit: dec!(10000000),
//!     allowable_deductions: dec!(0),
//!     is_mne: false,
//! }).unwrap();
//!
//! // 30% CIT + 4% levy, two separate lines
//! assert_eq!(result.total_liability, dec!(3400000.00));
//! assert_eq!(result.breakdown.len(), 2);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::calculations::common::{effective_rate, round_half_up};
use crate::models::{BreakdownLine, CompanySize};
use crate::rules::CitTable;

/// Errors that can occur during CIT calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CitError {
    #[error("gross profit cannot be negative, got {0}")]
    NegativeGrossProfit(Decimal),

    #[error("annual turnover cannot be negative, got {0}")]
    NegativeTurnover(Decimal),
}

/// Input for one CIT run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitInput {
    pub annual_turnover: Decimal,
    pub gross_profit: Decimal,
    pub allowable_deductions: Decimal,
    /// Declared multinational enterprise, subject to the minimum effective
    /// rate regardless of turnover.
    pub is_mne: bool,
}

/// Result of one CIT run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitResult {
    pub company_size: CompanySize,
    pub gross_profit: Decimal,
    pub allowable_deductions: Decimal,
    pub assessable_profit: Decimal,
    pub cit_liability: Decimal,
    pub development_levy: Decimal,
    pub total_liability: Decimal,
    /// Percentage of assessable profit, zero-guarded.
    pub effective_rate: Decimal,
    pub minimum_rate_applied: bool,
    pub breakdown: Vec<BreakdownLine>,
}

/// Flat-rate company income tax calculator with small-company exemption.
#[derive(Debug, Clone)]
pub struct CitCalculator<'a> {
    table: &'a CitTable,
}

impl<'a> CitCalculator<'a> {
    pub fn new(table: &'a CitTable) -> Self {
        Self { table }
    }

    /// Classifies a company by annual turnover against the table thresholds.
    pub fn classify(&self, annual_turnover: Decimal) -> CompanySize {
        if annual_turnover <= self.table.small_company_threshold {
            CompanySize::Small
        } else if annual_turnover <= self.table.large_company_threshold {
            CompanySize::Medium
        } else {
            CompanySize::Large
        }
    }

    /// Runs the full CIT + development levy computation.
    ///
    /// # Errors
    ///
    /// Returns [`CitError`] for negative gross profit or turnover. A base
    /// driven negative by deductions is floored to zero with a warning.
    pub fn calculate(&self, input: &CitInput) -> Result<CitResult, CitError> {
        if input.gross_profit < Decimal::ZERO {
            return Err(CitError::NegativeGrossProfit(input.gross_profit));
        }
        if input.annual_turnover < Decimal::ZERO {
            return Err(CitError::NegativeTurnover(input.annual_turnover));
        }

        let company_size = self.classify(input.annual_turnover);

        let raw_base = input.gross_profit - input.allowable_deductions;
        let assessable_profit = if raw_base < Decimal::ZERO {
            warn!(
                base = %raw_base,
                "assessable profit negative after deductions, flooring to zero"
            );
            Decimal::ZERO
        } else {
            raw_base
        };

        if company_size == CompanySize::Small {
            let breakdown = vec![BreakdownLine::new(
                "CIT (small company exemption)",
                assessable_profit,
                self.table.exempt_rate,
                round_half_up(assessable_profit * self.table.exempt_rate),
            )];
            let cit_liability: Decimal = breakdown.iter().map(|l| l.amount).sum();

            return Ok(CitResult {
                company_size,
                gross_profit: input.gross_profit,
                allowable_deductions: input.allowable_deductions,
                assessable_profit,
                cit_liability,
                development_levy: Decimal::ZERO,
                total_liability: cit_liability,
                effective_rate: effective_rate(cit_liability, assessable_profit),
                minimum_rate_applied: false,
                breakdown,
            });
        }

        let mut cit_liability = round_half_up(assessable_profit * self.table.standard_rate);
        let development_levy =
            round_half_up(assessable_profit * self.table.development_levy_rate);

        // Minimum effective rate top-up for MNE-scale companies. The levy is
        // fixed by statute; the CIT line absorbs the difference.
        let mut minimum_rate_applied = false;
        let mne_scale =
            input.is_mne || input.annual_turnover >= self.table.mne_turnover_threshold;
        if mne_scale && assessable_profit > Decimal::ZERO {
            let floor = round_half_up(assessable_profit * self.table.minimum_effective_rate);
            if cit_liability + development_levy < floor {
                cit_liability = floor - development_levy;
                minimum_rate_applied = true;
            }
        }

        let cit_label = if minimum_rate_applied {
            "CIT (minimum effective rate)"
        } else {
            "CIT (standard rate)"
        };
        let cit_rate = if minimum_rate_applied {
            self.table.minimum_effective_rate - self.table.development_levy_rate
        } else {
            self.table.standard_rate
        };

        let breakdown = vec![
            BreakdownLine::new(cit_label, assessable_profit, cit_rate, cit_liability),
            BreakdownLine::new(
                "Development levy",
                assessable_profit,
                self.table.development_levy_rate,
                development_levy,
            ),
        ];
        let total_liability = cit_liability + development_levy;

        Ok(CitResult {
            company_size,
            gross_profit: input.gross_profit,
            allowable_deductions: input.allowable_deductions,
            assessable_profit,
            cit_liability,
            development_levy,
            total_liability,
            effective_rate: effective_rate(total_liability, assessable_profit),
            minimum_rate_applied,
            breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn table() -> CitTable {
        CitTable {
            small_company_threshold: dec!(25000000),
            large_company_threshold: dec!(100000000),
            mne_turnover_threshold: dec!(20000000000),
            exempt_rate: dec!(0),
            standard_rate: dec!(0.30),
            development_levy_rate: dec!(0.04),
            minimum_effective_rate: dec!(0.15),
        }
    }

    fn calculate(input: CitInput) -> CitResult {
        let table = table();
        let calculator = CitCalculator::new(&table);
        calculator.calculate(&input).unwrap()
    }

    fn standard_input(turnover: Decimal, profit: Decimal) -> CitInput {
        CitInput {
            annual_turnover: turnover,
            gross_profit: profit,
            allowable_deductions: dec!(0),
            is_mne: false,
        }
    }

    // =========================================================================
    // classification tests
    // =========================================================================

    #[test]
    fn classify_small_at_threshold() {
        let table = table();
        let calculator = CitCalculator::new(&table);

        assert_eq!(calculator.classify(dec!(25000000)), CompanySize::Small);
    }

    #[test]
    fn classify_medium_above_small_threshold() {
        let table = table();
        let calculator = CitCalculator::new(&table);

        assert_eq!(calculator.classify(dec!(50000000)), CompanySize::Medium);
    }

    #[test]
    fn classify_large_above_large_threshold() {
        let table = table();
        let calculator = CitCalculator::new(&table);

        assert_eq!(calculator.classify(dec!(200000000)), CompanySize::Large);
    }

    // =========================================================================
    // small company exemption
    // =========================================================================

    #[test]
    fn small_company_pays_zero_with_no_levy_line() {
        let result = calculate(standard_input(dec!(20000000), dec!(5000000)));

        assert_eq!(result.total_liability, dec!(0.00));
        assert_eq!(result.development_levy, dec!(0));
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].rate, dec!(0));
    }

    #[test]
    fn small_company_exemption_applies_at_exact_threshold() {
        let result = calculate(standard_input(dec!(25000000), dec!(10000000)));

        assert_eq!(result.company_size, CompanySize::Small);
        assert_eq!(result.total_liability, dec!(0.00));
    }

    // =========================================================================
    // standard rate + levy
    // =========================================================================

    #[test]
    fn standard_company_pays_cit_plus_levy_as_two_lines() {
        let result = calculate(standard_input(dec!(40000000), dec!(10000000)));

        assert_eq!(result.cit_liability, dec!(3000000.00));
        assert_eq!(result.development_levy, dec!(400000.00));
        assert_eq!(result.total_liability, dec!(3400000.00));
        assert_eq!(result.breakdown.len(), 2);
        assert_eq!(result.breakdown[0].amount, dec!(3000000.00));
        assert_eq!(result.breakdown[1].amount, dec!(400000.00));
    }

    #[test]
    fn levy_and_cit_lines_share_the_assessable_base() {
        let result = calculate(standard_input(dec!(40000000), dec!(10000000)));

        assert_eq!(result.breakdown[0].base, dec!(10000000));
        assert_eq!(result.breakdown[1].base, dec!(10000000));
    }

    #[test]
    fn deductions_reduce_assessable_profit() {
        let result = calculate(CitInput {
            annual_turnover: dec!(50000000),
            gross_profit: dec!(10000000),
            allowable_deductions: dec!(3000000),
            is_mne: false,
        });

        assert_eq!(result.assessable_profit, dec!(7000000));
        assert_eq!(result.cit_liability, dec!(2100000.00));
    }

    #[test]
    fn deductions_exceeding_profit_floor_base_at_zero() {
        let result = calculate(CitInput {
            annual_turnover: dec!(50000000),
            gross_profit: dec!(1000000),
            allowable_deductions: dec!(5000000),
            is_mne: false,
        });

        assert_eq!(result.assessable_profit, dec!(0));
        assert_eq!(result.total_liability, dec!(0.00));
    }

    #[test]
    fn liability_equals_sum_of_breakdown_amounts() {
        let result = calculate(standard_input(dec!(60000000), dec!(12345678.90)));

        let sum: Decimal = result.breakdown.iter().map(|l| l.amount).sum();
        assert_eq!(result.total_liability, sum);
    }

    #[test]
    fn effective_rate_reflects_combined_liability() {
        let result = calculate(standard_input(dec!(40000000), dec!(10000000)));

        // (3,000,000 + 400,000) / 10,000,000 = 34%
        assert_eq!(result.effective_rate, dec!(34.00));
    }

    // =========================================================================
    // minimum effective rate
    // =========================================================================

    #[test]
    fn minimum_rate_does_not_bind_when_standard_exceeds_it() {
        // 34% combined is above the 15% floor.
        let result = calculate(CitInput {
            annual_turnover: dec!(25000000000),
            gross_profit: dec!(10000000),
            allowable_deductions: dec!(0),
            is_mne: false,
        });

        assert!(!result.minimum_rate_applied);
        assert_eq!(result.total_liability, dec!(3400000.00));
    }

    #[test]
    fn declared_mne_flag_triggers_the_same_floor_check() {
        let result = calculate(CitInput {
            annual_turnover: dec!(40000000),
            gross_profit: dec!(10000000),
            allowable_deductions: dec!(0),
            is_mne: true,
        });

        // Standard computation already exceeds the floor.
        assert!(!result.minimum_rate_applied);
    }

    // =========================================================================
    // input validation
    // =========================================================================

    #[test]
    fn negative_gross_profit_is_rejected() {
        let table = table();
        let calculator = CitCalculator::new(&table);

        let result = calculator.calculate(&standard_input(dec!(40000000), dec!(-1)));

        assert_eq!(result, Err(CitError::NegativeGrossProfit(dec!(-1))));
    }

    #[test]
    fn negative_turnover_is_rejected() {
        let table = table();
        let calculator = CitCalculator::new(&table);

        let result = calculator.calculate(&standard_input(dec!(-5), dec!(100)));

        assert_eq!(result, Err(CitError::NegativeTurnover(dec!(-5))));
    }
}
