//! Value Added Tax calculation over the flat rate.
//!
//! Only transactions flagged VAT-applicable enter the base; everything else
//! is excluded entirely rather than taxed at zero, so the applicable-base
//! subtotal is always reconstructable from the single breakdown line.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use ntax_core::calculations::VatCalculator;
//! use ntax_core::rules::VatTable;
//!
//! let table = VatTable { rate: dec!(0.075) };
//! let result = VatCalculator::new(&table).calculate_base(dec!(1000000));
//!
//! assert_eq!(result.liability, dec!(75000.00));
//! assert_eq!(result.taxable_base, dec!(1000000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{effective_rate, round_half_up};
use crate::models::{BreakdownLine, Transaction};
use crate::rules::VatTable;

/// Result of one VAT run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatResult {
    /// Sum of VAT-applicable transaction amounts in the reporting currency.
    pub taxable_base: Decimal,
    /// Sum of amounts excluded from the base (not applicable).
    pub excluded_total: Decimal,
    pub liability: Decimal,
    pub effective_rate: Decimal,
    pub breakdown: Vec<BreakdownLine>,
}

/// Flat-rate VAT calculator.
#[derive(Debug, Clone)]
pub struct VatCalculator<'a> {
    table: &'a VatTable,
}

impl<'a> VatCalculator<'a> {
    pub fn new(table: &'a VatTable) -> Self {
        Self { table }
    }

    /// Computes VAT over a pre-aggregated applicable base.
    pub fn calculate_base(&self, taxable_base: Decimal) -> VatResult {
        let liability = round_half_up(taxable_base * self.table.rate);
        VatResult {
            taxable_base,
            excluded_total: Decimal::ZERO,
            liability,
            effective_rate: effective_rate(liability, taxable_base),
            breakdown: vec![BreakdownLine::new(
                "VAT on taxable supplies",
                taxable_base,
                self.table.rate,
                liability,
            )],
        }
    }

    /// Computes VAT from classified transactions, filtering to those flagged
    /// applicable. Non-applicable amounts are reported in `excluded_total`
    /// and never appear in the base.
    pub fn calculate(&self, transactions: &[Transaction]) -> VatResult {
        let mut taxable_base = Decimal::ZERO;
        let mut excluded_total = Decimal::ZERO;

        for txn in transactions {
            if txn.flags.vat_applicable {
                taxable_base += txn.reporting_amount;
            } else {
                excluded_total += txn.reporting_amount;
            }
        }

        let mut result = self.calculate_base(taxable_base);
        result.excluded_total = excluded_total;
        result
    }
}
