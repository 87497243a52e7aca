use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The statutory tax types the engine computes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    Pit,
    Cit,
    Vat,
    Wht,
    /// Tracked separately for compliance deadlines; its liability is computed
    /// inside the CIT run as a distinct breakdown line.
    DevelopmentLevy,
}

impl TaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pit => "pit",
            Self::Cit => "cit",
            Self::Vat => "vat",
            Self::Wht => "wht",
            Self::DevelopmentLevy => "development_levy",
        }
    }
}

/// One line of a liability breakdown: a bracket or named rule, the base it
/// applied to, the rate, and its contribution to the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub label: String,
    pub base: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

impl BreakdownLine {
    pub fn new(label: impl Into<String>, base: Decimal, rate: Decimal, amount: Decimal) -> Self {
        Self {
            label: label.into(),
            base,
            rate,
            amount,
        }
    }
}

/// Engine output for one (tax type, year) run, before the store assigns an
/// id. Liability always equals the exact sum of `breakdown` amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxCalculation {
    pub tax_type: TaxType,
    pub year: i32,
    pub gross_income: Decimal,
    pub total_deductions: Decimal,
    pub taxable_income: Decimal,
    pub liability: Decimal,
    /// Percentage, derived from liability / gross income (zero-guarded).
    pub effective_rate: Decimal,
    pub breakdown: Vec<BreakdownLine>,
    pub is_scenario: bool,
    pub scenario_label: Option<String>,
}

/// A persisted calculation record. Immutable once created: a re-run for the
/// same (tax type, year) inserts a new record and the store marks this one
/// superseded, preserving the audit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculation {
    pub id: i64,
    pub tax_type: TaxType,
    pub year: i32,
    pub gross_income: Decimal,
    pub total_deductions: Decimal,
    pub taxable_income: Decimal,
    pub liability: Decimal,
    pub effective_rate: Decimal,
    pub breakdown: Vec<BreakdownLine>,
    pub is_scenario: bool,
    pub scenario_label: Option<String>,
    pub superseded: bool,
    pub created_at: DateTime<Utc>,
}
