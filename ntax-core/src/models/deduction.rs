use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closed set of deduction types recognised for PIT relief.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeductionType {
    Pension,
    Nhf,
    Nhis,
    LifeInsurance,
    HousingLoanInterest,
    /// Annual rent paid. Relief is a capped fraction of this amount, valued
    /// by the PIT calculator from the rule table.
    AnnualRentPaid,
}

impl DeductionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pension => "pension",
            Self::Nhf => "nhf",
            Self::Nhis => "nhis",
            Self::LifeInsurance => "life_insurance",
            Self::HousingLoanInterest => "housing_loan_interest",
            Self::AnnualRentPaid => "annual_rent_paid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Unverified,
    Verified,
}

/// A claimed reduction against a tax year.
///
/// Only verified deductions may reduce a filed calculation; unverified ones
/// are admitted to scenario output only, with an explicit caveat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub year: i32,
    pub deduction_type: DeductionType,
    pub description: String,
    pub amount: Decimal,
    pub verification: VerificationState,
}

impl Deduction {
    pub fn is_verified(&self) -> bool {
        self.verification == VerificationState::Verified
    }
}
