use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxpayerKind {
    Individual,
    Freelancer,
    Business,
}

impl TaxpayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Freelancer => "freelancer",
            Self::Business => "business",
        }
    }
}

/// Turnover-based company size classification under the Act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Small,
    Medium,
    Large,
}

/// Read-only taxpayer facts the engine consumes. Determines which calculators
/// apply and which rate table rows are eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxpayerProfile {
    pub kind: TaxpayerKind,
    pub company_size: Option<CompanySize>,
    pub declared_annual_gross_income: Decimal,
    pub residency_jurisdiction: String,
}

impl TaxpayerProfile {
    /// Tax types this taxpayer is obligated under.
    pub fn applicable_tax_types(&self) -> Vec<super::tax_calculation::TaxType> {
        use super::tax_calculation::TaxType;
        match self.kind {
            TaxpayerKind::Individual | TaxpayerKind::Freelancer => vec![TaxType::Pit],
            TaxpayerKind::Business => vec![
                TaxType::Cit,
                TaxType::Vat,
                TaxType::Wht,
                TaxType::DevelopmentLevy,
            ],
        }
    }
}
