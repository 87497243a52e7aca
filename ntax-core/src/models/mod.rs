mod compliance;
mod deduction;
mod tax_calculation;
mod taxpayer;
mod transaction;

pub use compliance::{ComplianceItem, ComplianceStatus};
pub use deduction::{Deduction, DeductionType, VerificationState};
pub use tax_calculation::{BreakdownLine, NewTaxCalculation, TaxCalculation, TaxType};
pub use taxpayer::{CompanySize, TaxpayerKind, TaxpayerProfile};
pub use transaction::{
    ApplicabilityFlags, Provenance, Transaction, TransactionCategory, TransactionDirection,
};
