use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::{self, Currency, CurrencyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionDirection {
    Income,
    Expense,
}

/// How a transaction's category was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Manual,
    AutomatedClassification,
}

/// Closed category set for classified transactions.
///
/// The applicability flags (VAT, WHT, capital) are derived from the category
/// via [`TransactionCategory::applicability`] and never stored independently,
/// so an external classifier can only influence them by picking a category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Salary,
    Freelance,
    BusinessIncome,
    Investment,
    Rental,
    CapitalGains,
    ForexGains,
    CryptoGains,
    Dividend,
    OtherIncome,
    BusinessExpense,
    PersonalExpense,
    DeductibleExpense,
    NonDeductibleExpense,
    CapitalInflow,
    CapitalOutflow,
    Transfer,
    Unknown,
}

/// Tax-applicability flags derived from a transaction's category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicabilityFlags {
    pub vat_applicable: bool,
    pub wht_applicable: bool,
    pub capital: bool,
}

impl TransactionCategory {
    /// Fixed category-to-flags lookup.
    ///
    /// The match is exhaustive on purpose: adding a category without deciding
    /// its applicability is a compile error.
    pub fn applicability(self) -> ApplicabilityFlags {
        use TransactionCategory::*;
        match self {
            BusinessIncome | Freelance => ApplicabilityFlags {
                vat_applicable: true,
                wht_applicable: self == Freelance,
                capital: false,
            },
            BusinessExpense => ApplicabilityFlags {
                vat_applicable: true,
                wht_applicable: false,
                capital: false,
            },
            Rental | Dividend | Investment => ApplicabilityFlags {
                vat_applicable: false,
                wht_applicable: true,
                capital: false,
            },
            CapitalInflow | CapitalOutflow => ApplicabilityFlags {
                vat_applicable: false,
                wht_applicable: false,
                capital: true,
            },
            Salary | CapitalGains | ForexGains | CryptoGains | OtherIncome
            | PersonalExpense | DeductibleExpense | NonDeductibleExpense | Transfer
            | Unknown => ApplicabilityFlags::default(),
        }
    }

    pub fn is_income(self) -> bool {
        use TransactionCategory::*;
        matches!(
            self,
            Salary
                | Freelance
                | BusinessIncome
                | Investment
                | Rental
                | CapitalGains
                | ForexGains
                | CryptoGains
                | Dividend
                | OtherIncome
        )
    }

    pub fn is_expense(self) -> bool {
        use TransactionCategory::*;
        matches!(
            self,
            BusinessExpense | PersonalExpense | DeductibleExpense | NonDeductibleExpense
        )
    }
}

/// An immutable financial event.
///
/// `reporting_amount` is fixed at creation from the original amount and the
/// exchange rate in effect at that moment; later rate changes never
/// retroactively alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub description: String,
    /// Signed amount in the original currency.
    pub amount: Decimal,
    pub currency: Currency,
    /// Amount in the reporting currency (NGN), computed once at creation.
    pub reporting_amount: Decimal,
    /// Exchange rate used for `reporting_amount`. `None` only for NGN.
    pub exchange_rate: Option<Decimal>,
    pub date: NaiveDate,
    pub direction: TransactionDirection,
    pub category: TransactionCategory,
    pub flags: ApplicabilityFlags,
    pub provenance: Provenance,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a transaction, normalizing the amount into the reporting
    /// currency exactly once and deriving applicability flags from the
    /// category.
    ///
    /// # Errors
    ///
    /// Returns [`CurrencyError::CurrencyMismatch`] when a non-NGN amount has
    /// no exchange rate, and [`CurrencyError::InvalidRate`] for a
    /// non-positive rate.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        description: impl Into<String>,
        amount: Decimal,
        currency: Currency,
        exchange_rate: Option<Decimal>,
        date: NaiveDate,
        direction: TransactionDirection,
        category: TransactionCategory,
        provenance: Provenance,
    ) -> Result<Self, CurrencyError> {
        let reporting_amount = currency::normalize(amount, currency, exchange_rate)?;

        Ok(Self {
            description: description.into(),
            amount,
            currency,
            reporting_amount,
            exchange_rate: if currency == Currency::Ngn {
                None
            } else {
                exchange_rate
            },
            date,
            direction,
            category,
            flags: category.applicability(),
            provenance,
            created_at: Utc::now(),
        })
    }
}
