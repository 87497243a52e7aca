//! Deterministic, rule-based transaction classification.
//!
//! Keyword matching over the transaction description is the built-in
//! fallback classifier. A higher-confidence external classifier may override
//! the *category* before a transaction is finalized, but applicability flags
//! are always re-derived from the category via
//! [`TransactionCategory::applicability`], never taken on faith from free
//! text.
//!
//! Keyword tables are ordered const slices, so classification of the same
//! description is reproducible across runs and platforms.

use serde::{Deserialize, Serialize};

use crate::models::{ApplicabilityFlags, TransactionCategory, TransactionDirection};

/// Confidence attached to a keyword match vs. a fallback guess.
pub const KEYWORD_CONFIDENCE: f32 = 0.75;
pub const CAPITAL_CONFIDENCE: f32 = 0.70;
pub const FALLBACK_CONFIDENCE: f32 = 0.30;

const INCOME_KEYWORDS: &[(&str, TransactionCategory)] = &[
    ("salary", TransactionCategory::Salary),
    ("wage", TransactionCategory::Salary),
    ("paye", TransactionCategory::Salary),
    ("payroll", TransactionCategory::Salary),
    ("freelance", TransactionCategory::Freelance),
    ("contract", TransactionCategory::Freelance),
    ("upwork", TransactionCategory::Freelance),
    ("fiverr", TransactionCategory::Freelance),
    ("invoice", TransactionCategory::Freelance),
    ("consulting", TransactionCategory::Freelance),
    ("sales", TransactionCategory::BusinessIncome),
    ("revenue", TransactionCategory::BusinessIncome),
    ("business income", TransactionCategory::BusinessIncome),
    ("interest", TransactionCategory::Investment),
    ("dividend", TransactionCategory::Dividend),
    ("rental", TransactionCategory::Rental),
    ("rent received", TransactionCategory::Rental),
    ("property income", TransactionCategory::Rental),
    ("forex", TransactionCategory::ForexGains),
    ("fx gain", TransactionCategory::ForexGains),
    ("crypto", TransactionCategory::CryptoGains),
    ("bitcoin", TransactionCategory::CryptoGains),
    ("trading profit", TransactionCategory::ForexGains),
];

const EXPENSE_KEYWORDS: &[(&str, TransactionCategory)] = &[
    ("office", TransactionCategory::BusinessExpense),
    ("equipment", TransactionCategory::BusinessExpense),
    ("software", TransactionCategory::BusinessExpense),
    ("subscription", TransactionCategory::BusinessExpense),
    ("internet", TransactionCategory::BusinessExpense),
    ("transport", TransactionCategory::BusinessExpense),
    ("fuel", TransactionCategory::BusinessExpense),
    ("travel", TransactionCategory::BusinessExpense),
    ("advertising", TransactionCategory::BusinessExpense),
    ("marketing", TransactionCategory::BusinessExpense),
    ("rent paid", TransactionCategory::DeductibleExpense),
    ("pension", TransactionCategory::DeductibleExpense),
    ("nhf", TransactionCategory::DeductibleExpense),
    ("nhis", TransactionCategory::DeductibleExpense),
    ("insurance", TransactionCategory::DeductibleExpense),
    ("food", TransactionCategory::PersonalExpense),
    ("groceries", TransactionCategory::PersonalExpense),
    ("entertainment", TransactionCategory::PersonalExpense),
    ("clothing", TransactionCategory::PersonalExpense),
];

// Capital keywords outrank income/expense matches: principal movements are
// neither income nor expense and must not be taxed.
const CAPITAL_KEYWORDS: &[&str] = &[
    "loan received",
    "capital injection",
    "investment deposit",
    "principal",
    "deposit",
    "funding",
    "equity",
    "loan repayment",
    "capital withdrawal",
];

/// Outcome of rule-based classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: TransactionCategory,
    pub flags: ApplicabilityFlags,
    pub confidence: f32,
    /// The keyword that decided the category, if any.
    pub matched_keyword: Option<String>,
}

/// Classifies a transaction description.
///
/// Capital keywords are checked first; then the keyword table for the
/// transaction's direction; unmatched descriptions fall back to
/// other-income or personal-expense at low confidence. Flags always come
/// from the category lookup.
pub fn classify(description: &str, direction: TransactionDirection) -> Classification {
    let desc = description.to_lowercase();
    let desc = desc.trim();

    for keyword in CAPITAL_KEYWORDS {
        if desc.contains(keyword) {
            let category = match direction {
                TransactionDirection::Income => TransactionCategory::CapitalInflow,
                TransactionDirection::Expense => TransactionCategory::CapitalOutflow,
            };
            return Classification {
                category,
                flags: category.applicability(),
                confidence: CAPITAL_CONFIDENCE,
                matched_keyword: Some((*keyword).to_string()),
            };
        }
    }

    let (keywords, fallback) = match direction {
        TransactionDirection::Income => (INCOME_KEYWORDS, TransactionCategory::OtherIncome),
        TransactionDirection::Expense => (EXPENSE_KEYWORDS, TransactionCategory::PersonalExpense),
    };

    for (keyword, category) in keywords {
        if desc.contains(keyword) {
            return Classification {
                category: *category,
                flags: category.applicability(),
                confidence: KEYWORD_CONFIDENCE,
                matched_keyword: Some((*keyword).to_string()),
            };
        }
    }

    Classification {
        category: fallback,
        flags: fallback.applicability(),
        confidence: FALLBACK_CONFIDENCE,
        matched_keyword: None,
    }
}

/// Re-derives applicability flags for an externally classified category.
///
/// This is the only admission path for categories assigned outside the
/// engine: the category must already be a member of the closed set (enforced
/// by the type), and the flags come from the fixed lookup, not the external
/// classifier.
pub fn flags_for(category: TransactionCategory) -> ApplicabilityFlags {
    category.applicability()
}
