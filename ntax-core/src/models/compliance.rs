use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::tax_calculation::TaxType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Pending,
    Completed,
    Overdue,
    NotApplicable,
}

/// A tracked statutory filing or payment obligation.
///
/// Status transitions: `Pending → Completed` (taxpayer action, external to
/// the engine) or `Pending → Overdue` (automatic once the due date passes).
/// `Completed` and `Overdue` are terminal; a new filing period gets a new
/// item rather than resetting this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub tax_type: TaxType,
    pub status: ComplianceStatus,
}

impl ComplianceItem {
    pub fn pending(
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: NaiveDate,
        tax_type: TaxType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            due_date,
            tax_type,
            status: ComplianceStatus::Pending,
        }
    }

    /// Transitions `Pending → Overdue` when the due date has passed.
    ///
    /// Returns whether the item transitioned. Terminal statuses are left
    /// untouched.
    pub fn mark_overdue_if_past_due(&mut self, today: NaiveDate) -> bool {
        if self.status == ComplianceStatus::Pending && today > self.due_date {
            self.status = ComplianceStatus::Overdue;
            true
        } else {
            false
        }
    }
}
