//! Anomaly and compliance detection.
//!
//! Two responsibilities share this module because they read the same data:
//!
//! * **Compliance items**: statutory obligations inferred from the filing
//!   calendar for a taxpayer kind, tracked through the
//!   [`ComplianceItem`](crate::models::ComplianceItem) state machine.
//! * **Advisory flags**: heuristic alerts (missed deductions, unusual
//!   transactions, audit-risk ratios, deadline proximity). Flags never block
//!   or alter a calculation; a calculation rerun with detection disabled
//!   yields identical figures.
//!
//! All thresholds live in [`AnomalyThresholds`] rule data. When a year has no
//! thresholds registered, detection degrades to an empty flag list with a
//! logged warning rather than failing the assessment.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{
    ComplianceItem, ComplianceStatus, Deduction, DeductionType, Transaction,
    TransactionCategory, TaxpayerKind,
};
use crate::rules::{AnomalyThresholds, FilingCalendar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// What a flag is about. Each kind carries a stable reason code so callers
/// can filter or deduplicate without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    DeadlineApproaching,
    DeadlineOverdue,
    MissedDeduction,
    UnusualTransaction,
    UnclassifiedTransaction,
    DeductionRatioHigh,
    ExpenseRatioHigh,
}

impl AlertKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeadlineApproaching => "deadline_approaching",
            Self::DeadlineOverdue => "deadline_overdue",
            Self::MissedDeduction => "missed_deduction",
            Self::UnusualTransaction => "unusual_transaction",
            Self::UnclassifiedTransaction => "unclassified_transaction",
            Self::DeductionRatioHigh => "deduction_ratio_high",
            Self::ExpenseRatioHigh => "expense_ratio_high",
        }
    }
}

/// One advisory flag. Purely informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
}

impl Alert {
    fn new(kind: AlertKind, severity: AlertSeverity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

/// Everything the detector reads. It never writes any of it.
#[derive(Debug, Clone)]
pub struct DetectionInput<'a> {
    pub transactions: &'a [Transaction],
    pub deductions: &'a [Deduction],
    pub compliance_items: &'a [ComplianceItem],
    pub year: i32,
    pub today: NaiveDate,
}

/// Detector over one year's thresholds.
#[derive(Debug, Clone)]
pub struct AnomalyDetector<'a> {
    thresholds: Option<&'a AnomalyThresholds>,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(thresholds: Option<&'a AnomalyThresholds>) -> Self {
        Self { thresholds }
    }

    /// Builds pending compliance items for every calendar obligation that
    /// applies to the taxpayer kind. Obligations whose schedule cannot
    /// produce a date (invalid calendar data) are skipped.
    pub fn compliance_items_for(
        calendar: &FilingCalendar,
        kind: TaxpayerKind,
        year: i32,
        today: NaiveDate,
    ) -> Vec<ComplianceItem> {
        calendar
            .applicable_to(kind)
            .filter_map(|deadline| {
                let due = deadline.due_date(year, today)?;
                Some(ComplianceItem::pending(
                    format!("{} filing", deadline.tax_type.as_str().to_uppercase()),
                    deadline.description.clone(),
                    due,
                    deadline.tax_type,
                ))
            })
            .collect()
    }

    /// Transitions every pending item whose due date has passed to overdue.
    /// Returns how many items transitioned.
    pub fn refresh_overdue(items: &mut [ComplianceItem], today: NaiveDate) -> usize {
        items
            .iter_mut()
            .map(|item| item.mark_overdue_if_past_due(today))
            .filter(|transitioned| *transitioned)
            .count()
    }

    /// Runs every heuristic check and returns flags sorted most severe
    /// first. With no thresholds registered for the year, logs a warning and
    /// returns no flags.
    pub fn detect(&self, input: &DetectionInput<'_>) -> Vec<Alert> {
        let Some(thresholds) = self.thresholds else {
            warn!(
                year = input.year,
                "no anomaly thresholds registered, skipping detection"
            );
            return Vec::new();
        };

        let mut alerts = Vec::new();
        self.check_deadlines(thresholds, input, &mut alerts);
        self.check_missed_deductions(input, &mut alerts);
        self.check_unusual_transactions(thresholds, input, &mut alerts);
        self.check_unclassified(input, &mut alerts);
        self.check_ratios(thresholds, input, &mut alerts);

        // Most severe first; insertion order breaks ties, which is stable
        // because every check iterates its input in order.
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
        alerts
    }

    fn check_deadlines(
        &self,
        thresholds: &AnomalyThresholds,
        input: &DetectionInput<'_>,
        alerts: &mut Vec<Alert>,
    ) {
        for item in input.compliance_items {
            match item.status {
                ComplianceStatus::Overdue => {
                    alerts.push(Alert::new(
                        AlertKind::DeadlineOverdue,
                        AlertSeverity::Critical,
                        format!("{} was due {}", item.title, item.due_date),
                    ));
                }
                ComplianceStatus::Pending => {
                    let days_left = (item.due_date - input.today).num_days();
                    if days_left < 0 {
                        // Pending past due means the refresh pass has not run;
                        // still worth surfacing.
                        alerts.push(Alert::new(
                            AlertKind::DeadlineOverdue,
                            AlertSeverity::Critical,
                            format!("{} was due {}", item.title, item.due_date),
                        ));
                    } else if days_left <= thresholds.deadline_critical_days {
                        alerts.push(Alert::new(
                            AlertKind::DeadlineApproaching,
                            AlertSeverity::Critical,
                            format!("{} due in {days_left} days", item.title),
                        ));
                    } else if days_left <= thresholds.deadline_warning_days {
                        alerts.push(Alert::new(
                            AlertKind::DeadlineApproaching,
                            AlertSeverity::Warning,
                            format!("{} due in {days_left} days", item.title),
                        ));
                    }
                }
                ComplianceStatus::Completed | ComplianceStatus::NotApplicable => {}
            }
        }
    }

    /// Deductible-category spending with no matching verified deduction
    /// claim for the year suggests relief being left on the table.
    fn check_missed_deductions(&self, input: &DetectionInput<'_>, alerts: &mut Vec<Alert>) {
        let claimed: BTreeSet<DeductionType> = input
            .deductions
            .iter()
            .filter(|d| d.year == input.year && d.is_verified())
            .map(|d| d.deduction_type)
            .collect();

        let mut flagged: BTreeSet<DeductionType> = BTreeSet::new();
        for txn in input.transactions {
            if txn.category != TransactionCategory::DeductibleExpense {
                continue;
            }
            let Some(deduction_type) = infer_deduction_type(&txn.description) else {
                continue;
            };
            if !claimed.contains(&deduction_type) && flagged.insert(deduction_type) {
                alerts.push(Alert::new(
                    AlertKind::MissedDeduction,
                    AlertSeverity::Info,
                    format!(
                        "spending matching {} found but no verified {} deduction is claimed",
                        deduction_type.as_str(),
                        deduction_type.as_str()
                    ),
                ));
            }
        }
    }

    fn check_unusual_transactions(
        &self,
        thresholds: &AnomalyThresholds,
        input: &DetectionInput<'_>,
        alerts: &mut Vec<Alert>,
    ) {
        let Some(average) = average_monthly_income(input.transactions) else {
            return;
        };
        let limit = average * thresholds.large_transaction_multiplier;
        if limit <= Decimal::ZERO {
            return;
        }

        for txn in input.transactions {
            if txn.reporting_amount > limit {
                alerts.push(Alert::new(
                    AlertKind::UnusualTransaction,
                    AlertSeverity::Warning,
                    format!(
                        "'{}' ({}) exceeds {}x average monthly income",
                        txn.description, txn.reporting_amount,
                        thresholds.large_transaction_multiplier
                    ),
                ));
            }
        }
    }

    fn check_unclassified(&self, input: &DetectionInput<'_>, alerts: &mut Vec<Alert>) {
        let unknown = input
            .transactions
            .iter()
            .filter(|t| t.category == TransactionCategory::Unknown)
            .count();
        if unknown > 0 {
            alerts.push(Alert::new(
                AlertKind::UnclassifiedTransaction,
                AlertSeverity::Info,
                format!("{unknown} transaction(s) remain unclassified"),
            ));
        }
    }

    fn check_ratios(
        &self,
        thresholds: &AnomalyThresholds,
        input: &DetectionInput<'_>,
        alerts: &mut Vec<Alert>,
    ) {
        let income: Decimal = input
            .transactions
            .iter()
            .filter(|t| t.category.is_income())
            .map(|t| t.reporting_amount)
            .sum();
        if income <= Decimal::ZERO {
            return;
        }

        let deductions: Decimal = input
            .deductions
            .iter()
            .filter(|d| d.year == input.year)
            .map(|d| d.amount)
            .sum();
        if deductions / income > thresholds.deduction_income_ratio_limit {
            alerts.push(Alert::new(
                AlertKind::DeductionRatioHigh,
                AlertSeverity::Warning,
                format!(
                    "claimed deductions exceed {}% of income, likely audit trigger",
                    thresholds.deduction_income_ratio_limit * Decimal::ONE_HUNDRED
                ),
            ));
        }

        let expenses: Decimal = input
            .transactions
            .iter()
            .filter(|t| t.category.is_expense())
            .map(|t| t.reporting_amount)
            .sum();
        if expenses / income > thresholds.expense_income_ratio_limit {
            alerts.push(Alert::new(
                AlertKind::ExpenseRatioHigh,
                AlertSeverity::Warning,
                format!(
                    "expenses exceed {}% of income, likely audit trigger",
                    thresholds.expense_income_ratio_limit * Decimal::ONE_HUNDRED
                ),
            ));
        }
    }
}

/// Average income per month with activity, not per calendar month, so a
/// taxpayer with three months of data is not diluted over twelve.
fn average_monthly_income(transactions: &[Transaction]) -> Option<Decimal> {
    let mut total = Decimal::ZERO;
    let mut months: BTreeSet<(i32, u32)> = BTreeSet::new();

    for txn in transactions {
        if txn.category.is_income() {
            total += txn.reporting_amount;
            months.insert((txn.date.year(), txn.date.month()));
        }
    }

    if months.is_empty() {
        None
    } else {
        Some(total / Decimal::from(months.len() as u64))
    }
}

/// Best-effort mapping from spending descriptions to the deduction type the
/// spend would support. Misses return `None` and flag nothing.
fn infer_deduction_type(description: &str) -> Option<DeductionType> {
    let desc = description.to_lowercase();
    if desc.contains("pension") {
        Some(DeductionType::Pension)
    } else if desc.contains("nhf") {
        Some(DeductionType::Nhf)
    } else if desc.contains("nhis") {
        Some(DeductionType::Nhis)
    } else if desc.contains("life insurance") || desc.contains("insurance premium") {
        Some(DeductionType::LifeInsurance)
    } else if desc.contains("rent") {
        Some(DeductionType::AnnualRentPaid)
    } else {
        None
    }
}
