//! Assessment orchestration: read, compute, persist, then advise.
//!
//! [`TaxEngine`] owns the frozen rule registry and drives one assessment per
//! call: load the taxpayer's data through the [`TaxStore`] seam, run the
//! calculator for the requested tax type, persist the result (the store marks
//! any prior calculation for the same type and year superseded), then run
//! detection for advisory flags. Detection runs after persistence and its
//! outcome never alters the stored figures.
//!
//! Scenario projections go through [`TaxEngine::project_pit`] and friends,
//! which delegate to the store-less [`ScenarioEngine`](crate::scenario);
//! a what-if cannot touch persisted state by construction.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::anomaly::{Alert, AnomalyDetector, DetectionInput};
use crate::calculations::{
    CitCalculator, CitError, CitInput, PitCalculator, PitError, PitInput, VatCalculator,
    WhtCalculator, WhtError, WhtPayment,
};
use crate::models::{
    ComplianceItem, Deduction, NewTaxCalculation, TaxCalculation, TaxType, TaxpayerKind,
    TaxpayerProfile, Transaction, TransactionCategory,
};
use crate::rules::{RecipientType, RegistryError, RuleTableRegistry, WhtPaymentType};
use crate::scenario::{
    CitScenario, PitScenario, ScenarioComparison, ScenarioEngine, ScenarioError,
    ScenarioOutcome,
};

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no taxpayer profile on record")]
    MissingProfile,

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Persistence seam, pre-scoped to a single taxpayer.
///
/// The engine is the only writer of calculations and compliance items;
/// transactions and deductions are read-only here (ingest owns them).
/// `insert_calculation` must mark any prior non-scenario calculation for the
/// same (tax type, year) superseded in the same operation.
#[async_trait]
pub trait TaxStore: Send + Sync {
    async fn profile(&self) -> Result<TaxpayerProfile, StoreError>;
    async fn transactions(&self, year: i32) -> Result<Vec<Transaction>, StoreError>;
    async fn deductions(&self, year: i32) -> Result<Vec<Deduction>, StoreError>;
    async fn compliance_items(&self) -> Result<Vec<ComplianceItem>, StoreError>;
    async fn insert_calculation(
        &self,
        calculation: NewTaxCalculation,
    ) -> Result<TaxCalculation, StoreError>;
    async fn replace_compliance_items(
        &self,
        items: Vec<ComplianceItem>,
    ) -> Result<(), StoreError>;
}

/// Errors from one assessment run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Pit(#[from] PitError),

    #[error(transparent)]
    Cit(#[from] CitError),

    #[error(transparent)]
    Wht(#[from] WhtError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{} does not apply to {} taxpayers", tax_type.as_str(), kind.as_str())]
    NotApplicable { tax_type: TaxType, kind: TaxpayerKind },
}

/// One persisted assessment plus its advisory flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub calculation: TaxCalculation,
    pub alerts: Vec<Alert>,
}

/// The orchestrator. Cheap to share behind an `Arc`; the registry inside is
/// immutable.
#[derive(Debug, Clone)]
pub struct TaxEngine {
    registry: RuleTableRegistry,
}

impl TaxEngine {
    pub fn new(registry: RuleTableRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleTableRegistry {
        &self.registry
    }

    /// Runs one full assessment for a tax type and year.
    ///
    /// # Errors
    ///
    /// Fails when the tax type does not apply to the taxpayer, the year has
    /// no rule table, the data is invalid, or the store fails. Advisory
    /// detection cannot fail an assessment.
    pub async fn assess<S: TaxStore>(
        &self,
        store: &S,
        tax_type: TaxType,
        year: i32,
        today: NaiveDate,
    ) -> Result<Assessment, EngineError> {
        let profile = store.profile().await?;
        if !profile.applicable_tax_types().contains(&tax_type) {
            return Err(EngineError::NotApplicable {
                tax_type,
                kind: profile.kind,
            });
        }

        let transactions = store.transactions(year).await?;
        let deductions = store.deductions(year).await?;
        debug!(
            tax_type = tax_type.as_str(),
            year,
            transactions = transactions.len(),
            deductions = deductions.len(),
            "assessment inputs loaded"
        );

        let new_calculation = self.compute(
            tax_type,
            year,
            &profile,
            &transactions,
            &deductions,
        )?;
        let calculation = store.insert_calculation(new_calculation).await?;
        info!(
            tax_type = tax_type.as_str(),
            year,
            liability = %calculation.liability,
            "assessment persisted"
        );

        let compliance_items = self
            .refresh_compliance(store, profile.kind, year, today)
            .await?;

        let detector = AnomalyDetector::new(self.registry.anomaly_thresholds(year));
        let alerts = detector.detect(&DetectionInput {
            transactions: &transactions,
            deductions: &deductions,
            compliance_items: &compliance_items,
            year,
            today,
        });

        Ok(Assessment {
            calculation,
            alerts,
        })
    }

    /// Pure computation for one tax type. No store access.
    fn compute(
        &self,
        tax_type: TaxType,
        year: i32,
        profile: &TaxpayerProfile,
        transactions: &[Transaction],
        deductions: &[Deduction],
    ) -> Result<NewTaxCalculation, EngineError> {
        match tax_type {
            TaxType::Pit => {
                let table = self.registry.pit(year)?;
                let verified: Vec<Deduction> = deductions
                    .iter()
                    .filter(|d| d.year == year && d.is_verified())
                    .cloned()
                    .collect();
                let result = PitCalculator::new(table).calculate(&PitInput {
                    gross_income: gross_income(profile, transactions),
                    deductions: verified,
                    is_minimum_wage_earner: false,
                })?;

                Ok(NewTaxCalculation {
                    tax_type,
                    year,
                    gross_income: result.gross_income,
                    total_deductions: result.total_deductions,
                    taxable_income: result.taxable_income,
                    liability: result.liability,
                    effective_rate: result.effective_rate,
                    breakdown: result.breakdown,
                    is_scenario: false,
                    scenario_label: None,
                })
            }
            TaxType::Cit | TaxType::DevelopmentLevy => {
                let table = self.registry.cit(year)?;
                let turnover = gross_income(profile, transactions);
                let allowable: Decimal = transactions
                    .iter()
                    .filter(|t| t.category == TransactionCategory::BusinessExpense)
                    .map(|t| t.reporting_amount)
                    .sum();
                let result = CitCalculator::new(table).calculate(&CitInput {
                    annual_turnover: turnover,
                    gross_profit: turnover,
                    allowable_deductions: allowable,
                    is_mne: false,
                })?;

                // The levy is computed inside the CIT run; a development-levy
                // assessment reports just that line.
                let (liability, breakdown) = if tax_type == TaxType::DevelopmentLevy {
                    (
                        result.development_levy,
                        result
                            .breakdown
                            .iter()
                            .filter(|l| l.label == "Development levy")
                            .cloned()
                            .collect(),
                    )
                } else {
                    (result.total_liability, result.breakdown)
                };

                Ok(NewTaxCalculation {
                    tax_type,
                    year,
                    gross_income: result.gross_profit,
                    total_deductions: result.allowable_deductions,
                    taxable_income: result.assessable_profit,
                    liability,
                    effective_rate: if tax_type == TaxType::DevelopmentLevy {
                        crate::calculations::common::effective_rate(
                            liability,
                            result.assessable_profit,
                        )
                    } else {
                        result.effective_rate
                    },
                    breakdown,
                    is_scenario: false,
                    scenario_label: None,
                })
            }
            TaxType::Vat => {
                let table = self.registry.vat(year)?;
                let result = VatCalculator::new(table).calculate(transactions);

                Ok(NewTaxCalculation {
                    tax_type,
                    year,
                    gross_income: result.taxable_base,
                    total_deductions: Decimal::ZERO,
                    taxable_income: result.taxable_base,
                    liability: result.liability,
                    effective_rate: result.effective_rate,
                    breakdown: result.breakdown,
                    is_scenario: false,
                    scenario_label: None,
                })
            }
            TaxType::Wht => {
                let table = self.registry.wht(year)?;
                let payments = withholding_payments(profile.kind, transactions);
                let result = WhtCalculator::new(table).calculate(&payments)?;

                Ok(NewTaxCalculation {
                    tax_type,
                    year,
                    gross_income: result.total_gross,
                    total_deductions: Decimal::ZERO,
                    taxable_income: result.total_gross,
                    liability: result.total_withheld,
                    effective_rate: crate::calculations::common::effective_rate(
                        result.total_withheld,
                        result.total_gross,
                    ),
                    breakdown: result.breakdown,
                    is_scenario: false,
                    scenario_label: None,
                })
            }
        }
    }

    /// Seeds compliance items from the filing calendar when the store has
    /// none, transitions past-due items to overdue, and persists the result.
    async fn refresh_compliance<S: TaxStore>(
        &self,
        store: &S,
        kind: TaxpayerKind,
        year: i32,
        today: NaiveDate,
    ) -> Result<Vec<ComplianceItem>, EngineError> {
        let mut items = store.compliance_items().await?;

        if items.is_empty() {
            match self.registry.filing_calendar() {
                Some(calendar) => {
                    items = AnomalyDetector::compliance_items_for(calendar, kind, year, today);
                }
                None => {
                    warn!("no filing calendar configured, compliance tracking disabled");
                    return Ok(items);
                }
            }
        }

        let transitioned = AnomalyDetector::refresh_overdue(&mut items, today);
        if transitioned > 0 {
            info!(transitioned, "compliance items transitioned to overdue");
        }
        store.replace_compliance_items(items.clone()).await?;
        Ok(items)
    }

    // ---- scenario pass-throughs; none of these can reach a store ----

    pub fn project_pit(&self, scenario: &PitScenario) -> Result<ScenarioOutcome, ScenarioError> {
        ScenarioEngine::new(&self.registry).project_pit(scenario)
    }

    pub fn project_cit(&self, scenario: &CitScenario) -> Result<ScenarioOutcome, ScenarioError> {
        ScenarioEngine::new(&self.registry).project_cit(scenario)
    }

    pub fn compare_income_change(
        &self,
        current: &PitScenario,
        projected_gross_income: Decimal,
    ) -> Result<ScenarioComparison, ScenarioError> {
        ScenarioEngine::new(&self.registry).compare_income_change(current, projected_gross_income)
    }

    pub fn compare_deduction_impact(
        &self,
        current: &PitScenario,
        extra: Deduction,
    ) -> Result<ScenarioComparison, ScenarioError> {
        ScenarioEngine::new(&self.registry).compare_deduction_impact(current, extra)
    }

    pub fn compare_entity_structure(
        &self,
        as_individual: &PitScenario,
        as_company: &CitScenario,
    ) -> Result<ScenarioComparison, ScenarioError> {
        ScenarioEngine::new(&self.registry).compare_entity_structure(as_individual, as_company)
    }
}

/// Annual gross income: the sum of income-category transactions, falling back
/// to the profile's declared figure when no transactions are on record yet.
fn gross_income(profile: &TaxpayerProfile, transactions: &[Transaction]) -> Decimal {
    let from_transactions: Decimal = transactions
        .iter()
        .filter(|t| t.category.is_income())
        .map(|t| t.reporting_amount)
        .sum();
    if from_transactions > Decimal::ZERO {
        from_transactions
    } else {
        profile.declared_annual_gross_income
    }
}

/// Maps WHT-flagged transactions to withholding payments. The payment type
/// follows the category; the recipient type follows the taxpayer kind.
fn withholding_payments(kind: TaxpayerKind, transactions: &[Transaction]) -> Vec<WhtPayment> {
    let recipient_type = match kind {
        TaxpayerKind::Business => RecipientType::Company,
        TaxpayerKind::Individual | TaxpayerKind::Freelancer => RecipientType::Individual,
    };

    transactions
        .iter()
        .filter(|t| t.flags.wht_applicable)
        .filter_map(|t| {
            let payment_type = match t.category {
                TransactionCategory::Rental => WhtPaymentType::Rent,
                TransactionCategory::Dividend => WhtPaymentType::Dividend,
                TransactionCategory::Investment => WhtPaymentType::Interest,
                TransactionCategory::Freelance => WhtPaymentType::Consultancy,
                _ => return None,
            };
            Some(WhtPayment {
                payment_type,
                recipient_type,
                gross_amount: t.reporting_amount,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::currency::Currency;
    use crate::models::{ComplianceStatus, Provenance, TransactionDirection};
    use crate::rules::{
        AnomalyThresholds, CitTable, DeadlineSchedule, FilingCalendar, FilingDeadline,
        PitTable, RegistryBuilder, TaxBand, VatTable, WhtTable,
    };

    /// In-memory store backing the orchestration tests.
    #[derive(Default)]
    struct MemoryStore {
        profile: Option<TaxpayerProfile>,
        transactions: Vec<Transaction>,
        deductions: Vec<Deduction>,
        compliance: Mutex<Vec<ComplianceItem>>,
        calculations: Mutex<Vec<TaxCalculation>>,
    }

    #[async_trait]
    impl TaxStore for MemoryStore {
        async fn profile(&self) -> Result<TaxpayerProfile, StoreError> {
            self.profile.clone().ok_or(StoreError::MissingProfile)
        }

        async fn transactions(&self, year: i32) -> Result<Vec<Transaction>, StoreError> {
            use chrono::Datelike;
            Ok(self
                .transactions
                .iter()
                .filter(|t| t.date.year() == year)
                .cloned()
                .collect())
        }

        async fn deductions(&self, year: i32) -> Result<Vec<Deduction>, StoreError> {
            Ok(self
                .deductions
                .iter()
                .filter(|d| d.year == year)
                .cloned()
                .collect())
        }

        async fn compliance_items(&self) -> Result<Vec<ComplianceItem>, StoreError> {
            Ok(self.compliance.lock().unwrap().clone())
        }

        async fn insert_calculation(
            &self,
            calculation: NewTaxCalculation,
        ) -> Result<TaxCalculation, StoreError> {
            let mut calculations = self.calculations.lock().unwrap();
            for prior in calculations.iter_mut() {
                if prior.tax_type == calculation.tax_type
                    && prior.year == calculation.year
                    && !prior.is_scenario
                {
                    prior.superseded = true;
                }
            }
            let record = TaxCalculation {
                id: calculations.len() as i64 + 1,
                tax_type: calculation.tax_type,
                year: calculation.year,
                gross_income: calculation.gross_income,
                total_deductions: calculation.total_deductions,
                taxable_income: calculation.taxable_income,
                liability: calculation.liability,
                effective_rate: calculation.effective_rate,
                breakdown: calculation.breakdown,
                is_scenario: calculation.is_scenario,
                scenario_label: calculation.scenario_label,
                superseded: false,
                created_at: Utc::now(),
            };
            calculations.push(record.clone());
            Ok(record)
        }

        async fn replace_compliance_items(
            &self,
            items: Vec<ComplianceItem>,
        ) -> Result<(), StoreError> {
            *self.compliance.lock().unwrap() = items;
            Ok(())
        }
    }

    fn registry() -> RuleTableRegistry {
        let mut wht_rates = BTreeMap::new();
        for payment in [
            WhtPaymentType::Rent,
            WhtPaymentType::Dividend,
            WhtPaymentType::Interest,
            WhtPaymentType::Consultancy,
        ] {
            wht_rates.insert((payment, RecipientType::Individual), dec!(0.05));
            wht_rates.insert((payment, RecipientType::Company), dec!(0.10));
        }

        RegistryBuilder::new()
            .pit_table(
                2026,
                PitTable {
                    bands: vec![
                        TaxBand {
                            upper_bound: Some(dec!(800000)),
                            rate: dec!(0),
                        },
                        TaxBand {
                            upper_bound: Some(dec!(3000000)),
                            rate: dec!(0.15),
                        },
                        TaxBand {
                            upper_bound: Some(dec!(12000000)),
                            rate: dec!(0.18),
                        },
                        TaxBand {
                            upper_bound: None,
                            rate: dec!(0.25),
                        },
                    ],
                    minimum_wage_exemption: dec!(840000),
                    rent_relief_rate: dec!(0.20),
                    rent_relief_cap: dec!(500000),
                },
            )
            .unwrap()
            .cit_table(
                2026,
                CitTable {
                    small_company_threshold: dec!(25000000),
                    large_company_threshold: dec!(100000000),
                    mne_turnover_threshold: dec!(20000000000),
                    exempt_rate: dec!(0),
                    standard_rate: dec!(0.30),
                    development_levy_rate: dec!(0.04),
                    minimum_effective_rate: dec!(0.15),
                },
            )
            .unwrap()
            .vat_table(2026, VatTable { rate: dec!(0.075) })
            .unwrap()
            .wht_table(2026, WhtTable { rates: wht_rates })
            .unwrap()
            .anomaly_thresholds(
                2026,
                AnomalyThresholds {
                    deduction_income_ratio_limit: dec!(0.40),
                    expense_income_ratio_limit: dec!(0.80),
                    large_transaction_multiplier: dec!(5),
                    deadline_warning_days: 30,
                    deadline_critical_days: 7,
                },
            )
            .unwrap()
            .filing_calendar(FilingCalendar {
                deadlines: vec![
                    FilingDeadline {
                        tax_type: TaxType::Pit,
                        applies_to: vec![TaxpayerKind::Individual, TaxpayerKind::Freelancer],
                        schedule: DeadlineSchedule::Annual { month: 3, day: 31 },
                        description: "Annual PIT return".into(),
                    },
                    FilingDeadline {
                        tax_type: TaxType::Vat,
                        applies_to: vec![TaxpayerKind::Business],
                        schedule: DeadlineSchedule::Monthly { day: 21 },
                        description: "Monthly VAT remittance".into(),
                    },
                ],
            })
            .unwrap()
            .build()
    }

    fn individual_profile(declared: Decimal) -> TaxpayerProfile {
        TaxpayerProfile {
            kind: TaxpayerKind::Individual,
            company_size: None,
            declared_annual_gross_income: declared,
            residency_jurisdiction: "Lagos".into(),
        }
    }

    fn business_profile() -> TaxpayerProfile {
        TaxpayerProfile {
            kind: TaxpayerKind::Business,
            company_size: None,
            declared_annual_gross_income: dec!(0),
            residency_jurisdiction: "Lagos".into(),
        }
    }

    fn txn(description: &str, amount: Decimal, category: TransactionCategory) -> Transaction {
        let direction = if category.is_expense() {
            TransactionDirection::Expense
        } else {
            TransactionDirection::Income
        };
        Transaction::new(
            description,
            amount,
            Currency::Ngn,
            None,
            NaiveDate::from_ymd_opt(2026, 4, 15).unwrap(),
            direction,
            category,
            Provenance::Manual,
        )
        .unwrap()
    }

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn pit_assessment_computes_and_persists() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(0))),
            transactions: vec![txn("salary", dec!(5000000), TransactionCategory::Salary)],
            ..Default::default()
        };

        let assessment = engine
            .assess(&store, TaxType::Pit, 2026, june_first())
            .await
            .unwrap();

        assert_eq!(assessment.calculation.liability, dec!(690000.00));
        assert!(!assessment.calculation.is_scenario);
        assert_eq!(store.calculations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reassessment_supersedes_the_prior_record() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(0))),
            transactions: vec![txn("salary", dec!(5000000), TransactionCategory::Salary)],
            ..Default::default()
        };

        engine
            .assess(&store, TaxType::Pit, 2026, june_first())
            .await
            .unwrap();
        engine
            .assess(&store, TaxType::Pit, 2026, june_first())
            .await
            .unwrap();

        let calculations = store.calculations.lock().unwrap();
        assert_eq!(calculations.len(), 2);
        assert!(calculations[0].superseded);
        assert!(!calculations[1].superseded);
    }

    #[tokio::test]
    async fn declared_income_backstops_an_empty_ledger() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(3000000))),
            ..Default::default()
        };

        let assessment = engine
            .assess(&store, TaxType::Pit, 2026, june_first())
            .await
            .unwrap();

        assert_eq!(assessment.calculation.gross_income, dec!(3000000));
        assert_eq!(assessment.calculation.liability, dec!(330000.00));
    }

    #[tokio::test]
    async fn cit_does_not_apply_to_individuals() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(1000000))),
            ..Default::default()
        };

        let result = engine.assess(&store, TaxType::Cit, 2026, june_first()).await;

        assert!(matches!(
            result,
            Err(EngineError::NotApplicable {
                tax_type: TaxType::Cit,
                kind: TaxpayerKind::Individual,
            })
        ));
    }

    #[tokio::test]
    async fn unknown_year_fails_before_persisting() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(1000000))),
            ..Default::default()
        };

        let result = engine.assess(&store, TaxType::Pit, 2019, june_first()).await;

        assert!(matches!(
            result,
            Err(EngineError::Registry(RegistryError::UnknownTaxYear {
                tax_type: TaxType::Pit,
                year: 2019,
            }))
        ));
        assert!(store.calculations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn vat_assessment_filters_to_applicable_transactions() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(business_profile()),
            transactions: vec![
                txn("sales", dec!(1000000), TransactionCategory::BusinessIncome),
                txn("loan received", dec!(9000000), TransactionCategory::CapitalInflow),
            ],
            ..Default::default()
        };

        let assessment = engine
            .assess(&store, TaxType::Vat, 2026, june_first())
            .await
            .unwrap();

        assert_eq!(assessment.calculation.liability, dec!(75000.00));
    }

    #[tokio::test]
    async fn wht_assessment_maps_categories_to_payment_types() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(business_profile()),
            transactions: vec![txn("rental income", dec!(1000000), TransactionCategory::Rental)],
            ..Default::default()
        };

        let assessment = engine
            .assess(&store, TaxType::Wht, 2026, june_first())
            .await
            .unwrap();

        // Company recipient rate.
        assert_eq!(assessment.calculation.liability, dec!(100000.00));
    }

    #[tokio::test]
    async fn development_levy_assessment_reports_only_the_levy_line() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(business_profile()),
            transactions: vec![txn(
                "sales",
                dec!(40000000),
                TransactionCategory::BusinessIncome,
            )],
            ..Default::default()
        };

        let assessment = engine
            .assess(&store, TaxType::DevelopmentLevy, 2026, june_first())
            .await
            .unwrap();

        assert_eq!(assessment.calculation.liability, dec!(1600000.00));
        assert_eq!(assessment.calculation.breakdown.len(), 1);
        assert_eq!(assessment.calculation.breakdown[0].label, "Development levy");
    }

    #[tokio::test]
    async fn assessment_seeds_compliance_items_from_the_calendar() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(2000000))),
            ..Default::default()
        };

        engine
            .assess(&store, TaxType::Pit, 2026, june_first())
            .await
            .unwrap();

        let items = store.compliance.lock().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].tax_type, TaxType::Pit);
        assert_eq!(items[0].status, ComplianceStatus::Pending);
    }

    #[tokio::test]
    async fn existing_past_due_items_transition_to_overdue() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(2000000))),
            ..Default::default()
        };
        store.compliance.lock().unwrap().push(ComplianceItem::pending(
            "PIT filing",
            "Annual PIT return",
            NaiveDate::from_ymd_opt(2026, 3, 28).unwrap(),
            TaxType::Pit,
        ));

        let assessment = engine
            .assess(&store, TaxType::Pit, 2026, june_first())
            .await
            .unwrap();

        let items = store.compliance.lock().unwrap();
        assert_eq!(items[0].status, ComplianceStatus::Overdue);
        assert!(assessment
            .alerts
            .iter()
            .any(|a| a.kind == crate::anomaly::AlertKind::DeadlineOverdue));
    }

    #[tokio::test]
    async fn scenario_projection_touches_no_stored_state() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(5000000))),
            ..Default::default()
        };

        let outcome = engine
            .project_pit(&PitScenario {
                label: "raise".into(),
                year: 2026,
                gross_income: dec!(12000000),
                deductions: vec![],
                include_unverified: false,
                is_minimum_wage_earner: false,
            })
            .unwrap();

        assert!(outcome.calculation.is_scenario);
        assert_eq!(outcome.calculation.liability, dec!(1950000.00));
        assert!(store.calculations.lock().unwrap().is_empty());
        assert!(store.compliance.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn assessment_matches_identical_scenario_figures() {
        let engine = TaxEngine::new(registry());
        let store = MemoryStore {
            profile: Some(individual_profile(dec!(0))),
            transactions: vec![txn("salary", dec!(5000000), TransactionCategory::Salary)],
            ..Default::default()
        };

        let assessment = engine
            .assess(&store, TaxType::Pit, 2026, june_first())
            .await
            .unwrap();
        let scenario = engine
            .project_pit(&PitScenario {
                label: "mirror".into(),
                year: 2026,
                gross_income: dec!(5000000),
                deductions: vec![],
                include_unverified: false,
                is_minimum_wage_earner: false,
            })
            .unwrap();

        assert_eq!(
            assessment.calculation.liability,
            scenario.calculation.liability
        );
        assert_eq!(
            assessment.calculation.breakdown,
            scenario.calculation.breakdown
        );
    }
}
