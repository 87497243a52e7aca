//! What-if projections over the same calculators and rule tables as real
//! assessments.
//!
//! The scenario engine holds only a registry reference: it cannot reach a
//! store, so projecting a scenario can never mutate transactions, deductions,
//! compliance items, or calculation history. Every output is marked
//! `is_scenario` and labelled, and any relaxation applied (such as admitting
//! unverified deductions) is surfaced as an explicit assumption string.
//!
//! Identical scenario inputs against the same registry always produce
//! identical output.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::{
    CitCalculator, CitError, CitInput, PitCalculator, PitError, PitInput,
};
use crate::models::{Deduction, NewTaxCalculation, TaxType};
use crate::rules::{RegistryError, RuleTableRegistry};

/// Errors from scenario projection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Pit(#[from] PitError),

    #[error(transparent)]
    Cit(#[from] CitError),
}

/// A hypothetical PIT situation to project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitScenario {
    pub label: String,
    pub year: i32,
    pub gross_income: Decimal,
    pub deductions: Vec<Deduction>,
    /// Admit unverified deductions into the projection. Surfaced as an
    /// assumption on the outcome; filings never do this.
    pub include_unverified: bool,
    pub is_minimum_wage_earner: bool,
}

/// A hypothetical CIT situation to project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitScenario {
    pub label: String,
    pub year: i32,
    pub input: CitInput,
}

/// A projected calculation plus the assumptions it was computed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub calculation: NewTaxCalculation,
    pub assumptions: Vec<String>,
}

/// Two projections side by side. `liability_delta` is projected minus
/// current: negative means the change saves tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub current: ScenarioOutcome,
    pub projected: ScenarioOutcome,
    pub liability_delta: Decimal,
    pub effective_rate_delta: Decimal,
}

/// Read-only what-if engine over a frozen registry.
#[derive(Debug, Clone)]
pub struct ScenarioEngine<'a> {
    registry: &'a RuleTableRegistry,
}

impl<'a> ScenarioEngine<'a> {
    pub fn new(registry: &'a RuleTableRegistry) -> Self {
        Self { registry }
    }

    /// Projects a PIT scenario.
    ///
    /// # Errors
    ///
    /// Fails when the year has no PIT table or the inputs are invalid.
    pub fn project_pit(&self, scenario: &PitScenario) -> Result<ScenarioOutcome, ScenarioError> {
        let table = self.registry.pit(scenario.year)?;

        let mut assumptions = Vec::new();
        let deductions: Vec<Deduction> = if scenario.include_unverified {
            let unverified = scenario
                .deductions
                .iter()
                .filter(|d| !d.is_verified())
                .count();
            if unverified > 0 {
                assumptions.push(format!(
                    "{unverified} unverified deduction(s) included as if verified"
                ));
            }
            scenario.deductions.clone()
        } else {
            scenario
                .deductions
                .iter()
                .filter(|d| d.is_verified())
                .cloned()
                .collect()
        };
        if scenario.is_minimum_wage_earner {
            assumptions.push("taxpayer declared as minimum wage earner".to_string());
        }

        let result = PitCalculator::new(table).calculate(&PitInput {
            gross_income: scenario.gross_income,
            deductions,
            is_minimum_wage_earner: scenario.is_minimum_wage_earner,
        })?;

        Ok(ScenarioOutcome {
            calculation: NewTaxCalculation {
                tax_type: TaxType::Pit,
                year: scenario.year,
                gross_income: result.gross_income,
                total_deductions: result.total_deductions,
                taxable_income: result.taxable_income,
                liability: result.liability,
                effective_rate: result.effective_rate,
                breakdown: result.breakdown,
                is_scenario: true,
                scenario_label: Some(scenario.label.clone()),
            },
            assumptions,
        })
    }

    /// Projects a CIT scenario.
    pub fn project_cit(&self, scenario: &CitScenario) -> Result<ScenarioOutcome, ScenarioError> {
        let table = self.registry.cit(scenario.year)?;
        let result = CitCalculator::new(table).calculate(&scenario.input)?;

        let mut assumptions = Vec::new();
        if scenario.input.is_mne {
            assumptions.push("company declared as a multinational enterprise".to_string());
        }

        Ok(ScenarioOutcome {
            calculation: NewTaxCalculation {
                tax_type: TaxType::Cit,
                year: scenario.year,
                gross_income: result.gross_profit,
                total_deductions: result.allowable_deductions,
                taxable_income: result.assessable_profit,
                liability: result.total_liability,
                effective_rate: result.effective_rate,
                breakdown: result.breakdown,
                is_scenario: true,
                scenario_label: Some(scenario.label.clone()),
            },
            assumptions,
        })
    }

    /// Current situation vs. the same situation at a different gross income.
    pub fn compare_income_change(
        &self,
        current: &PitScenario,
        projected_gross_income: Decimal,
    ) -> Result<ScenarioComparison, ScenarioError> {
        let mut projected = current.clone();
        projected.label = format!("{} (income {projected_gross_income})", current.label);
        projected.gross_income = projected_gross_income;
        self.compare_pit(current, &projected)
    }

    /// Current situation vs. the same situation with one extra deduction.
    pub fn compare_deduction_impact(
        &self,
        current: &PitScenario,
        extra: Deduction,
    ) -> Result<ScenarioComparison, ScenarioError> {
        let mut projected = current.clone();
        projected.label = format!("{} (+{})", current.label, extra.deduction_type.as_str());
        projected.deductions.push(extra);
        self.compare_pit(current, &projected)
    }

    /// The same earnings taxed as an individual vs. through a company.
    /// `liability_delta` is company minus individual.
    pub fn compare_entity_structure(
        &self,
        as_individual: &PitScenario,
        as_company: &CitScenario,
    ) -> Result<ScenarioComparison, ScenarioError> {
        let current = self.project_pit(as_individual)?;
        let projected = self.project_cit(as_company)?;
        Ok(comparison(current, projected))
    }

    fn compare_pit(
        &self,
        current: &PitScenario,
        projected: &PitScenario,
    ) -> Result<ScenarioComparison, ScenarioError> {
        let current = self.project_pit(current)?;
        let projected = self.project_pit(projected)?;
        Ok(comparison(current, projected))
    }
}

fn comparison(current: ScenarioOutcome, projected: ScenarioOutcome) -> ScenarioComparison {
    let liability_delta = projected.calculation.liability - current.calculation.liability;
    let effective_rate_delta =
        projected.calculation.effective_rate - current.calculation.effective_rate;
    ScenarioComparison {
        current,
        projected,
        liability_delta,
        effective_rate_delta,
    }
}
