//! Year-keyed registry of validated rule tables.
//!
//! The registry is the single source of truth consumed by every calculator.
//! It is populated once at process start via [`RegistryBuilder`], then frozen:
//! there is no mutation path, so concurrent readers need no locking. A lookup
//! for an unregistered year fails with [`RegistryError::UnknownTaxYear`];
//! the engine never silently falls back to a different year's table.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use ntax_core::rules::{RegistryBuilder, VatTable};
//!
//! let registry = RegistryBuilder::new()
//!     .vat_table(2026, VatTable { rate: dec!(0.075) })
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(registry.vat(2026).unwrap().rate, dec!(0.075));
//! assert!(registry.vat(2019).is_err());
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::TaxType;

use super::tables::{
    AnomalyThresholds, CitTable, FilingCalendar, PitTable, TableError, VatTable, WhtTable,
};

/// Errors from registry lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No rule table registered for the requested (tax type, year). Fatal to
    /// that run; never defaulted to another year.
    #[error("no {} rule table registered for tax year {year}", tax_type.as_str())]
    UnknownTaxYear { tax_type: TaxType, year: i32 },
}

/// Builds a [`RuleTableRegistry`], validating every table as it is added.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    pit: BTreeMap<i32, PitTable>,
    cit: BTreeMap<i32, CitTable>,
    vat: BTreeMap<i32, VatTable>,
    wht: BTreeMap<i32, WhtTable>,
    anomaly: BTreeMap<i32, AnomalyThresholds>,
    calendar: Option<FilingCalendar>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pit_table(mut self, year: i32, table: PitTable) -> Result<Self, TableError> {
        table.validate()?;
        self.pit.insert(year, table);
        Ok(self)
    }

    pub fn cit_table(mut self, year: i32, table: CitTable) -> Result<Self, TableError> {
        table.validate()?;
        self.cit.insert(year, table);
        Ok(self)
    }

    pub fn vat_table(mut self, year: i32, table: VatTable) -> Result<Self, TableError> {
        table.validate()?;
        self.vat.insert(year, table);
        Ok(self)
    }

    pub fn wht_table(mut self, year: i32, table: WhtTable) -> Result<Self, TableError> {
        table.validate()?;
        self.wht.insert(year, table);
        Ok(self)
    }

    pub fn anomaly_thresholds(
        mut self,
        year: i32,
        thresholds: AnomalyThresholds,
    ) -> Result<Self, TableError> {
        thresholds.validate()?;
        self.anomaly.insert(year, thresholds);
        Ok(self)
    }

    pub fn filing_calendar(mut self, calendar: FilingCalendar) -> Result<Self, TableError> {
        calendar.validate()?;
        self.calendar = Some(calendar);
        Ok(self)
    }

    /// Freezes the builder into an immutable registry.
    pub fn build(self) -> RuleTableRegistry {
        RuleTableRegistry {
            pit: self.pit,
            cit: self.cit,
            vat: self.vat,
            wht: self.wht,
            anomaly: self.anomaly,
            calendar: self.calendar,
        }
    }
}

/// Immutable, year-keyed rule tables. Safe for unlimited concurrent readers.
#[derive(Debug, Clone)]
pub struct RuleTableRegistry {
    pit: BTreeMap<i32, PitTable>,
    cit: BTreeMap<i32, CitTable>,
    vat: BTreeMap<i32, VatTable>,
    wht: BTreeMap<i32, WhtTable>,
    anomaly: BTreeMap<i32, AnomalyThresholds>,
    calendar: Option<FilingCalendar>,
}

impl RuleTableRegistry {
    pub fn pit(&self, year: i32) -> Result<&PitTable, RegistryError> {
        self.pit.get(&year).ok_or(RegistryError::UnknownTaxYear {
            tax_type: TaxType::Pit,
            year,
        })
    }

    pub fn cit(&self, year: i32) -> Result<&CitTable, RegistryError> {
        self.cit.get(&year).ok_or(RegistryError::UnknownTaxYear {
            tax_type: TaxType::Cit,
            year,
        })
    }

    pub fn vat(&self, year: i32) -> Result<&VatTable, RegistryError> {
        self.vat.get(&year).ok_or(RegistryError::UnknownTaxYear {
            tax_type: TaxType::Vat,
            year,
        })
    }

    pub fn wht(&self, year: i32) -> Result<&WhtTable, RegistryError> {
        self.wht.get(&year).ok_or(RegistryError::UnknownTaxYear {
            tax_type: TaxType::Wht,
            year,
        })
    }

    /// Anomaly thresholds are advisory configuration; a missing year degrades
    /// detection rather than failing a run, so this returns an `Option`.
    pub fn anomaly_thresholds(&self, year: i32) -> Option<&AnomalyThresholds> {
        self.anomaly.get(&year)
    }

    /// The statutory filing calendar, if one was configured.
    pub fn filing_calendar(&self) -> Option<&FilingCalendar> {
        self.calendar.as_ref()
    }

    /// Years with a registered table for the given tax type.
    pub fn registered_years(&self, tax_type: TaxType) -> Vec<i32> {
        match tax_type {
            TaxType::Pit => self.pit.keys().copied().collect(),
            TaxType::Cit | TaxType::DevelopmentLevy => self.cit.keys().copied().collect(),
            TaxType::Vat => self.vat.keys().copied().collect(),
            TaxType::Wht => self.wht.keys().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::rules::tables::TaxBand;

    fn pit_table() -> PitTable {
        PitTable {
            bands: vec![
                TaxBand {
                    upper_bound: Some(dec!(800000)),
                    rate: dec!(0),
                },
                TaxBand {
                    upper_bound: None,
                    rate: dec!(0.25),
                },
            ],
            minimum_wage_exemption: dec!(840000),
            rent_relief_rate: dec!(0.20),
            rent_relief_cap: dec!(500000),
        }
    }

    #[test]
    fn lookup_returns_registered_table() {
        let registry = RegistryBuilder::new()
            .pit_table(2026, pit_table())
            .unwrap()
            .build();

        let table = registry.pit(2026).unwrap();

        assert_eq!(table.bands.len(), 2);
    }

    #[test]
    fn lookup_for_unregistered_year_fails() {
        let registry = RegistryBuilder::new()
            .pit_table(2026, pit_table())
            .unwrap()
            .build();

        let err = registry.pit(2025).unwrap_err();

        assert_eq!(
            err,
            RegistryError::UnknownTaxYear {
                tax_type: TaxType::Pit,
                year: 2025,
            }
        );
    }

    #[test]
    fn no_fallback_between_tax_types() {
        let registry = RegistryBuilder::new()
            .pit_table(2026, pit_table())
            .unwrap()
            .build();

        assert!(registry.vat(2026).is_err());
        assert!(registry.cit(2026).is_err());
        assert!(registry.wht(2026).is_err());
    }

    #[test]
    fn invalid_table_is_rejected_at_registration() {
        let mut table = pit_table();
        table.bands.clear();

        let result = RegistryBuilder::new().pit_table(2026, table);

        assert_eq!(result.unwrap_err(), TableError::EmptyBracketTable);
    }

    #[test]
    fn missing_anomaly_thresholds_is_none_not_error() {
        let registry = RegistryBuilder::new().build();

        assert_eq!(registry.anomaly_thresholds(2026), None);
        assert!(registry.filing_calendar().is_none());
    }

    #[test]
    fn registered_years_reflect_inserted_tables() {
        let registry = RegistryBuilder::new()
            .vat_table(2025, VatTable { rate: dec!(0.075) })
            .unwrap()
            .vat_table(2026, VatTable { rate: dec!(0.075) })
            .unwrap()
            .build();

        assert_eq!(registry.registered_years(TaxType::Vat), vec![2025, 2026]);
    }
}
