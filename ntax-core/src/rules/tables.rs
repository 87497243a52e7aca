//! Versioned rule tables: brackets, flat rates, thresholds, and rate maps.
//!
//! Tables are plain data, validated on construction and registered per tax
//! year in the [`RuleTableRegistry`](super::RuleTableRegistry). Adding a
//! future year's rules means adding a new table, never patching an existing
//! one and never touching calculator code.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{TaxType, TaxpayerKind};

/// Errors from rule table validation. Invalid tables never enter a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("bracket table must contain at least one band")]
    EmptyBracketTable,

    #[error("band upper bounds must be strictly ascending, got {0}")]
    NonAscendingBand(Decimal),

    #[error("only the last band may be unbounded")]
    UnboundedBandNotLast,

    #[error("the last band must be unbounded")]
    MissingUnboundedBand,

    #[error("rate must be between 0 and 1, got {0}")]
    InvalidRate(Decimal),

    #[error("threshold must be non-negative, got {0}")]
    InvalidThreshold(Decimal),

    #[error("withholding rate table must contain at least one entry")]
    EmptyWithholdingTable,

    #[error("calendar day out of range, got {0}")]
    InvalidCalendarDay(u32),

    #[error("calendar month must be between 1 and 12, got {0}")]
    InvalidCalendarMonth(u32),
}

fn check_rate(rate: Decimal) -> Result<(), TableError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(TableError::InvalidRate(rate));
    }
    Ok(())
}

fn check_threshold(value: Decimal) -> Result<(), TableError> {
    if value < Decimal::ZERO {
        return Err(TableError::InvalidThreshold(value));
    }
    Ok(())
}

/// One marginal band of a progressive schedule. `upper_bound` is cumulative
/// taxable income; `None` marks the final, unbounded band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBand {
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

/// Personal income tax rule table for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitTable {
    /// Ordered marginal bands covering zero to unbounded.
    pub bands: Vec<TaxBand>,
    /// Annual gross income at or below which the taxpayer is fully exempt.
    pub minimum_wage_exemption: Decimal,
    /// Rent relief: this fraction of annual rent paid counts as a deduction.
    pub rent_relief_rate: Decimal,
    /// Upper cap on the rent relief amount.
    pub rent_relief_cap: Decimal,
}

impl PitTable {
    /// Validates band ordering, coverage, and rate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] if the band list is empty, upper bounds are not
    /// strictly ascending, an unbounded band appears before the end, the
    /// final band is bounded, or any rate or threshold is out of range.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.bands.is_empty() {
            return Err(TableError::EmptyBracketTable);
        }

        let mut prev_upper = Decimal::ZERO;
        for (i, band) in self.bands.iter().enumerate() {
            check_rate(band.rate)?;
            match band.upper_bound {
                Some(upper) => {
                    if i == self.bands.len() - 1 {
                        return Err(TableError::MissingUnboundedBand);
                    }
                    if upper <= prev_upper {
                        return Err(TableError::NonAscendingBand(upper));
                    }
                    prev_upper = upper;
                }
                None => {
                    if i != self.bands.len() - 1 {
                        return Err(TableError::UnboundedBandNotLast);
                    }
                }
            }
        }

        check_threshold(self.minimum_wage_exemption)?;
        check_rate(self.rent_relief_rate)?;
        check_threshold(self.rent_relief_cap)?;
        Ok(())
    }
}

/// Company income tax rule table for one year: a turnover threshold, two
/// flat rates, and the development levy applied to non-exempt companies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitTable {
    /// Turnover at or below which the company is exempt from CIT and levy.
    pub small_company_threshold: Decimal,
    /// Turnover above which the company is classified large.
    pub large_company_threshold: Decimal,
    /// Turnover at or above which the minimum effective rate applies.
    pub mne_turnover_threshold: Decimal,
    /// Rate for exempt (small) companies, documented as 0%.
    pub exempt_rate: Decimal,
    pub standard_rate: Decimal,
    pub development_levy_rate: Decimal,
    /// Floor on the combined effective rate for MNE-scale companies.
    pub minimum_effective_rate: Decimal,
}

impl CitTable {
    pub fn validate(&self) -> Result<(), TableError> {
        check_threshold(self.small_company_threshold)?;
        check_threshold(self.large_company_threshold)?;
        check_threshold(self.mne_turnover_threshold)?;
        check_rate(self.exempt_rate)?;
        check_rate(self.standard_rate)?;
        check_rate(self.development_levy_rate)?;
        check_rate(self.minimum_effective_rate)?;
        Ok(())
    }
}

/// Value added tax rule table for one year: a single flat rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatTable {
    pub rate: Decimal,
}

impl VatTable {
    pub fn validate(&self) -> Result<(), TableError> {
        check_rate(self.rate)
    }
}

/// Payment categories subject to withholding at source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WhtPaymentType {
    Dividend,
    Interest,
    Rent,
    Royalty,
    Commission,
    Consultancy,
    ProfessionalFees,
    TechnicalFees,
    ManagementFees,
    Construction,
    SupplyOfGoods,
    Contract,
    DirectorsFees,
}

impl WhtPaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dividend => "dividend",
            Self::Interest => "interest",
            Self::Rent => "rent",
            Self::Royalty => "royalty",
            Self::Commission => "commission",
            Self::Consultancy => "consultancy",
            Self::ProfessionalFees => "professional_fees",
            Self::TechnicalFees => "technical_fees",
            Self::ManagementFees => "management_fees",
            Self::Construction => "construction",
            Self::SupplyOfGoods => "supply_of_goods",
            Self::Contract => "contract",
            Self::DirectorsFees => "directors_fees",
        }
    }
}

/// Whether a withheld payment's recipient is an individual or a company.
/// Rates differ between the two for several payment types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Individual,
    Company,
}

impl RecipientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Company => "company",
        }
    }
}

/// Withholding tax rule table for one year: a rate per
/// (payment type, recipient type) pair. Pairs absent from the map have no
/// rate; the calculator fails loudly rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhtTable {
    pub rates: BTreeMap<(WhtPaymentType, RecipientType), Decimal>,
}

impl WhtTable {
    pub fn validate(&self) -> Result<(), TableError> {
        if self.rates.is_empty() {
            return Err(TableError::EmptyWithholdingTable);
        }
        for rate in self.rates.values() {
            check_rate(*rate)?;
        }
        Ok(())
    }

    pub fn rate(&self, payment: WhtPaymentType, recipient: RecipientType) -> Option<Decimal> {
        self.rates.get(&(payment, recipient)).copied()
    }
}

/// Heuristic thresholds for anomaly detection. Kept as rule-table data so
/// they can be revised without code changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// Declared deductions above this fraction of gross income flag audit
    /// risk.
    pub deduction_income_ratio_limit: Decimal,
    /// Expenses above this fraction of income flag audit attention.
    pub expense_income_ratio_limit: Decimal,
    /// A single transaction above this multiple of average monthly income is
    /// flagged unusual.
    pub large_transaction_multiplier: Decimal,
    /// Days before a deadline at which a warning flag is raised.
    pub deadline_warning_days: i64,
    /// Days before a deadline at which the flag escalates to critical.
    pub deadline_critical_days: i64,
}

impl AnomalyThresholds {
    pub fn validate(&self) -> Result<(), TableError> {
        check_threshold(self.deduction_income_ratio_limit)?;
        check_threshold(self.expense_income_ratio_limit)?;
        check_threshold(self.large_transaction_multiplier)?;
        if self.deadline_warning_days < 0 {
            return Err(TableError::InvalidThreshold(Decimal::from(
                self.deadline_warning_days,
            )));
        }
        if self.deadline_critical_days < 0 {
            return Err(TableError::InvalidThreshold(Decimal::from(
                self.deadline_critical_days,
            )));
        }
        Ok(())
    }
}

/// When a filing obligation recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineSchedule {
    /// Due once per tax year, on the given month and day of the following
    /// filing season.
    Annual { month: u32, day: u32 },
    /// Due on the given day of the month following each period.
    Monthly { day: u32 },
}

/// One statutory filing obligation, data-driven from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingDeadline {
    pub tax_type: TaxType,
    pub applies_to: Vec<TaxpayerKind>,
    pub schedule: DeadlineSchedule,
    pub description: String,
}

impl FilingDeadline {
    /// Next due date for this obligation, relative to `today`.
    ///
    /// Annual obligations for tax year `year` fall in `year + 1`'s filing
    /// season; monthly obligations fall in the month after `today`.
    pub fn due_date(&self, year: i32, today: NaiveDate) -> Option<NaiveDate> {
        match self.schedule {
            DeadlineSchedule::Annual { month, day } => {
                NaiveDate::from_ymd_opt(year + 1, month, day)
            }
            DeadlineSchedule::Monthly { day } => {
                use chrono::Datelike;
                let (y, m) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                NaiveDate::from_ymd_opt(y, m, day)
            }
        }
    }
}

/// The statutory calendar: every filing obligation the detector can infer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingCalendar {
    pub deadlines: Vec<FilingDeadline>,
}

impl FilingCalendar {
    pub fn validate(&self) -> Result<(), TableError> {
        for deadline in &self.deadlines {
            match deadline.schedule {
                DeadlineSchedule::Annual { month, day } => {
                    if !(1..=12).contains(&month) {
                        return Err(TableError::InvalidCalendarMonth(month));
                    }
                    // February caps at 28 so the deadline exists in every
                    // year.
                    let days_in_month = match month {
                        2 => 28,
                        4 | 6 | 9 | 11 => 30,
                        _ => 31,
                    };
                    if !(1..=days_in_month).contains(&day) {
                        return Err(TableError::InvalidCalendarDay(day));
                    }
                }
                // Monthly obligations must land in every month, so the day
                // stops at 28.
                DeadlineSchedule::Monthly { day } => {
                    if !(1..=28).contains(&day) {
                        return Err(TableError::InvalidCalendarDay(day));
                    }
                }
            }
        }
        Ok(())
    }

    /// Obligations applicable to the given taxpayer kind.
    pub fn applicable_to(&self, kind: TaxpayerKind) -> impl Iterator<Item = &FilingDeadline> {
        self.deadlines
            .iter()
            .filter(move |d| d.applies_to.contains(&kind))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn valid_pit_table() -> PitTable {
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
    fn valid_pit_table_passes_validation() {
        assert_eq!(valid_pit_table().validate(), Ok(()));
    }

    #[test]
    fn empty_band_list_is_rejected() {
        let table = PitTable {
            bands: vec![],
            ..valid_pit_table()
        };

        assert_eq!(table.validate(), Err(TableError::EmptyBracketTable));
    }

    #[test]
    fn non_ascending_bands_are_rejected() {
        let mut table = valid_pit_table();
        table.bands[1].upper_bound = Some(dec!(500000));

        assert_eq!(
            table.validate(),
            Err(TableError::NonAscendingBand(dec!(500000)))
        );
    }

    #[test]
    fn unbounded_band_in_the_middle_is_rejected() {
        let mut table = valid_pit_table();
        table.bands[1].upper_bound = None;

        assert_eq!(table.validate(), Err(TableError::UnboundedBandNotLast));
    }

    #[test]
    fn bounded_final_band_is_rejected() {
        let mut table = valid_pit_table();
        table.bands[2].upper_bound = Some(dec!(50000000));

        assert_eq!(table.validate(), Err(TableError::MissingUnboundedBand));
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let mut table = valid_pit_table();
        table.bands[1].rate = dec!(1.5);

        assert_eq!(table.validate(), Err(TableError::InvalidRate(dec!(1.5))));
    }

    #[test]
    fn wht_table_rejects_empty_map() {
        let table = WhtTable {
            rates: BTreeMap::new(),
        };

        assert_eq!(table.validate(), Err(TableError::EmptyWithholdingTable));
    }

    #[test]
    fn wht_rate_lookup_misses_unmapped_pair() {
        let mut rates = BTreeMap::new();
        rates.insert(
            (WhtPaymentType::Dividend, RecipientType::Company),
            dec!(0.10),
        );
        let table = WhtTable { rates };

        assert_eq!(
            table.rate(WhtPaymentType::Dividend, RecipientType::Company),
            Some(dec!(0.10))
        );
        assert_eq!(
            table.rate(WhtPaymentType::Royalty, RecipientType::Individual),
            None
        );
    }

    #[test]
    fn annual_deadline_falls_in_the_following_year() {
        let deadline = FilingDeadline {
            tax_type: TaxType::Pit,
            applies_to: vec![TaxpayerKind::Individual],
            schedule: DeadlineSchedule::Annual { month: 3, day: 31 },
            description: "Annual PIT return".into(),
        };

        let due = deadline.due_date(2026, NaiveDate::from_ymd_opt(2026, 11, 5).unwrap());

        assert_eq!(due, NaiveDate::from_ymd_opt(2027, 3, 31));
    }

    #[test]
    fn monthly_deadline_falls_in_the_next_month() {
        let deadline = FilingDeadline {
            tax_type: TaxType::Vat,
            applies_to: vec![TaxpayerKind::Business],
            schedule: DeadlineSchedule::Monthly { day: 21 },
            description: "Monthly VAT remittance".into(),
        };

        let due = deadline.due_date(2026, NaiveDate::from_ymd_opt(2026, 12, 10).unwrap());

        assert_eq!(due, NaiveDate::from_ymd_opt(2027, 1, 21));
    }

    #[test]
    fn calendar_rejects_day_past_28() {
        let calendar = FilingCalendar {
            deadlines: vec![FilingDeadline {
                tax_type: TaxType::Vat,
                applies_to: vec![TaxpayerKind::Business],
                schedule: DeadlineSchedule::Monthly { day: 31 },
                description: "bad".into(),
            }],
        };

        assert_eq!(calendar.validate(), Err(TableError::InvalidCalendarDay(31)));
    }

    fn annual_calendar(month: u32, day: u32) -> FilingCalendar {
        FilingCalendar {
            deadlines: vec![FilingDeadline {
                tax_type: TaxType::Pit,
                applies_to: vec![TaxpayerKind::Individual],
                schedule: DeadlineSchedule::Annual { month, day },
                description: "Annual PIT return".into(),
            }],
        }
    }

    #[test]
    fn calendar_rejects_annual_day_the_month_does_not_have() {
        assert_eq!(
            annual_calendar(2, 30).validate(),
            Err(TableError::InvalidCalendarDay(30))
        );
        assert_eq!(
            annual_calendar(4, 31).validate(),
            Err(TableError::InvalidCalendarDay(31))
        );
    }

    #[test]
    fn calendar_accepts_month_end_annual_deadlines() {
        assert_eq!(annual_calendar(3, 31).validate(), Ok(()));
        assert_eq!(annual_calendar(6, 30).validate(), Ok(()));
    }
}
