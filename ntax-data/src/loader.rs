use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use ntax_core::models::{TaxType, TaxpayerKind};
use ntax_core::rules::{
    AnomalyThresholds, CitTable, DeadlineSchedule, FilingCalendar, FilingDeadline, PitTable,
    RecipientType, RegistryBuilder, RuleTableRegistry, TableError, TaxBand, VatTable,
    WhtPaymentType, WhtTable,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a rule pack.
#[derive(Debug, Error)]
pub enum RulePackError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parameter '{name}' missing for year {year}")]
    MissingParameter { year: i32, name: &'static str },

    #[error("parameter '{name}' for year {year} is not usable as an integer")]
    InvalidParameter { year: i32, name: &'static str },

    #[error("unknown withholding payment type '{0}'")]
    UnknownPaymentType(String),

    #[error("unknown recipient type '{0}'")]
    UnknownRecipientType(String),

    #[error("unknown tax type '{0}'")]
    UnknownTaxType(String),

    #[error("unknown taxpayer kind '{0}'")]
    UnknownTaxpayerKind(String),

    #[error("unknown schedule '{0}' (expected 'annual' or 'monthly')")]
    UnknownSchedule(String),

    #[error("annual deadline '{0}' has no month")]
    MissingMonth(String),

    #[error("invalid rule table: {0}")]
    Table(#[from] TableError),
}

impl From<csv::Error> for RulePackError {
    fn from(err: csv::Error) -> Self {
        RulePackError::CsvParse(err.to_string())
    }
}

/// A single record from the PIT bands CSV file.
///
/// - `year`: the tax year the band belongs to
/// - `upper_bound`: cumulative upper bound of the band (empty for the final,
///   unbounded band)
/// - `rate`: the marginal rate as a decimal (e.g., 0.15 for 15%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PitBandRecord {
    pub year: i32,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub upper_bound: Option<Decimal>,
    pub rate: Decimal,
}

/// A single record from the scalar parameters CSV file: one named value per
/// (year, name) pair. Names are namespaced (`pit.`, `cit.`, `vat.`,
/// `anomaly.`).
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParamRecord {
    pub year: i32,
    pub name: String,
    pub value: Decimal,
}

/// A single record from the withholding rates CSV file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WhtRateRecord {
    pub year: i32,
    pub payment_type: String,
    pub recipient_type: String,
    pub rate: Decimal,
}

/// A single record from the filing calendar CSV file.
///
/// - `applies_to`: semicolon-separated taxpayer kinds
/// - `schedule`: `annual` (month required) or `monthly`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CalendarRecord {
    pub tax_type: String,
    pub applies_to: String,
    pub schedule: String,
    #[serde(deserialize_with = "deserialize_optional_u32")]
    pub month: Option<u32>,
    pub day: u32,
    pub description: String,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_optional_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn payment_type_from_code(code: &str) -> Result<WhtPaymentType, RulePackError> {
    match code {
        "dividend" => Ok(WhtPaymentType::Dividend),
        "interest" => Ok(WhtPaymentType::Interest),
        "rent" => Ok(WhtPaymentType::Rent),
        "royalty" => Ok(WhtPaymentType::Royalty),
        "commission" => Ok(WhtPaymentType::Commission),
        "consultancy" => Ok(WhtPaymentType::Consultancy),
        "professional_fees" => Ok(WhtPaymentType::ProfessionalFees),
        "technical_fees" => Ok(WhtPaymentType::TechnicalFees),
        "management_fees" => Ok(WhtPaymentType::ManagementFees),
        "construction" => Ok(WhtPaymentType::Construction),
        "supply_of_goods" => Ok(WhtPaymentType::SupplyOfGoods),
        "contract" => Ok(WhtPaymentType::Contract),
        "directors_fees" => Ok(WhtPaymentType::DirectorsFees),
        other => Err(RulePackError::UnknownPaymentType(other.to_string())),
    }
}

fn recipient_type_from_code(code: &str) -> Result<RecipientType, RulePackError> {
    match code {
        "individual" => Ok(RecipientType::Individual),
        "company" => Ok(RecipientType::Company),
        other => Err(RulePackError::UnknownRecipientType(other.to_string())),
    }
}

fn tax_type_from_code(code: &str) -> Result<TaxType, RulePackError> {
    match code {
        "pit" => Ok(TaxType::Pit),
        "cit" => Ok(TaxType::Cit),
        "vat" => Ok(TaxType::Vat),
        "wht" => Ok(TaxType::Wht),
        "development_levy" => Ok(TaxType::DevelopmentLevy),
        other => Err(RulePackError::UnknownTaxType(other.to_string())),
    }
}

fn taxpayer_kind_from_code(code: &str) -> Result<TaxpayerKind, RulePackError> {
    match code {
        "individual" => Ok(TaxpayerKind::Individual),
        "freelancer" => Ok(TaxpayerKind::Freelancer),
        "business" => Ok(TaxpayerKind::Business),
        other => Err(RulePackError::UnknownTaxpayerKind(other.to_string())),
    }
}

/// Scalar parameters indexed by (year, name).
type Params = BTreeMap<(i32, String), Decimal>;

fn param(params: &Params, year: i32, name: &'static str) -> Result<Decimal, RulePackError> {
    params
        .get(&(year, name.to_string()))
        .copied()
        .ok_or(RulePackError::MissingParameter { year, name })
}

fn param_days(params: &Params, year: i32, name: &'static str) -> Result<i64, RulePackError> {
    param(params, year, name)?
        .to_i64()
        .ok_or(RulePackError::InvalidParameter { year, name })
}

/// Loader for rule pack data from CSV files.
///
/// The pack is four files: `pit_bands.csv`, `tax_params.csv`,
/// `wht_rates.csv`, and `filing_calendar.csv`. Each `parse_*` method reads
/// one of them from any `Read`; [`RulePackLoader::build_registry`] assembles
/// the validated [`RuleTableRegistry`], and [`RulePackLoader::load_dir`] does
/// the whole thing from a directory.
pub struct RulePackLoader;

impl RulePackLoader {
    pub fn parse_pit_bands<R: Read>(reader: R) -> Result<Vec<PitBandRecord>, RulePackError> {
        Self::parse(reader)
    }

    pub fn parse_params<R: Read>(reader: R) -> Result<Vec<ParamRecord>, RulePackError> {
        Self::parse(reader)
    }

    pub fn parse_wht_rates<R: Read>(reader: R) -> Result<Vec<WhtRateRecord>, RulePackError> {
        Self::parse(reader)
    }

    pub fn parse_calendar<R: Read>(reader: R) -> Result<Vec<CalendarRecord>, RulePackError> {
        Self::parse(reader)
    }

    fn parse<R: Read, T: serde::de::DeserializeOwned>(
        reader: R,
    ) -> Result<Vec<T>, RulePackError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();
        for result in csv_reader.deserialize() {
            records.push(result?);
        }
        Ok(records)
    }

    /// Assembles a registry from parsed records. Every table is validated on
    /// insertion; a year gets a table of a given kind only when the pack
    /// carries that kind's data for the year.
    pub fn build_registry(
        bands: &[PitBandRecord],
        params: &[ParamRecord],
        wht_rates: &[WhtRateRecord],
        calendar: &[CalendarRecord],
    ) -> Result<RuleTableRegistry, RulePackError> {
        let params: Params = params
            .iter()
            .map(|p| ((p.year, p.name.clone()), p.value))
            .collect();

        let mut builder = RegistryBuilder::new();

        // PIT: band rows grouped per year, scalar reliefs from the params.
        let mut bands_by_year: BTreeMap<i32, Vec<TaxBand>> = BTreeMap::new();
        for record in bands {
            bands_by_year.entry(record.year).or_default().push(TaxBand {
                upper_bound: record.upper_bound,
                rate: record.rate,
            });
        }
        for (year, year_bands) in bands_by_year {
            builder = builder.pit_table(
                year,
                PitTable {
                    bands: year_bands,
                    minimum_wage_exemption: param(&params, year, "pit.minimum_wage_exemption")?,
                    rent_relief_rate: param(&params, year, "pit.rent_relief_rate")?,
                    rent_relief_cap: param(&params, year, "pit.rent_relief_cap")?,
                },
            )?;
        }

        // CIT, VAT, and anomaly thresholds are pure scalars; a year opts in
        // by carrying the group's first parameter.
        let years: std::collections::BTreeSet<i32> =
            params.keys().map(|(year, _)| *year).collect();
        for year in years {
            if params.contains_key(&(year, "cit.standard_rate".to_string())) {
                builder = builder.cit_table(
                    year,
                    CitTable {
                        small_company_threshold: param(
                            &params,
                            year,
                            "cit.small_company_threshold",
                        )?,
                        large_company_threshold: param(
                            &params,
                            year,
                            "cit.large_company_threshold",
                        )?,
                        mne_turnover_threshold: param(&params, year, "cit.mne_turnover_threshold")?,
                        exempt_rate: param(&params, year, "cit.exempt_rate")?,
                        standard_rate: param(&params, year, "cit.standard_rate")?,
                        development_levy_rate: param(&params, year, "cit.development_levy_rate")?,
                        minimum_effective_rate: param(
                            &params,
                            year,
                            "cit.minimum_effective_rate",
                        )?,
                    },
                )?;
            }

            if let Some(rate) = params.get(&(year, "vat.rate".to_string())) {
                builder = builder.vat_table(year, VatTable { rate: *rate })?;
            }

            if params.contains_key(&(year, "anomaly.large_transaction_multiplier".to_string())) {
                builder = builder.anomaly_thresholds(
                    year,
                    AnomalyThresholds {
                        deduction_income_ratio_limit: param(
                            &params,
                            year,
                            "anomaly.deduction_income_ratio_limit",
                        )?,
                        expense_income_ratio_limit: param(
                            &params,
                            year,
                            "anomaly.expense_income_ratio_limit",
                        )?,
                        large_transaction_multiplier: param(
                            &params,
                            year,
                            "anomaly.large_transaction_multiplier",
                        )?,
                        deadline_warning_days: param_days(
                            &params,
                            year,
                            "anomaly.deadline_warning_days",
                        )?,
                        deadline_critical_days: param_days(
                            &params,
                            year,
                            "anomaly.deadline_critical_days",
                        )?,
                    },
                )?;
            }
        }

        let mut wht_by_year: BTreeMap<i32, WhtTable> = BTreeMap::new();
        for record in wht_rates {
            let payment_type = payment_type_from_code(&record.payment_type)?;
            let recipient_type = recipient_type_from_code(&record.recipient_type)?;
            wht_by_year
                .entry(record.year)
                .or_insert_with(|| WhtTable {
                    rates: BTreeMap::new(),
                })
                .rates
                .insert((payment_type, recipient_type), record.rate);
        }
        for (year, table) in wht_by_year {
            builder = builder.wht_table(year, table)?;
        }

        if !calendar.is_empty() {
            let mut deadlines = Vec::with_capacity(calendar.len());
            for record in calendar {
                let applies_to = record
                    .applies_to
                    .split(';')
                    .map(|kind| taxpayer_kind_from_code(kind.trim()))
                    .collect::<Result<Vec<_>, _>>()?;
                let schedule = match record.schedule.as_str() {
                    "annual" => DeadlineSchedule::Annual {
                        month: record.month.ok_or_else(|| {
                            RulePackError::MissingMonth(record.description.clone())
                        })?,
                        day: record.day,
                    },
                    "monthly" => DeadlineSchedule::Monthly { day: record.day },
                    other => return Err(RulePackError::UnknownSchedule(other.to_string())),
                };
                deadlines.push(FilingDeadline {
                    tax_type: tax_type_from_code(&record.tax_type)?,
                    applies_to,
                    schedule,
                    description: record.description.clone(),
                });
            }
            builder = builder.filing_calendar(FilingCalendar { deadlines })?;
        }

        Ok(builder.build())
    }

    /// Loads a full rule pack from a directory. The calendar file is
    /// optional; the other three are required.
    pub fn load_dir(dir: &Path) -> Result<RuleTableRegistry, RulePackError> {
        let bands = Self::parse_pit_bands(open(dir, "pit_bands.csv")?)?;
        let params = Self::parse_params(open(dir, "tax_params.csv")?)?;
        let wht_rates = Self::parse_wht_rates(open(dir, "wht_rates.csv")?)?;

        let calendar_path = dir.join("filing_calendar.csv");
        let calendar = if calendar_path.exists() {
            Self::parse_calendar(open(dir, "filing_calendar.csv")?)?
        } else {
            Vec::new()
        };

        Self::build_registry(&bands, &params, &wht_rates, &calendar)
    }
}

fn open(dir: &Path, file: &str) -> Result<std::fs::File, RulePackError> {
    let path = dir.join(file);
    std::fs::File::open(&path).map_err(|source| RulePackError::Io {
        path: path.display().to_string(),
        source,
    })
}
