use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ntax_core::models::TaxType;
use ntax_data::RulePackLoader;

/// Load and validate a tax rule pack from a directory of CSV files.
///
/// The directory should contain:
/// - pit_bands.csv: year, upper_bound (empty for unbounded), rate
/// - tax_params.csv: year, name, value (namespaced pit./cit./vat./anomaly.)
/// - wht_rates.csv: year, payment_type, recipient_type, rate
/// - filing_calendar.csv (optional): tax_type, applies_to, schedule, month, day, description
#[derive(Parser, Debug)]
#[command(name = "ntax-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory containing the rule pack CSV files
    #[arg(short, long, default_value = "ntax-data/data")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    println!("Loading rule pack from: {}", args.dir.display());

    let registry = RulePackLoader::load_dir(&args.dir)
        .with_context(|| format!("Failed to load rule pack from: {}", args.dir.display()))?;

    for tax_type in [TaxType::Pit, TaxType::Cit, TaxType::Vat, TaxType::Wht] {
        let years = registry.registered_years(tax_type);
        println!("{}: {} year(s) registered {:?}", tax_type.as_str(), years.len(), years);
    }
    match registry.filing_calendar() {
        Some(calendar) => println!("filing calendar: {} deadline(s)", calendar.deadlines.len()),
        None => println!("filing calendar: none"),
    }

    println!("Rule pack is valid.");

    Ok(())
}
