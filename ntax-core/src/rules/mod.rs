//! Versioned, year-keyed rule tables and their registry.

mod registry;
mod tables;

pub use registry::{RegistryBuilder, RegistryError, RuleTableRegistry};
pub use tables::{
    AnomalyThresholds, CitTable, DeadlineSchedule, FilingCalendar, FilingDeadline, PitTable,
    RecipientType, TableError, TaxBand, VatTable, WhtPaymentType, WhtTable,
};
