pub mod loader;

pub use loader::{
    CalendarRecord, ParamRecord, PitBandRecord, RulePackError, RulePackLoader, WhtRateRecord,
};
