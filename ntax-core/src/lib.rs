pub mod anomaly;
pub mod calculations;
pub mod classifier;
pub mod currency;
pub mod engine;
pub mod models;
pub mod rules;
pub mod scenario;

pub use engine::{Assessment, EngineError, StoreError, TaxEngine, TaxStore};
pub use models::*;
pub use rules::{RegistryBuilder, RegistryError, RuleTableRegistry};
