//! Tax calculators: one per statutory tax type, sharing the breakdown-line
//! contract that a result's liability equals the exact sum of its line
//! amounts.

pub mod cit;
pub mod common;
pub mod pit;
pub mod vat;
pub mod wht;

pub use cit::{CitCalculator, CitError, CitInput, CitResult};
pub use pit::{DeductionDetail, PitCalculator, PitError, PitInput, PitResult};
pub use vat::{VatCalculator, VatResult};
pub use wht::{WhtCalculator, WhtError, WhtPayment, WhtResult};

// Re-exported so calculator callers name the rule enums from one place.
pub use crate::rules::{RecipientType, WhtPaymentType};
