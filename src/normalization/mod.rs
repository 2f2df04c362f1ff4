//! Opportunity normalization for mutation count data

mod opportunity;

pub use opportunity::{check_opportunity, normalize_opportunity, DataType, OpportunitySource};
