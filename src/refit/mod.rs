//! Refitting known signatures to observed mutation counts

mod solver;

pub use solver::{refit, refit_counts, refit_sample, RefitParams, RefitResult};
pub(crate) use solver::{fit_exposures, initial_exposures, validate_inputs, warn_on_label_mismatch};
