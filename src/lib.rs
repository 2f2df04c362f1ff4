//! rust_mutsig: mutational signature analysis in Rust
//!
//! Estimates how much each mutational process contributed to the somatic
//! mutations of tumor samples. Counts over mutation-context categories are
//! modelled as Poisson draws whose rates are exposures times signatures,
//! scaled by the genomic opportunity of each category.
//!
//! - `refit`: exposures to a known signature catalog
//! - `denovo`: signatures and exposures estimated jointly
//! - `bootstrap`: exposure means and standard deviations by resampling
//! - `similarity`: cosine similarity and one-to-one signature matching
//!
//! # Example
//!
//! ```ignore
//! use rust_mutsig::prelude::*;
//!
//! let counts = read_mutation_counts("counts.tsv")?;
//! let catalog = read_signature_catalog("COSMIC_v3.csv")?;
//! let opportunity = normalize_opportunity(counts.counts(), None)?;
//!
//! let (fit, summary) = refit_with_bootstrap(
//!     &counts,
//!     &catalog,
//!     opportunity.view(),
//!     DataType::Exome.default_lambda(),
//!     100,
//!     10000,
//! )?;
//! ```

pub mod bootstrap;
pub mod cli;
pub mod data;
pub mod denovo;
pub mod error;
pub mod io;
pub mod model;
pub mod normalization;
pub mod refit;
pub mod similarity;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bootstrap::{bootstrap, bootstrap_counts, bootstrap_with_params, BootstrapSummary};
    pub use crate::data::{denovo_signature_names, sbs96_contexts, MutationCounts, SignatureCatalog};
    pub use crate::denovo::{denovo, denovo_counts, denovo_with_params, DenovoParams, DenovoResult};
    pub use crate::error::{MutSigError, Result};
    pub use crate::io::{
        read_mutation_counts, read_opportunity, read_signature_catalog, write_bootstrap_summary,
        write_cohort_summary, write_exposures, write_matches_json, write_signatures,
        write_similarity, write_single_sample_exposures,
    };
    pub use crate::normalization::{normalize_opportunity, DataType, OpportunitySource};
    pub use crate::refit::{refit, refit_counts, refit_sample, RefitParams, RefitResult};
    pub use crate::similarity::{
        cosine_similarity_and_match, cosine_similarity_matrix, match_to_catalog, SimilarityReport,
    };
}

use ndarray::ArrayView2;
use prelude::*;

/// Refit a cohort and bootstrap the same fit with the default solver settings
pub fn refit_with_bootstrap(
    counts: &MutationCounts,
    catalog: &SignatureCatalog,
    opportunity: ArrayView2<f64>,
    lambda: f64,
    n_bootstraps: usize,
    seed: u64,
) -> Result<(RefitResult, BootstrapSummary)> {
    let params = RefitParams::default();
    let fit = refit_counts(counts, catalog, opportunity, lambda, &params)?;
    let summary = bootstrap_counts(
        counts,
        catalog,
        opportunity,
        n_bootstraps,
        lambda,
        &params,
        seed,
    )?;
    Ok((fit, summary))
}
