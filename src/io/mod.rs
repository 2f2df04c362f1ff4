//! Input/Output for count matrices, signature catalogs and result tables

mod csv;
mod results;

pub use self::csv::{
    read_mutation_counts, read_opportunity, read_signature_catalog, write_exposures,
    write_signatures, write_similarity,
};
pub use results::{
    write_bootstrap_summary, write_cohort_summary, write_matches_json,
    write_single_sample_exposures,
};
