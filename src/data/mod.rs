//! Data structures for mutation counts and signature catalogs

pub mod contexts;
mod count_matrix;
mod signatures;

pub use contexts::{default_category_labels, denovo_signature_names, sbs96_contexts, N_SBS96};
pub use count_matrix::MutationCounts;
pub use signatures::SignatureCatalog;
