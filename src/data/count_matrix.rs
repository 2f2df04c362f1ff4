//! Mutation count matrix (samples x mutation-context categories)

use std::collections::HashMap;

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{MutSigError, Result};

/// Deduplicate names by appending _1, _2, etc. to repeated entries
pub(crate) fn deduplicate_names(names: Vec<String>, kind: &str) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for name in &names {
        *seen.entry(name.clone()).or_insert(0) += 1;
    }
    if !seen.values().any(|&c| c > 1) {
        return names;
    }
    seen.clear();
    let mut result = Vec::with_capacity(names.len());
    for name in names {
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            result.push(name);
        } else {
            let new_name = format!("{}_{}", name, *count - 1);
            log::warn!("Duplicate {} name '{}' renamed to '{}'", kind, name, new_name);
            result.push(new_name);
        }
    }
    result
}

/// Observed mutation counts.
/// Rows are samples, columns are mutation-context categories.
#[derive(Debug, Clone)]
pub struct MutationCounts {
    /// Count data (samples x categories)
    counts: Array2<f64>,
    /// Sample identifiers
    sample_ids: Vec<String>,
    /// Category labels, e.g. `A[C>A]A`
    categories: Vec<String>,
}

impl MutationCounts {
    /// Create a new count matrix, validating shape and values
    pub fn new(
        counts: Array2<f64>,
        sample_ids: Vec<String>,
        categories: Vec<String>,
    ) -> Result<Self> {
        let (n_samples, n_categories) = counts.dim();

        if n_samples == 0 || n_categories == 0 {
            return Err(MutSigError::EmptyData {
                reason: format!("count matrix has shape ({}, {})", n_samples, n_categories),
            });
        }

        if sample_ids.len() != n_samples {
            return Err(MutSigError::DimensionMismatch {
                expected: format!("{} sample IDs", n_samples),
                got: format!("{} sample IDs", sample_ids.len()),
            });
        }

        if categories.len() != n_categories {
            return Err(MutSigError::DimensionMismatch {
                expected: format!("{} category labels", n_categories),
                got: format!("{} category labels", categories.len()),
            });
        }

        if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(MutSigError::InvalidCountMatrix {
                reason: "Counts must be non-negative finite values".to_string(),
            });
        }

        if counts.iter().any(|&x| x != x.round()) {
            log::warn!(
                "Some count values are not integers; bootstrap resampling rounds sample totals"
            );
        }

        for (i, row) in counts.axis_iter(Axis(0)).enumerate() {
            if row.sum() == 0.0 {
                log::warn!("Sample '{}' has no mutations; its exposures will be zero", sample_ids[i]);
            }
        }

        let sample_ids = deduplicate_names(sample_ids, "sample");

        Ok(Self {
            counts,
            sample_ids,
            categories,
        })
    }

    /// Create from a bare matrix with generated sample ids and category labels
    pub fn from_array(counts: Array2<f64>) -> Result<Self> {
        let (n_samples, n_categories) = counts.dim();
        let sample_ids = (1..=n_samples).map(|i| format!("sample_{}", i)).collect();
        let categories = super::contexts::default_category_labels(n_categories);
        Self::new(counts, sample_ids, categories)
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.counts.nrows()
    }

    /// Number of mutation-context categories
    pub fn n_categories(&self) -> usize {
        self.counts.ncols()
    }

    /// True when the matrix holds exactly one sample
    pub fn is_single_sample(&self) -> bool {
        self.n_samples() == 1
    }

    /// Raw counts as a view
    pub fn counts(&self) -> ArrayView2<'_, f64> {
        self.counts.view()
    }

    /// Sample identifiers
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Category labels
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

}
