//! Reference signature catalog (signatures x mutation-context categories)

use ndarray::{Array2, ArrayView2, Axis};

use super::count_matrix::deduplicate_names;
use crate::error::{MutSigError, Result};

/// Tolerance on row sums before a catalog row is renormalized with a warning
const ROW_SUM_TOLERANCE: f64 = 1e-3;

/// A catalog of mutational signatures.
/// Each row is a probability distribution over the categories.
#[derive(Debug, Clone)]
pub struct SignatureCatalog {
    /// Signature profiles (signatures x categories), rows sum to one
    signatures: Array2<f64>,
    /// Signature names, e.g. `SBS1`
    names: Vec<String>,
    /// Category labels
    categories: Vec<String>,
}

impl SignatureCatalog {
    /// Create a catalog, renormalizing rows so that each sums to one
    pub fn new(
        mut signatures: Array2<f64>,
        names: Vec<String>,
        categories: Vec<String>,
    ) -> Result<Self> {
        let (n_signatures, n_categories) = signatures.dim();

        if n_signatures == 0 || n_categories == 0 {
            return Err(MutSigError::EmptyData {
                reason: format!("signature matrix has shape ({}, {})", n_signatures, n_categories),
            });
        }

        if names.len() != n_signatures {
            return Err(MutSigError::DimensionMismatch {
                expected: format!("{} signature names", n_signatures),
                got: format!("{} signature names", names.len()),
            });
        }

        if categories.len() != n_categories {
            return Err(MutSigError::DimensionMismatch {
                expected: format!("{} category labels", n_categories),
                got: format!("{} category labels", categories.len()),
            });
        }

        if signatures.iter().any(|&x| x < 0.0 || !x.is_finite()) {
            return Err(MutSigError::InvalidSignatures {
                reason: "Signature entries must be non-negative finite values".to_string(),
            });
        }

        for (k, mut row) in signatures.axis_iter_mut(Axis(0)).enumerate() {
            let sum = row.sum();
            if sum <= 0.0 {
                return Err(MutSigError::InvalidParameter {
                    reason: format!("Signature '{}' sums to zero", names[k]),
                });
            }
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                log::warn!(
                    "Signature '{}' sums to {:.4}; renormalizing to 1",
                    names[k],
                    sum
                );
            }
            row.mapv_inplace(|x| x / sum);
        }

        let names = deduplicate_names(names, "signature");

        Ok(Self {
            signatures,
            names,
            categories,
        })
    }

    /// Create from a bare matrix with generated names and labels
    pub fn from_array(signatures: Array2<f64>) -> Result<Self> {
        let (n_signatures, n_categories) = signatures.dim();
        let names = (1..=n_signatures).map(|k| format!("Signature {}", k)).collect();
        let categories = super::contexts::default_category_labels(n_categories);
        Self::new(signatures, names, categories)
    }

    /// Number of signatures
    pub fn n_signatures(&self) -> usize {
        self.signatures.nrows()
    }

    /// Number of categories
    pub fn n_categories(&self) -> usize {
        self.signatures.ncols()
    }

    /// Signature matrix as a view
    pub fn signatures(&self) -> ArrayView2<'_, f64> {
        self.signatures.view()
    }

    /// Signature names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Category labels
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rows_renormalized() {
        let catalog = SignatureCatalog::from_array(array![[2.0, 2.0], [0.1, 0.9]]).unwrap();
        assert!((catalog.signatures()[[0, 0]] - 0.5).abs() < 1e-12);
        for row in catalog.signatures().axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_row_rejected() {
        let result = SignatureCatalog::from_array(array![[0.0, 0.0], [0.5, 0.5]]);
        assert!(matches!(result, Err(MutSigError::InvalidParameter { .. })));
    }
}
