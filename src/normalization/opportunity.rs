//! Genomic opportunity weights
//!
//! The opportunity of a category is how often its trinucleotide context
//! could mutate in the sequenced territory. Weights are scaled by their
//! maximum so the largest opportunity is exactly one.

use ndarray::{Array1, Array2, ArrayView2};

use crate::error::{MutSigError, Result};

/// Source of opportunity weights
#[derive(Debug, Clone)]
pub enum OpportunitySource {
    /// One weight per category, shared by every sample
    PerCategory(Array1<f64>),
    /// One weight per sample and category; a single row is broadcast
    PerSample(Array2<f64>),
}

/// Sequencing strategy, which selects the default regularization strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    #[default]
    Exome,
    Genome,
}

impl DataType {
    /// Default lambda for this data type
    pub fn default_lambda(self) -> f64 {
        match self {
            DataType::Exome => 10.0,
            DataType::Genome => 10.0,
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = MutSigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exome" => Ok(DataType::Exome),
            "genome" => Ok(DataType::Genome),
            other => Err(MutSigError::invalid_parameter(format!(
                "Unknown data type '{}'. Use 'exome' or 'genome'.",
                other
            ))),
        }
    }
}

/// Build the opportunity matrix for a count matrix.
///
/// Without a source every weight is one. Otherwise the source is broadcast
/// to the shape of `counts` and divided by its maximum entry.
pub fn normalize_opportunity(
    counts: ArrayView2<f64>,
    source: Option<&OpportunitySource>,
) -> Result<Array2<f64>> {
    let shape = counts.dim();

    let source = match source {
        Some(source) => source,
        None => return Ok(Array2::ones(shape)),
    };

    let broadcast = match source {
        OpportunitySource::PerCategory(weights) => weights
            .broadcast(shape)
            .map(|view| view.to_owned())
            .ok_or_else(|| MutSigError::ShapeMismatch {
                expected: format!("{} opportunity weights", shape.1),
                got: format!("{} opportunity weights", weights.len()),
            })?,
        OpportunitySource::PerSample(matrix) => {
            if matrix.dim() == shape {
                matrix.clone()
            } else {
                matrix
                    .broadcast(shape)
                    .map(|view| view.to_owned())
                    .ok_or_else(|| MutSigError::ShapeMismatch {
                        expected: format!("opportunity of shape {:?}", shape),
                        got: format!("opportunity of shape {:?}", matrix.dim()),
                    })?
            }
        }
    };

    if broadcast.dim() != shape {
        return Err(MutSigError::ShapeMismatch {
            expected: format!("opportunity of shape {:?}", shape),
            got: format!("opportunity of shape {:?}", broadcast.dim()),
        });
    }

    if let Some(((i, j), &bad)) = broadcast
        .indexed_iter()
        .find(|&(_, &w)| !(w.is_finite() && w > 0.0))
    {
        return Err(MutSigError::invalid_parameter(format!(
            "Opportunity weights must be positive and finite; found {} at sample {}, category {}",
            bad, i, j
        )));
    }

    let max = broadcast.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    log::debug!("Scaling opportunity weights by maximum {:.6e}", max);

    Ok(broadcast.mapv(|w| w / max))
}

/// Check that an opportunity matrix conforms to a count matrix
pub fn check_opportunity(counts: ArrayView2<f64>, opportunity: ArrayView2<f64>) -> Result<()> {
    if counts.dim() != opportunity.dim() {
        return Err(MutSigError::ShapeMismatch {
            expected: format!("opportunity of shape {:?}", counts.dim()),
            got: format!("opportunity of shape {:?}", opportunity.dim()),
        });
    }
    if opportunity.iter().any(|&w| !(w.is_finite() && w > 0.0)) {
        return Err(MutSigError::invalid_parameter(
            "Opportunity weights must be positive and finite",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_default_is_ones() {
        let counts = Array2::<f64>::zeros((3, 4));
        let o = normalize_opportunity(counts.view(), None).unwrap();
        assert_eq!(o.dim(), (3, 4));
        assert!(o.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_per_category_broadcast_and_scaled() {
        let counts = Array2::<f64>::zeros((2, 3));
        let source = OpportunitySource::PerCategory(array![2.0, 4.0, 8.0]);
        let o = normalize_opportunity(counts.view(), Some(&source)).unwrap();
        assert_eq!(o, array![[0.25, 0.5, 1.0], [0.25, 0.5, 1.0]]);
    }

    #[test]
    fn test_single_row_matrix_broadcast() {
        let counts = Array2::<f64>::zeros((2, 2));
        let source = OpportunitySource::PerSample(array![[1.0, 2.0]]);
        let o = normalize_opportunity(counts.view(), Some(&source)).unwrap();
        assert_eq!(o, array![[0.5, 1.0], [0.5, 1.0]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let counts = Array2::<f64>::zeros((2, 3));
        let source = OpportunitySource::PerCategory(array![1.0, 2.0]);
        let result = normalize_opportunity(counts.view(), Some(&source));
        assert!(matches!(result, Err(MutSigError::ShapeMismatch { .. })));

        let source = OpportunitySource::PerSample(Array2::ones((3, 3)));
        let result = normalize_opportunity(counts.view(), Some(&source));
        assert!(matches!(result, Err(MutSigError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let counts = Array2::<f64>::zeros((1, 2));
        let source = OpportunitySource::PerCategory(array![0.0, 1.0]);
        let result = normalize_opportunity(counts.view(), Some(&source));
        assert!(matches!(result, Err(MutSigError::InvalidParameter { .. })));
    }

    #[test]
    fn test_data_type_parse() {
        assert_eq!("Genome".parse::<DataType>().unwrap(), DataType::Genome);
        assert!("panel".parse::<DataType>().is_err());
        assert_eq!(DataType::Exome.default_lambda(), 10.0);
    }
}
