//! Exposure refitting against a fixed signature catalog
//!
//! Minimizes the penalized generalized KL objective of [`crate::model`] with
//! multiplicative updates. Each update is a majorization-minimization step,
//! so the objective trace is non-increasing and exposures never go negative.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::data::{MutationCounts, SignatureCatalog};
use crate::error::{MutSigError, Result};
use crate::model::{objective, penalty_weights, relative_change, update_exposures};
use crate::normalization::check_opportunity;

/// Configurable parameters for the refit solver
#[derive(Debug, Clone)]
pub struct RefitParams {
    /// Maximum number of multiplicative updates
    pub max_iter: usize,
    /// Relative objective change below which the fit is converged
    pub tol: f64,
}

impl Default for RefitParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-8,
        }
    }
}

impl RefitParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(MutSigError::invalid_parameter("max_iter must be at least 1"));
        }
        if !(self.tol >= 0.0) {
            return Err(MutSigError::invalid_parameter(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Output of a refit
#[derive(Debug, Clone)]
pub struct RefitResult {
    /// Estimated exposures (samples x signatures), in mutation counts
    pub exposures: Array2<f64>,
    /// Number of updates performed
    pub iterations: usize,
    /// Whether the tolerance was reached before the iteration budget ran out
    pub converged: bool,
    /// Final value of the penalized objective
    pub objective: f64,
    /// Objective before the first update and after every update
    pub objective_trace: Vec<f64>,
}

impl RefitResult {
    /// The exposure row when the input held exactly one sample
    pub fn single_sample(&self) -> Option<ArrayView1<'_, f64>> {
        if self.exposures.nrows() == 1 {
            Some(self.exposures.row(0))
        } else {
            None
        }
    }

    /// Mean exposure of each signature over all samples
    pub fn cohort_mean(&self) -> Array1<f64> {
        self.exposures
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.exposures.ncols()))
    }
}

/// Check the preconditions shared by refit, bootstrap and de novo
pub(crate) fn validate_inputs(
    counts: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    lambda: f64,
) -> Result<()> {
    if counts.nrows() == 0 || counts.ncols() == 0 {
        return Err(MutSigError::EmptyData {
            reason: format!("count matrix has shape {:?}", counts.dim()),
        });
    }

    if counts.iter().any(|&x| x < 0.0 || !x.is_finite()) {
        return Err(MutSigError::InvalidCountMatrix {
            reason: "Counts must be non-negative finite values".to_string(),
        });
    }

    if signatures.ncols() != counts.ncols() {
        return Err(MutSigError::DimensionMismatch {
            expected: format!("{} categories in signatures", counts.ncols()),
            got: format!("{} categories in signatures", signatures.ncols()),
        });
    }

    if signatures.nrows() == 0 {
        return Err(MutSigError::invalid_parameter("at least one signature is required"));
    }

    if signatures.iter().any(|&x| x < 0.0 || !x.is_finite()) {
        return Err(MutSigError::invalid_parameter(
            "signature entries must be non-negative finite values",
        ));
    }

    if let Some(k) = signatures
        .axis_iter(Axis(0))
        .position(|row| row.sum() <= 0.0)
    {
        return Err(MutSigError::invalid_parameter(format!(
            "signature {} sums to zero",
            k
        )));
    }

    check_opportunity(counts, opportunity)?;

    if !(lambda >= 0.0 && lambda.is_finite()) {
        return Err(MutSigError::invalid_parameter(format!(
            "lambda must be a non-negative finite number, got {}",
            lambda
        )));
    }

    Ok(())
}

/// Deterministic starting point: each sample's mutations split evenly
pub(crate) fn initial_exposures(counts: ArrayView2<f64>, n_signatures: usize) -> Array2<f64> {
    let totals = counts.sum_axis(Axis(1));
    let mut exposures = Array2::zeros((counts.nrows(), n_signatures));
    for (mut row, &total) in exposures.axis_iter_mut(Axis(0)).zip(totals.iter()) {
        row.fill(total / n_signatures as f64);
    }
    exposures
}

/// Estimate exposures of fixed signatures.
///
/// Returns exposures of shape `(rows(counts), rows(signatures))`.
pub fn refit(
    counts: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    lambda: f64,
    params: &RefitParams,
) -> Result<RefitResult> {
    validate_inputs(counts, signatures, opportunity, lambda)?;
    params.validate()?;

    let exposures = initial_exposures(counts, signatures.nrows());
    let result = fit_exposures(counts, signatures, opportunity, lambda, params, exposures);

    if !result.converged {
        log::warn!(
            "Refit did not converge within {} iterations (objective {:.6e}); returning best-effort exposures",
            params.max_iter,
            result.objective
        );
    }

    Ok(result)
}

/// Run multiplicative updates from the given exposures.
/// Inputs must already be validated.
pub(crate) fn fit_exposures(
    counts: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    lambda: f64,
    params: &RefitParams,
    mut exposures: Array2<f64>,
) -> RefitResult {
    let penalty = penalty_weights(counts, lambda);

    let mut previous = objective(
        counts,
        exposures.view(),
        signatures,
        opportunity,
        penalty.view(),
    );
    let mut trace = Vec::with_capacity(params.max_iter.min(4096) + 1);
    trace.push(previous);

    let mut converged = false;
    let mut iterations = 0;

    for iter in 1..=params.max_iter {
        update_exposures(
            counts,
            signatures,
            opportunity,
            penalty.view(),
            &mut exposures,
        );
        let current = objective(
            counts,
            exposures.view(),
            signatures,
            opportunity,
            penalty.view(),
        );
        trace.push(current);
        iterations = iter;

        let change = relative_change(previous, current);
        previous = current;
        if change < params.tol {
            converged = true;
            break;
        }
    }

    log::debug!(
        "Refit finished after {} iterations, objective {:.6e}, converged: {}",
        iterations,
        previous,
        converged
    );

    RefitResult {
        exposures,
        iterations,
        converged,
        objective: previous,
        objective_trace: trace,
    }
}

/// Refit a single sample given as a flat count vector
pub fn refit_sample(
    counts: ArrayView1<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView1<f64>,
    lambda: f64,
    params: &RefitParams,
) -> Result<Array1<f64>> {
    if opportunity.len() != counts.len() {
        return Err(MutSigError::ShapeMismatch {
            expected: format!("{} opportunity weights", counts.len()),
            got: format!("{} opportunity weights", opportunity.len()),
        });
    }
    let counts = counts.insert_axis(Axis(0));
    let opportunity = opportunity.insert_axis(Axis(0));
    let result = refit(counts, signatures, opportunity, lambda, params)?;
    Ok(result.exposures.row(0).to_owned())
}

/// Refit a labelled count matrix against a catalog
pub fn refit_counts(
    counts: &MutationCounts,
    catalog: &SignatureCatalog,
    opportunity: ArrayView2<f64>,
    lambda: f64,
    params: &RefitParams,
) -> Result<RefitResult> {
    warn_on_label_mismatch(counts.categories(), catalog.categories());
    log::info!(
        "Refitting {} signatures to {} samples (lambda = {})",
        catalog.n_signatures(),
        counts.n_samples(),
        lambda
    );
    refit(counts.counts(), catalog.signatures(), opportunity, lambda, params)
}

/// Category labels are informational; only their number is enforced
pub(crate) fn warn_on_label_mismatch(count_labels: &[String], signature_labels: &[String]) {
    if count_labels.len() == signature_labels.len() {
        let differing = count_labels
            .iter()
            .zip(signature_labels.iter())
            .filter(|(a, b)| a != b)
            .count();
        if differing > 0 {
            log::warn!(
                "{} category labels differ between counts and signatures; matching by column order",
                differing
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_signatures(n_categories: usize) -> Array2<f64> {
        let mut s = Array2::zeros((2, n_categories));
        s[[0, 0]] = 1.0;
        s[[1, 1]] = 1.0;
        s
    }

    #[test]
    fn test_single_category_scenario() {
        let mut counts = Array2::zeros((1, 6));
        counts[[0, 0]] = 10.0;
        let signatures = two_signatures(6);
        let opportunity = Array2::ones((1, 6));

        let result = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            0.0,
            &RefitParams::default(),
        )
        .unwrap();

        let e = result.single_sample().unwrap();
        assert!((e[0] - 10.0).abs() < 1e-6, "got {}", e[0]);
        assert!(e[1].abs() < 1e-6, "got {}", e[1]);
        assert!(result.converged);
    }

    #[test]
    fn test_opportunity_scales_exposure() {
        let counts = array![[10.0, 0.0]];
        let signatures = two_signatures(2);
        let fit = |opportunity: Array2<f64>| {
            refit(
                counts.view(),
                signatures.view(),
                opportunity.view(),
                0.0,
                &RefitParams::default(),
            )
            .unwrap()
            .exposures[[0, 0]]
        };

        let full = fit(array![[1.0, 1.0]]);
        let halved = fit(array![[0.5, 1.0]]);
        assert!((full - 10.0).abs() < 1e-6, "got {}", full);
        assert!((halved - 20.0).abs() < 1e-6, "got {}", halved);
    }

    #[test]
    fn test_shape_and_non_negativity() {
        let counts = array![
            [12.0, 3.0, 0.0, 5.0],
            [0.0, 8.0, 9.0, 1.0],
            [4.0, 4.0, 4.0, 4.0]
        ];
        let signatures = array![
            [0.7, 0.1, 0.1, 0.1],
            [0.1, 0.4, 0.4, 0.1],
            [0.25, 0.25, 0.25, 0.25]
        ];
        let opportunity = Array2::ones((3, 4));
        let result = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            1.0,
            &RefitParams::default(),
        )
        .unwrap();

        assert_eq!(result.exposures.dim(), (3, 3));
        assert!(result.exposures.iter().all(|&e| e >= 0.0));
        assert!(result.single_sample().is_none());
        assert_eq!(result.cohort_mean().len(), 3);
    }

    #[test]
    fn test_objective_non_increasing() {
        let counts = array![[30.0, 2.0, 7.0, 0.0, 11.0], [1.0, 0.0, 25.0, 14.0, 3.0]];
        let signatures = array![
            [0.5, 0.1, 0.1, 0.1, 0.2],
            [0.05, 0.05, 0.6, 0.2, 0.1],
            [0.2, 0.2, 0.2, 0.2, 0.2]
        ];
        let opportunity = array![[1.0, 0.8, 0.6, 0.9, 0.5], [1.0, 0.8, 0.6, 0.9, 0.5]];
        let params = RefitParams {
            max_iter: 200,
            tol: 0.0,
        };
        let result = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            5.0,
            &params,
        )
        .unwrap();

        assert_eq!(result.objective_trace.len(), 201);
        for pair in result.objective_trace.windows(2) {
            assert!(
                pair[1] <= pair[0] + 1e-9 * pair[0].abs().max(1.0),
                "objective increased: {} -> {}",
                pair[0],
                pair[1]
            );
        }
        assert!(!result.converged);
    }

    #[test]
    fn test_penalty_shrinks_exposures() {
        let counts = array![[20.0, 5.0, 5.0]];
        let signatures = array![[0.8, 0.1, 0.1], [0.1, 0.45, 0.45]];
        let opportunity = Array2::ones((1, 3));
        let free = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            0.0,
            &RefitParams::default(),
        )
        .unwrap();
        let penalized = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            15.0,
            &RefitParams::default(),
        )
        .unwrap();
        assert!(penalized.exposures.sum() < free.exposures.sum());
        assert!((free.exposures.sum() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_zero_sample_gets_zero_exposures() {
        let counts = array![[0.0, 0.0], [3.0, 1.0]];
        let signatures = array![[0.5, 0.5]];
        let opportunity = Array2::ones((2, 2));
        let result = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            0.0,
            &RefitParams::default(),
        )
        .unwrap();
        assert_eq!(result.exposures[[0, 0]], 0.0);
        assert!((result.exposures[[1, 0]] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_refit_sample_flat_vector() {
        let counts = array![0.0, 7.0, 0.0];
        let signatures = array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let opportunity = array![1.0, 1.0, 1.0];
        let e = refit_sample(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            0.0,
            &RefitParams::default(),
        )
        .unwrap();
        assert_eq!(e.len(), 2);
        assert!((e[1] - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_category_mismatch() {
        let counts = array![[1.0, 2.0, 3.0]];
        let signatures = array![[0.5, 0.5]];
        let opportunity = Array2::ones((1, 3));
        let result = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            0.0,
            &RefitParams::default(),
        );
        assert!(matches!(result, Err(MutSigError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_invalid_lambda_and_opportunity() {
        let counts = array![[1.0, 2.0]];
        let signatures = array![[0.5, 0.5]];
        let opportunity = Array2::ones((1, 2));
        let result = refit(
            counts.view(),
            signatures.view(),
            opportunity.view(),
            -1.0,
            &RefitParams::default(),
        );
        assert!(matches!(result, Err(MutSigError::InvalidParameter { .. })));

        let bad_opportunity = Array2::ones((2, 2));
        let result = refit(
            counts.view(),
            signatures.view(),
            bad_opportunity.view(),
            0.0,
            &RefitParams::default(),
        );
        assert!(matches!(result, Err(MutSigError::ShapeMismatch { .. })));
    }
}
