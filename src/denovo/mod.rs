//! De novo extraction of signatures and exposures
//!
//! Alternates an EM step (multiplicative exposure updates with signatures
//! fixed) and an M-step of projected gradient descent on the signatures
//! with exposures fixed. Both iteration counts are fixed budgets: the outer
//! loop always runs `em_steps` times unless an explicit tolerance is set,
//! which keeps results reproducible for a given generator state.

mod gradient;

use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::data::MutationCounts;
use crate::error::{MutSigError, Result};
use crate::model::{normalize_rows, objective, penalty_weights, poisson_log_likelihood, relative_change};
use crate::normalization::check_opportunity;
use crate::refit::{fit_exposures, initial_exposures, RefitParams};

use gradient::descend_signatures;

/// Configurable parameters for de novo extraction
#[derive(Debug, Clone)]
pub struct DenovoParams {
    /// Number of signatures to extract
    pub n_signatures: usize,
    /// Regularization strength on exposures
    pub lambda: f64,
    /// Outer EM iterations
    pub em_steps: usize,
    /// Gradient steps on the signatures per EM iteration
    pub gd_steps: usize,
    /// Multiplicative exposure updates per E-step
    pub e_step_iterations: usize,
    /// Initial step size of the signature line search
    pub learning_rate: f64,
    /// Opt-in early stop on relative objective change between EM iterations
    pub tol: Option<f64>,
}

impl Default for DenovoParams {
    fn default() -> Self {
        Self {
            n_signatures: 1,
            lambda: 0.0,
            em_steps: 2,
            gd_steps: 50,
            e_step_iterations: 200,
            learning_rate: 1.0,
            tol: None,
        }
    }
}

impl DenovoParams {
    /// Parameters with the default iteration budget
    pub fn new(n_signatures: usize, lambda: f64) -> Self {
        Self {
            n_signatures,
            lambda,
            ..Default::default()
        }
    }

    fn validate(&self, n_categories: usize) -> Result<()> {
        if self.n_signatures == 0 || self.n_signatures > n_categories {
            return Err(MutSigError::invalid_parameter(format!(
                "n_signatures must be between 1 and the number of categories ({}), got {}",
                n_categories, self.n_signatures
            )));
        }
        if self.em_steps == 0 {
            return Err(MutSigError::invalid_parameter("em_steps must be at least 1"));
        }
        if self.gd_steps == 0 {
            return Err(MutSigError::invalid_parameter("gd_steps must be at least 1"));
        }
        if self.e_step_iterations == 0 {
            return Err(MutSigError::invalid_parameter(
                "e_step_iterations must be at least 1",
            ));
        }
        if !(self.lambda >= 0.0 && self.lambda.is_finite()) {
            return Err(MutSigError::invalid_parameter(format!(
                "lambda must be a non-negative finite number, got {}",
                self.lambda
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(MutSigError::invalid_parameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(tol) = self.tol {
            if !(tol >= 0.0) {
                return Err(MutSigError::invalid_parameter(format!(
                    "tol must be non-negative, got {}",
                    tol
                )));
            }
        }
        Ok(())
    }
}

/// Output of de novo extraction
#[derive(Debug, Clone)]
pub struct DenovoResult {
    /// Exposures (samples x signatures)
    pub exposures: Array2<f64>,
    /// Signatures (signatures x categories), rows sum to one
    pub signatures: Array2<f64>,
    /// Objective after each EM iteration
    pub objective_trace: Vec<f64>,
    /// Poisson log-likelihood of the final fit
    pub log_likelihood: f64,
    /// Number of EM iterations performed
    pub em_iterations: usize,
}

/// Jointly estimate signatures and exposures.
///
/// `rng` seeds the initial signature matrix; pass a seeded generator for
/// reproducible runs.
pub fn denovo<R: Rng + ?Sized>(
    counts: ArrayView2<f64>,
    n_signatures: usize,
    lambda: f64,
    opportunity: ArrayView2<f64>,
    em_steps: usize,
    gd_steps: usize,
    rng: &mut R,
) -> Result<DenovoResult> {
    let params = DenovoParams {
        n_signatures,
        lambda,
        em_steps,
        gd_steps,
        ..Default::default()
    };
    denovo_with_params(counts, opportunity, &params, rng)
}

/// Jointly estimate signatures and exposures with full parameter control
pub fn denovo_with_params<R: Rng + ?Sized>(
    counts: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    params: &DenovoParams,
    rng: &mut R,
) -> Result<DenovoResult> {
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
    params.validate(counts.ncols())?;
    check_opportunity(counts, opportunity)?;

    let k = params.n_signatures;
    let lambda = params.lambda;
    let penalty = penalty_weights(counts, lambda);
    let e_step = RefitParams {
        max_iter: params.e_step_iterations,
        tol: 1e-8,
    };

    let mut signatures = Array2::from_shape_fn((k, counts.ncols()), |_| rng.random::<f64>());
    normalize_rows(&mut signatures);
    let mut exposures = initial_exposures(counts, k);

    let mut trace = Vec::with_capacity(params.em_steps);
    let mut previous: Option<f64> = None;
    let mut em_iterations = 0;

    for step in 1..=params.em_steps {
        let fit = fit_exposures(
            counts,
            signatures.view(),
            opportunity,
            lambda,
            &e_step,
            exposures,
        );
        exposures = fit.exposures;

        let accepted = descend_signatures(
            counts,
            exposures.view(),
            opportunity,
            penalty.view(),
            &mut signatures,
            params.gd_steps,
            params.learning_rate,
        );

        let current = objective(
            counts,
            exposures.view(),
            signatures.view(),
            opportunity,
            penalty.view(),
        );
        trace.push(current);
        em_iterations = step;

        log::debug!(
            "EM step {}/{}: objective {:.6e}, {} exposure updates, {} of {} gradient steps accepted",
            step,
            params.em_steps,
            current,
            fit.iterations,
            accepted,
            params.gd_steps
        );

        if let (Some(tol), Some(prev)) = (params.tol, previous) {
            if relative_change(prev, current) < tol {
                log::info!("De novo extraction converged after {} EM steps", step);
                break;
            }
        }
        previous = Some(current);
    }

    let log_likelihood =
        poisson_log_likelihood(counts, exposures.view(), signatures.view(), opportunity);

    Ok(DenovoResult {
        exposures,
        signatures,
        objective_trace: trace,
        log_likelihood,
        em_iterations,
    })
}

/// De novo extraction on a labelled count matrix
pub fn denovo_counts<R: Rng + ?Sized>(
    counts: &MutationCounts,
    opportunity: ArrayView2<f64>,
    params: &DenovoParams,
    rng: &mut R,
) -> Result<DenovoResult> {
    log::info!(
        "Extracting {} signatures from {} samples x {} categories ({} EM steps, {} gradient steps, lambda = {})",
        params.n_signatures,
        counts.n_samples(),
        counts.n_categories(),
        params.em_steps,
        params.gd_steps,
        params.lambda
    );
    denovo_with_params(counts.counts(), opportunity, params, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity_and_match;
    use ndarray::{array, Axis};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Counts generated exactly from two disjoint signatures
    fn synthetic_counts() -> (Array2<f64>, Array2<f64>) {
        let truth = array![
            [0.5, 0.3, 0.2, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.1, 0.3, 0.6]
        ];
        let mut exposures = Array2::zeros((12, 2));
        for i in 0..12 {
            exposures[[i, 0]] = 20.0 + 15.0 * i as f64;
            exposures[[i, 1]] = 200.0 - 14.0 * i as f64;
        }
        (exposures.dot(&truth).mapv(f64::round), truth)
    }

    #[test]
    fn test_output_constraints() {
        let (counts, _) = synthetic_counts();
        let opportunity = Array2::ones(counts.raw_dim());
        let mut rng = StdRng::seed_from_u64(7);
        let result = denovo(counts.view(), 3, 1.0, opportunity.view(), 3, 10, &mut rng).unwrap();

        assert_eq!(result.exposures.dim(), (12, 3));
        assert_eq!(result.signatures.dim(), (3, 6));
        assert!(result.exposures.iter().all(|&e| e >= 0.0));
        assert!(result.signatures.iter().all(|&s| s >= 0.0));
        for row in result.signatures.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert_eq!(result.objective_trace.len(), 3);
        assert_eq!(result.em_iterations, 3);
        assert!(result.log_likelihood.is_finite());
    }

    #[test]
    fn test_objective_non_increasing_across_em_steps() {
        let (counts, _) = synthetic_counts();
        let opportunity = Array2::ones(counts.raw_dim());
        let mut rng = StdRng::seed_from_u64(11);
        let result = denovo(counts.view(), 2, 0.0, opportunity.view(), 10, 5, &mut rng).unwrap();
        for pair in result.objective_trace.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9 * pair[0].abs().max(1.0));
        }
    }

    #[test]
    fn test_recovers_disjoint_signatures() {
        let (counts, truth) = synthetic_counts();
        let opportunity = Array2::ones(counts.raw_dim());
        let mut rng = StdRng::seed_from_u64(2024);
        let params = DenovoParams {
            em_steps: 100,
            gd_steps: 10,
            ..DenovoParams::new(2, 0.0)
        };
        let result =
            denovo_with_params(counts.view(), opportunity.view(), &params, &mut rng).unwrap();

        let report = cosine_similarity_and_match(result.signatures.view(), truth.view()).unwrap();
        for m in &report.matches {
            assert!(m.reference_index.is_some());
            assert!(m.similarity > 0.9, "similarity {}", m.similarity);
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (counts, _) = synthetic_counts();
        let opportunity = Array2::ones(counts.raw_dim());
        let a = denovo(
            counts.view(),
            2,
            1.0,
            opportunity.view(),
            2,
            5,
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
        let b = denovo(
            counts.view(),
            2,
            1.0,
            opportunity.view(),
            2,
            5,
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();
        assert_eq!(a.signatures, b.signatures);
        assert_eq!(a.exposures, b.exposures);
    }

    #[test]
    fn test_too_many_signatures_rejected() {
        let counts = Array2::from_elem((2, 4), 1.0);
        let opportunity = Array2::ones((2, 4));
        let mut rng = StdRng::seed_from_u64(0);
        let result = denovo(counts.view(), 5, 0.0, opportunity.view(), 2, 50, &mut rng);
        assert!(matches!(result, Err(MutSigError::InvalidParameter { .. })));

        let result = denovo(counts.view(), 0, 0.0, opportunity.view(), 2, 50, &mut rng);
        assert!(matches!(result, Err(MutSigError::InvalidParameter { .. })));
    }

    #[test]
    fn test_zero_iteration_budget_rejected() {
        let counts = Array2::from_elem((2, 4), 1.0);
        let opportunity = Array2::ones((2, 4));
        let mut rng = StdRng::seed_from_u64(0);
        let result = denovo(counts.view(), 2, 0.0, opportunity.view(), 0, 50, &mut rng);
        assert!(matches!(result, Err(MutSigError::InvalidParameter { .. })));
        let result = denovo(counts.view(), 2, 0.0, opportunity.view(), 2, 0, &mut rng);
        assert!(matches!(result, Err(MutSigError::InvalidParameter { .. })));
    }

    #[test]
    fn test_early_stop_with_tolerance() {
        let (counts, _) = synthetic_counts();
        let opportunity = Array2::ones(counts.raw_dim());
        let mut rng = StdRng::seed_from_u64(5);
        let params = DenovoParams {
            em_steps: 500,
            gd_steps: 5,
            tol: Some(1e-3),
            ..DenovoParams::new(2, 0.0)
        };
        let result =
            denovo_with_params(counts.view(), opportunity.view(), &params, &mut rng).unwrap();
        assert!(result.em_iterations < 500);
        assert_eq!(result.objective_trace.len(), result.em_iterations);
    }
}
