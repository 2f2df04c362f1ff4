//! Bootstrap confidence estimates for refit exposures
//!
//! Each iteration draws a multinomial resample of every sample's counts and
//! refits the signatures. Iterations run in parallel, each with its own
//! generator derived from the seed and the iteration index, and are only
//! aggregated once all of them have finished.

mod resample;

pub use resample::{multinomial_row, resample_counts};

use ndarray::{Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::data::{MutationCounts, SignatureCatalog};
use crate::error::{MutSigError, Result};
use crate::refit::{fit_exposures, initial_exposures, validate_inputs, warn_on_label_mismatch, RefitParams};

use resample::iteration_rng;

/// Default number of bootstrap iterations
pub const DEFAULT_BOOTSTRAPS: usize = 100;

/// Mean and standard deviation of exposures over bootstrap iterations
#[derive(Debug, Clone)]
pub struct BootstrapSummary {
    /// Elementwise mean (samples x signatures)
    pub mean: Array2<f64>,
    /// Elementwise population standard deviation (samples x signatures)
    pub std: Array2<f64>,
    /// Number of iterations aggregated
    pub n_bootstraps: usize,
    /// Iterations whose refit hit the iteration budget
    pub n_unconverged: usize,
}

impl BootstrapSummary {
    /// Mean and std rows when the input held exactly one sample
    pub fn single_sample(&self) -> Option<(ArrayView1<'_, f64>, ArrayView1<'_, f64>)> {
        if self.mean.nrows() == 1 {
            Some((self.mean.row(0), self.std.row(0)))
        } else {
            None
        }
    }
}

/// Bootstrap exposures with the default refit parameters
pub fn bootstrap(
    counts: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    n_bootstraps: usize,
    lambda: f64,
    seed: u64,
) -> Result<BootstrapSummary> {
    bootstrap_with_params(
        counts,
        signatures,
        opportunity,
        n_bootstraps,
        lambda,
        &RefitParams::default(),
        seed,
    )
}

/// Bootstrap exposures.
///
/// Iteration `b` resamples with a generator seeded from `seed + b`, so the
/// result depends only on the inputs and `seed`, never on thread scheduling.
pub fn bootstrap_with_params(
    counts: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    n_bootstraps: usize,
    lambda: f64,
    params: &RefitParams,
    seed: u64,
) -> Result<BootstrapSummary> {
    if n_bootstraps == 0 {
        return Err(MutSigError::invalid_parameter("n_bootstraps must be at least 1"));
    }
    validate_inputs(counts, signatures, opportunity, lambda)?;
    params.validate()?;

    let n_signatures = signatures.nrows();

    let replicates: Vec<(Array2<f64>, bool)> = (0..n_bootstraps)
        .into_par_iter()
        .map(|b| -> Result<(Array2<f64>, bool)> {
            let mut rng = iteration_rng(seed, b);
            let resampled = resample_counts(counts, &mut rng)?;
            let start = initial_exposures(resampled.view(), n_signatures);
            let fit = fit_exposures(
                resampled.view(),
                signatures,
                opportunity,
                lambda,
                params,
                start,
            );
            Ok((fit.exposures, fit.converged))
        })
        .collect::<Result<Vec<_>>>()?;

    let n_unconverged = replicates.iter().filter(|(_, converged)| !converged).count();
    if n_unconverged > 0 {
        log::warn!(
            "{} of {} bootstrap refits did not converge within {} iterations",
            n_unconverged,
            n_bootstraps,
            params.max_iter
        );
    }

    let shape = (counts.nrows(), n_signatures);
    let n = n_bootstraps as f64;

    let mut mean = Array2::zeros(shape);
    for (exposures, _) in &replicates {
        mean += exposures;
    }
    mean /= n;

    let mut variance = Array2::<f64>::zeros(shape);
    for (exposures, _) in &replicates {
        let deviation = exposures - &mean;
        variance += &deviation.mapv(|d| d * d);
    }
    variance /= n;
    let std = variance.mapv(f64::sqrt);

    Ok(BootstrapSummary {
        mean,
        std,
        n_bootstraps,
        n_unconverged,
    })
}

/// Bootstrap a labelled count matrix against a catalog
pub fn bootstrap_counts(
    counts: &MutationCounts,
    catalog: &SignatureCatalog,
    opportunity: ArrayView2<f64>,
    n_bootstraps: usize,
    lambda: f64,
    params: &RefitParams,
    seed: u64,
) -> Result<BootstrapSummary> {
    warn_on_label_mismatch(counts.categories(), catalog.categories());
    log::info!(
        "Bootstrapping exposures of {} samples with {} iterations (seed {})",
        counts.n_samples(),
        n_bootstraps,
        seed
    );
    bootstrap_with_params(
        counts.counts(),
        catalog.signatures(),
        opportunity,
        n_bootstraps,
        lambda,
        params,
        seed,
    )
}
