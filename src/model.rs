//! Poisson reconstruction model shared by the refit and de novo solvers
//!
//! Counts are modelled as `M_ij ~ Poisson(O_ij * (E S)_ij)`. Both solvers
//! minimize the generalized Kullback-Leibler divergence between `M` and that
//! rate, plus an L1 penalty on the exposures whose weight for sample `i` is
//! `lambda / max(N_i, 1)` (`N_i` = total mutations of the sample). Scaling by
//! depth keeps one lambda meaningful for both exomes and genomes.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use statrs::function::gamma::ln_gamma;

/// Floor applied to reconstructed rates before they are used as divisors
pub const EPSILON: f64 = 1e-12;

/// Per-sample L1 penalty weights: `lambda / max(N_i, 1)`
pub fn penalty_weights(counts: ArrayView2<f64>, lambda: f64) -> Array1<f64> {
    counts
        .sum_axis(Axis(1))
        .mapv(|total| lambda / total.max(1.0))
}

/// Penalized generalized KL divergence `D(M || O * ES) + sum_i w_i * |E_i|_1`
pub fn objective(
    counts: ArrayView2<f64>,
    exposures: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    penalty: ArrayView1<f64>,
) -> f64 {
    let reconstruction = exposures.dot(&signatures);
    let divergence = kl_divergence(counts, reconstruction.view(), opportunity);
    let l1: f64 = exposures
        .axis_iter(Axis(0))
        .zip(penalty.iter())
        .map(|(row, &w)| w * row.sum())
        .sum();
    divergence + l1
}

/// Generalized KL divergence between counts and `O * reconstruction`
pub fn kl_divergence(
    counts: ArrayView2<f64>,
    reconstruction: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
) -> f64 {
    let mut total = 0.0;
    for ((i, j), &count) in counts.indexed_iter() {
        let rate = opportunity[[i, j]] * reconstruction[[i, j]];
        if count > 0.0 {
            total += count * (count / rate.max(EPSILON)).ln() - count + rate;
        } else {
            total += rate;
        }
    }
    total
}

/// Poisson log-likelihood of the counts under `O * (E S)`
pub fn poisson_log_likelihood(
    counts: ArrayView2<f64>,
    exposures: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
) -> f64 {
    let reconstruction = exposures.dot(&signatures);
    counts
        .indexed_iter()
        .map(|((i, j), &count)| {
            let rate = (opportunity[[i, j]] * reconstruction[[i, j]]).max(EPSILON);
            count * rate.ln() - rate - ln_gamma(count + 1.0)
        })
        .sum()
}

/// One multiplicative update of the exposures with signatures held fixed.
///
/// `E_ik <- E_ik * sum_j S_kj M_ij / (ES)_ij / (sum_j O_ij S_kj + w_i)`
///
/// This is the majorization-minimization step for the penalized KL objective,
/// so the objective never increases and exposures stay non-negative.
pub fn update_exposures(
    counts: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    penalty: ArrayView1<f64>,
    exposures: &mut Array2<f64>,
) {
    let reconstruction = exposures.dot(&signatures);
    let ratio = ratio_matrix(counts, reconstruction.view());
    let numerator = ratio.dot(&signatures.t());
    let mut denominator = opportunity.dot(&signatures.t());
    for (mut row, &w) in denominator.axis_iter_mut(Axis(0)).zip(penalty.iter()) {
        row.mapv_inplace(|d| (d + w).max(EPSILON));
    }

    ndarray::Zip::from(exposures)
        .and(&numerator)
        .and(&denominator)
        .for_each(|e, &num, &den| {
            *e *= num / den;
        });
}

/// `M_ij / max((ES)_ij, EPSILON)`, zero where the count is zero
pub fn ratio_matrix(counts: ArrayView2<f64>, reconstruction: ArrayView2<f64>) -> Array2<f64> {
    let mut ratio = Array2::zeros(counts.raw_dim());
    ndarray::Zip::from(&mut ratio)
        .and(counts)
        .and(reconstruction)
        .for_each(|r, &m, &es| {
            if m > 0.0 {
                *r = m / es.max(EPSILON);
            }
        });
    ratio
}

/// Normalize each row to sum to one.
///
/// Rows whose sum is zero or not finite are reset to the uniform
/// distribution. Returns the number of rows reset.
pub fn normalize_rows(matrix: &mut Array2<f64>) -> usize {
    let n_cols = matrix.ncols();
    let mut reset = 0;
    for mut row in matrix.axis_iter_mut(Axis(0)) {
        let sum = row.sum();
        if sum > 0.0 && sum.is_finite() {
            row.mapv_inplace(|x| x / sum);
        } else {
            row.fill(1.0 / n_cols as f64);
            reset += 1;
        }
    }
    reset
}

/// Relative change between successive objective values
pub fn relative_change(previous: f64, current: f64) -> f64 {
    (previous - current).abs() / previous.abs().max(EPSILON)
}
