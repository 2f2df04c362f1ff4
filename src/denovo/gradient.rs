//! Signature update for the M-step of de novo extraction
//!
//! Projected gradient descent on the signature matrix with exposures held
//! fixed. The gradient of the KL term is
//! `G_kj = sum_i E_ik (O_ij - M_ij / (ES)_ij)`, scaled per entry by
//! `S_kj / sum_i E_ik O_ij`. With a unit learning rate the step coincides
//! with the multiplicative KL update, so it never leaves the non-negative
//! orthant; the projection then clips and renormalizes every row onto the
//! simplex. A backtracking line search rejects any step that would increase
//! the objective.

use ndarray::{Array2, ArrayView1, ArrayView2, Zip};

use crate::model::{normalize_rows, objective, ratio_matrix, EPSILON};

/// Maximum number of step halvings per gradient step
const MAX_HALVINGS: usize = 30;

/// Scaled descent direction for the signatures
pub(crate) fn scaled_gradient(
    counts: ArrayView2<f64>,
    exposures: ArrayView2<f64>,
    signatures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
) -> Array2<f64> {
    let reconstruction = exposures.dot(&signatures);
    let ratio = ratio_matrix(counts, reconstruction.view());
    let residual = &opportunity - &ratio;
    let gradient = exposures.t().dot(&residual);
    let weight = exposures.t().dot(&opportunity);

    let mut direction = Array2::zeros(signatures.raw_dim());
    Zip::from(&mut direction)
        .and(&gradient)
        .and(&weight)
        .and(signatures)
        .for_each(|d, &g, &w, &s| {
            if w > EPSILON {
                *d = s * g / w;
            }
        });
    direction
}

/// Clip negatives and renormalize each row to sum to one
pub(crate) fn project_to_simplex(signatures: &mut Array2<f64>) {
    signatures.mapv_inplace(|x| if x > 0.0 { x } else { 0.0 });
    let reset = normalize_rows(signatures);
    if reset > 0 {
        log::debug!("{} signature rows collapsed to zero and were reset to uniform", reset);
    }
}

/// Run up to `gd_steps` projected gradient steps on the signatures.
///
/// Returns the number of steps that were accepted by the line search.
pub(crate) fn descend_signatures(
    counts: ArrayView2<f64>,
    exposures: ArrayView2<f64>,
    opportunity: ArrayView2<f64>,
    penalty: ArrayView1<f64>,
    signatures: &mut Array2<f64>,
    gd_steps: usize,
    learning_rate: f64,
) -> usize {
    let mut current = objective(counts, exposures, signatures.view(), opportunity, penalty);
    let mut accepted = 0;

    for _ in 0..gd_steps {
        let direction = scaled_gradient(counts, exposures, signatures.view(), opportunity);

        let mut step = learning_rate;
        let mut improved = false;
        for _ in 0..MAX_HALVINGS {
            let mut candidate = &*signatures - &(&direction * step);
            project_to_simplex(&mut candidate);
            let value = objective(counts, exposures, candidate.view(), opportunity, penalty);
            if value <= current {
                *signatures = candidate;
                current = value;
                improved = true;
                break;
            }
            step *= 0.5;
        }

        if !improved {
            break;
        }
        accepted += 1;
    }

    accepted
}
