//! Multinomial resampling of mutation counts

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution};

use crate::error::{MutSigError, Result};

/// Independent generator for one bootstrap iteration
pub(crate) fn iteration_rng(seed: u64, iteration: usize) -> StdRng {
    StdRng::seed_from_u64(seed.wrapping_add(iteration as u64))
}

/// Draw one sample's counts from a multinomial with the observed proportions.
///
/// The number of trials is the sample total rounded to an integer, so row
/// totals are preserved exactly. Draws use the conditional binomial method:
/// category `j` receives `Binomial(remaining, p_j / remaining_mass)`.
pub fn multinomial_row<R: Rng + ?Sized>(row: ArrayView1<f64>, rng: &mut R) -> Result<Array1<f64>> {
    let mut out = Array1::zeros(row.len());
    let total: f64 = row.sum();
    let trials = total.round();
    if !(trials >= 1.0) {
        return Ok(out);
    }

    let last = match row.iter().rposition(|&x| x > 0.0) {
        Some(last) => last,
        None => return Ok(out),
    };

    let mut remaining = trials as u64;
    let mut remaining_mass = total;
    for (j, &weight) in row.iter().enumerate().take(last + 1) {
        if remaining == 0 {
            break;
        }
        if weight <= 0.0 {
            continue;
        }
        let drawn = if j == last {
            remaining
        } else {
            let p = (weight / remaining_mass).clamp(0.0, 1.0);
            Binomial::new(remaining, p)
                .map_err(|e| {
                    MutSigError::invalid_parameter(format!(
                        "binomial draw with n = {}, p = {} failed: {}",
                        remaining, p, e
                    ))
                })?
                .sample(rng)
        };
        out[j] = drawn as f64;
        remaining -= drawn;
        remaining_mass -= weight;
    }

    Ok(out)
}

/// Resample every row of a count matrix independently
pub fn resample_counts<R: Rng + ?Sized>(counts: ArrayView2<f64>, rng: &mut R) -> Result<Array2<f64>> {
    let mut resampled = Array2::zeros(counts.raw_dim());
    for (mut target, source) in resampled
        .axis_iter_mut(Axis(0))
        .zip(counts.axis_iter(Axis(0)))
    {
        target.assign(&multinomial_row(source, rng)?);
    }
    Ok(resampled)
}
