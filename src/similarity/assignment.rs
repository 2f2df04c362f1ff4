//! Linear sum assignment (Hungarian algorithm)
//!
//! Shortest augmenting path formulation with row and column potentials,
//! O(n^2 m) for an n x m cost matrix with n <= m.

use ndarray::ArrayView2;

use crate::error::{MutSigError, Result};

/// Minimum-cost assignment of rows to columns.
///
/// Returns `(row, column)` pairs sorted by row. Every row is assigned when
/// `rows <= cols`; otherwise every column is assigned and the surplus rows
/// are left out.
pub fn linear_sum_assignment(cost: ArrayView2<f64>) -> Result<Vec<(usize, usize)>> {
    let (n_rows, n_cols) = cost.dim();
    if n_rows == 0 || n_cols == 0 {
        return Ok(Vec::new());
    }
    if cost.iter().any(|c| !c.is_finite()) {
        return Err(MutSigError::invalid_parameter(
            "assignment costs must be finite",
        ));
    }

    let mut pairs = if n_rows <= n_cols {
        solve(n_rows, n_cols, |i, j| cost[[i, j]])
    } else {
        solve(n_cols, n_rows, |i, j| cost[[j, i]])
            .into_iter()
            .map(|(col, row)| (row, col))
            .collect()
    };
    pairs.sort_unstable();
    Ok(pairs)
}

/// Core solver for `n <= m`; `cost(i, j)` is the cost of row i, column j
fn solve<F>(n: usize, m: usize, cost: F) -> Vec<(usize, usize)>
where
    F: Fn(usize, usize) -> f64,
{
    // 1-based with index 0 as a virtual column
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        owner[0] = i;
        let mut j0 = 0;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let slack = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if slack < min_slack[j] {
                    min_slack[j] = slack;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        // Augment along the alternating path
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| owner[j] != 0)
        .map(|j| (owner[j] - 1, j - 1))
        .collect()
}
