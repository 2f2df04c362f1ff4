//! Matching de novo signatures to a reference catalog
//!
//! Pairwise cosine similarity between signature profiles, followed by an
//! optimal one-to-one assignment that maximizes total similarity.

mod assignment;

pub use assignment::linear_sum_assignment;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

use crate::data::SignatureCatalog;
use crate::error::{MutSigError, Result};

/// Best match of one de novo signature
#[derive(Debug, Clone, Serialize)]
pub struct SignatureMatch {
    /// Row of the de novo signature matrix
    pub denovo_index: usize,
    /// Reference signature assigned by the one-to-one matching, if any
    pub reference_index: Option<usize>,
    /// Name of the assigned reference signature, when names are known
    pub reference_name: Option<String>,
    /// Similarity to the assigned reference, or to the closest reference
    /// when this signature was left unassigned
    pub similarity: f64,
    /// Closest reference signature regardless of the assignment
    pub best_reference_index: usize,
}

/// Cosine similarity matrix plus assignment
#[derive(Debug, Clone)]
pub struct SimilarityReport {
    /// (n_denovo x n_reference) cosine similarities
    pub similarity: Array2<f64>,
    /// One entry per de novo signature, in row order
    pub matches: Vec<SignatureMatch>,
}

impl SimilarityReport {
    /// Mean similarity over assigned pairs
    pub fn mean_assigned_similarity(&self) -> f64 {
        let assigned: Vec<f64> = self
            .matches
            .iter()
            .filter(|m| m.reference_index.is_some())
            .map(|m| m.similarity)
            .collect();
        if assigned.is_empty() {
            0.0
        } else {
            assigned.iter().sum::<f64>() / assigned.len() as f64
        }
    }
}

/// Cosine similarity of two vectors; zero when either has zero norm
pub fn cosine_similarity(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (a.dot(&b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Pairwise cosine similarity between the rows of two matrices
pub fn cosine_similarity_matrix(
    denovo: ArrayView2<f64>,
    reference: ArrayView2<f64>,
) -> Result<Array2<f64>> {
    if denovo.ncols() != reference.ncols() {
        return Err(MutSigError::DimensionMismatch {
            expected: format!("{} categories in reference signatures", denovo.ncols()),
            got: format!("{} categories in reference signatures", reference.ncols()),
        });
    }

    let mut similarity = Array2::zeros((denovo.nrows(), reference.nrows()));
    for (i, a) in denovo.axis_iter(Axis(0)).enumerate() {
        for (j, b) in reference.axis_iter(Axis(0)).enumerate() {
            similarity[[i, j]] = cosine_similarity(a, b);
        }
    }
    Ok(similarity)
}

/// Cosine similarities and the optimal one-to-one matching.
///
/// When there are more de novo signatures than references, the surplus de
/// novo signatures are left without an assigned reference.
pub fn cosine_similarity_and_match(
    denovo: ArrayView2<f64>,
    reference: ArrayView2<f64>,
) -> Result<SimilarityReport> {
    if reference.nrows() == 0 {
        return Err(MutSigError::EmptyData {
            reason: "reference catalog has no signatures".to_string(),
        });
    }

    let similarity = cosine_similarity_matrix(denovo, reference)?;
    let cost = similarity.mapv(|s| 1.0 - s);
    let pairs = linear_sum_assignment(cost.view())?;

    let mut assigned = vec![None; denovo.nrows()];
    for (row, col) in pairs {
        assigned[row] = Some(col);
    }

    let matches = similarity
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(i, row)| {
            let best = row
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |acc, (j, &s)| if s > acc.1 { (j, s) } else { acc });
            let score = match assigned[i] {
                Some(j) => row[j],
                None => best.1,
            };
            SignatureMatch {
                denovo_index: i,
                reference_index: assigned[i],
                reference_name: None,
                similarity: score,
                best_reference_index: best.0,
            }
        })
        .collect();

    Ok(SimilarityReport { similarity, matches })
}

/// Match de novo signatures against a named catalog
pub fn match_to_catalog(
    denovo: ArrayView2<f64>,
    catalog: &SignatureCatalog,
) -> Result<SimilarityReport> {
    let mut report = cosine_similarity_and_match(denovo, catalog.signatures())?;
    for m in report.matches.iter_mut() {
        m.reference_name = m.reference_index.map(|j| catalog.names()[j].clone());
    }
    for m in &report.matches {
        match (&m.reference_name, m.reference_index) {
            (Some(name), Some(_)) => log::info!(
                "De novo signature {} matches {} (cosine similarity {:.3})",
                m.denovo_index + 1,
                name,
                m.similarity
            ),
            _ => log::info!(
                "De novo signature {} left unassigned (closest: {}, cosine similarity {:.3})",
                m.denovo_index + 1,
                catalog.names()[m.best_reference_index],
                m.similarity
            ),
        }
    }
    Ok(report)
}
