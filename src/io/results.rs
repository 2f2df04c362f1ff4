//! Output tables for refit, bootstrap and similarity results

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;

use super::csv::write_labelled_matrix;
use crate::bootstrap::BootstrapSummary;
use crate::error::{MutSigError, Result};
use crate::similarity::{SignatureMatch, SimilarityReport};

/// Write bootstrap mean and standard deviation to two exposure tables
pub fn write_bootstrap_summary<P: AsRef<Path>, Q: AsRef<Path>>(
    mean_path: P,
    std_path: Q,
    summary: &BootstrapSummary,
    sample_ids: &[String],
    signature_names: &[String],
) -> Result<()> {
    super::write_exposures(mean_path, summary.mean.view(), sample_ids, signature_names)?;
    super::write_exposures(std_path, summary.std.view(), sample_ids, signature_names)
}

/// Write one sample's exposures with their bootstrap standard deviation.
///
/// Two rows, `Signature` and `std_dev`, one column per signature.
pub fn write_single_sample_exposures<P: AsRef<Path>>(
    path: P,
    exposures: ArrayView1<f64>,
    std_dev: ArrayView1<f64>,
    signature_names: &[String],
) -> Result<()> {
    if exposures.len() != std_dev.len() {
        return Err(MutSigError::ShapeMismatch {
            expected: format!("{} standard deviations", exposures.len()),
            got: format!("{}", std_dev.len()),
        });
    }
    let mut table = Array2::zeros((2, exposures.len()));
    table.row_mut(0).assign(&exposures);
    table.row_mut(1).assign(&std_dev);
    let rows = ["Signature".to_string(), "std_dev".to_string()];
    write_labelled_matrix(path, "", &rows, signature_names, table.view())
}

/// Write the mean exposure of each signature over the cohort, one row per
/// signature
pub fn write_cohort_summary<P: AsRef<Path>>(
    path: P,
    mean_exposures: ArrayView1<f64>,
    signature_names: &[String],
) -> Result<()> {
    let column = mean_exposures.insert_axis(Axis(1));
    write_labelled_matrix(
        path,
        "",
        signature_names,
        &["Signatures".to_string()],
        column,
    )
}

#[derive(Serialize)]
struct MatchesDocument<'a> {
    mean_assigned_similarity: f64,
    matches: &'a [SignatureMatch],
}

/// Write the signature assignment as pretty-printed JSON
pub fn write_matches_json<P: AsRef<Path>>(path: P, report: &SimilarityReport) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    let document = MatchesDocument {
        mean_assigned_similarity: report.mean_assigned_similarity(),
        matches: &report.matches,
    };
    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}
