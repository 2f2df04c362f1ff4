//! Delimited-text reading and writing for counts, catalogs and result tables

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ::csv::{ReaderBuilder, Trim, WriterBuilder};
use ndarray::{Array2, ArrayView2, Axis};

use crate::data::{default_category_labels, MutationCounts, SignatureCatalog, N_SBS96};
use crate::error::{MutSigError, Result};
use crate::normalization::OpportunitySource;

/// Numeric table with optional row names
struct Table {
    /// Header field above the row-name column, if the header has one
    corner: Option<String>,
    columns: Vec<String>,
    row_names: Option<Vec<String>>,
    values: Array2<f64>,
}

/// Tab if the first line contains one, comma otherwise
fn detect_delimiter(path: &Path) -> Result<u8> {
    let file = File::open(path)?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line)?;
    if first_line.trim().is_empty() {
        return Err(MutSigError::EmptyData {
            reason: format!("{} is empty", path.display()),
        });
    }
    Ok(if first_line.contains('\t') { b'\t' } else { b',' })
}

fn read_records(path: &Path, has_headers: bool) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let delimiter = detect_delimiter(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)?;

    let header = if has_headers {
        reader.headers()?.iter().map(str::to_string).collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

/// Header labels that head an id column rather than a category
const ROW_NAME_LABELS: [&str; 8] = [
    "sample",
    "samples",
    "sample_id",
    "id",
    "name",
    "type",
    "signature",
    "mutationtype",
];

fn is_row_name_label(label: &str, width: usize) -> bool {
    label.is_empty()
        || ROW_NAME_LABELS.contains(&label.to_ascii_lowercase().as_str())
        || (width == N_SBS96 + 1 && !label.contains('>'))
}

fn parse_table<F>(path: &Path, header: Vec<String>, rows: Vec<Vec<String>>, invalid: F) -> Result<Table>
where
    F: Fn(String) -> MutSigError,
{
    let first = rows.first().ok_or_else(|| MutSigError::EmptyData {
        reason: format!("no data rows in {}", path.display()),
    })?;

    // A leading non-numeric field holds the row name. Numeric ids are
    // recognized from the header instead: either it is one field short of
    // the data, or its first field names the id column.
    let width = first.len();
    let has_names = first
        .first()
        .is_some_and(|field| field.parse::<f64>().is_err())
        || (width > 1 && header.len() + 1 == width)
        || header
            .first()
            .is_some_and(|label| is_row_name_label(label, width));
    let n_values = width - usize::from(has_names);
    if n_values == 0 {
        return Err(invalid(format!("no numeric columns in {}", path.display())));
    }

    let mut values = Array2::zeros((rows.len(), n_values));
    let mut row_names = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(invalid(format!(
                "row {} of {} has {} columns, expected {}",
                i + 1,
                path.display(),
                row.len(),
                width
            )));
        }
        let fields = if has_names {
            row_names.push(row[0].clone());
            &row[1..]
        } else {
            &row[..]
        };
        for (j, field) in fields.iter().enumerate() {
            values[[i, j]] = field.parse::<f64>().map_err(|_| {
                invalid(format!(
                    "invalid value '{}' in row {}, column {} of {}",
                    field,
                    i + 1,
                    j + 1,
                    path.display()
                ))
            })?;
        }
    }

    let (corner, columns) = if header.len() == n_values + 1 {
        (Some(header[0].clone()), header[1..].to_vec())
    } else if header.len() == n_values || header.is_empty() {
        (None, header)
    } else {
        return Err(MutSigError::DimensionMismatch {
            expected: format!("{} header fields in {}", n_values, path.display()),
            got: format!("{} header fields", header.len()),
        });
    };

    Ok(Table {
        corner,
        columns,
        row_names: has_names.then_some(row_names),
        values,
    })
}

/// Read a mutation count matrix.
///
/// Tab- or comma-delimited with a header row of category labels and one
/// row per sample. A leading column is taken as sample ids when it is
/// non-numeric, when the header names it (`sample`, `id`, ...) or when the
/// header is one field short; otherwise samples are named `sample_1`,
/// `sample_2`, ...
pub fn read_mutation_counts<P: AsRef<Path>>(path: P) -> Result<MutationCounts> {
    let path = path.as_ref();
    let (header, rows) = read_records(path, true)?;
    let table = parse_table(path, header, rows, |reason| MutSigError::InvalidCountMatrix {
        reason,
    })?;

    let (n_samples, n_categories) = table.values.dim();
    let sample_ids = table
        .row_names
        .unwrap_or_else(|| (1..=n_samples).map(|i| format!("sample_{}", i)).collect());
    let categories = if table.columns.iter().any(|c| c.is_empty()) {
        default_category_labels(n_categories)
    } else {
        table.columns
    };

    log::info!(
        "Read {} samples x {} categories from {}",
        n_samples,
        n_categories,
        path.display()
    );
    MutationCounts::new(table.values, sample_ids, categories)
}

/// Read a reference signature catalog.
///
/// Either one signature per row (`Signature, A[C>A]A, ...`) or the
/// categories-by-signatures layout (`Type, SBS1, SBS2, ...` with one row per
/// mutation context), which is transposed on load.
pub fn read_signature_catalog<P: AsRef<Path>>(path: P) -> Result<SignatureCatalog> {
    let path = path.as_ref();
    let (header, rows) = read_records(path, true)?;
    let table = parse_table(path, header, rows, |reason| MutSigError::InvalidSignatures {
        reason,
    })?;

    let (n_rows, n_cols) = table.values.dim();
    let corner_is_type = table
        .corner
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("type"));
    let rows_are_contexts = table
        .row_names
        .as_ref()
        .is_some_and(|names| names.iter().all(|n| n.contains('>')));
    let transpose = corner_is_type || rows_are_contexts || (n_rows == N_SBS96 && n_cols != N_SBS96);

    let (signatures, names, categories) = if transpose {
        let categories = table
            .row_names
            .unwrap_or_else(|| default_category_labels(n_rows));
        (table.values.t().to_owned(), table.columns, categories)
    } else {
        let names = table
            .row_names
            .unwrap_or_else(|| (1..=n_rows).map(|k| format!("Signature {}", k)).collect());
        (table.values, names, table.columns)
    };
    let categories = if categories.len() == signatures.ncols() {
        categories
    } else {
        default_category_labels(signatures.ncols())
    };

    log::info!(
        "Read {} signatures over {} categories from {}",
        signatures.nrows(),
        signatures.ncols(),
        path.display()
    );
    SignatureCatalog::new(signatures, names, categories)
}

/// Read opportunity weights from a headerless numeric file.
///
/// A single row (or a single column) is a per-category vector; several rows
/// form a per-sample matrix.
pub fn read_opportunity<P: AsRef<Path>>(path: P) -> Result<OpportunitySource> {
    let path = path.as_ref();
    let (_, rows) = read_records(path, false)?;
    let table = parse_table(path, Vec::new(), rows, |reason| MutSigError::invalid_parameter(reason))?;
    if table.row_names.is_some() {
        return Err(MutSigError::invalid_parameter(format!(
            "opportunity file {} must be purely numeric",
            path.display()
        )));
    }

    let values = table.values;
    let source = match values.dim() {
        (1, _) => OpportunitySource::PerCategory(values.row(0).to_owned()),
        (_, 1) => OpportunitySource::PerCategory(values.column(0).to_owned()),
        _ => OpportunitySource::PerSample(values),
    };
    Ok(source)
}

/// Write a matrix with row and column labels as a tab-delimited table
pub(crate) fn write_labelled_matrix<P: AsRef<Path>>(
    path: P,
    corner: &str,
    row_names: &[String],
    col_names: &[String],
    values: ArrayView2<f64>,
) -> Result<()> {
    if values.dim() != (row_names.len(), col_names.len()) {
        return Err(MutSigError::ShapeMismatch {
            expected: format!("({}, {})", row_names.len(), col_names.len()),
            got: format!("{:?}", values.dim()),
        });
    }

    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record(std::iter::once(corner).chain(col_names.iter().map(String::as_str)))?;
    for (name, row) in row_names.iter().zip(values.axis_iter(Axis(0))) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(name.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write exposures (samples x signatures) with sample ids as the first column
pub fn write_exposures<P: AsRef<Path>>(
    path: P,
    exposures: ArrayView2<f64>,
    sample_ids: &[String],
    signature_names: &[String],
) -> Result<()> {
    write_labelled_matrix(path, "sample_id", sample_ids, signature_names, exposures)
}

/// Write signatures in the categories-by-signatures layout
pub fn write_signatures<P: AsRef<Path>>(
    path: P,
    signatures: ArrayView2<f64>,
    signature_names: &[String],
    categories: &[String],
) -> Result<()> {
    write_labelled_matrix(path, "Type", categories, signature_names, signatures.t())
}

/// Write a similarity matrix, de novo signatures as rows
pub fn write_similarity<P: AsRef<Path>>(
    path: P,
    similarity: ArrayView2<f64>,
    denovo_names: &[String],
    reference_names: &[String],
) -> Result<()> {
    write_labelled_matrix(path, "", denovo_names, reference_names, similarity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_counts_with_sample_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tA[C>A]A\tA[C>A]C\tA[C>A]G").unwrap();
        writeln!(file, "tumor1\t10\t0\t3").unwrap();
        writeln!(file, "tumor2\t1\t2\t3").unwrap();

        let counts = read_mutation_counts(file.path()).unwrap();
        assert_eq!(counts.n_samples(), 2);
        assert_eq!(counts.n_categories(), 3);
        assert_eq!(counts.sample_ids(), &["tumor1".to_string(), "tumor2".to_string()]);
        assert_eq!(counts.categories()[0], "A[C>A]A");
        assert_eq!(counts.counts()[[0, 0]], 10.0);
    }

    #[test]
    fn test_read_counts_without_sample_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "c1,c2").unwrap();
        writeln!(file, "4,5").unwrap();

        let counts = read_mutation_counts(file.path()).unwrap();
        assert_eq!(counts.sample_ids(), &["sample_1".to_string()]);
        assert!(counts.is_single_sample());
    }

    #[test]
    fn test_read_counts_with_numeric_sample_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample\tc1\tc2").unwrap();
        writeln!(file, "1\t10\t3").unwrap();
        writeln!(file, "2\t4\t5").unwrap();

        let counts = read_mutation_counts(file.path()).unwrap();
        assert_eq!(counts.sample_ids(), &["1".to_string(), "2".to_string()]);
        assert_eq!(counts.categories(), &["c1".to_string(), "c2".to_string()]);
        assert_eq!(counts.counts(), array![[10.0, 3.0], [4.0, 5.0]].view());
    }

    #[test]
    fn test_read_counts_header_without_corner() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "c1,c2").unwrap();
        writeln!(file, "101,7,1").unwrap();

        let counts = read_mutation_counts(file.path()).unwrap();
        assert_eq!(counts.sample_ids(), &["101".to_string()]);
        assert_eq!(counts.counts(), array![[7.0, 1.0]].view());
    }

    #[test]
    fn test_read_counts_rejects_bad_value() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "c1\tc2").unwrap();
        writeln!(file, "4\tfive").unwrap();
        assert!(matches!(
            read_mutation_counts(file.path()),
            Err(MutSigError::InvalidCountMatrix { .. })
        ));
    }

    #[test]
    fn test_read_counts_ragged_row() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "c1\tc2\tc3").unwrap();
        writeln!(file, "1\t2\t3").unwrap();
        writeln!(file, "1\t2").unwrap();
        assert!(read_mutation_counts(file.path()).is_err());
    }

    #[test]
    fn test_read_catalog_signature_rows() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Signature,c1,c2,c3").unwrap();
        writeln!(file, "SBS1,0.5,0.25,0.25").unwrap();
        writeln!(file, "SBS5,0.1,0.1,0.8").unwrap();

        let catalog = read_signature_catalog(file.path()).unwrap();
        assert_eq!(catalog.n_signatures(), 2);
        assert_eq!(catalog.n_categories(), 3);
        assert_eq!(catalog.names()[1], "SBS5");
        assert!((catalog.signatures()[[1, 2]] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_read_catalog_cosmic_layout_transposed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Type,SBS1,SBS2").unwrap();
        writeln!(file, "A[C>A]A,0.6,0.1").unwrap();
        writeln!(file, "A[C>A]C,0.4,0.9").unwrap();

        let catalog = read_signature_catalog(file.path()).unwrap();
        assert_eq!(catalog.n_signatures(), 2);
        assert_eq!(catalog.n_categories(), 2);
        assert_eq!(catalog.names(), &["SBS1".to_string(), "SBS2".to_string()]);
        assert_eq!(catalog.categories()[1], "A[C>A]C");
        assert!((catalog.signatures()[[1, 1]] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_written_signatures_read_back() {
        let signatures = array![[0.2, 0.3, 0.5], [0.6, 0.2, 0.2]];
        let names = vec!["Denovo A".to_string(), "Denovo B".to_string()];
        let categories = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        let file = NamedTempFile::new().unwrap();
        write_signatures(file.path(), signatures.view(), &names, &categories).unwrap();

        let catalog = read_signature_catalog(file.path()).unwrap();
        assert_eq!(catalog.names(), names.as_slice());
        assert_eq!(catalog.categories(), categories.as_slice());
        assert!((catalog.signatures()[[0, 2]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_read_opportunity_vector_and_matrix() {
        let mut vector = NamedTempFile::new().unwrap();
        writeln!(vector, "1\t2\t4").unwrap();
        match read_opportunity(vector.path()).unwrap() {
            OpportunitySource::PerCategory(v) => assert_eq!(v, array![1.0, 2.0, 4.0]),
            other => panic!("expected per-category weights, got {:?}", other),
        }

        let mut matrix = NamedTempFile::new().unwrap();
        writeln!(matrix, "1\t2\t4").unwrap();
        writeln!(matrix, "2\t2\t2").unwrap();
        match read_opportunity(matrix.path()).unwrap() {
            OpportunitySource::PerSample(m) => assert_eq!(m.dim(), (2, 3)),
            other => panic!("expected per-sample weights, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            read_mutation_counts(file.path()),
            Err(MutSigError::EmptyData { .. })
        ));
    }

    #[test]
    fn test_write_exposures_layout() {
        let exposures = array![[1.5, 0.0], [2.0, 3.0]];
        let file = NamedTempFile::new().unwrap();
        write_exposures(
            file.path(),
            exposures.view(),
            &["s1".to_string(), "s2".to_string()],
            &["SBS1".to_string(), "SBS5".to_string()],
        )
        .unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sample_id\tSBS1\tSBS5");
        assert_eq!(lines[1], "s1\t1.5\t0");
        assert_eq!(lines[2], "s2\t2\t3");
    }

    #[test]
    fn test_write_shape_checked() {
        let values = array![[1.0, 2.0]];
        let file = NamedTempFile::new().unwrap();
        let result = write_exposures(file.path(), values.view(), &["s1".to_string()], &["a".to_string()]);
        assert!(matches!(result, Err(MutSigError::ShapeMismatch { .. })));
    }
}
