//! Error types for rust_mutsig

use thiserror::Error;

/// Main error type for signature fitting operations
#[derive(Error, Debug)]
pub enum MutSigError {
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("Invalid count matrix: {reason}")]
    InvalidCountMatrix { reason: String },

    #[error("Invalid signatures: {reason}")]
    InvalidSignatures { reason: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for signature fitting operations
pub type Result<T> = std::result::Result<T, MutSigError>;

impl MutSigError {
    pub(crate) fn invalid_parameter(reason: impl Into<String>) -> Self {
        MutSigError::InvalidParameter {
            reason: reason.into(),
        }
    }
}
