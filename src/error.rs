//! Error types for the streamline clustering library

use thiserror::Error;

/// Errors that stop a clustering run.
///
/// Degenerate but well-formed inputs (zero variance, empty clusters, more
/// clusters than curves) are handled by policy and never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Dataset contains no curves or no samples.
    #[error("empty input")]
    EmptyInput,

    /// Requested cluster count cannot be used.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} curves")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of curves in the dataset.
        n_items: usize,
    },

    /// Rows of a matrix have inconsistent lengths.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected row length.
        expected: usize,
        /// Found row length.
        found: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// A text matrix could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// The orthogonal decomposition did not converge.
    #[error("decomposition failed: {0}")]
    Decomposition(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
