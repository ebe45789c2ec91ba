//! Plain-text curve dataset loading

use crate::error::{Error, Result};
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Load a dataset where each non-blank line is one flattened curve.
///
/// Values are whitespace-separated floats and every curve must have the same
/// number of samples.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    let path = path.as_ref();
    log::info!("Reading dataset: {}", path.display());

    let text = fs::read_to_string(path)?;
    let rows = parse_rows(&text)?;
    let matrix = to_matrix(rows)?;

    log::info!(
        "Loaded {} curves with {} samples each",
        matrix.nrows(),
        matrix.ncols()
    );

    Ok(matrix)
}

/// Parse whitespace-separated float rows, one per line, skipping blank lines
pub fn parse_rows(text: &str) -> Result<Vec<Vec<f32>>> {
    let mut rows = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f32>().map_err(|e| Error::Parse {
                    line: line_no + 1,
                    message: format!("{token:?}: {e}"),
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        rows.push(row);
    }

    Ok(rows)
}

/// Pack equal-length rows into a dense matrix
pub fn to_matrix(rows: Vec<Vec<f32>>) -> Result<Array2<f32>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, |r| r.len());
    if n_rows == 0 || n_cols == 0 {
        return Err(Error::EmptyInput);
    }

    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for row in rows {
        if row.len() != n_cols {
            return Err(Error::DimensionMismatch {
                expected: n_cols,
                found: row.len(),
            });
        }
        flat.extend(row);
    }

    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| Error::InvalidParameter {
        name: "dataset",
        message: e.to_string(),
    })
}
