//! On-disk cache for full distance matrices

use crate::data::parse_rows;
use crate::distance::matrix::DistanceMatrix;
use crate::distance::metric::{Norm, PairDistance};
use crate::error::Result;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Cache file for the given metric inside `dir`
pub fn cache_path(dir: &Path, norm: Norm) -> PathBuf {
    dir.join(norm.id().to_string())
}

/// Write a matrix as plain text: one row per line, values space-separated
pub fn store(path: &Path, matrix: &DistanceMatrix) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    for i in 0..matrix.size() {
        for value in matrix.row(i) {
            write!(out, "{} ", value)?;
        }
        writeln!(out)?;
    }
    out.flush()?;

    Ok(())
}

/// Read a matrix previously written by [`store`]
pub fn load(path: &Path) -> Result<DistanceMatrix> {
    let text = fs::read_to_string(path)?;
    DistanceMatrix::from_rows(parse_rows(&text)?)
}

/// Reuse the cached matrix for `norm` if present, otherwise compute and store it.
///
/// A cached file whose size does not match the current dataset is ignored and
/// overwritten.
pub fn load_or_compute<M: PairDistance + ?Sized>(
    dir: &Path,
    norm: Norm,
    metric: &M,
) -> Result<DistanceMatrix> {
    let path = cache_path(dir, norm);

    if path.exists() {
        log::info!("Reading distance matrix from {}", path.display());
        let matrix = load(&path)?;
        if matrix.size() == metric.len() {
            return Ok(matrix);
        }
        log::warn!(
            "Cached distance matrix has {} rows but dataset has {}, recomputing",
            matrix.size(),
            metric.len()
        );
    }

    log::info!("Computing {}x{} distance matrix", metric.len(), metric.len());
    let matrix = DistanceMatrix::compute(metric);
    store(&path, &matrix)?;
    log::info!(
        "Distance matrix cached at {} ({:.1} MB in memory)",
        path.display(),
        matrix.memory_usage() as f64 / (1024.0 * 1024.0)
    );

    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn store_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let data = array![[0.0f32, 0.0], [0.0, 2.5], [1.5, 0.0]];
        let metric = Norm::Manhattan.prepare(data.view(), 1);
        let matrix = DistanceMatrix::compute(&metric);

        let path = cache_path(dir.path(), Norm::Manhattan);
        store(&path, &matrix).unwrap();
        assert!(path.ends_with("1"));

        assert_eq!(load(&path).unwrap(), matrix);
    }

    #[test]
    fn existing_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path(dir.path(), Norm::Euclidean);
        fs::write(&path, "9 2\n2 9\n").unwrap();

        let data = array![[0.0f32], [1.0]];
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let matrix = load_or_compute(dir.path(), Norm::Euclidean, &metric).unwrap();

        // Read back from disk, not recomputed, and the diagonal is forced to zero
        assert_eq!(matrix.get(0, 1), 2.0);
        assert_eq!(matrix.get(0, 0), 0.0);
    }

    #[test]
    fn missing_file_is_computed_and_written() {
        let dir = tempfile::tempdir().unwrap();
        let data = array![[0.0f32], [3.0]];
        let metric = Norm::Euclidean.prepare(data.view(), 1);

        let matrix = load_or_compute(dir.path(), Norm::Euclidean, &metric).unwrap();
        assert_eq!(matrix.get(1, 0), 3.0);
        assert!(cache_path(dir.path(), Norm::Euclidean).exists());
    }
}
