//! Dense pairwise distance matrix

use crate::distance::metric::PairDistance;
use crate::error::{Error, Result};
use rayon::prelude::*;
use std::mem;

/// Row-major `size × size` matrix of curve dissimilarities.
///
/// The buffer is owned by one clustering run and every access is
/// bounds-checked through the row stride.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    /// Number of curves (rows and columns)
    size: usize,

    /// Concatenated rows; entry `(i, j)` lives at `i * size + j`
    values: Vec<f32>,
}

impl DistanceMatrix {
    /// All-zero matrix for `size` curves
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Fill the full matrix from a metric, one worker per row.
    ///
    /// The diagonal is left at zero.
    pub fn compute<M: PairDistance + ?Sized>(metric: &M) -> Self {
        let size = metric.len();
        let mut matrix = Self::zeros(size);
        if size == 0 {
            return matrix;
        }

        matrix
            .values
            .par_chunks_mut(size)
            .enumerate()
            .for_each(|(i, row)| {
                for (j, cell) in row.iter_mut().enumerate() {
                    if i != j {
                        *cell = metric.between(i, j);
                    }
                }
            });

        matrix
    }

    /// Build from parsed rows, forcing the diagonal to zero
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let size = rows.len();
        let mut matrix = Self::zeros(size);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(Error::DimensionMismatch {
                    expected: size,
                    found: row.len(),
                });
            }
            let dst = matrix.row_mut(i);
            dst.copy_from_slice(&row);
            dst[i] = 0.0;
        }

        Ok(matrix)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance between curves `i` and `j`
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        assert!(i < self.size && j < self.size, "index ({i}, {j}) out of bounds");
        self.values[i * self.size + j]
    }

    /// One full row of the matrix
    pub fn row(&self, i: usize) -> &[f32] {
        let start = i * self.size;
        &self.values[start..start + self.size]
    }

    fn row_mut(&mut self, i: usize) -> &mut [f32] {
        let start = i * self.size;
        &mut self.values[start..start + self.size]
    }

    /// Average linkage: mean of all `(a, b)` cross distances
    pub fn linkage(&self, first: &[usize], second: &[usize]) -> f32 {
        debug_assert!(!first.is_empty() && !second.is_empty());

        let total: f64 = first
            .iter()
            .map(|&a| {
                let row = self.row(a);
                second.iter().map(|&b| row[b] as f64).sum::<f64>()
            })
            .sum();

        (total / (first.len() * second.len()) as f64) as f32
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        mem::size_of::<Self>() + self.values.capacity() * mem::size_of::<f32>()
    }
}

impl PairDistance for DistanceMatrix {
    fn len(&self) -> usize {
        self.size
    }

    fn between(&self, a: usize, b: usize) -> f32 {
        self.get(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Norm;
    use ndarray::array;

    #[test]
    fn compute_matches_metric() {
        let data = array![[0.0f32, 0.0], [3.0, 4.0], [6.0, 8.0]];
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let matrix = DistanceMatrix::compute(&metric);

        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.get(0, 1), 5.0);
        assert_eq!(matrix.get(2, 0), 10.0);
        assert!((0..3).all(|i| matrix.get(i, i) == 0.0));
        assert!(matrix.memory_usage() >= 9 * mem::size_of::<f32>());
    }

    #[test]
    fn from_rows_zeroes_diagonal() {
        let matrix = DistanceMatrix::from_rows(vec![vec![7.0, 1.0], vec![1.0, 7.0]]).unwrap();
        assert_eq!(matrix.row(0), &[0.0, 1.0]);
        assert_eq!(matrix.row(1), &[1.0, 0.0]);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = DistanceMatrix::from_rows(vec![vec![0.0, 1.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn linkage_is_mean_of_cross_distances() {
        let matrix = DistanceMatrix::from_rows(vec![
            vec![0.0, 1.0, 4.0],
            vec![1.0, 0.0, 6.0],
            vec![4.0, 6.0, 0.0],
        ])
        .unwrap();

        assert_eq!(matrix.linkage(&[0, 1], &[2]), 5.0);
        assert_eq!(matrix.linkage(&[2], &[0]), 4.0);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_access_panics() {
        DistanceMatrix::zeros(2).get(2, 0);
    }
}
