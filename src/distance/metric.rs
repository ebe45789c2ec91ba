//! Curve dissimilarity measures

use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Symmetric access to dissimilarities between two curves of one dataset
pub trait PairDistance: Sync {
    /// Number of curves.
    fn len(&self) -> usize;

    /// Dissimilarity between curves `a` and `b`.
    fn between(&self, a: usize, b: usize) -> f32;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dissimilarity prepared against one dataset.
///
/// Besides curve-to-curve distances it measures an arbitrary vector (a
/// centroid) against any row of the prepared data.
pub trait Dissimilarity: PairDistance {
    /// The rows this metric was prepared against.
    fn points(&self) -> ArrayView2<'_, f32>;

    /// Dissimilarity between `point` and row `row` of the prepared data.
    fn to_row(&self, point: ArrayView1<'_, f32>, row: usize) -> f32;
}

/// Metric selector; the discriminant names the distance-matrix cache file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Norm {
    /// Euclidean distance between flattened curves
    Euclidean,
    /// Sum of absolute component differences
    Manhattan,
    /// Largest absolute component difference
    Chebyshev,
    /// One minus the cosine of the angle between flattened curves
    Angular,
    /// Mean Euclidean distance between corresponding curve samples
    MeanPointwise,
}

impl Norm {
    /// Stable numeric id of the metric
    pub fn id(self) -> u32 {
        match self {
            Norm::Euclidean => 0,
            Norm::Manhattan => 1,
            Norm::Chebyshev => 2,
            Norm::Angular => 3,
            Norm::MeanPointwise => 4,
        }
    }

    /// Precompute whatever per-row statistics the metric needs over `data`.
    ///
    /// `point_dim` is the number of components per curve sample and is only
    /// consulted by [`Norm::MeanPointwise`].
    pub fn prepare(self, data: ArrayView2<'_, f32>, point_dim: usize) -> PreparedMetric<'_> {
        let row_norms = match self {
            Norm::Angular => data
                .outer_iter()
                .into_par_iter()
                .map(|row| row.dot(&row).sqrt())
                .collect(),
            _ => Vec::new(),
        };

        PreparedMetric {
            norm: self,
            data,
            point_dim: point_dim.max(1),
            row_norms,
        }
    }
}

/// A [`Norm`] bound to a dataset with its precomputed statistics
#[derive(Debug, Clone)]
pub struct PreparedMetric<'a> {
    norm: Norm,
    data: ArrayView2<'a, f32>,
    point_dim: usize,
    row_norms: Vec<f32>,
}

impl<'a> PreparedMetric<'a> {
    fn angular(&self, point: ArrayView1<'_, f32>, row: usize, row_norm: f32) -> f32 {
        let point_norm = point.dot(&point).sqrt();
        if point_norm == 0.0 && row_norm == 0.0 {
            return 0.0;
        }
        if point_norm == 0.0 || row_norm == 0.0 {
            return 1.0;
        }
        let cosine = point.dot(&self.data.row(row)) / (point_norm * row_norm);
        (1.0 - cosine).clamp(0.0, 2.0)
    }
}

impl PairDistance for PreparedMetric<'_> {
    fn len(&self) -> usize {
        self.data.nrows()
    }

    fn between(&self, a: usize, b: usize) -> f32 {
        if a == b {
            return 0.0;
        }
        match self.norm {
            Norm::Angular => self.angular(self.data.row(a), b, self.row_norms[b]),
            _ => self.to_row(self.data.row(a), b),
        }
    }
}

impl Dissimilarity for PreparedMetric<'_> {
    fn points(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    fn to_row(&self, point: ArrayView1<'_, f32>, row: usize) -> f32 {
        let other = self.data.row(row);
        let diffs = point.iter().zip(other.iter()).map(|(a, b)| a - b);

        match self.norm {
            Norm::Euclidean => diffs.map(|d| d * d).sum::<f32>().sqrt(),
            Norm::Manhattan => diffs.map(f32::abs).sum(),
            Norm::Chebyshev => diffs.fold(0.0, |acc, d| acc.max(d.abs())),
            Norm::Angular => self.angular(point, row, self.row_norms[row]),
            Norm::MeanPointwise => {
                let a = point.as_slice();
                let b = other.as_slice();
                match (a, b) {
                    (Some(a), Some(b)) => mean_pointwise(a, b, self.point_dim),
                    _ => {
                        let a = point.to_vec();
                        let b = other.to_vec();
                        mean_pointwise(&a, &b, self.point_dim)
                    }
                }
            }
        }
    }
}

/// Average Euclidean distance between corresponding `dim`-component samples
fn mean_pointwise(a: &[f32], b: &[f32], dim: usize) -> f32 {
    let samples = a.len() / dim;
    if samples == 0 {
        return 0.0;
    }

    let total: f32 = a
        .chunks_exact(dim)
        .zip(b.chunks_exact(dim))
        .map(|(p, q)| {
            p.iter()
                .zip(q)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()
        })
        .sum();

    total / samples as f32
}
