//! Cluster quality statistics

use crate::distance::PairDistance;
use rayon::prelude::*;
use serde::Serialize;

/// Shannon entropy of the cluster-size distribution normalized by the maximum
/// entropy for the number of non-empty clusters.
///
/// Returns 0 when at most one cluster is non-empty.
pub fn balanced_entropy(sizes: &[usize], total: usize) -> f32 {
    let non_empty: Vec<usize> = sizes.iter().copied().filter(|&s| s > 0).collect();
    if non_empty.len() <= 1 || total == 0 {
        return 0.0;
    }

    let entropy: f64 = non_empty
        .iter()
        .map(|&s| {
            let p = s as f64 / total as f64;
            p * p.log2()
        })
        .sum();

    let balanced = -entropy / (non_empty.len() as f64).log2();
    balanced.clamp(0.0, 1.0) as f32
}

/// Scores a labeling against pairwise curve distances
pub trait ValidityEvaluator: Sync {
    fn evaluate(&self, distances: &dyn PairDistance, labels: &[usize]) -> f32;
}

/// Mean intra-cluster distance divided by mean inter-cluster distance.
///
/// Lower is better; 0 when either kind of pair is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactnessRatio;

impl ValidityEvaluator for CompactnessRatio {
    fn evaluate(&self, distances: &dyn PairDistance, labels: &[usize]) -> f32 {
        let n = labels.len();

        // (intra sum, intra count, inter sum, inter count)
        let (intra, n_intra, inter, n_inter) = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut acc = (0.0f64, 0usize, 0.0f64, 0usize);
                for j in (i + 1)..n {
                    let d = distances.between(i, j) as f64;
                    if labels[i] == labels[j] {
                        acc.0 += d;
                        acc.1 += 1;
                    } else {
                        acc.2 += d;
                        acc.3 += 1;
                    }
                }
                acc
            })
            .reduce(
                || (0.0, 0, 0.0, 0),
                |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3),
            );

        if n_intra == 0 || n_inter == 0 || inter == 0.0 {
            return 0.0;
        }
        ((intra / n_intra as f64) / (inter / n_inter as f64)) as f32
    }
}

/// Silhouette coefficients of a labeling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SilhouetteScores {
    /// Coefficient of every curve
    pub per_curve: Vec<f32>,

    /// Mean coefficient of every group
    pub per_group: Vec<f32>,

    /// Mean coefficient over all curves
    pub average: f32,
}

/// Computes silhouette coefficients for a labeling
pub trait SilhouetteEvaluator: Sync {
    fn evaluate(&self, distances: &dyn PairDistance, labels: &[usize], groups: usize) -> SilhouetteScores;
}

/// Classic silhouette: `(b − a) / max(a, b)` with `a` the mean distance to the
/// own group and `b` the smallest mean distance to another group.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silhouette;

impl SilhouetteEvaluator for Silhouette {
    fn evaluate(&self, distances: &dyn PairDistance, labels: &[usize], groups: usize) -> SilhouetteScores {
        let n = labels.len();
        let mut group_sizes = vec![0usize; groups];
        for &l in labels {
            group_sizes[l] += 1;
        }

        let per_curve: Vec<f32> = (0..n)
            .into_par_iter()
            .map(|i| {
                let own = labels[i];
                if group_sizes[own] <= 1 {
                    return 0.0;
                }

                let mut sums = vec![0.0f64; groups];
                for j in 0..n {
                    if j != i {
                        sums[labels[j]] += distances.between(i, j) as f64;
                    }
                }

                let a = sums[own] / (group_sizes[own] - 1) as f64;
                let b = (0..groups)
                    .filter(|&g| g != own && group_sizes[g] > 0)
                    .map(|g| sums[g] / group_sizes[g] as f64)
                    .fold(f64::INFINITY, f64::min);

                if !b.is_finite() {
                    return 0.0;
                }
                let scale = a.max(b);
                if scale == 0.0 {
                    0.0
                } else {
                    ((b - a) / scale) as f32
                }
            })
            .collect();

        let mut group_sums = vec![0.0f64; groups];
        for (i, &s) in per_curve.iter().enumerate() {
            group_sums[labels[i]] += s as f64;
        }
        let per_group = group_sums
            .iter()
            .zip(&group_sizes)
            .map(|(&sum, &size)| if size == 0 { 0.0 } else { (sum / size as f64) as f32 })
            .collect();

        let average = if n == 0 {
            0.0
        } else {
            (per_curve.iter().map(|&s| s as f64).sum::<f64>() / n as f64) as f32
        };

        SilhouetteScores {
            per_curve,
            per_group,
            average,
        }
    }
}
