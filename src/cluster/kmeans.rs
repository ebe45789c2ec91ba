//! Lloyd k-means over reduced or raw curve coordinates

use crate::data::preprocessing::mean_of_rows;
use crate::distance::Dissimilarity;
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::Serialize;

/// Hard cap on Lloyd rounds
pub const MAX_ITERATIONS: usize = 20;

/// Relative change in displacement below which the run is considered converged
pub const RELATIVE_TOLERANCE: f32 = 1.0e-2;

/// Displacement at or below which centroids are considered settled
pub const MIN_DISPLACEMENT: f32 = 1.0e-2;

/// Displacement assumed before the first round
const INITIAL_DISPLACEMENT: f32 = 1000.0;

/// Which stopping rule ended the iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// Displacement changed by less than [`RELATIVE_TOLERANCE`] between rounds
    Converged,
    /// [`MAX_ITERATIONS`] rounds were run
    IterationCap,
    /// Displacement fell to [`MIN_DISPLACEMENT`] or below
    Settled,
}

/// Result of a k-means run, indexed by raw cluster id
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Raw cluster id of every point
    pub labels: Vec<usize>,

    /// Point indices of every cluster, ascending
    pub members: Vec<Vec<usize>>,

    /// Final centroid of every cluster
    pub centroids: Array2<f32>,

    /// Maximum centroid displacement of each round
    pub displacements: Vec<f32>,

    pub stop: StopReason,
}

impl KmeansFit {
    pub fn iterations(&self) -> usize {
        self.displacements.len()
    }

    /// Population of every raw cluster
    pub fn sizes(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }
}

/// Decide whether to stop after a round.
///
/// Mirrors the continuation test `rel >= tol && iterations < cap && moving > min`;
/// the first failing clause is reported.
pub fn stop_reason(before: f32, moving: f32, iterations: usize) -> Option<StopReason> {
    let relative = (moving - before).abs() / before;
    if !(relative >= RELATIVE_TOLERANCE) {
        Some(StopReason::Converged)
    } else if iterations >= MAX_ITERATIONS {
        Some(StopReason::IterationCap)
    } else if moving <= MIN_DISPLACEMENT {
        Some(StopReason::Settled)
    } else {
        None
    }
}

/// Run Lloyd iterations from `seeds` over the metric's prepared rows.
///
/// Empty clusters keep their previous centroid and do not contribute to the
/// round's displacement.
pub fn cluster<M: Dissimilarity + ?Sized>(metric: &M, seeds: Array2<f32>) -> KmeansFit {
    let points = metric.points();
    let n = points.nrows();
    let k = seeds.nrows();
    let mut centroids = seeds;

    log::info!("K-means start: {} points, {} clusters", n, k);

    let mut labels: Vec<usize>;
    let mut members: Vec<Vec<usize>>;
    let mut displacements = Vec::new();
    let mut moving = INITIAL_DISPLACEMENT;

    let stop = loop {
        let before = moving;

        // Assignment is independent per point
        labels = (0..n)
            .into_par_iter()
            .map(|i| nearest_centroid(metric, &centroids, i))
            .collect();

        members = group_members(&labels, k);

        // Each cluster is owned by one worker while its mean is recomputed
        let updates: Vec<Option<(Array1<f32>, f32)>> = members
            .par_iter()
            .enumerate()
            .map(|(c, rows)| {
                if rows.is_empty() {
                    return None;
                }
                let mean = mean_of_rows(points, rows);
                let shift = euclidean(mean.view(), centroids.row(c));
                Some((mean, shift))
            })
            .collect();

        moving = f32::MIN_POSITIVE;
        for (c, update) in updates.into_iter().enumerate() {
            if let Some((mean, shift)) = update {
                centroids.row_mut(c).assign(&mean);
                moving = moving.max(shift);
            }
        }

        displacements.push(moving);
        log::debug!(
            "K-means iteration {} completed, and moving is {}",
            displacements.len(),
            moving
        );

        if let Some(reason) = stop_reason(before, moving, displacements.len()) {
            break reason;
        }
    };

    let empty = members.iter().filter(|m| m.is_empty()).count();
    if empty > 0 {
        log::warn!("{} of {} clusters ended empty", empty, k);
    }
    log::info!(
        "K-means finished after {} iterations ({:?})",
        displacements.len(),
        stop
    );

    KmeansFit {
        labels,
        members,
        centroids,
        displacements,
        stop,
    }
}

/// Index of the closest centroid, first minimum wins
fn nearest_centroid<M: Dissimilarity + ?Sized>(metric: &M, centroids: &Array2<f32>, row: usize) -> usize {
    let mut best = f32::MAX;
    let mut best_idx = 0;
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let d = metric.to_row(centroid, row);
        if d < best {
            best = d;
            best_idx = c;
        }
    }
    best_idx
}

/// Bucket point indices by label, preserving ascending index order
pub(crate) fn group_members(labels: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut members = vec![Vec::new(); k];
    for (i, &label) in labels.iter().enumerate() {
        members[label].push(i);
    }
    members
}

fn euclidean(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Norm;
    use ndarray::array;

    fn blobs() -> Array2<f32> {
        array![[0.0f32, 0.0], [0.0, 1.0], [1.0, 0.0], [10.0, 10.0], [10.0, 11.0], [11.0, 10.0]]
    }

    #[test]
    fn separates_two_blobs() {
        let data = blobs();
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let fit = cluster(&metric, array![[0.0f32, 0.0], [10.0, 10.0]]);

        assert_eq!(fit.members, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(fit.labels, vec![0, 0, 0, 1, 1, 1]);
        assert!((fit.centroids[[1, 0]] - 31.0 / 3.0).abs() < 1e-5);
        assert_eq!(fit.sizes(), vec![3, 3]);
    }

    #[test]
    fn empty_cluster_centroid_is_untouched() {
        let data = blobs();
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let fit = cluster(&metric, array![[0.0f32, 0.0], [10.0, 10.0], [500.0, 500.0]]);

        assert!(fit.members[2].is_empty());
        assert_eq!(fit.centroids.row(2), array![500.0f32, 500.0]);
    }

    #[test]
    fn ties_go_to_first_centroid() {
        let data = array![[0.0f32], [2.0]];
        let metric = Norm::Euclidean.prepare(data.view(), 1);
        let centroids = array![[1.0f32], [1.0]];
        assert_eq!(nearest_centroid(&metric, &centroids, 0), 0);
        assert_eq!(nearest_centroid(&metric, &centroids, 1), 0);
    }

    #[test]
    fn stop_rules_follow_continuation_test() {
        assert_eq!(stop_reason(1000.0, 1000.0, 1), Some(StopReason::Converged));
        assert_eq!(stop_reason(10.0, 5.0, MAX_ITERATIONS), Some(StopReason::IterationCap));
        assert_eq!(stop_reason(10.0, 0.005, 3), Some(StopReason::Settled));
        assert_eq!(stop_reason(10.0, 5.0, 3), None);
        assert_eq!(stop_reason(f32::MIN_POSITIVE, f32::MIN_POSITIVE, 2), Some(StopReason::Converged));
    }

    #[test]
    fn never_exceeds_iteration_cap() {
        // Slowly drifting data under a non-Euclidean metric
        let data = Array2::from_shape_fn((60, 3), |(i, j)| ((i * 31 + j * 17) % 23) as f32 * 0.7);
        let metric = Norm::Chebyshev.prepare(data.view(), 1);
        let seeds = data.slice(ndarray::s![0..7, ..]).to_owned();
        let fit = cluster(&metric, seeds);

        assert!(fit.iterations() >= 1 && fit.iterations() <= MAX_ITERATIONS);
        assert!(fit.displacements.iter().all(|&d| d >= 0.0));
        let n: usize = fit.sizes().iter().sum();
        assert_eq!(n, 60);
    }
}
