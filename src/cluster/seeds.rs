//! Initial centroid generation

use crate::data::preprocessing::column_bounds;
use crate::distance::Dissimilarity;
use ndarray::Array2;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the first k centroids are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InitStrategy {
    /// Uniform random positions inside the data's bounding box
    RandomPosition,
    /// Distinct rows drawn at random from the data
    Samples,
    /// Greedy farthest-point sampling under the active metric
    FarSamples,
}

impl InitStrategy {
    /// Produce a `k × D` centroid matrix over the metric's prepared rows
    pub fn generate<M: Dissimilarity + ?Sized>(self, metric: &M, k: usize, seed: u64) -> Array2<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let points = metric.points();
        if points.nrows() == 0 || k == 0 {
            return Array2::zeros((k, points.ncols()));
        }

        match self {
            InitStrategy::RandomPosition => random_positions(metric, k, &mut rng),
            InitStrategy::Samples => from_samples(metric, k, &mut rng),
            InitStrategy::FarSamples => far_samples(metric, k, &mut rng),
        }
    }
}

fn random_positions<M: Dissimilarity + ?Sized>(metric: &M, k: usize, rng: &mut ChaCha8Rng) -> Array2<f32> {
    let bounds = column_bounds(metric.points());
    let mut centroids = Array2::zeros((k, bounds.len()));

    for mut row in centroids.rows_mut() {
        for (cell, &(lo, hi)) in row.iter_mut().zip(&bounds) {
            *cell = lo + rng.gen::<f32>() * (hi - lo);
        }
    }

    centroids
}

fn from_samples<M: Dissimilarity + ?Sized>(metric: &M, k: usize, rng: &mut ChaCha8Rng) -> Array2<f32> {
    let points = metric.points();
    let n = points.nrows();

    // Distinct rows first; only repeat once the dataset is exhausted
    let mut picks = index::sample(rng, n, k.min(n)).into_vec();
    while picks.len() < k {
        picks.push(rng.gen_range(0..n));
    }

    let mut centroids = Array2::zeros((k, points.ncols()));
    for (mut row, &i) in centroids.rows_mut().into_iter().zip(&picks) {
        row.assign(&points.row(i));
    }
    centroids
}

fn far_samples<M: Dissimilarity + ?Sized>(metric: &M, k: usize, rng: &mut ChaCha8Rng) -> Array2<f32> {
    let points = metric.points();
    let n = points.nrows();
    let mut centroids = Array2::zeros((k, points.ncols()));

    let first = rng.gen_range(0..n);
    centroids.row_mut(0).assign(&points.row(first));

    // Distance of every row to its nearest chosen centroid
    let mut nearest: Vec<f32> = (0..n)
        .into_par_iter()
        .map(|i| metric.to_row(points.row(first), i))
        .collect();

    for c in 1..k {
        // First row with the largest distance wins
        let mut pick = 0;
        let mut best = f32::MIN;
        for (i, &d) in nearest.iter().enumerate() {
            if d > best {
                best = d;
                pick = i;
            }
        }

        centroids.row_mut(c).assign(&points.row(pick));
        let chosen = points.row(pick);
        nearest.par_iter_mut().enumerate().for_each(|(i, d)| {
            *d = d.min(metric.to_row(chosen, i));
        });
    }

    centroids
}
