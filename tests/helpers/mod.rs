#![allow(dead_code)]

use ndarray::{array, Array2};
use streamline_cluster::{Algorithm, Config, InitStrategy};

/// Two well separated triangles of points
pub fn blobs() -> Array2<f32> {
    array![[0.0f32, 0.0], [0.0, 1.0], [1.0, 0.0], [10.0, 10.0], [10.0, 11.0], [11.0, 10.0]]
}

/// `per_family` noisy straight streamlines along two distinct directions,
/// `samples` points of three components each
pub fn streamlines(per_family: usize, samples: usize) -> Array2<f32> {
    let cols = samples * 3;
    Array2::from_shape_fn((per_family * 2, cols), |(row, col)| {
        let family = row / per_family;
        let member = (row % per_family) as f32;
        let t = (col / 3) as f32;
        let jitter = 0.01 * member;
        match (family, col % 3) {
            (0, 0) => t + jitter,
            (0, _) => jitter,
            (_, 2) => t + jitter,
            (_, 0) => 5.0 + jitter,
            _ => jitter,
        }
    })
}

/// Two-group run with far-apart seeding
pub fn two_groups(reduction: bool, algorithm: Algorithm) -> Config {
    let mut config = Config::new(2, reduction, algorithm);
    config.init = InitStrategy::FarSamples;
    config
}

/// Sorted groups, each with ascending members
pub fn sorted_groups(mut groups: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    for g in &mut groups {
        g.sort_unstable();
    }
    groups.sort();
    groups
}
