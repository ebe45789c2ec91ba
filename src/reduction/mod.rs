//! Variance-ranked dimensionality reduction of the curve matrix
//!
//! The centered dataset is factored with a thin singular value decomposition.
//! Every right singular vector becomes a candidate direction; directions are
//! ranked by the energy (squared norm) of the data projected on them and the
//! shortest prefix explaining more than [`ENERGY_RATIO`] of the total energy
//! is kept.

use crate::data::preprocessing::{center, column_means};
use crate::error::{Error, Result};
use crate::instrument::{seconds, EventSink};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::Instant;

/// Fraction of total energy the retained directions must exceed
pub const ENERGY_RATIO: f64 = 0.999;

/// Output of [`reduce`]
#[derive(Debug, Clone)]
pub struct Reduction {
    /// `Row × pc_number` coefficients of the centered data
    pub coordinates: Array2<f32>,

    /// `pc_number × Column` orthonormal basis, one direction per row
    pub basis: Array2<f32>,

    /// Column means subtracted before factoring
    pub mean: Array1<f32>,

    /// Number of retained directions
    pub pc_number: usize,

    /// Energy of every candidate direction in ranked (decreasing) order
    pub energies: Vec<f64>,
}

impl Reduction {
    /// Map reduced-space rows back to original coordinates (`rows × basis + mean`)
    pub fn reconstruct(&self, rows: ArrayView2<f32>) -> Array2<f32> {
        rows.dot(&self.basis) + &self.mean
    }

    /// Total energy of the centered data
    pub fn total_energy(&self) -> f64 {
        self.energies.iter().sum()
    }
}

/// Reduce `data` (`Row × Column`) to its leading variance directions.
///
/// Records the factorization wall time on `sink`.
pub fn reduce(data: ArrayView2<f32>, sink: &mut dyn EventSink) -> Result<Reduction> {
    let (rows, cols) = data.dim();
    if rows == 0 || cols == 0 {
        return Err(Error::EmptyInput);
    }

    let mean = column_means(data);
    let centered = center(data, mean.view());

    // Thin SVD, right singular vectors only
    let start = Instant::now();
    let factored = DMatrix::<f32>::from_fn(rows, cols, |i, j| centered[[i, j]])
        .try_svd(false, true, f32::EPSILON, 0)
        .ok_or_else(|| Error::Decomposition("SVD did not converge".to_string()))?;
    let v_t = factored
        .v_t
        .ok_or_else(|| Error::Decomposition("right singular vectors missing".to_string()))?;
    sink.record("SVD takes: ".to_string(), seconds(start.elapsed()));

    let directions = Array2::from_shape_fn((v_t.nrows(), cols), |(i, j)| v_t[(i, j)]);

    // Coefficients of every curve on every direction
    let coefficients = centered.dot(&directions.t());

    let raw_energy: Vec<f64> = coefficients
        .axis_iter(Axis(1))
        .into_par_iter()
        .map(|c| c.iter().map(|&v| (v as f64) * (v as f64)).sum())
        .collect();

    // Stable sort keeps decomposition order among equal energies
    let mut order: Vec<usize> = (0..raw_energy.len()).collect();
    order.sort_by(|&a, &b| {
        raw_energy[b]
            .partial_cmp(&raw_energy[a])
            .unwrap_or(Ordering::Equal)
    });
    let energies: Vec<f64> = order.iter().map(|&i| raw_energy[i]).collect();

    let pc_number = select_pc_number(&energies);
    let kept = &order[..pc_number];

    log::info!(
        "SVD completed: kept {} of {} directions",
        pc_number,
        energies.len()
    );

    Ok(Reduction {
        coordinates: coefficients.select(Axis(1), kept),
        basis: directions.select(Axis(0), kept),
        mean,
        pc_number,
        energies,
    })
}

/// Smallest prefix of `energies` whose sum exceeds `ENERGY_RATIO` of the total.
///
/// Zero total energy (all curves identical) keeps a single direction.
pub fn select_pc_number(energies: &[f64]) -> usize {
    if energies.is_empty() {
        return 0;
    }

    let total: f64 = energies.iter().sum();
    if total <= 0.0 {
        log::warn!("Dataset has zero variance, keeping a single direction");
        return 1;
    }

    let threshold = ENERGY_RATIO * total;
    let mut cumulative = 0.0;
    for (i, &e) in energies.iter().enumerate() {
        cumulative += e;
        if cumulative > threshold {
            return i + 1;
        }
    }

    energies.len()
}
