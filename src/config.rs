//! Configuration management for the streamline cluster analyzer

use crate::cluster::seeds::InitStrategy;
use crate::distance::Norm;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Clustering performed after the optional reduction step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Lloyd k-means
    Kmeans,
    /// Average-linkage agglomerative hierarchical clustering
    Ahc,
}

/// Settings for one clustering run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of clusters requested
    pub clusters: usize,

    /// Cluster on variance-reduced coordinates instead of raw curves
    pub reduction: bool,

    /// Clustering algorithm
    pub algorithm: Algorithm,

    /// Initial centroid strategy for k-means
    pub init: InitStrategy,

    /// Dissimilarity used in raw space
    pub norm: Norm,

    /// Components per curve sample (3 for spatial streamlines)
    pub point_dim: usize,

    /// Dataset where full distance matrices are never cached
    pub special_dataset: bool,

    /// Directory for cached distance matrices
    pub cache_dir: Option<PathBuf>,

    /// Seed for centroid initialization
    pub seed: u64,

    /// Worker threads (0 = all available cores)
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            clusters: 8,
            reduction: true,
            algorithm: Algorithm::Kmeans,
            init: InitStrategy::Samples,
            norm: Norm::Euclidean,
            point_dim: 3,
            special_dataset: false,
            cache_dir: None,
            seed: 42,
            threads: 0,
        }
    }
}

impl Config {
    /// Create a new configuration for the given cluster count and algorithm
    pub fn new(clusters: usize, reduction: bool, algorithm: Algorithm) -> Self {
        Self {
            clusters,
            reduction,
            algorithm,
            ..Self::default()
        }
    }

    /// Check the configuration against a `rows × cols` dataset
    pub fn validate(&self, rows: usize, cols: usize) -> Result<()> {
        if rows == 0 || cols == 0 {
            return Err(Error::EmptyInput);
        }

        if self.clusters == 0 {
            return Err(Error::InvalidClusterCount {
                requested: self.clusters,
                n_items: rows,
            });
        }

        if self.clusters > rows {
            log::warn!(
                "Requested {} clusters for {} curves, some clusters will stay empty",
                self.clusters,
                rows
            );
        }

        // Reduced runs always measure Euclidean distance
        let pointwise = !self.reduction && self.norm == Norm::MeanPointwise;
        if pointwise && (self.point_dim == 0 || cols % self.point_dim != 0) {
            return Err(Error::InvalidParameter {
                name: "point_dim",
                message: format!("{} samples cannot be split into {}-component points", cols, self.point_dim),
            });
        }

        Ok(())
    }
}
