//! Clustering engines and their shared result types

pub mod ahc;
pub mod finalize;
pub mod kmeans;
pub mod metrics;
pub mod seeds;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Clustering indexed by raw cluster id, before relabeling
#[derive(Debug, Clone, PartialEq)]
pub struct RawClustering {
    /// Curve indices of every raw cluster, in member-list order
    pub members: Vec<Vec<usize>>,

    /// Centroid of every raw cluster in the space the clustering ran in
    pub centroids: Array2<f32>,
}

/// A curve chosen to represent its cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representative {
    /// Curve index
    pub index: usize,

    /// Relabeled cluster id
    pub cluster: usize,
}

/// A cluster centroid in original coordinate space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanCentroid {
    pub coordinates: Vec<f32>,

    /// Relabeled cluster id
    pub cluster: usize,
}

/// Final per-curve and per-cluster results of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOutput {
    /// Cluster id of every curve; ids ascend with cluster population
    pub labels: Vec<usize>,

    /// Population of every curve's own cluster
    pub sizes: Vec<usize>,

    /// Member closest to each centroid
    pub closest: Vec<Representative>,

    /// Member furthest from each centroid
    pub furthest: Vec<Representative>,

    pub centroids: Vec<MeanCentroid>,

    /// Normalized entropy of the size distribution in `[0, 1]`
    pub entropy: f32,

    /// Number of non-empty clusters
    pub group_count: usize,
}

impl ClusterOutput {
    /// Curve indices of every relabeled cluster
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.group_count];
        for (i, &label) in self.labels.iter().enumerate() {
            groups[label].push(i);
        }
        groups
    }
}
