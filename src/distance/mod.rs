//! Dissimilarity measures, pairwise matrices and their on-disk cache

pub mod cache;
pub mod matrix;
pub mod metric;

pub use matrix::DistanceMatrix;
pub use metric::{Dissimilarity, Norm, PairDistance, PreparedMetric};
