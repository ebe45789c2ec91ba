//! Core library functions for the streamline cluster analyzer

pub mod cluster;
pub mod config;
pub mod data;
pub mod distance;
pub mod error;
pub mod instrument;
pub mod pipeline;
pub mod reduction;
pub mod storage;

pub use cluster::seeds::InitStrategy;
pub use cluster::ClusterOutput;
pub use config::{Algorithm, Config};
pub use distance::Norm;
pub use error::{Error, Result};
pub use instrument::{EventSink, TimeRecorder};
pub use pipeline::{run, ClusteringReport};
