//! Orchestration of reduction, clustering, finalization and evaluation

use crate::cluster::finalize::{finalize, Projection};
use crate::cluster::kmeans::{self, StopReason};
use crate::cluster::metrics::{
    CompactnessRatio, Silhouette, SilhouetteEvaluator, SilhouetteScores, ValidityEvaluator,
};
use crate::cluster::{ahc, ClusterOutput, RawClustering};
use crate::config::{Algorithm, Config};
use crate::distance::{cache, Dissimilarity, DistanceMatrix, Norm, PairDistance};
use crate::error::Result;
use crate::instrument::{timed, EventSink};
use crate::reduction::reduce;
use ndarray::ArrayView2;
use serde::Serialize;

/// Quality evaluators invoked after finalization
#[derive(Clone, Copy)]
pub struct Evaluators<'a> {
    pub validity: &'a dyn ValidityEvaluator,
    pub silhouette: &'a dyn SilhouetteEvaluator,
}

impl Default for Evaluators<'static> {
    fn default() -> Self {
        Self {
            validity: &CompactnessRatio,
            silhouette: &Silhouette,
        }
    }
}

/// How a k-means run ended
#[derive(Debug, Clone, Serialize)]
pub struct KmeansSummary {
    pub iterations: usize,
    pub stop: StopReason,
    pub displacements: Vec<f32>,
}

/// Everything one run produces
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub output: ClusterOutput,

    /// Retained directions when clustering ran in reduced space
    pub pc_number: Option<usize>,

    /// Present for k-means runs
    pub kmeans: Option<KmeansSummary>,

    /// Skipped when fewer than two groups were produced
    pub validity: Option<f32>,
    pub silhouette: Option<SilhouetteScores>,
}

/// Cluster `data` (`Row × Column`) with the default evaluators
pub fn run(data: ArrayView2<f32>, config: &Config, sink: &mut dyn EventSink) -> Result<ClusteringReport> {
    run_with(data, config, Evaluators::default(), sink)
}

/// Cluster `data` with caller-provided evaluators
pub fn run_with(
    data: ArrayView2<f32>,
    config: &Config,
    evaluators: Evaluators<'_>,
    sink: &mut dyn EventSink,
) -> Result<ClusteringReport> {
    let (rows, cols) = data.dim();
    config.validate(rows, cols)?;

    log::info!(
        "Clustering {} curves ({} samples) into {} groups with {:?}, reduction {}",
        rows,
        cols,
        config.clusters,
        config.algorithm,
        if config.reduction { "on" } else { "off" }
    );

    if config.reduction {
        run_reduced(data, config, evaluators, sink)
    } else {
        run_raw(data, config, evaluators, sink)
    }
}

fn run_reduced(
    data: ArrayView2<f32>,
    config: &Config,
    evaluators: Evaluators<'_>,
    sink: &mut dyn EventSink,
) -> Result<ClusteringReport> {
    let reduction = reduce(data, sink)?;
    let metric = Norm::Euclidean.prepare(reduction.coordinates.view(), 1);

    let (raw, kmeans) = cluster_with(config, &metric, None, sink);

    let projection = Projection {
        basis: reduction.basis.view(),
        mean: reduction.mean.view(),
    };
    let output = finalize(&raw, &metric, Some(projection));

    let (validity, silhouette) = evaluate(&metric, &output, evaluators, sink);

    Ok(ClusteringReport {
        output,
        pc_number: Some(reduction.pc_number),
        kmeans,
        validity,
        silhouette,
    })
}

fn run_raw(
    data: ArrayView2<f32>,
    config: &Config,
    evaluators: Evaluators<'_>,
    sink: &mut dyn EventSink,
) -> Result<ClusteringReport> {
    let metric = config.norm.prepare(data, config.point_dim);
    sink.record("For norm ".to_string(), config.norm.id().to_string());

    // AHC needs the full matrix up front; k-means only for evaluation
    let mut matrix = match config.algorithm {
        Algorithm::Ahc => Some(distance_matrix(config, &metric)?),
        Algorithm::Kmeans => None,
    };

    let (raw, kmeans) = cluster_with(config, &metric, matrix.as_ref(), sink);
    let output = finalize(&raw, &metric, None);

    let (validity, silhouette) = if output.group_count <= 1 {
        log::warn!("Only {} group produced, skipping evaluation", output.group_count);
        (None, None)
    } else if config.special_dataset {
        evaluate(&metric, &output, evaluators, sink)
    } else {
        if matrix.is_none() {
            matrix = Some(distance_matrix(config, &metric)?);
        }
        match matrix.as_ref() {
            Some(m) => evaluate(m, &output, evaluators, sink),
            None => (None, None),
        }
    };

    Ok(ClusteringReport {
        output,
        pc_number: None,
        kmeans,
        validity,
        silhouette,
    })
}

/// Full distance matrix under the configured caching rules
fn distance_matrix<M: Dissimilarity + ?Sized>(config: &Config, metric: &M) -> Result<DistanceMatrix> {
    match (&config.cache_dir, config.special_dataset) {
        (Some(dir), false) => cache::load_or_compute(dir, config.norm, metric),
        _ => Ok(DistanceMatrix::compute(metric)),
    }
}

/// Run the configured algorithm; returns the raw clustering indexed by raw id
fn cluster_with<M: Dissimilarity + ?Sized>(
    config: &Config,
    metric: &M,
    matrix: Option<&DistanceMatrix>,
    sink: &mut dyn EventSink,
) -> (RawClustering, Option<KmeansSummary>) {
    let k = config.clusters;

    match config.algorithm {
        Algorithm::Kmeans => {
            let seeds = config.init.generate(metric, k, config.seed);
            let fit = timed(sink, "k-means iteration takes: ", || kmeans::cluster(metric, seeds));

            let summary = KmeansSummary {
                iterations: fit.iterations(),
                stop: fit.stop,
                displacements: fit.displacements,
            };
            let raw = RawClustering {
                members: fit.members,
                centroids: fit.centroids,
            };
            (raw, Some(summary))
        }
        Algorithm::Ahc => {
            let computed;
            let matrix = match matrix {
                Some(m) => m,
                None => {
                    computed = DistanceMatrix::compute(metric);
                    &computed
                }
            };

            let event = format!("Hierarchical clustering for {} groups takes: ", k);
            let nodes = timed(sink, &event, || ahc::merge(matrix, k));
            (ahc::label_nodes(&nodes, metric.points()), None)
        }
    }
}

/// Silhouette and validity scores, recorded on the sink
fn evaluate(
    distances: &dyn PairDistance,
    output: &ClusterOutput,
    evaluators: Evaluators<'_>,
    sink: &mut dyn EventSink,
) -> (Option<f32>, Option<SilhouetteScores>) {
    if output.group_count <= 1 {
        return (None, None);
    }

    let scores = timed(sink, "Clustering evaluation computing takes: ", || {
        evaluators
            .silhouette
            .evaluate(distances, &output.labels, output.group_count)
    });
    let validity = evaluators.validity.evaluate(distances, &output.labels);

    sink.record("Validity measure is: ".to_string(), validity.to_string());
    sink.record("Silhouette is: ".to_string(), scores.average.to_string());
    log::info!(
        "Balanced entropy {:.4}, validity {:.4}, silhouette {:.4}",
        output.entropy,
        validity,
        scores.average
    );

    (Some(validity), Some(scores))
}
