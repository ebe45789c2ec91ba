//! Results persistence module

use anyhow::Result;
use crate::config::Config;
use crate::instrument::TimeRecorder;
use crate::pipeline::ClusteringReport;
use itertools::Itertools;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use serde_json::{json, to_string_pretty};

/// Save analysis results to the specified directory
pub fn save_results(
    report: &ClusteringReport,
    recorder: &TimeRecorder,
    config: &Config,
    dims: (usize, usize),
    output_dir: &str,
) -> Result<()> {
    log::info!("Saving {} groups to {}", report.output.group_count, output_dir);

    fs::create_dir_all(output_dir)?;

    save_summary(report, recorder, config, dims, output_dir)?;
    save_clusters(report, output_dir)?;
    save_labels(report, output_dir)?;

    log::info!("Results saved successfully");

    Ok(())
}

/// Run settings, quality scores and recorded events
fn save_summary(
    report: &ClusteringReport,
    recorder: &TimeRecorder,
    config: &Config,
    (rows, cols): (usize, usize),
    output_dir: &str,
) -> Result<()> {
    log::info!("Saving summary information");

    let path = Path::new(output_dir).join("summary.json");
    let mut file = File::create(path)?;

    let output = &report.output;
    let group_sizes: Vec<usize> = output.labels.iter().counts().into_iter().sorted().map(|(_, n)| n).collect();

    let summary = json!({
        "dataset": {
            "curves": rows,
            "samples": cols,
        },
        "config": config,
        "cluster_stats": {
            "group_count": output.group_count,
            "group_sizes": group_sizes,
            "balanced_entropy": output.entropy,
            "principal_components": report.pc_number,
            "validity": report.validity,
            "silhouette": report.silhouette.as_ref().map(|s| s.average),
            "silhouette_per_group": report.silhouette.as_ref().map(|s| &s.per_group),
        },
        "kmeans": report.kmeans,
        "events": recorder.events,
    });

    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}

/// Per-group representatives and original-space centroids
fn save_clusters(report: &ClusteringReport, output_dir: &str) -> Result<()> {
    log::info!("Saving individual cluster information");

    let path = Path::new(output_dir).join("clusters.json");
    let mut file = File::create(path)?;

    let output = &report.output;
    let groups = output.groups();

    let clusters_json = json!({
        "clusters": output.centroids.iter().map(|c| {
            json!({
                "id": c.cluster,
                "size": groups[c.cluster].len(),
                "closest": output.closest.iter().find(|r| r.cluster == c.cluster).map(|r| r.index),
                "furthest": output.furthest.iter().find(|r| r.cluster == c.cluster).map(|r| r.index),
                "centroid": c.coordinates,
            })
        }).collect::<Vec<_>>()
    });

    file.write_all(to_string_pretty(&clusters_json)?.as_bytes())?;

    Ok(())
}

/// One `label size` line per curve, in input order
fn save_labels(report: &ClusteringReport, output_dir: &str) -> Result<()> {
    let path = Path::new(output_dir).join("labels.txt");
    let mut file = File::create(path)?;

    let output = &report.output;
    let lines = output
        .labels
        .iter()
        .zip(&output.sizes)
        .map(|(label, size)| format!("{} {}", label, size))
        .join("\n");

    writeln!(file, "{}", lines)?;

    Ok(())
}
