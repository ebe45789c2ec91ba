use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use streamline_cluster::{data, pipeline, storage, Algorithm, Config, InitStrategy, Norm, TimeRecorder};

#[derive(Parser, Debug)]
#[clap(
    name = "streamline-cluster",
    about = "Cluster streamlines and pathlines with k-means or hierarchical merging"
)]
struct Cli {
    /// Path to whitespace-separated curve file, one curve per line
    #[clap(long)]
    input: String,

    /// Output directory for results
    #[clap(long, default_value = "cluster_results")]
    output_dir: String,

    /// Number of clusters requested
    #[clap(long, default_value = "8")]
    clusters: usize,

    /// Clustering algorithm
    #[clap(long, value_enum, default_value = "kmeans")]
    algorithm: Algorithm,

    /// Cluster raw curves instead of reduced coordinates
    #[clap(long)]
    no_reduction: bool,

    /// Initial centroid strategy for k-means
    #[clap(long, value_enum, default_value = "samples")]
    init: InitStrategy,

    /// Dissimilarity used without reduction
    #[clap(long, value_enum, default_value = "euclidean")]
    norm: Norm,

    /// Components per curve sample
    #[clap(long, default_value = "3")]
    point_dim: usize,

    /// Never cache the full distance matrix for this dataset
    #[clap(long)]
    special_dataset: bool,

    /// Directory for cached distance matrices
    #[clap(long)]
    cache_dir: Option<PathBuf>,

    /// Seed for centroid initialization
    #[clap(long, default_value = "42")]
    seed: u64,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            clusters: self.clusters,
            reduction: !self.no_reduction,
            algorithm: self.algorithm,
            init: self.init,
            norm: self.norm,
            point_dim: self.point_dim,
            special_dataset: self.special_dataset,
            cache_dir: self.cache_dir.clone(),
            seed: self.seed,
            threads: self.threads,
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let config = args.config();

    let num_threads = if config.threads > 0 {
        config.threads
    } else {
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    log::info!("Starting streamline cluster analysis");
    log::info!("Input: {}", args.input);
    log::info!("Output: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    // 1. Load curves
    let curves = data::load_dataset(&args.input)?;
    log::info!("Loaded {} curves with {} samples each", curves.nrows(), curves.ncols());

    // 2. Reduce, cluster, finalize and evaluate
    let mut recorder = TimeRecorder::new();
    let report = pipeline::run(curves.view(), &config, &mut recorder)?;

    log::info!("Found {} groups", report.output.group_count);
    for event in &recorder.events {
        log::debug!("{}{}", event.event, event.value);
    }

    // 3. Save results
    storage::save_results(&report, &recorder, &config, curves.dim(), &args.output_dir)?;

    log::info!("Analysis complete. Results saved to {}", args.output_dir);

    Ok(())
}
