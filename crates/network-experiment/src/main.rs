//! Network Experiment CLI.
//!
//! Commands:
//! - single: Run one trial and print its trace
//! - sweep-b: Cooperation versus the temptation b
//! - sweep-alpha: Cooperation versus the stranger cost alpha
//! - compare: Persistent connections (PC) versus ephemeral connections (EC)
//! - snapshot: Strategy grids of a lattice run at chosen rounds
//! - heterogeneity: Trial-averaged degree CV and cooperation over time

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cooperation_kernel::{ModelConfig, TopologyKind};
use network_experiment::experiment::{ExperimentRunner, ExperimentRunnerConfig};
use network_experiment::results::{
    average_history, format_duration, format_trace_line, write_averaged_trace, write_trace,
    GridResults,
};
use network_experiment::snapshot::{save_snapshots, write_grids};
use network_experiment::sweep::{compare_connections, sweep, SweepParameter};

/// Generate a timestamped output path from the given path.
/// e.g., "sweep_b.json" -> "sweep_b-20260108-010530.json"
fn timestamped_path(path: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("results");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}-{}.{}", stem, timestamp, ext))
}

#[derive(Parser)]
#[command(name = "network-experiment")]
#[command(version)]
#[command(about = "Cooperation with ephemeral connections on lattice and random networks")]
struct Cli {
    /// JSON model configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Network topology: er or lattice
    #[arg(long)]
    topology: Option<String>,

    /// Number of nodes (a perfect square for the lattice)
    #[arg(long)]
    size: Option<usize>,

    /// Half the mean degree R (Erdos-Renyi only)
    #[arg(long = "half-degree")]
    half_degree: Option<usize>,

    /// Memory length M
    #[arg(long)]
    memory: Option<usize>,

    /// Cooperation ratio threshold r below which agents seek strangers
    #[arg(long)]
    threshold: Option<f64>,

    /// Stranger attempts per round
    #[arg(long)]
    attempts: Option<usize>,

    /// Rounds per trial
    #[arg(long, default_value = "10")]
    steps: usize,

    /// Final rounds averaged into the stationary cooperation level
    #[arg(long, default_value = "10")]
    window: usize,

    /// Maximum trials running at once (default: available cores)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Directory for output files
    #[arg(long = "out-dir", env = "NETWORK_EXPERIMENT_OUT", default_value = ".")]
    out_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single trial
    Single {
        /// Temptation b
        #[arg(long)]
        b: Option<f64>,

        /// Stranger cost coefficient
        #[arg(long)]
        alpha: Option<f64>,

        /// Play the fixed network only
        #[arg(long)]
        no_strangers: bool,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write the per-round trace to this file (inside the output directory)
        #[arg(long)]
        trace: Option<PathBuf>,
    },

    /// Sweep the temptation b
    SweepB {
        /// Values of b (comma-separated)
        #[arg(long, default_value = "1.0,1.1,1.2,1.3,1.4,1.5,1.6,1.7,1.8,1.9,2.0", value_delimiter = ',')]
        values: Vec<f64>,

        /// Stranger cost coefficient
        #[arg(long)]
        alpha: Option<f64>,

        /// Number of trials per value
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Base seed; trial t uses seed + t
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for results
        #[arg(long, default_value = "sweep_b.json")]
        output: PathBuf,
    },

    /// Sweep the stranger cost coefficient alpha
    SweepAlpha {
        /// Values of alpha (comma-separated)
        #[arg(long, default_value = "0.0,0.1,0.2,0.3,0.4,0.5,0.6,0.7,0.8,0.9,1.0", value_delimiter = ',')]
        values: Vec<f64>,

        /// Temptation b
        #[arg(long)]
        b: Option<f64>,

        /// Number of trials per value
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Base seed; trial t uses seed + t
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for results
        #[arg(long, default_value = "sweep_alpha.json")]
        output: PathBuf,
    },

    /// Compare persistent-only (PC) with ephemeral connections (EC)
    Compare {
        /// Temptation b
        #[arg(long)]
        b: Option<f64>,

        /// Stranger cost coefficient
        #[arg(long)]
        alpha: Option<f64>,

        /// Number of trials per mode
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Base seed; trial t uses seed + t
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for results
        #[arg(long, default_value = "pc_vs_ec.json")]
        output: PathBuf,
    },

    /// Write lattice strategy snapshots
    Snapshot {
        /// Rounds after which to snapshot (comma-separated, zero-based)
        #[arg(long, default_value = "0,9", value_delimiter = ',')]
        at: Vec<usize>,

        /// Temptation b
        #[arg(long)]
        b: Option<f64>,

        /// Stranger cost coefficient
        #[arg(long)]
        alpha: Option<f64>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Trial-averaged degree heterogeneity and cooperation over time
    Heterogeneity {
        /// Temptation b
        #[arg(long)]
        b: Option<f64>,

        /// Stranger cost coefficient
        #[arg(long)]
        alpha: Option<f64>,

        /// Number of trials
        #[arg(long, default_value = "5")]
        trials: usize,

        /// Base seed; trial t uses seed + t
        #[arg(long)]
        seed: Option<u64>,

        /// Output file for the averaged series
        #[arg(long, default_value = "heterogeneity.tsv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    match &cli.command {
        Commands::Single {
            b,
            alpha,
            no_strangers,
            seed,
            trace,
        } => {
            let mut model = build_model(&cli, *b, *alpha)?;
            if *no_strangers {
                model.game.strangers_enabled = false;
            }
            let runner = ExperimentRunner::new(runner_config(&cli, model));
            let seed = *seed;
            let result = tokio::task::spawn_blocking(move || runner.run(0, seed))
                .await
                .context("trial task panicked")??;

            println!("\n=== Trial Result ===");
            println!("Topology: {}", result.config.topology);
            println!(
                "Nodes: {} (mean degree {:.3})",
                result.config.nodes, result.mean_degree
            );
            println!(
                "b = {}, alpha = {}, r = {}, M = {}, strangers = {}",
                result.config.temptation,
                result.config.stranger_cost,
                result.config.threshold,
                result.config.memory_len,
                result.config.strangers_enabled
            );
            println!("Seed: {}", result.config.seed);
            println!("Duration: {}", format_duration(result.duration_ms));
            println!("\nPer-Round Trace:");
            for stats in &result.history {
                println!(
                    "{}",
                    format_trace_line(stats.step, stats.degree_cv, stats.cooperation)
                );
            }
            println!(
                "\nStationary P_c (last {} rounds): {:.4}",
                result.config.averaging_window, result.stationary_cooperation
            );
            println!("Stranger games: {}", result.total_stranger_games);

            if let Some(trace) = trace {
                let path = cli.out_dir.join(trace);
                write_trace(&path, &result.history)?;
                println!("Trace saved to: {}", path.display());
            }
        }

        Commands::SweepB {
            values,
            alpha,
            trials,
            seed,
            output,
        } => {
            let model = build_model(&cli, None, *alpha)?;
            let base = runner_config(&cli, model);
            let results = sweep(&base, SweepParameter::Temptation, values, *trials, *seed).await?;
            let path = save_results(&cli, &results, output)?;

            println!("\n=== b Sweep Complete ===");
            println!("Results saved to: {}", path.display());
            print_summary(&results);
        }

        Commands::SweepAlpha {
            values,
            b,
            trials,
            seed,
            output,
        } => {
            let model = build_model(&cli, *b, None)?;
            let base = runner_config(&cli, model);
            let results = sweep(&base, SweepParameter::StrangerCost, values, *trials, *seed).await?;
            let path = save_results(&cli, &results, output)?;

            println!("\n=== alpha Sweep Complete ===");
            println!("Results saved to: {}", path.display());
            print_summary(&results);
        }

        Commands::Compare {
            b,
            alpha,
            trials,
            seed,
            output,
        } => {
            let model = build_model(&cli, *b, *alpha)?;
            let base = runner_config(&cli, model);
            let results = compare_connections(&base, *trials, *seed).await?;
            let path = save_results(&cli, &results, output)?;

            println!("\n=== PC vs EC Complete ===");
            println!("Results saved to: {}", path.display());
            print_summary(&results);
        }

        Commands::Snapshot { at, b, alpha, seed } => {
            let mut model = build_model(&cli, *b, *alpha)?;
            if cli.topology.is_none() {
                model.network.topology = TopologyKind::SquareLattice;
            }
            let mut config = runner_config(&cli, model);
            let last = at.iter().copied().max().unwrap_or(0);
            config.steps = config.steps.max(last + 1);
            config.snapshot_steps = at.clone();

            let runner = ExperimentRunner::new(config);
            let seed = *seed;
            let result = tokio::task::spawn_blocking(move || runner.run(0, seed))
                .await
                .context("trial task panicked")??;

            println!("\n=== Snapshots (seed {}) ===", result.config.seed);
            let json_path = timestamped_path(&cli.out_dir.join("snapshots.json"));
            save_snapshots(&json_path, &result.snapshots)?;
            println!("Snapshot data saved to: {}", json_path.display());

            let grids = write_grids(&cli.out_dir, &result.snapshots)?;
            for snapshot in &result.snapshots {
                println!("  step {:>5}: P_c={:.4}", snapshot.step, snapshot.cooperation());
            }
            if grids.is_empty() && !result.snapshots.is_empty() {
                println!("Network is not a square lattice; no grids written");
            }
            for path in &grids {
                println!("Grid saved to: {}", path.display());
            }
        }

        Commands::Heterogeneity {
            b,
            alpha,
            trials,
            seed,
            output,
        } => {
            let model = build_model(&cli, *b, *alpha)?;
            let runner = ExperimentRunner::new(runner_config(&cli, model));
            info!(trials = trials, "Starting heterogeneity run");
            let results = runner.run_trials(*trials, *seed).await?;

            let averaged = average_history(&results);
            let path = timestamped_path(&cli.out_dir.join(output));
            write_averaged_trace(&path, &averaged)?;

            let mut grid = GridResults::new();
            grid.extend(results);
            grid.compute_summary();
            let json_path = save_results(&cli, &grid, Path::new("heterogeneity.json"))?;

            println!("\n=== Heterogeneity Complete ===");
            println!("Averaged series saved to: {}", path.display());
            println!("Results saved to: {}", json_path.display());
            println!("\n  {:>5} {:>8} {:>8}", "Step", "CV", "P_c");
            for round in &averaged {
                println!(
                    "  {:>5} {:>8.4} {:>8.4}",
                    round.step, round.mean_degree_cv, round.mean_cooperation
                );
            }
        }
    }

    Ok(())
}

/// Assemble the model from the optional config file, global flags and command overrides.
fn build_model(cli: &Cli, temptation: Option<f64>, stranger_cost: Option<f64>) -> Result<ModelConfig> {
    let mut model = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => ModelConfig::default(),
    };

    if let Some(topology) = &cli.topology {
        model.network.topology = parse_topology(topology)?;
    }
    if let Some(size) = cli.size {
        model.network.size = size;
    }
    if let Some(half_degree) = cli.half_degree {
        model.network.half_degree = half_degree;
    }
    if let Some(memory) = cli.memory {
        model.game.memory_len = memory;
    }
    if let Some(threshold) = cli.threshold {
        model.game.threshold = threshold;
    }
    if let Some(attempts) = cli.attempts {
        model.game.stranger_attempts = attempts;
    }
    if let Some(b) = temptation {
        model.game.temptation = b;
    }
    if let Some(alpha) = stranger_cost {
        model.game.stranger_cost = alpha;
    }
    Ok(model)
}

fn runner_config(cli: &Cli, model: ModelConfig) -> ExperimentRunnerConfig {
    let defaults = ExperimentRunnerConfig::default();
    ExperimentRunnerConfig {
        model,
        steps: cli.steps,
        averaging_window: cli.window,
        snapshot_steps: Vec::new(),
        max_concurrent_trials: cli.concurrency.unwrap_or(defaults.max_concurrent_trials),
    }
}

fn save_results(cli: &Cli, results: &GridResults, output: &Path) -> Result<PathBuf> {
    let path = timestamped_path(&cli.out_dir.join(output));
    results.save(&path)?;
    Ok(path)
}

fn print_summary(results: &GridResults) {
    println!("\nSummary:");
    for (key, summary) in &results.summary {
        println!(
            "  {}: P_c={:.4} ± {:.4} (n={}), CV={:.4}",
            key,
            summary.mean_cooperation,
            summary.cooperation_se,
            summary.trials,
            summary.mean_degree_cv
        );
    }
}

fn parse_topology(s: &str) -> Result<TopologyKind> {
    match s.to_lowercase().as_str() {
        "er" | "erdos_renyi" | "erdos-renyi" | "random" => Ok(TopologyKind::ErdosRenyi),
        "lattice" | "sl" | "square_lattice" | "square-lattice" => Ok(TopologyKind::SquareLattice),
        _ => anyhow::bail!("Unknown topology: {}. Valid: er, lattice", s),
    }
}
