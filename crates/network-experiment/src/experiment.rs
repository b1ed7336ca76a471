//! Experiment runner for network cooperation experiments.
//!
//! Orchestrates the experiment lifecycle:
//! 1. Build the network and initial population
//! 2. Run rounds, capturing snapshots on request
//! 3. Reduce the history to stationary values
//! 4. Repeat over trials in parallel

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use uuid::Uuid;

use cooperation_kernel::stats::mean;
use cooperation_kernel::{ModelConfig, Simulation};

use crate::results::{ExperimentConfig, ExperimentResult};
use crate::snapshot::Snapshot;

/// Configuration for the experiment runner.
#[derive(Debug, Clone)]
pub struct ExperimentRunnerConfig {
    /// Model parameters shared by all trials
    pub model: ModelConfig,
    /// Rounds per trial
    pub steps: usize,
    /// Final rounds averaged into the stationary cooperation level
    pub averaging_window: usize,
    /// Rounds after which to capture a strategy snapshot
    pub snapshot_steps: Vec<usize>,
    /// Maximum trials running at once
    pub max_concurrent_trials: usize,
}

impl Default for ExperimentRunnerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            steps: 10,
            averaging_window: 10,
            snapshot_steps: Vec::new(),
            max_concurrent_trials: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// The experiment runner.
#[derive(Debug, Clone)]
pub struct ExperimentRunner {
    config: ExperimentRunnerConfig,
}

impl ExperimentRunner {
    /// Create a new experiment runner.
    pub fn new(config: ExperimentRunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExperimentRunnerConfig {
        &self.config
    }

    /// Run a single trial to completion.
    ///
    /// CPU-bound; call from a blocking context when inside an async runtime.
    pub fn run(&self, trial: usize, seed: Option<u64>) -> Result<ExperimentResult> {
        let started_at = Utc::now();
        let start_time = Instant::now();

        let mut sim = Simulation::new(self.config.model.clone(), seed)
            .with_context(|| format!("setting up trial {}", trial))?;

        let mut history = Vec::with_capacity(self.config.steps);
        let mut snapshots = Vec::new();
        for _ in 0..self.config.steps {
            let stats = sim.step();
            if self.config.snapshot_steps.contains(&stats.step) {
                debug!(step = stats.step, trial = trial, "Captured snapshot");
                snapshots.push(Snapshot::capture(&sim, stats.step));
            }
            history.push(stats);
        }

        let window = self.config.averaging_window.clamp(1, history.len().max(1));
        let tail = &history[history.len().saturating_sub(window)..];
        let tail_cooperation: Vec<f64> = tail.iter().map(|s| s.cooperation).collect();
        let tail_cv: Vec<f64> = tail.iter().map(|s| s.degree_cv).collect();

        let stationary_cooperation = if history.is_empty() {
            sim.cooperation()
        } else {
            mean(&tail_cooperation)
        };
        let final_cooperation = history.last().map_or(sim.cooperation(), |s| s.cooperation);
        let final_degree_cv = history.last().map_or(0.0, |s| s.degree_cv);
        let total_stranger_games = history.iter().map(|s| s.stranger_games).sum();

        let model = sim.config();
        let result = ExperimentResult {
            run_id: Uuid::new_v4(),
            config: ExperimentConfig {
                topology: model.network.topology.name().to_string(),
                nodes: sim.graph().node_count(),
                half_degree: model.network.half_degree,
                temptation: model.game.temptation,
                threshold: model.game.threshold,
                memory_len: model.game.memory_len,
                stranger_attempts: model.game.stranger_attempts,
                stranger_cost: model.game.stranger_cost,
                strangers_enabled: model.game.strangers_enabled,
                steps: self.config.steps,
                averaging_window: window,
                trial,
                seed: sim.seed(),
            },
            started_at,
            ended_at: Utc::now(),
            duration_ms: start_time.elapsed().as_millis() as u64,
            mean_degree: sim.graph().mean_degree(),
            stationary_cooperation,
            final_cooperation,
            final_degree_cv,
            mean_degree_cv: mean(&tail_cv),
            total_stranger_games,
            history,
            snapshots,
        };

        info!(
            trial = trial,
            seed = result.config.seed,
            b = result.config.temptation,
            alpha = result.config.stranger_cost,
            p_c = format!("{:.4}", result.stationary_cooperation),
            cv = format!("{:.4}", result.final_degree_cv),
            "Trial complete"
        );
        Ok(result)
    }

    /// Run `trials` independent trials on the blocking pool.
    ///
    /// With a base seed, trial `t` uses `base_seed + t`; otherwise each trial
    /// draws its own seed. Results come back in trial order.
    pub async fn run_trials(
        &self,
        trials: usize,
        base_seed: Option<u64>,
    ) -> Result<Vec<ExperimentResult>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_trials.max(1)));

        let futures = (0..trials).map(|trial| {
            let runner = self.clone();
            let semaphore = semaphore.clone();
            let seed = base_seed.map(|s| s.wrapping_add(trial as u64));
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .context("trial semaphore closed")?;
                tokio::task::spawn_blocking(move || runner.run(trial, seed))
                    .await
                    .context("trial task panicked")?
            }
        });

        join_all(futures).await.into_iter().collect()
    }
}
