//! Results collection and output for network cooperation experiments.
//!
//! Captures:
//! - Per-round cooperation fraction and degree heterogeneity
//! - Stationary cooperation averaged over the final rounds
//! - Stranger game counts
//! - Strategy snapshots when requested

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cooperation_kernel::stats::{confidence_interval_95, mean, standard_error};
use cooperation_kernel::RoundStats;

use crate::snapshot::Snapshot;

/// Results from a single trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Experiment configuration
    pub config: ExperimentConfig,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub ended_at: DateTime<Utc>,
    /// Wall-clock duration
    pub duration_ms: u64,
    /// Mean degree of the fixed network
    pub mean_degree: f64,
    /// Statistics for every round
    pub history: Vec<RoundStats>,
    /// Cooperation fraction averaged over the last `averaging_window` rounds
    pub stationary_cooperation: f64,
    /// Cooperation fraction after the last round
    pub final_cooperation: f64,
    /// Degree CV after the last round
    pub final_degree_cv: f64,
    /// Degree CV averaged over the same window as `stationary_cooperation`
    pub mean_degree_cv: f64,
    /// Stranger games across all rounds
    pub total_stranger_games: usize,
    /// Strategy snapshots taken during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<Snapshot>,
}

/// Parameters of a single trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Topology short name ("er" or "lattice")
    pub topology: String,
    pub nodes: usize,
    pub half_degree: usize,
    /// Temptation b
    pub temptation: f64,
    /// Cooperation threshold r
    pub threshold: f64,
    pub memory_len: usize,
    pub stranger_attempts: usize,
    /// Stranger cost coefficient alpha
    pub stranger_cost: f64,
    /// False for persistent connections only
    pub strangers_enabled: bool,
    /// Rounds played
    pub steps: usize,
    /// Rounds averaged for the stationary value
    pub averaging_window: usize,
    /// Trial number (for repeated experiments)
    pub trial: usize,
    /// Seed actually used, so the trial can be replayed
    pub seed: u64,
}

impl ExperimentConfig {
    /// Grouping key for summaries: every parameter except trial and seed.
    ///
    /// Floats use their shortest exact form so nearby sweep values stay apart.
    pub fn key(&self) -> String {
        format!(
            "{}:n={}:R={}:b={}:alpha={}:r={}:m={}:k={}:steps={}:w={}:strangers={}",
            self.topology,
            self.nodes,
            self.half_degree,
            self.temptation,
            self.stranger_cost,
            self.threshold,
            self.memory_len,
            self.stranger_attempts,
            self.steps,
            self.averaging_window,
            self.strangers_enabled
        )
    }
}

/// Aggregate results from a sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridResults {
    /// All individual results
    pub results: Vec<ExperimentResult>,
    /// Summary statistics by configuration key
    pub summary: BTreeMap<String, ConfigSummary>,
}

/// Summary statistics for a configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub config_key: String,
    pub trials: usize,
    pub temptation: f64,
    pub stranger_cost: f64,
    pub strangers_enabled: bool,
    /// Mean stationary cooperation across trials
    pub mean_cooperation: f64,
    /// Standard error of mean_cooperation
    pub cooperation_se: f64,
    /// 95% confidence interval for mean_cooperation, clamped to [0, 1]
    pub cooperation_ci: (f64, f64),
    pub min_cooperation: f64,
    pub max_cooperation: f64,
    /// Mean of the windowed degree CV across trials
    pub mean_degree_cv: f64,
    pub mean_stranger_games: f64,
}

/// Trial-averaged statistics for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragedRound {
    pub step: usize,
    pub mean_cooperation: f64,
    pub cooperation_se: f64,
    pub mean_degree_cv: f64,
    pub degree_cv_se: f64,
}

impl GridResults {
    /// Create a new empty grid results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result.
    pub fn add(&mut self, result: ExperimentResult) {
        self.results.push(result);
    }

    /// Add many results.
    pub fn extend(&mut self, results: impl IntoIterator<Item = ExperimentResult>) {
        self.results.extend(results);
    }

    /// Compute summary statistics.
    pub fn compute_summary(&mut self) {
        let mut by_config: BTreeMap<String, Vec<&ExperimentResult>> = BTreeMap::new();
        for result in &self.results {
            by_config.entry(result.config.key()).or_default().push(result);
        }

        self.summary.clear();
        for (key, results) in by_config {
            let trials = results.len();
            let first = &results[0].config;
            let cooperation: Vec<f64> = results.iter().map(|r| r.stationary_cooperation).collect();
            let cvs: Vec<f64> = results.iter().map(|r| r.mean_degree_cv).collect();
            let strangers: Vec<f64> = results
                .iter()
                .map(|r| r.total_stranger_games as f64)
                .collect();

            let (lo, hi) = confidence_interval_95(&cooperation);
            let summary = ConfigSummary {
                config_key: key.clone(),
                trials,
                temptation: first.temptation,
                stranger_cost: first.stranger_cost,
                strangers_enabled: first.strangers_enabled,
                mean_cooperation: mean(&cooperation),
                cooperation_se: standard_error(&cooperation),
                cooperation_ci: (lo.max(0.0), hi.min(1.0)),
                min_cooperation: cooperation.iter().copied().fold(f64::INFINITY, f64::min),
                max_cooperation: cooperation.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                mean_degree_cv: mean(&cvs),
                mean_stranger_games: mean(&strangers),
            };
            self.summary.insert(key, summary);
        }
    }

    /// Save results to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Load results from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let results = serde_json::from_str(&json)?;
        Ok(results)
    }
}

/// Average per-round statistics across trials.
///
/// Trials may differ in length; each round averages over the trials that
/// reached it.
pub fn average_history(results: &[ExperimentResult]) -> Vec<AveragedRound> {
    let rounds = results.iter().map(|r| r.history.len()).max().unwrap_or(0);
    (0..rounds)
        .map(|step| {
            let rows: Vec<&RoundStats> = results.iter().filter_map(|r| r.history.get(step)).collect();
            let cooperation: Vec<f64> = rows.iter().map(|s| s.cooperation).collect();
            let cvs: Vec<f64> = rows.iter().map(|s| s.degree_cv).collect();
            AveragedRound {
                step,
                mean_cooperation: mean(&cooperation),
                cooperation_se: standard_error(&cooperation),
                mean_degree_cv: mean(&cvs),
                degree_cv_se: standard_error(&cvs),
            }
        })
        .collect()
}

/// One trace line: `"{step}\tCV={cv:.4}\tP_c={p_c:.4}"`.
pub fn format_trace_line(step: usize, degree_cv: f64, cooperation: f64) -> String {
    format!("{}\tCV={:.4}\tP_c={:.4}", step, degree_cv, cooperation)
}

/// Write a per-round trace, one line per round.
pub fn write_trace(path: impl AsRef<Path>, history: &[RoundStats]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for stats in history {
        writeln!(
            out,
            "{}",
            format_trace_line(stats.step, stats.degree_cv, stats.cooperation)
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write a trial-averaged trace with standard errors as tab-separated columns.
pub fn write_averaged_trace(path: impl AsRef<Path>, rounds: &[AveragedRound]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "step\tcv\tcv_se\tp_c\tp_c_se")?;
    for round in rounds {
        writeln!(
            out,
            "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
            round.step,
            round.mean_degree_cv,
            round.degree_cv_se,
            round.mean_cooperation,
            round.cooperation_se
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Format a duration in milliseconds for display.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{:.1}m", ms as f64 / 60_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(step: usize, cooperation: f64, degree_cv: f64) -> RoundStats {
        RoundStats {
            step,
            degree_cv,
            cooperation,
            cooperators: (cooperation * 100.0) as usize,
            stranger_games: 0,
            strategy_changes: 0,
        }
    }

    fn result(temptation: f64, trial: usize, stationary: f64) -> ExperimentResult {
        ExperimentResult {
            run_id: Uuid::new_v4(),
            config: ExperimentConfig {
                topology: "er".to_string(),
                nodes: 100,
                half_degree: 2,
                temptation,
                threshold: 0.5,
                memory_len: 10,
                stranger_attempts: 3,
                stranger_cost: 0.1,
                strangers_enabled: true,
                steps: 2,
                averaging_window: 2,
                trial,
                seed: trial as u64,
            },
            started_at: Utc::now(),
            ended_at: Utc::now(),
            duration_ms: 5,
            mean_degree: 4.0,
            history: vec![round(0, 0.5, 0.1), round(1, stationary, 0.2)],
            stationary_cooperation: stationary,
            final_cooperation: stationary,
            final_degree_cv: 0.2,
            mean_degree_cv: 0.15,
            total_stranger_games: 10 * trial,
            snapshots: Vec::new(),
        }
    }

    #[test]
    fn test_grid_results_summary() {
        let mut results = GridResults::new();
        for trial in 0..3 {
            results.add(result(1.2, trial, 0.2 + 0.1 * trial as f64));
        }
        results.add(result(1.5, 0, 0.05));
        results.compute_summary();

        assert_eq!(results.summary.len(), 2);
        let key = results.results[0].config.key();
        let summary = results.summary.get(&key).unwrap();

        assert_eq!(summary.trials, 3);
        assert!((summary.mean_cooperation - 0.3).abs() < 1e-9);
        assert!(summary.cooperation_se > 0.0);
        assert!(summary.cooperation_ci.0 <= summary.mean_cooperation);
        assert!(summary.cooperation_ci.1 >= summary.mean_cooperation);
        assert!((summary.min_cooperation - 0.2).abs() < 1e-9);
        assert!((summary.max_cooperation - 0.4).abs() < 1e-9);
        assert!((summary.mean_stranger_games - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_trial_has_zero_se() {
        let mut results = GridResults::new();
        results.add(result(1.1, 0, 0.7));
        results.compute_summary();
        let summary = results.summary.values().next().unwrap();
        assert_eq!(summary.cooperation_se, 0.0);
        assert_eq!(summary.cooperation_ci, (0.7, 0.7));
    }

    #[test]
    fn test_key_separates_pc_and_ec() {
        let ec = result(1.2, 0, 0.3);
        let mut pc = result(1.2, 0, 0.3);
        pc.config.strangers_enabled = false;
        assert_ne!(ec.config.key(), pc.config.key());
        assert!(pc.config.key().ends_with("strangers=false"));
    }

    #[test]
    fn test_key_covers_every_run_parameter() {
        let base = result(1.2, 0, 0.3);
        let mut close = result(1.2001, 0, 0.3);
        assert_ne!(base.config.key(), close.config.key());

        close.config.temptation = 1.2;
        assert_eq!(base.config.key(), close.config.key());

        let variants: [fn(&mut ExperimentConfig); 5] = [
            |c| c.half_degree = 3,
            |c| c.stranger_attempts = 5,
            |c| c.steps = 50,
            |c| c.averaging_window = 1,
            |c| c.stranger_cost = 0.1004,
        ];
        for vary in variants {
            let mut other = result(1.2, 0, 0.3);
            vary(&mut other.config);
            assert_ne!(base.config.key(), other.config.key());
        }

        // Trial and seed do not split groups
        let other = result(1.2, 4, 0.3);
        assert_eq!(base.config.key(), other.config.key());
    }

    #[test]
    fn test_average_history() {
        let a = result(1.2, 0, 0.4);
        let mut b = result(1.2, 1, 0.6);
        b.history.push(round(2, 0.9, 0.3));

        let averaged = average_history(&[a, b]);
        assert_eq!(averaged.len(), 3);
        assert!((averaged[1].mean_cooperation - 0.5).abs() < 1e-12);
        assert!((averaged[0].mean_degree_cv - 0.1).abs() < 1e-12);
        // Only the longer trial reached round 2
        assert!((averaged[2].mean_cooperation - 0.9).abs() < 1e-12);
        assert_eq!(averaged[2].cooperation_se, 0.0);
    }

    #[test]
    fn test_trace_line_format() {
        assert_eq!(format_trace_line(3, 0.123456, 0.5), "3\tCV=0.1235\tP_c=0.5000");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(1500), "1.5s");
        assert_eq!(format_duration(90_000), "1.5m");
    }
}
