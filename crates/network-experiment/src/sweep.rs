//! Parameter sweeps: the same trial batch repeated over a list of model variants.

use anyhow::{bail, Result};
use rand::Rng;
use tracing::{info, warn};

use cooperation_kernel::ModelConfig;

use crate::experiment::{ExperimentRunner, ExperimentRunnerConfig};
use crate::results::GridResults;

/// Model parameter varied by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepParameter {
    /// Temptation b
    Temptation,
    /// Stranger cost coefficient alpha
    StrangerCost,
}

impl SweepParameter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temptation => "b",
            Self::StrangerCost => "alpha",
        }
    }

    /// Copy of `model` with this parameter set to `value`.
    pub fn apply(&self, model: &ModelConfig, value: f64) -> ModelConfig {
        let mut model = model.clone();
        match self {
            Self::Temptation => model.game.temptation = value,
            Self::StrangerCost => model.game.stranger_cost = value,
        }
        model
    }
}

/// Run `trials` trials for each variant, in order, and summarise.
///
/// Every variant reuses the same seeds, so variants differ only in the
/// parameters, not in the sampled networks and initial states. Without a
/// base seed one is drawn once and shared by all variants.
pub async fn run_variants(
    base: &ExperimentRunnerConfig,
    variants: Vec<(String, ModelConfig)>,
    trials: usize,
    base_seed: Option<u64>,
) -> Result<GridResults> {
    let base_seed = base_seed.unwrap_or_else(|| rand::rng().random());
    let mut results = GridResults::new();
    let total = variants.len();

    for (completed, (label, model)) in variants.into_iter().enumerate() {
        let runner = ExperimentRunner::new(ExperimentRunnerConfig {
            model,
            ..base.clone()
        });
        let batch = runner.run_trials(trials, Some(base_seed)).await?;
        results.extend(batch);

        info!(
            progress = format!("{}/{}", completed + 1, total),
            variant = label.as_str(),
            trials = trials,
            "Completed variant"
        );
    }

    results.compute_summary();
    Ok(results)
}

/// Sweep one parameter over `values`.
///
/// Values outside the model's domain are skipped with a warning; a sweep
/// with no valid value is an error.
pub async fn sweep(
    base: &ExperimentRunnerConfig,
    parameter: SweepParameter,
    values: &[f64],
    trials: usize,
    base_seed: Option<u64>,
) -> Result<GridResults> {
    let mut variants = Vec::with_capacity(values.len());
    for &value in values {
        let model = parameter.apply(&base.model, value);
        match model.validate() {
            Ok(()) => variants.push((format!("{}={}", parameter.name(), value), model)),
            Err(e) => warn!(parameter = parameter.name(), value = value, error = %e, "Skipping sweep value"),
        }
    }
    if variants.is_empty() {
        bail!("No valid {} values to sweep", parameter.name());
    }

    info!(
        parameter = parameter.name(),
        values = variants.len(),
        trials = trials,
        "Starting sweep"
    );
    run_variants(base, variants, trials, base_seed).await
}

/// Persistent connections only ("PC") against persistent plus ephemeral ("EC").
pub async fn compare_connections(
    base: &ExperimentRunnerConfig,
    trials: usize,
    base_seed: Option<u64>,
) -> Result<GridResults> {
    let mut persistent = base.model.clone();
    persistent.game.strangers_enabled = false;
    let mut ephemeral = base.model.clone();
    ephemeral.game.strangers_enabled = true;

    info!(trials = trials, "Starting PC vs EC comparison");
    run_variants(
        base,
        vec![("PC".to_string(), persistent), ("EC".to_string(), ephemeral)],
        trials,
        base_seed,
    )
    .await
}
