//! Round statistics and summary helpers.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::topology::Graph;

/// Observables recorded after each round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundStats {
    /// Zero-based round index
    pub step: usize,
    /// Coefficient of variation of the effective degree
    pub degree_cv: f64,
    /// Fraction of cooperators after the strategy update
    pub cooperation: f64,
    /// Number of cooperators after the strategy update
    pub cooperators: usize,
    /// Stranger games played this round
    pub stranger_games: usize,
    /// Agents that changed strategy this round
    pub strategy_changes: usize,
}

/// Effective degree: fixed links plus stranger links made and received this round.
pub fn effective_degrees(graph: &Graph, agents: &[Agent]) -> Vec<usize> {
    let mut degrees: Vec<usize> = (0..agents.len())
        .map(|i| graph.degree(i) + agents[i].strangers.len())
        .collect();
    for agent in agents {
        for &stranger in &agent.strangers {
            degrees[stranger] += 1;
        }
    }
    degrees
}

/// σ/μ of the effective degree, with the population standard deviation.
///
/// Returns 0 when the mean degree is 0.
pub fn degree_cv(graph: &Graph, agents: &[Agent]) -> f64 {
    let degrees: Vec<f64> = effective_degrees(graph, agents)
        .into_iter()
        .map(|d| d as f64)
        .collect();
    coefficient_of_variation(&degrees)
}

/// Population coefficient of variation; 0 for empty input or a zero mean.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let mu = mean(values);
    if mu == 0.0 {
        return 0.0;
    }
    let n = values.len() as f64;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mu
}

/// Count of agents currently cooperating.
pub fn cooperator_count(agents: &[Agent]) -> usize {
    agents.iter().filter(|a| a.strategy.is_cooperator()).count()
}

/// Arithmetic mean; 0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard error of the mean using the sample standard deviation.
///
/// Zero with fewer than two values.
pub fn standard_error(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt() / (n as f64).sqrt()
}

/// Normal-approximation 95% confidence interval around the mean.
pub fn confidence_interval_95(values: &[f64]) -> (f64, f64) {
    let mu = mean(values);
    let half = 1.96 * standard_error(values);
    (mu - half, mu + half)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Strategy;
    use crate::topology::square_lattice;

    #[test]
    fn test_lattice_without_strangers_has_zero_cv() {
        let graph = square_lattice(4).unwrap();
        let agents: Vec<Agent> = (0..16).map(|_| Agent::new(Strategy::Cooperate, 2)).collect();
        assert_eq!(degree_cv(&graph, &agents), 0.0);
    }

    #[test]
    fn test_strangers_count_both_ways() {
        let graph = Graph::empty(3);
        let mut agents: Vec<Agent> = (0..3).map(|_| Agent::new(Strategy::Defect, 2)).collect();
        agents[0].strangers.push(2);
        agents[0].strangers.push(2);

        assert_eq!(effective_degrees(&graph, &agents), vec![2, 0, 2]);
        // Degrees [2, 0, 2]: mean 4/3, population sd sqrt(8/9)
        let expected = (8.0f64 / 9.0).sqrt() / (4.0 / 3.0);
        assert!((degree_cv(&graph, &agents) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_mean_gives_zero_cv() {
        let graph = Graph::empty(3);
        let agents: Vec<Agent> = (0..3).map(|_| Agent::new(Strategy::Defect, 2)).collect();
        assert_eq!(degree_cv(&graph, &agents), 0.0);
        assert_eq!(coefficient_of_variation(&[]), 0.0);
    }

    #[test]
    fn test_summary_helpers() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&values), 2.5);
        let se = standard_error(&values);
        assert!((se - (5.0f64 / 3.0).sqrt() / 2.0).abs() < 1e-12);
        let (lo, hi) = confidence_interval_95(&values);
        assert!(lo < 2.5 && hi > 2.5);
        assert_eq!(standard_error(&[1.0]), 0.0);
    }

    #[test]
    fn test_cooperator_count() {
        let agents = vec![
            Agent::new(Strategy::Cooperate, 1),
            Agent::new(Strategy::Defect, 1),
            Agent::new(Strategy::Cooperate, 1),
        ];
        assert_eq!(cooperator_count(&agents), 2);
    }
}
