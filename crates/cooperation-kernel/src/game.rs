//! Payoffs: the weak prisoner's dilemma on fixed and ephemeral links.
//!
//! Every agent plays all of its fixed neighbours. An agent whose remembered
//! cooperation ratio is below the threshold also draws a few random nodes
//! and plays each one that shares the bad record. Those stranger games pay
//! only the initiator and cost `b * alpha` apiece.

use rand::{Rng, RngCore};

use crate::agent::{Agent, Strategy};
use crate::config::GameConfig;
use crate::topology::Graph;

/// Payoff to `me` from one game against `other`.
///
/// Mutual cooperation pays 1, a defector exploiting a cooperator gets `b`,
/// everything else pays 0.
pub fn pair_payoff(me: Strategy, other: Strategy, temptation: f64) -> f64 {
    match (me, other) {
        (Strategy::Cooperate, Strategy::Cooperate) => 1.0,
        (Strategy::Defect, Strategy::Cooperate) => temptation,
        (_, Strategy::Defect) => 0.0,
    }
}

/// Compute every agent's payoff for the round and record its stranger games.
///
/// Strategies and memories are read-only here, so the result does not
/// depend on evaluation order. Returns the number of stranger games played.
pub fn play_round(
    graph: &Graph,
    agents: &mut [Agent],
    config: &GameConfig,
    rng: &mut dyn RngCore,
) -> usize {
    let n = agents.len();
    let strategies: Vec<Strategy> = agents.iter().map(|a| a.strategy).collect();
    let seeking: Vec<bool> = agents
        .iter()
        .map(|a| config.strangers_enabled && a.seeks_strangers(config.threshold))
        .collect();

    let mut stranger_games = 0;
    for (x, agent) in agents.iter_mut().enumerate() {
        let own = strategies[x];
        let mut payoff: f64 = graph
            .neighbors(x)
            .iter()
            .map(|&y| pair_payoff(own, strategies[y], config.temptation))
            .sum();

        if seeking[x] {
            let mut played = 0usize;
            for _ in 0..config.stranger_attempts {
                let candidate = rng.random_range(0..n);
                if seeking[candidate] {
                    payoff += pair_payoff(own, strategies[candidate], config.temptation);
                    agent.strangers.push(candidate);
                    played += 1;
                }
            }
            payoff -= config.stranger_fee() * played as f64;
            stranger_games += played;
        }

        agent.payoff = payoff;
    }
    stranger_games
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn agents_with_history(plays: &[Strategy], memory_len: usize) -> Vec<Agent> {
        plays
            .iter()
            .map(|&s| {
                let mut agent = Agent::new(s, memory_len);
                for _ in 0..memory_len {
                    agent.record_decision();
                }
                agent
            })
            .collect()
    }

    #[test]
    fn test_pair_payoff_table() {
        let b = 1.3;
        assert_eq!(pair_payoff(Strategy::Cooperate, Strategy::Cooperate, b), 1.0);
        assert_eq!(pair_payoff(Strategy::Defect, Strategy::Cooperate, b), 1.3);
        assert_eq!(pair_payoff(Strategy::Cooperate, Strategy::Defect, b), 0.0);
        assert_eq!(pair_payoff(Strategy::Defect, Strategy::Defect, b), 0.0);
    }

    #[test]
    fn test_neighbor_payoffs_without_strangers() {
        // Star: 0 is a defector linked to three cooperators
        let graph = Graph::from_edges(4, [(0, 1), (0, 2), (0, 3)]).unwrap();
        let mut agents = agents_with_history(
            &[
                Strategy::Defect,
                Strategy::Cooperate,
                Strategy::Cooperate,
                Strategy::Cooperate,
            ],
            1,
        );
        let config = GameConfig {
            temptation: 1.5,
            strangers_enabled: false,
            ..GameConfig::default()
        };
        let played = play_round(&graph, &mut agents, &config, &mut ChaCha8Rng::seed_from_u64(0));

        assert_eq!(played, 0);
        assert!((agents[0].payoff - 4.5).abs() < 1e-12);
        for leaf in &agents[1..] {
            assert_eq!(leaf.payoff, 0.0);
        }
    }

    #[test]
    fn test_stranger_games_charge_fee_per_game() {
        // Two isolated defectors, both with a full all-defect memory
        let graph = Graph::empty(2);
        let mut agents = agents_with_history(&[Strategy::Defect, Strategy::Defect], 2);
        let config = GameConfig {
            temptation: 1.2,
            stranger_cost: 0.5,
            stranger_attempts: 4,
            memory_len: 2,
            ..GameConfig::default()
        };
        let played = play_round(&graph, &mut agents, &config, &mut ChaCha8Rng::seed_from_u64(11));

        // Every draw qualifies, so every attempt becomes a game
        assert_eq!(played, 8);
        for agent in &agents {
            assert_eq!(agent.strangers.len(), 4);
            assert!((agent.payoff - (-4.0 * 0.6)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cooperative_records_never_seek_strangers() {
        let graph = Graph::empty(3);
        let mut agents = agents_with_history(
            &[Strategy::Cooperate, Strategy::Cooperate, Strategy::Cooperate],
            2,
        );
        let config = GameConfig::default();
        let played = play_round(&graph, &mut agents, &config, &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(played, 0);
        assert!(agents.iter().all(|a| a.strangers.is_empty()));
    }

    #[test]
    fn test_strangers_need_full_memory() {
        let graph = Graph::empty(2);
        let mut agents = vec![
            Agent::new(Strategy::Defect, 5),
            Agent::new(Strategy::Defect, 5),
        ];
        agents[0].record_decision();
        let played = play_round(
            &graph,
            &mut agents,
            &GameConfig::default(),
            &mut ChaCha8Rng::seed_from_u64(2),
        );
        assert_eq!(played, 0);
    }

    #[test]
    fn test_only_qualifying_strangers_are_played() {
        // Node 0 seeks strangers; node 1 has a cooperative record and never qualifies
        let graph = Graph::empty(2);
        let mut agents = agents_with_history(&[Strategy::Defect, Strategy::Cooperate], 3);
        let config = GameConfig {
            memory_len: 3,
            stranger_attempts: 20,
            ..GameConfig::default()
        };
        play_round(&graph, &mut agents, &config, &mut ChaCha8Rng::seed_from_u64(8));

        assert!(agents[0].strangers.iter().all(|&s| s == 0));
        let expected = -(agents[0].strangers.len() as f64) * config.stranger_fee();
        assert!((agents[0].payoff - expected).abs() < 1e-12);
        assert!(agents[1].strangers.is_empty());
    }
}
