//! Strategy update: pairwise imitation weighted by payoff difference.

use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};

use crate::agent::Agent;
use crate::config::GameConfig;
use crate::topology::Graph;

/// Probability that an agent with payoff `own` imitates a model with payoff `model`.
///
/// `(model - own) / (b * k_max)` when the model did at least as well, where
/// `k_max` is the larger fixed degree of the pair. Zero otherwise, and zero
/// when both have no fixed links.
pub fn imitation_probability(own: f64, model: f64, k_max: usize, temptation: f64) -> f64 {
    if k_max == 0 || model < own {
        return 0.0;
    }
    (model - own) / (temptation * k_max as f64)
}

/// Let every agent consider imitating one random partner.
///
/// Partners are the fixed neighbours plus, for stranger-seeking agents, the
/// strangers played this round. The learner copies the partner's strategy
/// from the start of the round, so the phase behaves as a synchronous update.
/// Returns the number of agents whose strategy changed.
pub fn update_strategies(
    graph: &Graph,
    agents: &mut [Agent],
    config: &GameConfig,
    rng: &mut dyn RngCore,
) -> usize {
    let mut candidates: Vec<usize> = Vec::new();
    let mut changed = 0;

    for x in 0..agents.len() {
        candidates.clear();
        candidates.extend_from_slice(graph.neighbors(x));
        let learner = &agents[x];
        if learner.seeks_strangers(config.threshold) {
            candidates.extend_from_slice(&learner.strangers);
        }

        let Some(&y) = candidates.choose(rng) else {
            continue;
        };

        let k_max = graph.degree(x).max(graph.degree(y));
        let probability =
            imitation_probability(agents[x].payoff, agents[y].payoff, k_max, config.temptation);
        let roll: f64 = rng.random();
        if roll < probability {
            let adopted = agents[y].previous;
            if agents[x].strategy != adopted {
                changed += 1;
            }
            agents[x].strategy = adopted;
        }
    }
    changed
}
