//! The simulation kernel: synchronous rounds of play, imitation and measurement.
//!
//! ## Usage
//!
//! ```
//! use cooperation_kernel::{ModelConfig, Simulation, TopologyKind};
//!
//! let mut config = ModelConfig::default();
//! config.network.topology = TopologyKind::SquareLattice;
//! config.network.size = 400;
//!
//! let mut sim = Simulation::new(config, Some(7)).unwrap();
//! for stats in sim.run(20) {
//!     println!("{}\tCV={:.4}\tP_c={:.4}", stats.step, stats.degree_cv, stats.cooperation);
//! }
//! ```

use anyhow::{bail, Context, Result};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::agent::{Agent, Strategy};
use crate::config::ModelConfig;
use crate::dynamics::update_strategies;
use crate::game::play_round;
use crate::stats::{cooperator_count, degree_cv, RoundStats};
use crate::topology::{builder_for, Graph};

/// A running population on a fixed network.
pub struct Simulation {
    config: ModelConfig,
    graph: Graph,
    agents: Vec<Agent>,
    rng: ChaCha8Rng,
    seed: u64,
    step: usize,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("seed", &self.seed)
            .field("step", &self.step)
            .finish()
    }
}

impl Simulation {
    /// Validate the config, build the network and draw initial strategies.
    ///
    /// Without a seed one is drawn from the thread rng; `seed()` reports it
    /// so the run can be repeated.
    pub fn new(config: ModelConfig, seed: Option<u64>) -> Result<Self> {
        config.validate().context("Invalid model configuration")?;
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let builder = builder_for(&config.network)?;
        let graph = builder.build(&mut rng)?;
        info!(
            topology = builder.name(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            mean_degree = format!("{:.3}", graph.mean_degree()),
            seed = seed,
            "Built network"
        );

        Self::assemble(config, graph, rng, seed)
    }

    /// Run on a caller-supplied network instead of building one.
    ///
    /// Only the game section and topology kind of `config` are used; the
    /// network size is taken from `graph`.
    pub fn with_graph(mut config: ModelConfig, graph: Graph, seed: u64) -> Result<Self> {
        config.game.validate().context("Invalid game configuration")?;
        if graph.node_count() == 0 {
            bail!("Cannot simulate on an empty network");
        }
        config.network.size = graph.node_count();
        Self::assemble(config, graph, ChaCha8Rng::seed_from_u64(seed), seed)
    }

    fn assemble(config: ModelConfig, graph: Graph, mut rng: ChaCha8Rng, seed: u64) -> Result<Self> {
        let memory_len = config.game.memory_len;
        let agents = (0..graph.node_count())
            .map(|_| Agent::new(random_strategy(&mut rng), memory_len))
            .collect();
        Ok(Self {
            config,
            graph,
            agents,
            rng,
            seed,
            step: 0,
        })
    }

    /// Play one round and return its statistics.
    pub fn step(&mut self) -> RoundStats {
        for agent in &mut self.agents {
            agent.payoff = 0.0;
            agent.previous = agent.strategy;
            agent.record_decision();
        }

        let game = &self.config.game;
        let stranger_games = play_round(&self.graph, &mut self.agents, game, &mut self.rng);
        let strategy_changes = update_strategies(&self.graph, &mut self.agents, game, &mut self.rng);

        let cooperators = cooperator_count(&self.agents);
        let stats = RoundStats {
            step: self.step,
            degree_cv: degree_cv(&self.graph, &self.agents),
            cooperation: cooperators as f64 / self.agents.len() as f64,
            cooperators,
            stranger_games,
            strategy_changes,
        };

        for agent in &mut self.agents {
            agent.strangers.clear();
        }
        self.step += 1;

        debug!(
            step = stats.step,
            cv = format!("{:.4}", stats.degree_cv),
            p_c = format!("{:.4}", stats.cooperation),
            strangers = stats.stranger_games,
            "Round complete"
        );
        stats
    }

    /// Play `rounds` rounds and collect their statistics.
    pub fn run(&mut self, rounds: usize) -> Vec<RoundStats> {
        (0..rounds).map(|_| self.step()).collect()
    }

    /// Redraw initial strategies and clear all memories; the network is kept.
    pub fn reset(&mut self) {
        for agent in &mut self.agents {
            let strategy = random_strategy(&mut self.rng);
            agent.reset(strategy);
        }
        self.step = 0;
    }

    /// Current strategy of every node.
    pub fn snapshot(&self) -> Vec<Strategy> {
        self.agents.iter().map(|a| a.strategy).collect()
    }

    pub fn cooperator_count(&self) -> usize {
        cooperator_count(&self.agents)
    }

    /// Current fraction of cooperators.
    pub fn cooperation(&self) -> f64 {
        self.cooperator_count() as f64 / self.agents.len() as f64
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of rounds played so far.
    pub fn rounds_played(&self) -> usize {
        self.step
    }
}

fn random_strategy(rng: &mut dyn RngCore) -> Strategy {
    if rng.random_bool(0.5) {
        Strategy::Cooperate
    } else {
        Strategy::Defect
    }
}
