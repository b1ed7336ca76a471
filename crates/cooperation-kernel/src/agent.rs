//! Agents: strategy, round payoff and a bounded memory of past decisions.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// A decision in the prisoner's dilemma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    Cooperate,
    Defect,
}

impl Strategy {
    pub fn is_cooperator(self) -> bool {
        matches!(self, Self::Cooperate)
    }

    /// Single-character form used in snapshots.
    pub fn symbol(self) -> char {
        match self {
            Self::Cooperate => 'C',
            Self::Defect => 'D',
        }
    }
}

/// One player on the network.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Strategy played this round
    pub strategy: Strategy,
    /// Strategy at the start of this round; neighbours imitate this one
    pub previous: Strategy,
    /// Payoff accumulated this round
    pub payoff: f64,
    /// Strangers this agent played this round (may repeat)
    pub strangers: Vec<usize>,
    memory: VecDeque<Strategy>,
    capacity: usize,
    cooperations: usize,
}

impl Agent {
    /// Create an agent with an empty memory of `capacity` rounds.
    pub fn new(strategy: Strategy, capacity: usize) -> Self {
        Self {
            strategy,
            previous: strategy,
            payoff: 0.0,
            strangers: Vec::new(),
            memory: VecDeque::with_capacity(capacity),
            capacity,
            cooperations: 0,
        }
    }

    /// Push the current strategy into memory, evicting the oldest entry when full.
    pub fn record_decision(&mut self) {
        if self.memory.len() == self.capacity {
            if let Some(evicted) = self.memory.pop_front() {
                if evicted.is_cooperator() {
                    self.cooperations -= 1;
                }
            }
        }
        self.memory.push_back(self.strategy);
        if self.strategy.is_cooperator() {
            self.cooperations += 1;
        }
    }

    /// Number of cooperative decisions currently remembered.
    pub fn cooperations(&self) -> usize {
        self.cooperations
    }

    pub fn memory(&self) -> &VecDeque<Strategy> {
        &self.memory
    }

    pub fn memory_is_full(&self) -> bool {
        self.memory.len() == self.capacity
    }

    /// Fraction of cooperative decisions, defined only once memory is full.
    pub fn cooperation_ratio(&self) -> Option<f64> {
        self.memory_is_full()
            .then(|| self.cooperations as f64 / self.capacity as f64)
    }

    /// Whether this agent's record is bad enough to look for strangers.
    pub fn seeks_strangers(&self, threshold: f64) -> bool {
        self.cooperation_ratio().is_some_and(|ratio| ratio < threshold)
    }

    /// Forget history, payoff and strangers, and start over with `strategy`.
    pub fn reset(&mut self, strategy: Strategy) {
        self.strategy = strategy;
        self.previous = strategy;
        self.payoff = 0.0;
        self.strangers.clear();
        self.memory.clear();
        self.cooperations = 0;
    }
}
