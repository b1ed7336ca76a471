//! Configuration types for the cooperation model.
//!
//! Defaults reproduce the reference setup: 10 000 nodes with mean degree 4,
//! a ten-round memory, b = 1.2, threshold 0.5, three stranger attempts per
//! round and a stranger cost coefficient of 0.1. Loaded from JSON at runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topology::TopologyKind;

/// Rejected model parameters.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("temptation b must be >= 1.0, got {0}")]
    Temptation(f64),

    #[error("cooperation threshold r must lie in [0, 1], got {0}")]
    Threshold(f64),

    #[error("memory length must be at least 1")]
    EmptyMemory,

    #[error("stranger cost alpha must be >= 0, got {0}")]
    StrangerCost(f64),

    #[error("network needs at least 2 nodes, got {0}")]
    TooFewNodes(usize),

    #[error("half degree R must be at least 1")]
    ZeroHalfDegree,

    #[error("mean degree 2R = {degree} is not below the node count {nodes}")]
    DegreeTooLarge { degree: usize, nodes: usize },

    #[error("square lattice needs a perfect square node count with side >= 3, got {0}")]
    NotALattice(usize),
}

/// Top-level model configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Game and stranger-interaction parameters
    #[serde(default)]
    pub game: GameConfig,

    /// Fixed network parameters
    #[serde(default)]
    pub network: NetworkConfig,
}

/// Game parameters: payoffs, memory and the stranger rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Payoff of a defector meeting a cooperator (mutual cooperation pays 1)
    pub temptation: f64,

    /// Agents whose remembered cooperation ratio is below this seek strangers
    pub threshold: f64,

    /// Number of most recent rounds kept in memory
    pub memory_len: usize,

    /// Stranger draws attempted per round by a stranger-seeking agent
    pub stranger_attempts: usize,

    /// Cost coefficient: each stranger game costs `temptation * stranger_cost`
    pub stranger_cost: f64,

    /// Disable to keep only persistent (fixed network) connections
    pub strangers_enabled: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            temptation: 1.2,
            threshold: 0.5,
            memory_len: 10,
            stranger_attempts: 3,
            stranger_cost: 0.1,
            strangers_enabled: true,
        }
    }
}

impl GameConfig {
    /// Deduction for a single accepted stranger game.
    pub fn stranger_fee(&self) -> f64 {
        self.temptation * self.stranger_cost
    }
}

/// Fixed network parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of nodes
    pub size: usize,

    /// Half the mean degree (the lattice always has R = 2)
    pub half_degree: usize,

    /// Topology family
    pub topology: TopologyKind,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            size: 10_000,
            half_degree: 2,
            topology: TopologyKind::ErdosRenyi,
        }
    }
}

impl NetworkConfig {
    /// Edge probability that gives a mean degree of about `2R`.
    pub fn edge_probability(&self) -> f64 {
        if self.size < 2 {
            return 0.0;
        }
        (2 * self.half_degree) as f64 / (self.size - 1) as f64
    }

    /// Side length of the lattice, if `size` is a perfect square.
    pub fn lattice_side(&self) -> Option<usize> {
        let side = (self.size as f64).sqrt().round() as usize;
        (side * side == self.size).then_some(side)
    }
}

impl ModelConfig {
    /// Check every parameter against the model's domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        self.network.validate()
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temptation.is_nan() || self.temptation < 1.0 {
            return Err(ConfigError::Temptation(self.temptation));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Threshold(self.threshold));
        }
        if self.memory_len == 0 {
            return Err(ConfigError::EmptyMemory);
        }
        if self.stranger_cost.is_nan() || self.stranger_cost < 0.0 {
            return Err(ConfigError::StrangerCost(self.stranger_cost));
        }
        Ok(())
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size < 2 {
            return Err(ConfigError::TooFewNodes(self.size));
        }
        if self.half_degree == 0 {
            return Err(ConfigError::ZeroHalfDegree);
        }
        match self.topology {
            TopologyKind::ErdosRenyi => {
                if 2 * self.half_degree >= self.size {
                    return Err(ConfigError::DegreeTooLarge {
                        degree: 2 * self.half_degree,
                        nodes: self.size,
                    });
                }
            }
            TopologyKind::SquareLattice => match self.lattice_side() {
                Some(side) if side >= 3 => {}
                _ => return Err(ConfigError::NotALattice(self.size)),
            },
        }
        Ok(())
    }
}
