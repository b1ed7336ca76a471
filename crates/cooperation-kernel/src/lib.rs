//! Cooperation Kernel: the weak prisoner's dilemma on fixed networks with ephemeral links.
//!
//! Agents remember their last M decisions. Those with a poor cooperative
//! record reach out to strangers with an equally poor record, paying a cost
//! per short-lived game, on top of playing their persistent neighbours.
//! Strategies spread by payoff-weighted pairwise imitation.

pub mod agent;
pub mod config;
pub mod dynamics;
pub mod game;
pub mod kernel;
pub mod stats;
pub mod topology;

pub use agent::{Agent, Strategy};
pub use config::{ConfigError, GameConfig, ModelConfig, NetworkConfig};
pub use kernel::Simulation;
pub use stats::RoundStats;
pub use topology::{Graph, TopologyBuilder, TopologyKind};
