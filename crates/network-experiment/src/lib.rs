//! Network Experiment: cooperation with ephemeral stranger links on lattice and random networks.
//!
//! This crate drives the cooperation kernel through the study's experiments:
//! - Sweeps over the temptation b and the stranger cost alpha
//! - Persistent-only versus persistent-plus-ephemeral connections
//! - Strategy snapshots on the square lattice
//! - Degree heterogeneity over time

pub mod experiment;
pub mod results;
pub mod snapshot;
pub mod sweep;
