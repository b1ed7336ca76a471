//! Strategy snapshots: where cooperators and defectors sit at a given round.
//!
//! On a square lattice a snapshot renders as an L x L grid of `C`/`D`
//! characters, row by row, with node `row * L + col` at (row, col).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use cooperation_kernel::{Simulation, Strategy, TopologyKind};

/// Strategies of all nodes after a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Round after which the snapshot was taken
    pub step: usize,
    /// Lattice side, when the network is a square lattice
    pub side: Option<usize>,
    pub strategies: Vec<Strategy>,
}

impl Snapshot {
    /// Capture the current strategies of a simulation.
    pub fn capture(sim: &Simulation, step: usize) -> Self {
        let nodes = sim.graph().node_count();
        let side = match sim.config().network.topology {
            TopologyKind::SquareLattice => {
                let side = (nodes as f64).sqrt().round() as usize;
                (side * side == nodes).then_some(side)
            }
            TopologyKind::ErdosRenyi => None,
        };
        Self {
            step,
            side,
            strategies: sim.snapshot(),
        }
    }

    /// Fraction of cooperators in the snapshot.
    pub fn cooperation(&self) -> f64 {
        if self.strategies.is_empty() {
            return 0.0;
        }
        let cooperators = self.strategies.iter().filter(|s| s.is_cooperator()).count();
        cooperators as f64 / self.strategies.len() as f64
    }

    /// Render as a grid of `C`/`D`, one line per lattice row.
    pub fn render_grid(&self) -> Result<String> {
        let Some(side) = self.side else {
            bail!("Snapshot at step {} is not from a square lattice", self.step);
        };
        if side * side != self.strategies.len() {
            bail!(
                "Snapshot has {} nodes, expected {} for side {}",
                self.strategies.len(),
                side * side,
                side
            );
        }
        let mut out = String::with_capacity(side * (side + 1));
        for row in self.strategies.chunks(side) {
            out.extend(row.iter().map(|s| s.symbol()));
            out.push('\n');
        }
        Ok(out)
    }

    /// Write the rendered grid to a text file.
    pub fn write_grid(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let grid = self.render_grid()?;
        std::fs::write(path, grid).with_context(|| format!("writing {}", path.display()))
    }
}

/// Save every snapshot as JSON; non-lattice snapshots keep their flat strategy list.
pub fn save_snapshots(path: impl AsRef<Path>, snapshots: &[Snapshot]) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(snapshots)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Write `snapshot-stepNNNNN.txt` grids into `dir` for the lattice snapshots.
///
/// Snapshots without a lattice side have no grid and are skipped.
pub fn write_grids(dir: impl AsRef<Path>, snapshots: &[Snapshot]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut written = Vec::new();
    for snapshot in snapshots.iter().filter(|s| s.side.is_some()) {
        let path = dir.join(format!("snapshot-step{:05}.txt", snapshot.step));
        snapshot.write_grid(&path)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cooperation_kernel::ModelConfig;

    fn lattice_config(size: usize) -> ModelConfig {
        let mut config = ModelConfig::default();
        config.network.topology = TopologyKind::SquareLattice;
        config.network.size = size;
        config
    }

    #[test]
    fn test_render_lattice_grid() {
        let snapshot = Snapshot {
            step: 4,
            side: Some(3),
            strategies: vec![
                Strategy::Cooperate,
                Strategy::Defect,
                Strategy::Cooperate,
                Strategy::Defect,
                Strategy::Defect,
                Strategy::Defect,
                Strategy::Cooperate,
                Strategy::Cooperate,
                Strategy::Cooperate,
            ],
        };
        assert_eq!(snapshot.render_grid().unwrap(), "CDC\nDDD\nCCC\n");
        assert!((snapshot.cooperation() - 5.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_lattice_snapshot_does_not_render() {
        let snapshot = Snapshot {
            step: 0,
            side: None,
            strategies: vec![Strategy::Defect; 10],
        };
        assert!(snapshot.render_grid().is_err());
    }

    #[test]
    fn test_capture_from_simulation() {
        let mut sim = Simulation::new(lattice_config(25), Some(17)).unwrap();
        sim.run(3);
        let snapshot = Snapshot::capture(&sim, 2);
        assert_eq!(snapshot.side, Some(5));
        assert_eq!(snapshot.strategies.len(), 25);
        assert!((snapshot.cooperation() - sim.cooperation()).abs() < 1e-12);

        let grid = snapshot.render_grid().unwrap();
        assert_eq!(grid.lines().count(), 5);
        assert!(grid.lines().all(|line| line.len() == 5));
    }

    #[test]
    fn test_capture_side_follows_supplied_graph() {
        let graph = cooperation_kernel::topology::square_lattice(4).unwrap();
        let sim = Simulation::with_graph(lattice_config(100), graph, 3).unwrap();
        let snapshot = Snapshot::capture(&sim, 0);
        assert_eq!(snapshot.side, Some(4));
        assert_eq!(snapshot.render_grid().unwrap().lines().count(), 4);
    }

    #[test]
    fn test_capture_from_random_network_has_no_side() {
        let mut config = ModelConfig::default();
        config.network.size = 50;
        let sim = Simulation::new(config, Some(2)).unwrap();
        assert_eq!(Snapshot::capture(&sim, 0).side, None);
    }
}
