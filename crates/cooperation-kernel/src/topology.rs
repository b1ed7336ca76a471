//! Fixed network topologies: the persistent connections agents play on.
//!
//! Two families are supported:
//! - Erdős–Rényi G(N, p) with p chosen so the mean degree is about 2R
//! - Square lattice with periodic boundaries and von Neumann neighbourhood

use std::fmt;

use anyhow::{bail, Result};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;

/// Topology family of the fixed network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyKind {
    ErdosRenyi,
    SquareLattice,
}

impl TopologyKind {
    /// Short name used in result keys and file names.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ErdosRenyi => "er",
            Self::SquareLattice => "lattice",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Undirected simple graph over nodes `0..n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    adjacency: Vec<Vec<usize>>,
    edges: usize,
}

impl Graph {
    /// Graph with `n` nodes and no edges.
    pub fn empty(n: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); n],
            edges: 0,
        }
    }

    /// Build from an edge list. Self-loops and duplicate edges are dropped.
    pub fn from_edges(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Result<Self> {
        let mut graph = Self::empty(n);
        for (a, b) in edges {
            if a >= n || b >= n {
                bail!("Edge ({}, {}) out of range for {} nodes", a, b, n);
            }
            if a != b && !graph.adjacency[a].contains(&b) {
                graph.add_edge_unchecked(a, b);
            }
        }
        Ok(graph)
    }

    fn add_edge_unchecked(&mut self, a: usize, b: usize) {
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        self.edges += 1;
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    /// Mean fixed degree, 2E / N.
    pub fn mean_degree(&self) -> f64 {
        if self.adjacency.is_empty() {
            return 0.0;
        }
        (2 * self.edges) as f64 / self.adjacency.len() as f64
    }
}

/// A topology builder produces the fixed network for a simulation.
///
/// Builders receive the simulation's rng so a seeded run also seeds the
/// network. Deterministic families may ignore it.
pub trait TopologyBuilder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Build the graph.
    fn build(&self, rng: &mut dyn RngCore) -> Result<Graph>;
}

/// G(N, p) random graph.
#[derive(Debug, Clone)]
pub struct ErdosRenyiBuilder {
    pub nodes: usize,
    pub probability: f64,
}

impl TopologyBuilder for ErdosRenyiBuilder {
    fn name(&self) -> &str {
        "erdos_renyi"
    }

    fn build(&self, rng: &mut dyn RngCore) -> Result<Graph> {
        Ok(erdos_renyi(self.nodes, self.probability, rng))
    }
}

/// Periodic L x L lattice.
#[derive(Debug, Clone)]
pub struct SquareLatticeBuilder {
    pub side: usize,
}

impl TopologyBuilder for SquareLatticeBuilder {
    fn name(&self) -> &str {
        "square_lattice"
    }

    fn build(&self, _rng: &mut dyn RngCore) -> Result<Graph> {
        square_lattice(self.side)
    }
}

/// Pick the builder described by a network config.
pub fn builder_for(config: &NetworkConfig) -> Result<Box<dyn TopologyBuilder>> {
    match config.topology {
        TopologyKind::ErdosRenyi => Ok(Box::new(ErdosRenyiBuilder {
            nodes: config.size,
            probability: config.edge_probability(),
        })),
        TopologyKind::SquareLattice => match config.lattice_side() {
            Some(side) => Ok(Box::new(SquareLatticeBuilder { side })),
            None => bail!("{} nodes do not form a square lattice", config.size),
        },
    }
}

/// Sample G(n, p) by geometric skipping over the lower-triangle pair index.
///
/// Runs in O(n + E) instead of testing all n(n-1)/2 pairs.
pub fn erdos_renyi(n: usize, p: f64, rng: &mut dyn RngCore) -> Graph {
    let mut graph = Graph::empty(n);
    if n < 2 || p.is_nan() || p <= 0.0 {
        return graph;
    }
    if p >= 1.0 {
        for a in 0..n {
            for b in (a + 1)..n {
                graph.add_edge_unchecked(a, b);
            }
        }
        return graph;
    }

    let log_q = (-p).ln_1p();
    let mut v: usize = 1;
    let mut w: i64 = -1;
    while v < n {
        let u: f64 = rng.random();
        let skip = ((1.0 - u).ln() / log_q).floor() as i64;
        w += 1 + skip;
        while v < n && w >= v as i64 {
            w -= v as i64;
            v += 1;
        }
        if v < n {
            graph.add_edge_unchecked(v, w as usize);
        }
    }
    graph
}

/// Periodic square lattice, each node linked to its four von Neumann neighbours.
///
/// Node `row * side + col` sits at (row, col).
pub fn square_lattice(side: usize) -> Result<Graph> {
    if side < 3 {
        bail!("Lattice side must be at least 3, got {}", side);
    }
    let n = side * side;
    let mut graph = Graph::empty(n);
    for row in 0..side {
        for col in 0..side {
            let node = row * side + col;
            let right = row * side + (col + 1) % side;
            let down = ((row + 1) % side) * side + col;
            graph.add_edge_unchecked(node, right);
            graph.add_edge_unchecked(node, down);
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_lattice_degree_is_four() {
        let graph = square_lattice(5).unwrap();
        assert_eq!(graph.node_count(), 25);
        assert_eq!(graph.edge_count(), 50);
        for node in 0..25 {
            assert_eq!(graph.degree(node), 4);
        }
        assert!((graph.mean_degree() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_lattice_wraps_around() {
        let graph = square_lattice(4).unwrap();
        // Corner (0, 0) links to (0, 3) and (3, 0)
        let neighbors = graph.neighbors(0);
        assert!(neighbors.contains(&1));
        assert!(neighbors.contains(&3));
        assert!(neighbors.contains(&4));
        assert!(neighbors.contains(&12));
    }

    #[test]
    fn test_lattice_rejects_small_side() {
        assert!(square_lattice(2).is_err());
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let graph = erdos_renyi(300, 0.05, &mut rng);
        for a in 0..graph.node_count() {
            for &b in graph.neighbors(a) {
                assert_ne!(a, b, "self-loop at {}", a);
                assert!(graph.neighbors(b).contains(&a));
            }
        }
    }

    #[test]
    fn test_erdos_renyi_mean_degree() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let n = 4_000;
        let p = 4.0 / (n - 1) as f64;
        let graph = erdos_renyi(n, p, &mut rng);
        let mean = graph.mean_degree();
        assert!((mean - 4.0).abs() < 0.3, "mean degree {}", mean);
    }

    #[test]
    fn test_erdos_renyi_no_duplicate_edges() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let graph = erdos_renyi(200, 0.1, &mut rng);
        for a in 0..graph.node_count() {
            let mut seen = graph.neighbors(a).to_vec();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), graph.degree(a));
        }
    }

    #[test]
    fn test_erdos_renyi_extremes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(erdos_renyi(50, 0.0, &mut rng).edge_count(), 0);
        assert_eq!(erdos_renyi(10, 1.0, &mut rng).edge_count(), 45);
        assert_eq!(erdos_renyi(1, 0.5, &mut rng).edge_count(), 0);
    }

    #[test]
    fn test_erdos_renyi_tiny_probability() {
        // 1 - p rounds to 1.0 here, so the skip length must come from ln_1p
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let graph = erdos_renyi(1_000, 1e-17, &mut rng);
        assert_eq!(graph.node_count(), 1_000);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_erdos_renyi_is_seeded() {
        let a = erdos_renyi(500, 0.01, &mut ChaCha8Rng::seed_from_u64(9));
        let b = erdos_renyi(500, 0.01, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_edges_drops_loops_and_duplicates() {
        let graph = Graph::from_edges(3, [(0, 1), (1, 0), (2, 2), (1, 2)]).unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert!(Graph::from_edges(2, [(0, 5)]).is_err());
    }

    #[test]
    fn test_builder_for_config() {
        let config = NetworkConfig {
            size: 16,
            half_degree: 2,
            topology: TopologyKind::SquareLattice,
        };
        let builder = builder_for(&config).unwrap();
        assert_eq!(builder.name(), "square_lattice");
        let graph = builder.build(&mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        assert_eq!(graph.node_count(), 16);

        let bad = NetworkConfig { size: 15, ..config };
        assert!(builder_for(&bad).is_err());
    }
}
