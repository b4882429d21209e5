//! Hierarchical aggregation for Louvain
//!
//! After a local-moving phase every community collapses into one super-node.
//! Edges crossing a community boundary become weighted super-edges; edges
//! inside a community become the super-node's self-loop weight. Degrees and the
//! total edge weight `W` are therefore identical on every level, which keeps the
//! modularity gain of a super-node move equal to the gain of moving all of its
//! members on the original graph.
//!
//! ```text
//! level 0                      level 1
//!   a - b      communities       [ab] ==2== [cd]     self-loops: ab=1, cd=1
//!   | X |   -> {a,b} {c,d}  ->   degrees: ab=4, cd=4 (sum unchanged)
//!   c - d
//! ```

use crate::storage::{AdjacencyMap, NodeIndex};
use std::collections::{BTreeMap, HashMap};

/// Weighted undirected graph one hierarchy level runs on
#[derive(Debug, Clone, PartialEq)]
pub struct LevelGraph {
    /// Non-loop neighbors with edge weight, ascending by neighbor index
    neighbors: Vec<Vec<(usize, f64)>>,
    /// Weight of edges folded into each node, each edge counted once
    self_loops: Vec<f64>,
    /// Weighted degree: neighbor weights + twice the self-loop weight
    degrees: Vec<f64>,
    /// `W`: every undirected edge counted once
    total_weight: f64,
}

impl LevelGraph {
    /// Level-0 graph: one node per entity, parallel edges become weights
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_adjacency(adjacency: &AdjacencyMap, index: &NodeIndex) -> Self {
        let neighbors: Vec<Vec<(usize, f64)>> = index
            .ids()
            .iter()
            .map(|id| {
                let mut links: Vec<(usize, f64)> = adjacency
                    .links(id)
                    .filter_map(|(neighbor, count)| {
                        index.position(neighbor).map(|j| (j, count as f64))
                    })
                    .collect();
                links.sort_unstable_by_key(|&(j, _)| j);
                links
            })
            .collect();

        let self_loops = vec![0.0; neighbors.len()];
        let degrees = neighbors
            .iter()
            .map(|links| links.iter().map(|&(_, w)| w).sum())
            .collect();

        Self {
            neighbors,
            self_loops,
            degrees,
            total_weight: adjacency.edge_count() as f64,
        }
    }

    /// Number of nodes on this level
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Total edge weight `W`
    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Neighbors of `node` with edge weights (self-loop excluded)
    #[must_use]
    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.neighbors[node]
    }

    /// Internal weight folded into `node`
    #[must_use]
    pub fn self_loop(&self, node: usize) -> f64 {
        self.self_loops[node]
    }

    /// Weighted degree of `node`
    #[must_use]
    pub fn degree(&self, node: usize) -> f64 {
        self.degrees[node]
    }
}

/// Result of collapsing one level
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Graph over super-nodes
    pub graph: LevelGraph,

    /// Level node → super-node
    pub super_node_of: Vec<usize>,
}

impl Aggregation {
    /// Number of super-nodes produced
    #[must_use]
    pub fn super_node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Compose an original-node → level-node mapping with this level
    ///
    /// Returns a fresh mapping; the input is left untouched.
    #[must_use]
    pub fn compose(&self, membership: &[usize]) -> Vec<usize> {
        membership
            .iter()
            .map(|&level_node| self.super_node_of[level_node])
            .collect()
    }
}

/// Collapse each community of `graph` into a super-node
///
/// `communities[i]` is the community label of level node `i`; labels need not
/// be dense. Super-node ids follow the first appearance of each label.
#[must_use]
pub fn aggregate(graph: &LevelGraph, communities: &[usize]) -> Aggregation {
    let mut label_to_super: HashMap<usize, usize> = HashMap::new();
    let super_node_of: Vec<usize> = communities
        .iter()
        .map(|&label| {
            let next = label_to_super.len();
            *label_to_super.entry(label).or_insert(next)
        })
        .collect();

    let count = label_to_super.len();
    let mut crossing: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
    let mut self_loops = vec![0.0; count];

    for (node, links) in graph.neighbors.iter().enumerate() {
        let from = super_node_of[node];
        self_loops[from] += graph.self_loops[node];

        for &(neighbor, weight) in links {
            let to = super_node_of[neighbor];
            if from == to {
                // Seen once from each endpoint
                self_loops[from] += weight / 2.0;
            } else {
                *crossing[from].entry(to).or_insert(0.0) += weight;
            }
        }
    }

    let neighbors: Vec<Vec<(usize, f64)>> = crossing
        .into_iter()
        .map(|links| links.into_iter().collect())
        .collect();

    let degrees = neighbors
        .iter()
        .zip(&self_loops)
        .map(|(links, &internal)| links.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * internal)
        .collect();

    Aggregation {
        graph: LevelGraph {
            neighbors,
            self_loops,
            degrees,
            total_weight: graph.total_weight,
        },
        super_node_of,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AdjacencyBuilder, Edge, NodeId};

    fn square_with_diagonals() -> (AdjacencyMap, NodeIndex) {
        let nodes: Vec<NodeId> = ["a", "b", "c", "d"].iter().map(|&id| id.into()).collect();
        let edges = vec![
            Edge::new("a", "b", "R"),
            Edge::new("c", "d", "R"),
            Edge::new("a", "c", "R"),
            Edge::new("a", "d", "R"),
            Edge::new("b", "c", "R"),
            Edge::new("b", "d", "R"),
        ];
        let adjacency = AdjacencyBuilder::new(&nodes, &edges).undirected();
        let index = adjacency.index();
        (adjacency, index)
    }

    #[test]
    fn test_level_zero_matches_adjacency() {
        let (adjacency, index) = square_with_diagonals();
        let graph = LevelGraph::from_adjacency(&adjacency, &index);

        assert_eq!(graph.node_count(), 4);
        assert!((graph.total_weight() - 6.0).abs() < f64::EPSILON);
        for node in 0..4 {
            assert!((graph.degree(node) - 3.0).abs() < f64::EPSILON);
            assert!(graph.self_loop(node).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_aggregate_preserves_degree_and_weight() {
        let (adjacency, index) = square_with_diagonals();
        let graph = LevelGraph::from_adjacency(&adjacency, &index);

        // {a,b} and {c,d} with non-dense labels
        let aggregation = aggregate(&graph, &[7, 7, 3, 3]);
        let level1 = &aggregation.graph;

        assert_eq!(aggregation.super_node_count(), 2);
        assert_eq!(aggregation.super_node_of, vec![0, 0, 1, 1]);
        assert!((level1.total_weight() - 6.0).abs() < f64::EPSILON);
        assert!((level1.self_loop(0) - 1.0).abs() < f64::EPSILON);
        assert!((level1.self_loop(1) - 1.0).abs() < f64::EPSILON);
        assert_eq!(level1.neighbors(0), &[(1, 4.0)]);
        assert!((level1.degree(0) - 6.0).abs() < f64::EPSILON);
        assert!((level1.degree(1) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_twice_folds_everything() {
        let (adjacency, index) = square_with_diagonals();
        let graph = LevelGraph::from_adjacency(&adjacency, &index);

        let level1 = aggregate(&graph, &[0, 0, 1, 1]);
        let level2 = aggregate(&level1.graph, &[0, 0]);

        assert_eq!(level2.super_node_count(), 1);
        assert!((level2.graph.self_loop(0) - 6.0).abs() < f64::EPSILON);
        assert!((level2.graph.degree(0) - 12.0).abs() < f64::EPSILON);
        assert!(level2.graph.neighbors(0).is_empty());
    }

    #[test]
    fn test_compose_builds_new_mapping() {
        let (adjacency, index) = square_with_diagonals();
        let graph = LevelGraph::from_adjacency(&adjacency, &index);

        let membership = vec![0, 1, 2, 3];
        let level1 = aggregate(&graph, &[5, 5, 9, 9]);
        let composed = level1.compose(&membership);

        assert_eq!(composed, vec![0, 0, 1, 1]);
        assert_eq!(membership, vec![0, 1, 2, 3]);
    }
}
