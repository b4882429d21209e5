//! Louvain local-moving phase
//!
//! Greedily relocates nodes between adjacent communities while that increases
//! modularity. Each sweep visits the movable nodes in a fresh random order; a
//! node only considers communities it has at least one edge into, so the work
//! per node is bounded by its degree rather than by the number of communities.
//!
//! Gain of moving node `i` from its current community to `target`:
//!
//! ```text
//! ΔQ = (k_i,target − k_i,current) / W
//!      − resolution · k_i · (Σ_target − Σ_current) / (2 · W²)
//! ```
//!
//! where `k_i,x` is the edge weight from `i` into community `x` and `Σ_x` the
//! summed degree of `x` without `i`.

use super::aggregation::LevelGraph;
use crate::config::LouvainOptions;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Outcome of one local-moving phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalMovingPhase {
    /// At least one node changed community
    pub moved: bool,

    /// Sweeps performed
    pub sweeps: usize,

    /// Total node moves across all sweeps
    pub moves: usize,
}

/// Local-moving optimizer over one [`LevelGraph`]
#[derive(Debug)]
pub struct ModularityOptimizer<'g> {
    graph: &'g LevelGraph,
    max_iterations: usize,
    min_gain: f64,
    resolution: f64,
}

impl<'g> ModularityOptimizer<'g> {
    /// Create an optimizer using the Louvain options
    #[must_use]
    pub fn new(graph: &'g LevelGraph, options: &LouvainOptions) -> Self {
        Self {
            graph,
            max_iterations: options.max_iterations,
            min_gain: options.min_modularity_gain,
            resolution: options.resolution,
        }
    }

    /// Start from singletons and optimize every node
    pub fn optimize<R: Rng + ?Sized>(&self, rng: &mut R) -> (Vec<usize>, LocalMovingPhase) {
        let mut communities: Vec<usize> = (0..self.graph.node_count()).collect();
        let movable: Vec<usize> = (0..self.graph.node_count()).collect();
        let phase = self.optimize_from(&mut communities, &movable, rng);
        (communities, phase)
    }

    /// Optimize only `movable` nodes, starting from `communities`
    ///
    /// Nodes outside `movable` keep their community but still count toward
    /// community degree sums. Labels in `communities` may be sparse.
    pub fn optimize_from<R: Rng + ?Sized>(
        &self,
        communities: &mut [usize],
        movable: &[usize],
        rng: &mut R,
    ) -> LocalMovingPhase {
        let graph = self.graph;
        let w = graph.total_weight();
        let mut phase = LocalMovingPhase::default();

        if w <= 0.0 || movable.is_empty() {
            return phase;
        }

        let label_space = communities
            .iter()
            .max()
            .map_or(0, |&max| max + 1)
            .max(communities.len());
        let mut community_degree = vec![0.0; label_space];
        for (node, &community) in communities.iter().enumerate() {
            community_degree[community] += graph.degree(node);
        }

        let mut order = movable.to_vec();
        let mut candidate_slot: HashMap<usize, usize> = HashMap::new();
        let mut candidates: Vec<(usize, f64)> = Vec::new();

        while phase.sweeps < self.max_iterations {
            phase.sweeps += 1;
            order.shuffle(rng);
            let mut sweep_moves = 0;

            for &node in &order {
                let current = communities[node];
                let k_i = graph.degree(node);

                candidate_slot.clear();
                candidates.clear();
                let mut edges_to_current = 0.0;

                for &(neighbor, weight) in graph.neighbors(node) {
                    let community = communities[neighbor];
                    if community == current {
                        edges_to_current += weight;
                        continue;
                    }
                    match candidate_slot.get(&community) {
                        Some(&slot) => candidates[slot].1 += weight,
                        None => {
                            candidate_slot.insert(community, candidates.len());
                            candidates.push((community, weight));
                        }
                    }
                }

                let sum_current = community_degree[current] - k_i;
                let mut best: Option<usize> = None;
                let mut best_gain = self.min_gain;

                // Strict comparison: ties keep the first candidate evaluated
                for &(target, edges_to_target) in &candidates {
                    let sum_target = community_degree[target];
                    let gain = (edges_to_target - edges_to_current) / w
                        - self.resolution * k_i * (sum_target - sum_current) / (2.0 * w * w);
                    if gain > best_gain {
                        best_gain = gain;
                        best = Some(target);
                    }
                }

                if let Some(target) = best {
                    community_degree[current] -= k_i;
                    community_degree[target] += k_i;
                    communities[node] = target;
                    sweep_moves += 1;
                }
            }

            phase.moves += sweep_moves;
            if sweep_moves == 0 {
                break;
            }
            phase.moved = true;
        }

        phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AdjacencyBuilder, Edge, NodeId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn level_graph(nodes: &[&str], edges: &[(&str, &str)]) -> LevelGraph {
        let ids: Vec<NodeId> = nodes.iter().map(|&id| id.into()).collect();
        let edges: Vec<Edge> = edges.iter().map(|&(s, t)| Edge::new(s, t, "R")).collect();
        let adjacency = AdjacencyBuilder::new(&ids, &edges).undirected();
        LevelGraph::from_adjacency(&adjacency, &adjacency.index())
    }

    #[test]
    fn test_no_edges_no_moves() {
        let graph = level_graph(&["a", "b", "c"], &[]);
        let optimizer = ModularityOptimizer::new(&graph, &LouvainOptions::default());

        let (communities, phase) = optimizer.optimize(&mut StdRng::seed_from_u64(1));

        assert_eq!(communities, vec![0, 1, 2]);
        assert!(!phase.moved);
        assert_eq!(phase.sweeps, 0);
    }

    #[test]
    fn test_triangle_merges() {
        let graph = level_graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let optimizer = ModularityOptimizer::new(&graph, &LouvainOptions::default());

        let (communities, phase) = optimizer.optimize(&mut StdRng::seed_from_u64(7));

        assert!(phase.moved);
        assert!(phase.moves >= 2);
        assert_eq!(communities[0], communities[1]);
        assert_eq!(communities[1], communities[2]);
    }

    #[test]
    fn test_disjoint_pairs_stay_apart() {
        let graph = level_graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "d")]);
        let optimizer = ModularityOptimizer::new(&graph, &LouvainOptions::default());

        let (communities, _) = optimizer.optimize(&mut StdRng::seed_from_u64(3));

        assert_eq!(communities[0], communities[1]);
        assert_eq!(communities[2], communities[3]);
        assert_ne!(communities[0], communities[2]);
    }

    #[test]
    fn test_max_iterations_caps_sweeps() {
        let graph = level_graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let options = LouvainOptions::default().with_max_iterations(1);
        let optimizer = ModularityOptimizer::new(&graph, &options);

        let (_, phase) = optimizer.optimize(&mut StdRng::seed_from_u64(11));

        assert_eq!(phase.sweeps, 1);
    }

    #[test]
    fn test_frozen_nodes_keep_community() {
        // Path a-b-c-d; only d may move, everything else pinned
        let graph = level_graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);
        let optimizer = ModularityOptimizer::new(&graph, &LouvainOptions::default());

        let mut communities = vec![10, 10, 20, 30];
        let phase = optimizer.optimize_from(&mut communities, &[3], &mut StdRng::seed_from_u64(5));

        assert_eq!(&communities[..3], &[10, 10, 20]);
        assert_eq!(communities[3], 20);
        assert!(phase.moved);
    }

    #[test]
    fn test_high_min_gain_blocks_moves() {
        let graph = level_graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        let options = LouvainOptions::default().with_min_modularity_gain(10.0);
        let optimizer = ModularityOptimizer::new(&graph, &options);

        let (communities, phase) = optimizer.optimize(&mut StdRng::seed_from_u64(2));

        assert_eq!(communities, vec![0, 1, 2]);
        assert!(!phase.moved);
        assert_eq!(phase.sweeps, 1);
    }
}
