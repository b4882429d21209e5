//! Modularity of a finished partition
//!
//! ```text
//! Q = Σ_c [ internal_c / W − resolution · (degree_c / 2W)² ]
//! ```
//!
//! Computed once from scratch for reporting. The local-moving search uses the
//! per-move gain formula instead and never accumulates Q.

use super::aggregation::LevelGraph;
use crate::storage::{AdjacencyMap, NodeId};
use std::collections::BTreeMap;

/// Modularity of `communities` (one label per level node) on `graph`
#[must_use]
pub fn modularity(graph: &LevelGraph, communities: &[usize], resolution: f64) -> f64 {
    let w = graph.total_weight();
    if w <= 0.0 {
        return 0.0;
    }

    // label -> (internal weight, degree sum)
    let mut totals: BTreeMap<usize, (f64, f64)> = BTreeMap::new();

    for (node, &community) in communities.iter().enumerate() {
        let entry = totals.entry(community).or_insert((0.0, 0.0));
        entry.0 += graph.self_loop(node);
        entry.1 += graph.degree(node);

        for &(neighbor, weight) in graph.neighbors(node) {
            if communities[neighbor] == community {
                entry.0 += weight / 2.0;
            }
        }
    }

    totals
        .values()
        .map(|&(internal, degree)| {
            let share = degree / (2.0 * w);
            internal / w - resolution * share * share
        })
        .sum()
}

/// Modularity of an id-keyed assignment on an undirected adjacency map
///
/// Nodes missing from `assignment` are treated as singletons.
#[must_use]
pub fn modularity_of(
    adjacency: &AdjacencyMap,
    assignment: &BTreeMap<NodeId, usize>,
    resolution: f64,
) -> f64 {
    let index = adjacency.index();
    let graph = LevelGraph::from_adjacency(adjacency, &index);

    let offset = assignment.values().max().map_or(0, |&max| max + 1);
    let communities: Vec<usize> = index
        .ids()
        .iter()
        .enumerate()
        .map(|(i, id)| assignment.get(id).copied().unwrap_or(offset + i))
        .collect();

    modularity(&graph, &communities, resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{AdjacencyBuilder, Edge};

    fn two_triangles_with_bridge() -> AdjacencyMap {
        let nodes: Vec<NodeId> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|&id| id.into())
            .collect();
        let edges = vec![
            Edge::new("a", "b", "R"),
            Edge::new("b", "c", "R"),
            Edge::new("c", "a", "R"),
            Edge::new("d", "e", "R"),
            Edge::new("e", "f", "R"),
            Edge::new("f", "d", "R"),
            Edge::new("c", "d", "R"),
        ];
        AdjacencyBuilder::new(&nodes, &edges).undirected()
    }

    fn assignment(pairs: &[(&str, usize)]) -> BTreeMap<NodeId, usize> {
        pairs.iter().map(|&(id, c)| (NodeId::from(id), c)).collect()
    }

    #[test]
    fn test_two_triangles_known_value() {
        let adjacency = two_triangles_with_bridge();
        let split = assignment(&[("a", 0), ("b", 0), ("c", 0), ("d", 1), ("e", 1), ("f", 1)]);

        // W = 7, each side: internal 3, degree 7 -> 2 * (3/7 - (7/14)^2)
        let expected = 2.0 * (3.0 / 7.0 - 0.25);
        let q = modularity_of(&adjacency, &split, 1.0);
        assert!((q - expected).abs() < 1e-12, "Q = {q}");
    }

    #[test]
    fn test_single_community_is_zero() {
        let adjacency = two_triangles_with_bridge();
        let all = assignment(&[("a", 0), ("b", 0), ("c", 0), ("d", 0), ("e", 0), ("f", 0)]);

        let q = modularity_of(&adjacency, &all, 1.0);
        assert!(q.abs() < 1e-12, "Q = {q}");
    }

    #[test]
    fn test_singletons_are_negative() {
        let adjacency = two_triangles_with_bridge();
        let q = modularity_of(&adjacency, &BTreeMap::new(), 1.0);
        assert!(q < 0.0);
        assert!(q >= -0.5);
    }

    #[test]
    fn test_no_edges_is_zero() {
        let nodes: Vec<NodeId> = vec!["a".into(), "b".into()];
        let adjacency = AdjacencyBuilder::new(&nodes, &[]).undirected();
        let q = modularity_of(&adjacency, &assignment(&[("a", 0), ("b", 1)]), 1.0);
        assert!(q.abs() < f64::EPSILON);
    }

    #[test]
    fn test_resolution_scales_penalty() {
        let adjacency = two_triangles_with_bridge();
        let split = assignment(&[("a", 0), ("b", 0), ("c", 0), ("d", 1), ("e", 1), ("f", 1)]);

        let low = modularity_of(&adjacency, &split, 0.5);
        let high = modularity_of(&adjacency, &split, 2.0);
        assert!(low > high);
    }
}
