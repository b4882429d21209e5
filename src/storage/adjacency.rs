//! Adjacency sets and degree counts built from a snapshot
//!
//! Every algorithm family starts here. The builder drops self-loops and edges
//! whose endpoints are not in the node list, and uses ordered maps so that the
//! result does not depend on input ordering.
//!
//! ```text
//! nodes: a, b, c      edges: a-b, b-c, a-b, c-c, c-z
//!
//! undirected:
//!   a: {b x2}         degree 2
//!   b: {a x2, c x1}   degree 3
//!   c: {b x1}         degree 1     (c-c self-loop and c-z dropped)
//! ```

use super::{Edge, NodeId};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Node id → incident-edge count
pub type DegreeMap = BTreeMap<NodeId, usize>;

/// Builds [`AdjacencyMap`]s from a node id list and an edge list
#[derive(Debug, Clone, Copy)]
pub struct AdjacencyBuilder<'a> {
    node_ids: &'a [NodeId],
    edges: &'a [Edge],
}

impl<'a> AdjacencyBuilder<'a> {
    /// Create a builder over borrowed snapshot data
    #[must_use]
    pub fn new(node_ids: &'a [NodeId], edges: &'a [Edge]) -> Self {
        Self { node_ids, edges }
    }

    /// Symmetric adjacency: edge (u, v) is recorded as u→v and v→u
    #[must_use]
    pub fn undirected(&self) -> AdjacencyMap {
        self.build(false)
    }

    /// Out-link adjacency: edge (u, v) is recorded as u→v only
    #[must_use]
    pub fn directed(&self) -> AdjacencyMap {
        self.build(true)
    }

    fn build(&self, directed: bool) -> AdjacencyMap {
        let mut links: BTreeMap<NodeId, BTreeMap<NodeId, usize>> = self
            .node_ids
            .iter()
            .map(|id| (id.clone(), BTreeMap::new()))
            .collect();

        let mut edge_count = 0;
        let mut dropped = 0;

        for edge in self.edges {
            if edge.source == edge.target
                || !links.contains_key(&edge.source)
                || !links.contains_key(&edge.target)
            {
                dropped += 1;
                continue;
            }

            edge_count += 1;
            bump(&mut links, &edge.source, &edge.target);
            if !directed {
                bump(&mut links, &edge.target, &edge.source);
            }
        }

        if dropped > 0 {
            debug!(
                "adjacency: dropped {dropped} self-loop/dangling edge(s) of {}",
                self.edges.len()
            );
        }

        AdjacencyMap {
            links,
            edge_count,
            dropped_edges: dropped,
            directed,
        }
    }
}

fn bump(links: &mut BTreeMap<NodeId, BTreeMap<NodeId, usize>>, from: &NodeId, to: &NodeId) {
    if let Some(neighbors) = links.get_mut(from) {
        *neighbors.entry(to.clone()).or_insert(0) += 1;
    }
}

/// Node id → neighbor set, with parallel-edge multiplicities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyMap {
    links: BTreeMap<NodeId, BTreeMap<NodeId, usize>>,
    edge_count: usize,
    dropped_edges: usize,
    directed: bool,
}

impl AdjacencyMap {
    /// Number of distinct nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.links.len()
    }

    /// Number of valid edges, each counted once regardless of direction
    ///
    /// This is the total edge weight `W` used for modularity normalization.
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of self-loops and dangling edges that were dropped
    #[must_use]
    pub const fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    /// Whether this map holds out-links only
    #[must_use]
    pub const fn is_directed(&self) -> bool {
        self.directed
    }

    /// True if the node is part of the map
    #[must_use]
    pub fn contains(&self, node: &NodeId) -> bool {
        self.links.contains_key(node)
    }

    /// All node ids in ascending order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.links.keys()
    }

    /// Neighbor set of a node (empty for unknown nodes)
    pub fn neighbors<'s>(&'s self, node: &NodeId) -> impl Iterator<Item = &'s NodeId> + 's {
        self.links.get(node).into_iter().flat_map(BTreeMap::keys)
    }

    /// Neighbors with the number of parallel edges to each
    pub fn links<'s>(&'s self, node: &NodeId) -> impl Iterator<Item = (&'s NodeId, usize)> + 's {
        self.links
            .get(node)
            .into_iter()
            .flat_map(|neighbors| neighbors.iter().map(|(id, &count)| (id, count)))
    }

    /// Incident-edge count (out-edges for a directed map)
    #[must_use]
    pub fn degree(&self, node: &NodeId) -> usize {
        self.links
            .get(node)
            .map_or(0, |neighbors| neighbors.values().sum())
    }

    /// Degree of every node
    #[must_use]
    pub fn degrees(&self) -> DegreeMap {
        self.links
            .iter()
            .map(|(id, neighbors)| (id.clone(), neighbors.values().sum()))
            .collect()
    }

    /// Dense `usize` indexing of the node set, in ascending id order
    #[must_use]
    pub fn index(&self) -> NodeIndex {
        NodeIndex::new(self.links.keys().cloned().collect())
    }
}

/// Bijection between node ids and dense indices used inside the hot loops
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    ids: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
}

impl NodeIndex {
    fn new(ids: Vec<NodeId>) -> Self {
        let positions = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self { ids, positions }
    }

    /// Number of indexed nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no nodes are indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dense index of a node id
    #[must_use]
    pub fn position(&self, node: &NodeId) -> Option<usize> {
        self.positions.get(node).copied()
    }

    /// Node id at a dense index
    #[must_use]
    pub fn id(&self, position: usize) -> &NodeId {
        &self.ids[position]
    }

    /// All ids in index order
    #[must_use]
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().map(|id| NodeId::from(*id)).collect()
    }

    #[test]
    fn test_undirected_is_symmetric() {
        let nodes = ids(&["a", "b", "c"]);
        let edges = vec![Edge::new("a", "b", "R"), Edge::new("b", "c", "R")];

        let adjacency = AdjacencyBuilder::new(&nodes, &edges).undirected();

        for node in adjacency.nodes() {
            for neighbor in adjacency.neighbors(node) {
                assert!(
                    adjacency.neighbors(neighbor).any(|back| back == node),
                    "{node} -> {neighbor} has no reverse link"
                );
            }
        }
        assert_eq!(adjacency.edge_count(), 2);
        assert!(!adjacency.is_directed());
    }

    #[test]
    fn test_drops_self_loops_and_dangling_edges() {
        let nodes = ids(&["a", "b"]);
        let edges = vec![
            Edge::new("a", "a", "R"),
            Edge::new("a", "missing", "R"),
            Edge::new("ghost", "b", "R"),
            Edge::new("a", "b", "R"),
        ];

        let adjacency = AdjacencyBuilder::new(&nodes, &edges).undirected();

        assert_eq!(adjacency.edge_count(), 1);
        assert_eq!(adjacency.dropped_edges(), 3);
        assert_eq!(adjacency.degree(&NodeId::from("a")), 1);
        assert_eq!(adjacency.degree(&NodeId::from("b")), 1);
        assert!(!adjacency.contains(&NodeId::from("missing")));
    }

    #[test]
    fn test_parallel_edges_count_toward_degree() {
        let nodes = ids(&["a", "b", "c"]);
        let edges = vec![
            Edge::new("a", "b", "OWNS"),
            Edge::new("b", "a", "MANAGES"),
            Edge::new("b", "c", "R"),
        ];

        let adjacency = AdjacencyBuilder::new(&nodes, &edges).undirected();
        let degrees = adjacency.degrees();

        assert_eq!(degrees[&NodeId::from("a")], 2);
        assert_eq!(degrees[&NodeId::from("b")], 3);
        assert_eq!(degrees[&NodeId::from("c")], 1);
        // Neighbor set still has one entry per distinct neighbor
        assert_eq!(adjacency.neighbors(&NodeId::from("b")).count(), 2);
        // Degree sum is twice the edge count
        assert_eq!(degrees.values().sum::<usize>(), 2 * adjacency.edge_count());
    }

    #[test]
    fn test_order_independent() {
        let nodes = ids(&["a", "b", "c", "d"]);
        let mut edges = vec![
            Edge::new("a", "b", "R"),
            Edge::new("c", "d", "R"),
            Edge::new("b", "c", "R"),
        ];
        let first = AdjacencyBuilder::new(&nodes, &edges).undirected();

        edges.reverse();
        let mut shuffled_nodes = nodes.clone();
        shuffled_nodes.reverse();
        let second = AdjacencyBuilder::new(&shuffled_nodes, &edges).undirected();

        assert_eq!(first, second);
    }

    #[test]
    fn test_directed_keeps_out_links_only() {
        let nodes = ids(&["a", "b"]);
        let edges = vec![Edge::new("a", "b", "R")];

        let adjacency = AdjacencyBuilder::new(&nodes, &edges).directed();

        assert!(adjacency.is_directed());
        assert_eq!(adjacency.degree(&NodeId::from("a")), 1);
        assert_eq!(adjacency.degree(&NodeId::from("b")), 0);
        assert_eq!(adjacency.neighbors(&NodeId::from("b")).count(), 0);
    }

    #[test]
    fn test_node_index_roundtrip() {
        let nodes = ids(&["c", "a", "b"]);
        let adjacency = AdjacencyBuilder::new(&nodes, &[]).undirected();
        let index = adjacency.index();

        assert_eq!(index.len(), 3);
        assert_eq!(index.ids(), &ids(&["a", "b", "c"])[..]);
        assert_eq!(index.position(&NodeId::from("b")), Some(1));
        assert_eq!(index.id(2), &NodeId::from("c"));
        assert_eq!(index.position(&NodeId::from("z")), None);
    }
}
