//! In-memory graph store
//!
//! Reference [`GraphStore`] used by tests and benchmarks, and the template for
//! real adapters. Writes stamp nodes/edges with the current time so that the
//! diff queries have something to answer.

use super::store::{ChangeSummary, GraphStore};
use super::{Edge, GraphSnapshot, Node, NodeId};
use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Change ratio at or below which the store recommends incremental updates
pub const DEFAULT_INCREMENTAL_THRESHOLD: f64 = 0.30;

/// Graph store held entirely in memory behind an async `RwLock`
#[derive(Debug)]
pub struct InMemoryGraphStore {
    graph: RwLock<GraphSnapshot>,
    incremental_threshold: f64,
}

impl InMemoryGraphStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::from_snapshot(GraphSnapshot::default())
    }

    /// Create a store pre-loaded with a snapshot (timestamps kept as given)
    #[must_use]
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        Self {
            graph: RwLock::new(snapshot),
            incremental_threshold: DEFAULT_INCREMENTAL_THRESHOLD,
        }
    }

    /// Override the ratio used for `recommend_incremental`
    #[must_use]
    pub const fn with_incremental_threshold(mut self, threshold: f64) -> Self {
        self.incremental_threshold = threshold;
        self
    }

    /// Insert or replace a node, stamping it as modified now
    pub async fn upsert_node(&self, mut node: Node) {
        node.updated_at = Some(Utc::now());
        let mut graph = self.graph.write().await;
        match graph.nodes.iter_mut().find(|existing| existing.id == node.id) {
            Some(existing) => *existing = node,
            None => graph.nodes.push(node),
        }
    }

    /// Append an edge, stamping it as created now
    pub async fn add_edge(&self, mut edge: Edge) {
        edge.created_at = Some(Utc::now());
        self.graph.write().await.edges.push(edge);
    }

    /// Remove a node and every edge touching it
    ///
    /// Returns `true` if the node existed.
    pub async fn remove_node(&self, id: &NodeId) -> bool {
        let mut graph = self.graph.write().await;
        let before = graph.nodes.len();
        graph.nodes.retain(|node| &node.id != id);
        graph
            .edges
            .retain(|edge| &edge.source != id && &edge.target != id);
        graph.nodes.len() != before
    }

    /// Current node and edge counts
    pub async fn counts(&self) -> (usize, usize) {
        let graph = self.graph.read().await;
        (graph.nodes.len(), graph.edges.len())
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

fn changed_since(stamp: Option<DateTime<Utc>>, since: DateTime<Utc>) -> bool {
    stamp.is_some_and(|at| at >= since)
}

impl GraphStore for InMemoryGraphStore {
    async fn fetch_snapshot(&self) -> Result<GraphSnapshot> {
        Ok(self.graph.read().await.clone())
    }

    #[allow(clippy::cast_precision_loss)]
    async fn change_summary(&self, since: DateTime<Utc>) -> Result<ChangeSummary> {
        let graph = self.graph.read().await;

        let modified = graph
            .nodes
            .iter()
            .filter(|node| changed_since(node.updated_at, since))
            .count();
        let created = graph
            .edges
            .iter()
            .filter(|edge| changed_since(edge.created_at, since))
            .count();
        let total_changes = modified + created;

        let change_ratio = match (graph.nodes.len(), total_changes) {
            (_, 0) => 0.0,
            (0, _) => 1.0,
            (n, total) => total as f64 / n as f64,
        };

        Ok(ChangeSummary {
            has_changes: total_changes > 0,
            change_ratio,
            recommend_incremental: total_changes > 0 && change_ratio <= self.incremental_threshold,
            total_changes,
        })
    }

    async fn modified_nodes_since(&self, since: DateTime<Utc>) -> Result<Vec<Node>> {
        let graph = self.graph.read().await;
        Ok(graph
            .nodes
            .iter()
            .filter(|node| changed_since(node.updated_at, since))
            .cloned()
            .collect())
    }

    async fn edges_created_since(&self, since: DateTime<Utc>) -> Result<Vec<Edge>> {
        let graph = self.graph.read().await;
        Ok(graph
            .edges
            .iter()
            .filter(|edge| changed_since(edge.created_at, since))
            .cloned()
            .collect())
    }
}
