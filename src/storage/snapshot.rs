//! Knowledge-graph snapshot types
//!
//! A snapshot is the `{nodes, edges}` pair fetched from the graph store at the
//! start of every analytics call. Nothing in it is mutated by the engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Entity identifier as assigned by the graph store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from anything string-like
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Knowledge-graph entity (process, role, system, document, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique id
    pub id: NodeId,

    /// Display name
    pub name: String,

    /// Type tag (e.g. `"Process"`, `"Role"`)
    pub node_type: String,

    /// Free-form attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Last modification time, used by the store to answer diff queries
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Node {
    /// Create a node without attributes
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(id),
            name: name.into(),
            node_type: node_type.into(),
            attributes: BTreeMap::new(),
            updated_at: None,
        }
    }

    /// Attach a free-form attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Relationship between two entities
///
/// Whether the edge is read as directed depends on the algorithm: Louvain
/// always treats it as undirected, `PageRank` always as directed, betweenness
/// per its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source entity
    pub source: NodeId,

    /// Target entity
    pub target: NodeId,

    /// Type tag (e.g. `"PERFORMS"`, `"DEPENDS_ON"`)
    pub edge_type: String,

    /// Creation time, used by the store to answer diff queries
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Edge {
    /// Create an edge
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            source: NodeId::new(source),
            target: NodeId::new(target),
            edge_type: edge_type.into(),
            created_at: None,
        }
    }
}

/// Point-in-time copy of the graph as fetched from the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// All entities
    pub nodes: Vec<Node>,

    /// All relationships
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Create a snapshot
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// True when there are no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every node, in snapshot order
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    /// Index nodes by id for display joins
    #[must_use]
    pub fn nodes_by_id(&self) -> BTreeMap<&NodeId, &Node> {
        self.nodes.iter().map(|node| (&node.id, node)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_conversions() {
        let a = NodeId::from("proc-1");
        let b = NodeId::new(String::from("proc-1"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "proc-1");
        assert_eq!(a.to_string(), "proc-1");
    }

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = GraphSnapshot::new(
            vec![
                Node::new("a", "Approve invoice", "Process"),
                Node::new("b", "Accountant", "Role"),
            ],
            vec![Edge::new("b", "a", "PERFORMS")],
        );

        assert!(!snapshot.is_empty());
        assert_eq!(snapshot.node_ids(), vec![NodeId::from("a"), NodeId::from("b")]);

        let by_id = snapshot.nodes_by_id();
        assert_eq!(by_id[&NodeId::from("b")].node_type, "Role");
    }

    #[test]
    fn test_node_serde_defaults() {
        let json = r#"{"id":"x","name":"X","node_type":"System"}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert!(node.attributes.is_empty());
        assert!(node.updated_at.is_none());
    }
}
