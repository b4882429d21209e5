//! Graph storage layer
//!
//! Snapshot types, the read-only graph-store seam, an in-memory store, and the
//! adjacency builder every algorithm starts from.

pub mod adjacency;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use adjacency::{AdjacencyBuilder, AdjacencyMap, DegreeMap, NodeIndex};
pub use memory::InMemoryGraphStore;
pub use snapshot::{Edge, GraphSnapshot, Node, NodeId};
pub use store::{ChangeSummary, GraphStore};
