//! Read-only seam to the external graph store
//!
//! The analytics engines never mutate the store. The only suspension points
//! of an analytics call are these fetches; everything after the snapshot is
//! resident runs synchronously.

use super::{Edge, GraphSnapshot, Node};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of what changed in the store since a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Anything changed at all
    pub has_changes: bool,

    /// Changed entities + created edges, relative to the current node count
    pub change_ratio: f64,

    /// Store-side hint that an incremental update is worthwhile
    pub recommend_incremental: bool,

    /// Absolute number of changes
    pub total_changes: usize,
}

/// Graph-store collaborator
///
/// Implementations must be safe to call concurrently if the analytics service
/// is shared across tasks; this crate does not add any locking of its own.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    /// Fetch the full `{nodes, edges}` snapshot
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged; analytics calls propagate it.
    async fn fetch_snapshot(&self) -> Result<GraphSnapshot>;

    /// Summarize changes since `since`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn change_summary(&self, since: DateTime<Utc>) -> Result<ChangeSummary>;

    /// Entities created or modified since `since`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn modified_nodes_since(&self, since: DateTime<Utc>) -> Result<Vec<Node>>;

    /// Edges created since `since`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn edges_created_since(&self, since: DateTime<Utc>) -> Result<Vec<Edge>>;
}
