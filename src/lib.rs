//! trueno-kg: structural analytics for business-process knowledge graphs
//!
//! # Overview
//!
//! trueno-kg answers three structural questions about a knowledge graph held
//! by an external store: which entities cluster together (Louvain community
//! detection, with a frontier-restricted incremental variant), which are most
//! influential (`PageRank`), and which act as bridges (Brandes betweenness).
//!
//! # Quick Start
//!
//! ```
//! use trueno_kg::{Edge, GraphAnalytics, InMemoryGraphStore, LouvainOptions, Node};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trueno_kg::Result<()> {
//! let store = InMemoryGraphStore::new();
//! store.upsert_node(Node::new("intake", "Order intake", "Process")).await;
//! store.upsert_node(Node::new("clerk", "Sales clerk", "Role")).await;
//! store.add_edge(Edge::new("clerk", "intake", "PERFORMS")).await;
//!
//! let analytics = GraphAnalytics::new(store);
//!
//! // Cluster entities
//! let communities = analytics.detect_communities(&LouvainOptions::default()).await?;
//! assert_eq!(communities.community_count(), 1);
//!
//! // Rank them
//! let pagerank = analytics.calculate_pagerank(&Default::default()).await?;
//! assert_eq!(pagerank.ranked[0].name, "Order intake");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Storage**: snapshot types, the read-only [`GraphStore`] seam, an
//!   in-memory store, and the deduplicated adjacency every algorithm starts from
//! - **Algorithms**: synchronous, allocation-local implementations over one
//!   snapshot; randomness comes from an injected [`rand::Rng`]
//! - **Service**: [`GraphAnalytics`] fetches a snapshot, runs an algorithm,
//!   and joins scores with display attributes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod config;
pub mod error;
pub mod service;
pub mod storage;

// Re-export core types
pub use algorithms::{
    betweenness, louvain, pagerank, BetweennessResult, Community, CommunityResult,
    DetectionOutcome, EntityStanding, FallbackReason, GraphDelta, PageRankResult, RankedEntity,
    ScoreMap,
};
pub use config::{
    AnalyticsConfig, BetweennessOptions, IncrementalOptions, LouvainOptions, PageRankOptions,
};
pub use error::AnalyticsError;
pub use service::GraphAnalytics;
pub use storage::{
    AdjacencyBuilder, AdjacencyMap, ChangeSummary, Edge, GraphSnapshot, GraphStore,
    InMemoryGraphStore, Node, NodeId,
};

// Error type
pub use anyhow::{Error, Result};
