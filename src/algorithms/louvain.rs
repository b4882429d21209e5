//! Louvain community detection algorithm
//!
//! Community detection for identifying clusters of business entities based on
//! graph structure. Based on the Louvain method (Blondel et al., 2008).
//!
//! The method alternates two phases:
//! 1. Local moving: nodes greedily join neighboring communities
//!    ([`ModularityOptimizer`])
//! 2. Aggregation: communities collapse into super-nodes ([`aggregate`])
//!
//! and stops when a phase moves nothing, a single community remains, or
//! aggregation no longer coarsens the graph. Each round is one hierarchy level.
//!
//! # References
//! - Blondel et al. (2008): "Fast unfolding of communities in large networks"
//! - Newman (2006): "Modularity and community structure in networks"

use super::aggregation::{aggregate, LevelGraph};
use super::local_moving::ModularityOptimizer;
use super::modularity::modularity;
use crate::config::LouvainOptions;
use crate::storage::{AdjacencyMap, GraphSnapshot, NodeId};
use chrono::{DateTime, Utc};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Dense community assignment produced by a detection run
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Node → community id in `[0, community_count)`
    pub assignment: BTreeMap<NodeId, usize>,

    /// Number of communities
    pub community_count: usize,

    /// Modularity of the assignment on the full graph
    pub modularity: f64,

    /// Local-moving/aggregation rounds performed
    pub hierarchy_levels: usize,

    /// Local-moving sweeps across all levels
    pub sweeps: usize,
}

impl Partition {
    /// Partition of an empty graph
    #[must_use]
    pub fn empty() -> Self {
        Self {
            assignment: BTreeMap::new(),
            community_count: 0,
            modularity: 0.0,
            hierarchy_levels: 0,
            sweeps: 0,
        }
    }
}

/// Detect communities with multi-level Louvain
///
/// `adjacency` must be undirected. The random source drives the sweep order;
/// pass a seeded generator for reproducible output.
///
/// # Example
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use trueno_kg::algorithms::louvain;
/// use trueno_kg::config::LouvainOptions;
/// use trueno_kg::{AdjacencyBuilder, Edge, NodeId};
///
/// let nodes: Vec<NodeId> = ["a", "b", "c", "x", "y", "z"].iter().map(|&n| n.into()).collect();
/// let edges = vec![
///     Edge::new("a", "b", "R"), Edge::new("b", "c", "R"), Edge::new("c", "a", "R"),
///     Edge::new("x", "y", "R"), Edge::new("y", "z", "R"), Edge::new("z", "x", "R"),
/// ];
/// let adjacency = AdjacencyBuilder::new(&nodes, &edges).undirected();
///
/// let partition = louvain(&adjacency, &LouvainOptions::default(), &mut StdRng::seed_from_u64(1));
/// assert_eq!(partition.community_count, 2);
/// assert!(partition.modularity > 0.0);
/// ```
pub fn louvain<R: Rng + ?Sized>(
    adjacency: &AdjacencyMap,
    options: &LouvainOptions,
    rng: &mut R,
) -> Partition {
    let index = adjacency.index();
    let n = index.len();
    if n == 0 {
        return Partition::empty();
    }

    let base = LevelGraph::from_adjacency(adjacency, &index);
    if base.total_weight() <= 0.0 {
        let assignment = index.ids().iter().cloned().zip(0..n).collect();
        return Partition {
            assignment,
            community_count: n,
            modularity: 0.0,
            hierarchy_levels: 0,
            sweeps: 0,
        };
    }

    // original node -> node of the current level
    let mut membership: Vec<usize> = (0..n).collect();
    let mut level_graph = base.clone();
    let mut levels = 0;
    let mut sweeps = 0;

    loop {
        let optimizer = ModularityOptimizer::new(&level_graph, options);
        let (communities, phase) = optimizer.optimize(rng);
        levels += 1;
        sweeps += phase.sweeps;

        let aggregation = aggregate(&level_graph, &communities);
        membership = aggregation.compose(&membership);

        let before = level_graph.node_count();
        let after = aggregation.super_node_count();
        debug!(
            "louvain level {levels}: {before} -> {after} nodes, {} moves in {} sweeps",
            phase.moves, phase.sweeps
        );

        if !phase.moved || after <= 1 || after == before {
            break;
        }
        level_graph = aggregation.graph;
    }

    let (labels, community_count) = renumber(&membership);
    let q = modularity(&base, &labels, options.resolution);
    let assignment = index.ids().iter().cloned().zip(labels).collect();

    Partition {
        assignment,
        community_count,
        modularity: q,
        hierarchy_levels: levels,
        sweeps,
    }
}

/// Relabel to dense ids in order of first appearance
///
/// Returns the new labels and the number of distinct communities.
#[must_use]
pub fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut dense: HashMap<usize, usize> = HashMap::new();
    let relabeled = labels
        .iter()
        .map(|&label| {
            let next = dense.len();
            *dense.entry(label).or_insert(next)
        })
        .collect();
    (relabeled, dense.len())
}

/// Why a requested incremental run was answered with full detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No usable previous result was supplied
    NoPreviousResult,

    /// Graph too small for incremental updates to pay off
    TooFewNodes {
        /// Current node count
        node_count: usize,
        /// Configured minimum
        min_nodes: usize,
    },

    /// Store advised against an incremental update
    NotRecommended {
        /// Change ratio reported by the store
        ratio: f64,
    },

    /// Too much of the graph changed
    ChangeRatioExceeded {
        /// Observed change ratio
        ratio: f64,
        /// Configured maximum
        max_ratio: f64,
    },
}

/// How a community result was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DetectionOutcome {
    /// Full multi-level Louvain was requested and ran
    Full,

    /// Frontier-restricted update of a previous result
    Incremental,

    /// Store reported no changes; the previous result was returned
    Cached,

    /// Incremental was requested but policy chose full detection
    FallbackByPolicy {
        /// Policy that applied
        reason: FallbackReason,
    },

    /// Incremental failed internally and full detection ran instead
    FallbackByError {
        /// Rendered error
        error: String,
    },
}

impl DetectionOutcome {
    /// True for either fallback variant
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::FallbackByPolicy { .. } | Self::FallbackByError { .. })
    }
}

/// One detected community with display summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// Dense id in `[0, community_count)`
    pub id: usize,

    /// Member ids, ascending
    pub members: Vec<NodeId>,

    /// Number of members
    pub size: usize,

    /// Member count per node type
    pub type_counts: BTreeMap<String, usize>,

    /// Most frequent node type (ties go to the alphabetically first type)
    pub dominant_type: Option<String>,
}

/// Metadata attached to every community result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMetadata {
    /// Nodes analyzed
    pub node_count: usize,

    /// Valid undirected edges analyzed (`W`)
    pub edge_count: usize,

    /// Wall time of the call, snapshot fetch included
    pub execution_time: Duration,

    /// Number of communities
    pub community_count: usize,

    /// Modularity of the final assignment
    pub modularity: f64,

    /// Hierarchy levels (incremental runs report 1)
    pub hierarchy_levels: usize,

    /// Local-moving sweeps performed
    pub sweeps: usize,

    /// How this result was produced
    pub outcome: DetectionOutcome,

    /// Frontier size for incremental runs
    pub frontier_size: Option<usize>,

    /// Communities touched by an incremental run, ascending
    pub changed_communities: Vec<usize>,

    /// When the underlying partition was computed
    pub computed_at: DateTime<Utc>,
}

/// Community detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityResult {
    /// Node → community id
    pub assignment: BTreeMap<NodeId, usize>,

    /// Communities ordered by id
    pub communities: Vec<Community>,

    /// Run metadata
    pub metadata: CommunityMetadata,
}

impl CommunityResult {
    /// Join a partition with node display data
    ///
    /// `read_at` is when `snapshot` was read from the store; later change
    /// queries diff from it.
    #[must_use]
    pub fn from_partition(
        partition: Partition,
        snapshot: &GraphSnapshot,
        edge_count: usize,
        outcome: DetectionOutcome,
        read_at: DateTime<Utc>,
    ) -> Self {
        let nodes = snapshot.nodes_by_id();

        let mut members: Vec<Vec<NodeId>> = vec![Vec::new(); partition.community_count];
        for (node, &community) in &partition.assignment {
            members[community].push(node.clone());
        }

        let communities = members
            .into_iter()
            .enumerate()
            .map(|(id, members)| {
                let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();
                for member in &members {
                    if let Some(node) = nodes.get(member) {
                        *type_counts.entry(node.node_type.clone()).or_insert(0) += 1;
                    }
                }
                let dominant_type = dominant(&type_counts);
                Community {
                    id,
                    size: members.len(),
                    members,
                    type_counts,
                    dominant_type,
                }
            })
            .collect();

        Self {
            metadata: CommunityMetadata {
                node_count: partition.assignment.len(),
                edge_count,
                execution_time: Duration::ZERO,
                community_count: partition.community_count,
                modularity: partition.modularity,
                hierarchy_levels: partition.hierarchy_levels,
                sweeps: partition.sweeps,
                outcome,
                frontier_size: None,
                changed_communities: Vec::new(),
                computed_at: read_at,
            },
            assignment: partition.assignment,
            communities,
        }
    }

    /// Community id of a node
    #[must_use]
    pub fn community_of(&self, node: &NodeId) -> Option<usize> {
        self.assignment.get(node).copied()
    }

    /// Community by id
    #[must_use]
    pub fn community(&self, id: usize) -> Option<&Community> {
        self.communities.get(id)
    }

    /// The `n` largest communities, ties broken by id
    #[must_use]
    pub fn largest(&self, n: usize) -> Vec<&Community> {
        let mut sorted: Vec<&Community> = self.communities.iter().collect();
        sorted.sort_by(|a, b| b.size.cmp(&a.size).then(a.id.cmp(&b.id)));
        sorted.truncate(n);
        sorted
    }

    /// Number of communities
    #[must_use]
    pub fn community_count(&self) -> usize {
        self.metadata.community_count
    }
}

fn dominant(type_counts: &BTreeMap<String, usize>) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (node_type, &count) in type_counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((node_type, count));
        }
    }
    best.map(|(node_type, _)| node_type.clone())
}
