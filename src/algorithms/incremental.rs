//! Dynamic-frontier Louvain
//!
//! Re-optimizes only the part of the graph a change can plausibly affect.
//! Communities are seeded from a previous result, new nodes start as
//! singletons, and local moving runs over the *frontier*:
//!
//! ```text
//! frontier = new nodes ∪ endpoints of new edges ∪ modified nodes
//!            ∪ immediate neighbors of all of the above
//! ```
//!
//! Everything outside the frontier keeps its seeded community. Whether the
//! incremental path is worth taking at all is decided by [`check_eligibility`];
//! callers run full detection otherwise.

use super::aggregation::LevelGraph;
use super::local_moving::ModularityOptimizer;
use super::louvain::{renumber, CommunityResult, FallbackReason, Partition};
use super::modularity::modularity;
use crate::config::{IncrementalOptions, LouvainOptions};
use crate::error::AnalyticsError;
use crate::storage::{AdjacencyMap, Edge, NodeId};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Changes since the previous result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDelta {
    /// Edges created since the previous result
    pub new_edges: Vec<Edge>,

    /// Entities created or modified since the previous result
    ///
    /// Entities the previous result never saw are counted as new nodes, not
    /// as modified ones.
    pub modified_nodes: Vec<NodeId>,
}

impl GraphDelta {
    /// Delta from the store's diff answers
    #[must_use]
    pub fn new(new_edges: Vec<Edge>, modified_nodes: Vec<NodeId>) -> Self {
        Self {
            new_edges,
            modified_nodes,
        }
    }
}

/// Change counts the eligibility decision was based on
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Present now, absent from the previous assignment
    pub new_nodes: Vec<NodeId>,

    /// Modified, present now and in the previous assignment
    pub modified_nodes: Vec<NodeId>,

    /// Number of new edges reported
    pub new_edge_count: usize,

    /// `(new nodes + new edges + modified nodes) / node count`
    pub change_ratio: f64,
}

/// Decision on whether to run the incremental path
#[derive(Debug, Clone, PartialEq)]
pub enum Eligibility {
    /// Incremental update is allowed
    Eligible(ChangeSet),

    /// Full detection should run instead
    Ineligible(FallbackReason),
}

/// Decide whether an incremental update is allowed
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn check_eligibility(
    previous: Option<&CommunityResult>,
    adjacency: &AdjacencyMap,
    delta: &GraphDelta,
    options: &IncrementalOptions,
) -> Eligibility {
    let Some(previous) = previous.filter(|prev| !prev.assignment.is_empty()) else {
        return Eligibility::Ineligible(FallbackReason::NoPreviousResult);
    };

    let node_count = adjacency.node_count();
    if node_count < options.min_nodes {
        return Eligibility::Ineligible(FallbackReason::TooFewNodes {
            node_count,
            min_nodes: options.min_nodes,
        });
    }

    let new_nodes: Vec<NodeId> = adjacency
        .nodes()
        .filter(|id| !previous.assignment.contains_key(*id))
        .cloned()
        .collect();

    let modified_nodes: Vec<NodeId> = delta
        .modified_nodes
        .iter()
        .filter(|id| adjacency.contains(id) && previous.assignment.contains_key(*id))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let changes = new_nodes.len() + delta.new_edges.len() + modified_nodes.len();
    let change_ratio = changes as f64 / node_count as f64;

    if change_ratio > options.max_change_ratio {
        return Eligibility::Ineligible(FallbackReason::ChangeRatioExceeded {
            ratio: change_ratio,
            max_ratio: options.max_change_ratio,
        });
    }

    Eligibility::Eligible(ChangeSet {
        new_nodes,
        modified_nodes,
        new_edge_count: delta.new_edges.len(),
        change_ratio,
    })
}

/// Nodes that must be re-evaluated after a change
#[must_use]
pub fn frontier(
    adjacency: &AdjacencyMap,
    changes: &ChangeSet,
    new_edges: &[Edge],
) -> BTreeSet<NodeId> {
    let mut seeds: BTreeSet<&NodeId> = BTreeSet::new();
    seeds.extend(changes.new_nodes.iter());
    seeds.extend(changes.modified_nodes.iter());
    for edge in new_edges {
        seeds.extend([&edge.source, &edge.target]);
    }

    let mut frontier = BTreeSet::new();
    for seed in seeds.into_iter().filter(|id| adjacency.contains(id)) {
        frontier.extend(adjacency.neighbors(seed).cloned());
        frontier.insert(seed.clone());
    }
    frontier
}

/// Output of a successful incremental run
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierUpdate {
    /// Dense assignment over the current graph
    pub partition: Partition,

    /// Nodes that were allowed to move
    pub frontier: BTreeSet<NodeId>,

    /// Communities (new ids) touched by the frontier or with changed membership
    pub changed_communities: Vec<usize>,
}

/// Update a previous partition by local moving over the frontier
///
/// # Errors
///
/// Returns [`AnalyticsError::CorruptPreviousResult`] if the previous result
/// assigns a community id outside its own community range.
pub fn update_communities<R: Rng + ?Sized>(
    previous: &CommunityResult,
    adjacency: &AdjacencyMap,
    changes: &ChangeSet,
    new_edges: &[Edge],
    options: &LouvainOptions,
    rng: &mut R,
) -> Result<FrontierUpdate, AnalyticsError> {
    let previous_count = previous.metadata.community_count;
    if let Some((node, &community)) = previous
        .assignment
        .iter()
        .find(|(_, &community)| community >= previous_count)
    {
        return Err(AnalyticsError::CorruptPreviousResult {
            node: node.clone(),
            community,
            count: previous_count,
        });
    }

    let index = adjacency.index();
    let graph = LevelGraph::from_adjacency(adjacency, &index);

    // Seed: previous ids for known nodes, fresh singletons after them
    let mut next_fresh = previous_count;
    let mut communities: Vec<usize> = index
        .ids()
        .iter()
        .map(|id| {
            previous.assignment.get(id).copied().unwrap_or_else(|| {
                next_fresh += 1;
                next_fresh - 1
            })
        })
        .collect();

    let frontier = frontier(adjacency, changes, new_edges);
    let movable: Vec<usize> = frontier
        .iter()
        .filter_map(|id| index.position(id))
        .collect();

    let phase =
        ModularityOptimizer::new(&graph, options).optimize_from(&mut communities, &movable, rng);
    debug!(
        "incremental louvain: frontier {} of {} nodes, {} moves in {} sweeps",
        movable.len(),
        index.len(),
        phase.moves,
        phase.sweeps
    );

    let (labels, community_count) = renumber(&communities);
    let q = modularity(&graph, &labels, options.resolution);
    let assignment: BTreeMap<NodeId, usize> =
        index.ids().iter().cloned().zip(labels.iter().copied()).collect();

    let mut changed: BTreeSet<usize> = movable.iter().map(|&i| labels[i]).collect();
    changed.extend(membership_changes(previous, &assignment, community_count));

    Ok(FrontierUpdate {
        partition: Partition {
            assignment,
            community_count,
            modularity: q,
            hierarchy_levels: 1,
            sweeps: phase.sweeps,
        },
        frontier,
        changed_communities: changed.into_iter().collect(),
    })
}

/// New communities whose member set is not exactly a previous community
fn membership_changes(
    previous: &CommunityResult,
    assignment: &BTreeMap<NodeId, usize>,
    community_count: usize,
) -> Vec<usize> {
    let mut previous_groups: BTreeMap<usize, BTreeSet<&NodeId>> = BTreeMap::new();
    for (node, &community) in &previous.assignment {
        previous_groups.entry(community).or_default().insert(node);
    }

    let mut current_groups: Vec<BTreeSet<&NodeId>> = vec![BTreeSet::new(); community_count];
    for (node, &community) in assignment {
        current_groups[community].insert(node);
    }

    current_groups
        .iter()
        .enumerate()
        .filter(|(_, members)| {
            let anchor = members
                .iter()
                .find_map(|node| previous.assignment.get(*node));
            anchor.and_then(|community| previous_groups.get(community)) != Some(*members)
        })
        .map(|(id, _)| id)
        .collect()
}
