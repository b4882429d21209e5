//! `PageRank` importance scoring
//!
//! Based on Page et al. (1999) "The `PageRank` Citation Ranking: Bringing Order to the Web".
//! Power iteration over directed in-link lists.
//!
//! ```text
//! PR(v) = (1-d)/N + d * Σ_{u→v} PR(u) / outdegree(u)
//! ```
//!
//! Dangling nodes (out-degree 0) contribute nothing: their mass is dropped
//! rather than redistributed, so scores only sum to 1.0 on graphs where every
//! node has an out-link.

use super::ranking::{rank_entities, EntityStanding, RankedEntity, ScoreMap};
use crate::config::PageRankOptions;
use crate::storage::{AdjacencyBuilder, Edge, GraphSnapshot, NodeId};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw power-iteration output
#[derive(Debug, Clone, PartialEq)]
pub struct PageRankScores {
    /// Node → score
    pub scores: ScoreMap,

    /// Iterations performed
    pub iterations: usize,

    /// Max delta fell below the threshold
    pub converged: bool,

    /// Largest per-node change in the last iteration
    pub max_delta: f64,

    /// Valid directed edges used
    pub edge_count: usize,
}

/// Compute `PageRank` over a directed edge list
///
/// Self-loops and edges to unknown nodes are ignored; parallel edges count
/// once each toward the source's out-degree.
///
/// # Example
///
/// ```
/// use trueno_kg::algorithms::pagerank;
/// use trueno_kg::config::PageRankOptions;
/// use trueno_kg::{Edge, NodeId};
///
/// let nodes: Vec<NodeId> = vec!["a".into(), "b".into(), "c".into()];
/// let edges = vec![Edge::new("a", "b", "R"), Edge::new("b", "c", "R"), Edge::new("c", "a", "R")];
///
/// let result = pagerank(&nodes, &edges, &PageRankOptions::default());
/// assert!(result.converged);
/// assert!((result.scores.values().sum::<f64>() - 1.0).abs() < 1e-5);
/// ```
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn pagerank(node_ids: &[NodeId], edges: &[Edge], options: &PageRankOptions) -> PageRankScores {
    let adjacency = AdjacencyBuilder::new(node_ids, edges).directed();
    let index = adjacency.index();
    let n = index.len();

    if n == 0 {
        return PageRankScores {
            scores: ScoreMap::new(),
            iterations: 0,
            converged: true,
            max_delta: 0.0,
            edge_count: 0,
        };
    }

    // in_links[v] = (u, parallel edges u→v)
    let mut in_links: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut out_degree = vec![0.0_f64; n];
    for (u, id) in index.ids().iter().enumerate() {
        for (target, count) in adjacency.links(id) {
            if let Some(v) = index.position(target) {
                in_links[v].push((u, count as f64));
                out_degree[u] += count as f64;
            }
        }
    }

    let damping = options.damping_factor;
    let teleport = (1.0 - damping) / n as f64;

    let mut ranks = vec![1.0 / n as f64; n];
    let mut new_ranks = vec![0.0; n];
    let mut iterations = 0;
    let mut converged = false;
    let mut max_delta = 0.0;

    while iterations < options.max_iterations {
        iterations += 1;
        max_delta = 0.0_f64;

        for (v, links) in in_links.iter().enumerate() {
            let inbound: f64 = links
                .iter()
                .map(|&(u, count)| ranks[u] * count / out_degree[u])
                .sum();
            new_ranks[v] = teleport + damping * inbound;
            max_delta = max_delta.max((new_ranks[v] - ranks[v]).abs());
        }

        std::mem::swap(&mut ranks, &mut new_ranks);

        if max_delta < options.convergence_threshold {
            converged = true;
            break;
        }
    }

    debug!("pagerank: {n} nodes, {iterations} iterations, converged={converged}, max_delta={max_delta:.2e}");

    PageRankScores {
        scores: index.ids().iter().cloned().zip(ranks).collect(),
        iterations,
        converged,
        max_delta,
        edge_count: adjacency.edge_count(),
    }
}

/// Metadata of a `PageRank` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankMetadata {
    /// Nodes scored
    pub node_count: usize,

    /// Valid directed edges used
    pub edge_count: usize,

    /// Wall time of the call, snapshot fetch included
    pub execution_time: Duration,

    /// Iterations performed
    pub iterations: usize,

    /// Max delta fell below the threshold
    pub converged: bool,

    /// Largest per-node change in the last iteration
    pub max_delta: f64,
}

/// `PageRank` scores joined with display data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankResult {
    /// Node → score
    pub scores: ScoreMap,

    /// Entities by descending score
    pub ranked: Vec<RankedEntity>,

    /// Run metadata
    pub metadata: PageRankMetadata,
}

impl PageRankResult {
    /// Join raw scores with the snapshot's display attributes
    #[must_use]
    pub fn from_scores(raw: PageRankScores, snapshot: &GraphSnapshot) -> Self {
        let ranked = rank_entities(&raw.scores, snapshot);
        Self {
            metadata: PageRankMetadata {
                node_count: raw.scores.len(),
                edge_count: raw.edge_count,
                execution_time: Duration::ZERO,
                iterations: raw.iterations,
                converged: raw.converged,
                max_delta: raw.max_delta,
            },
            scores: raw.scores,
            ranked,
        }
    }

    /// Score of one node
    #[must_use]
    pub fn score(&self, node: &NodeId) -> Option<f64> {
        self.scores.get(node).copied()
    }

    /// Top `n` entities
    #[must_use]
    pub fn top(&self, n: usize) -> &[RankedEntity] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    /// Score, rank and percentile of one node
    #[must_use]
    pub fn standing(&self, node: &NodeId) -> Option<EntityStanding> {
        EntityStanding::find(&self.ranked, node)
    }
}
