//! Betweenness centrality (Brandes, 2001)
//!
//! For every source an unweighted BFS records shortest-path counts σ, hop
//! distances and shortest-path predecessors. Dependencies are then accumulated
//! while popping the BFS stack, which yields nodes in non-increasing distance:
//!
//! ```text
//! δ(v) += σ(v) / σ(w) · (1 + δ(w))     for every predecessor v of w
//! ```
//!
//! Sampling runs the BFS from `k` random sources and scales the result by
//! `n / k`. Normalization happens before that rescale.
//!
//! Undirected traversal reaches each pair from both ends and raw scores keep
//! both contributions; normalization divides by `(n−1)(n−2)/2`, so an
//! undirected hub can score up to 2.

use super::ranking::{rank_entities, EntityStanding, RankedEntity, ScoreMap};
use crate::config::BetweennessOptions;
use crate::storage::{AdjacencyBuilder, AdjacencyMap, Edge, GraphSnapshot, NodeId, NodeIndex};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Raw Brandes output
#[derive(Debug, Clone, PartialEq)]
pub struct BetweennessScores {
    /// Node → betweenness
    pub scores: ScoreMap,

    /// BFS sources actually used
    pub sources: usize,

    /// Every node was used as a source
    pub exact: bool,

    /// Valid edges traversed
    pub edge_count: usize,
}

/// Compute betweenness centrality
///
/// # Example
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use trueno_kg::algorithms::betweenness;
/// use trueno_kg::config::BetweennessOptions;
/// use trueno_kg::{Edge, NodeId};
///
/// // a -> b -> c: every a..c path runs through b
/// let nodes: Vec<NodeId> = vec!["a".into(), "b".into(), "c".into()];
/// let edges = vec![Edge::new("a", "b", "R"), Edge::new("b", "c", "R")];
/// let options = BetweennessOptions::default().with_normalized(false);
///
/// let result = betweenness(&nodes, &edges, &options, &mut StdRng::seed_from_u64(0));
/// assert_eq!(result.scores[&NodeId::from("b")], 1.0);
/// assert_eq!(result.scores[&NodeId::from("a")], 0.0);
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn betweenness<R: Rng + ?Sized>(
    node_ids: &[NodeId],
    edges: &[Edge],
    options: &BetweennessOptions,
    rng: &mut R,
) -> BetweennessScores {
    let builder = AdjacencyBuilder::new(node_ids, edges);
    let adjacency = if options.directed {
        builder.directed()
    } else {
        builder.undirected()
    };
    let index = adjacency.index();
    let n = index.len();

    let sources: Vec<usize> = match options.sample_size {
        Some(k) if k < n => rand::seq::index::sample(rng, n, k).into_vec(),
        _ => (0..n).collect(),
    };
    let exact = sources.len() == n;

    let neighbors = dense_neighbors(&adjacency, &index);
    let mut centrality = vec![0.0_f64; n];
    for &source in &sources {
        accumulate(source, &neighbors, &mut centrality);
    }

    if options.normalized && n > 2 {
        let pairs = ((n - 1) * (n - 2)) as f64;
        let scale = if options.directed { pairs } else { pairs / 2.0 };
        for score in &mut centrality {
            *score /= scale;
        }
    }

    if !exact && !sources.is_empty() {
        let rescale = n as f64 / sources.len() as f64;
        for score in &mut centrality {
            *score *= rescale;
        }
    }

    debug!(
        "betweenness: {n} nodes, {} sources, directed={}, normalized={}",
        sources.len(),
        options.directed,
        options.normalized
    );

    BetweennessScores {
        scores: index.ids().iter().cloned().zip(centrality).collect(),
        sources: sources.len(),
        exact,
        edge_count: adjacency.edge_count(),
    }
}

fn dense_neighbors(adjacency: &AdjacencyMap, index: &NodeIndex) -> Vec<Vec<usize>> {
    index
        .ids()
        .iter()
        .map(|id| {
            adjacency
                .neighbors(id)
                .filter_map(|neighbor| index.position(neighbor))
                .collect()
        })
        .collect()
}

/// Single-source BFS plus dependency accumulation into `centrality`
fn accumulate(source: usize, neighbors: &[Vec<usize>], centrality: &mut [f64]) {
    let n = neighbors.len();
    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut distance: Vec<Option<usize>> = vec![None; n];
    let mut delta = vec![0.0_f64; n];

    sigma[source] = 1.0;
    distance[source] = Some(0);

    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        let Some(dist_v) = distance[v] else { continue };

        for &w in &neighbors[v] {
            if distance[w].is_none() {
                distance[w] = Some(dist_v + 1);
                queue.push_back(w);
            }
            if distance[w] == Some(dist_v + 1) {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    while let Some(w) = stack.pop() {
        for &v in &predecessors[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            centrality[w] += delta[w];
        }
    }
}

/// Metadata of a betweenness run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetweennessMetadata {
    /// Nodes scored
    pub node_count: usize,

    /// Valid edges traversed
    pub edge_count: usize,

    /// Wall time of the call, snapshot fetch included
    pub execution_time: Duration,

    /// Scores were normalized
    pub normalized: bool,

    /// Edge direction was followed
    pub directed: bool,

    /// Requested sample size
    pub sample_size: Option<usize>,

    /// BFS sources actually used
    pub sources: usize,

    /// Every node was used as a source
    pub exact: bool,
}

/// Betweenness scores joined with display data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetweennessResult {
    /// Node → betweenness
    pub scores: ScoreMap,

    /// Entities by descending score
    pub ranked: Vec<RankedEntity>,

    /// Run metadata
    pub metadata: BetweennessMetadata,
}

impl BetweennessResult {
    /// Join raw scores with the snapshot's display attributes
    #[must_use]
    pub fn from_scores(
        raw: BetweennessScores,
        snapshot: &GraphSnapshot,
        options: &BetweennessOptions,
    ) -> Self {
        let ranked = rank_entities(&raw.scores, snapshot);
        Self {
            metadata: BetweennessMetadata {
                node_count: raw.scores.len(),
                edge_count: raw.edge_count,
                execution_time: Duration::ZERO,
                normalized: options.normalized,
                directed: options.directed,
                sample_size: options.sample_size,
                sources: raw.sources,
                exact: raw.exact,
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

    /// 1-based rank of one node
    #[must_use]
    pub fn rank_of(&self, node: &NodeId) -> Option<usize> {
        self.ranked
            .iter()
            .find(|entity| &entity.id == node)
            .map(|entity| entity.rank)
    }

    /// Percentile of one node, 100 for the top entity
    #[must_use]
    pub fn percentile_of(&self, node: &NodeId) -> Option<f64> {
        self.standing(node).map(|standing| standing.percentile)
    }

    /// Score, rank and percentile of one node
    #[must_use]
    pub fn standing(&self, node: &NodeId) -> Option<EntityStanding> {
        EntityStanding::find(&self.ranked, node)
    }

    /// Entities scoring at least `threshold`, highest first
    #[must_use]
    pub fn bridges(&self, threshold: f64) -> Vec<&RankedEntity> {
        self.ranked
            .iter()
            .take_while(|entity| entity.score >= threshold)
            .collect()
    }
}
