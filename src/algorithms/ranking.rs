//! Ranked presentation of per-node scores
//!
//! Joins a [`ScoreMap`] with the display attributes of the snapshot it was
//! computed from and orders it by descending score. Equal scores fall back to
//! ascending node id so the order is stable across runs.

use crate::storage::{GraphSnapshot, NodeId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Node → score
pub type ScoreMap = BTreeMap<NodeId, f64>;

/// One scored entity with its display attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    /// 1-based position in the ranking
    pub rank: usize,

    /// Node id
    pub id: NodeId,

    /// Display name (the id when the node carries none)
    pub name: String,

    /// Entity type
    pub entity_type: String,

    /// Score
    pub score: f64,

    /// Free-form attributes copied from the node
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Where a single entity sits in a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStanding {
    /// Node id
    pub id: NodeId,

    /// Score
    pub score: f64,

    /// 1-based rank
    pub rank: usize,

    /// Number of ranked entities
    pub total: usize,

    /// Share of entities ranked below this one, in `[0, 100]`
    pub percentile: f64,
}

impl EntityStanding {
    /// Look up `node` in an already sorted ranking
    #[must_use]
    pub fn find(ranked: &[RankedEntity], node: &NodeId) -> Option<Self> {
        let entity = ranked.iter().find(|entity| &entity.id == node)?;
        Some(Self {
            id: entity.id.clone(),
            score: entity.score,
            rank: entity.rank,
            total: ranked.len(),
            percentile: percentile(entity.rank, ranked.len()),
        })
    }
}

/// Percentile of a 1-based `rank` among `total` entities
///
/// The top entity is at 100, the bottom at 0. A single entity is at 100.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn percentile(rank: usize, total: usize) -> f64 {
    if total <= 1 {
        return 100.0;
    }
    (total - rank.clamp(1, total)) as f64 / (total - 1) as f64 * 100.0
}

/// Join `scores` with node attributes and sort descending
#[must_use]
pub fn rank_entities(scores: &ScoreMap, snapshot: &GraphSnapshot) -> Vec<RankedEntity> {
    let nodes = snapshot.nodes_by_id();

    let mut ranked: Vec<RankedEntity> = scores
        .iter()
        .map(|(id, &score)| {
            let node = nodes.get(id);
            RankedEntity {
                rank: 0,
                id: id.clone(),
                name: node.map_or_else(|| id.to_string(), |node| node.name.clone()),
                entity_type: node.map(|node| node.node_type.clone()).unwrap_or_default(),
                score,
                attributes: node.map(|node| node.attributes.clone()).unwrap_or_default(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| by_score_desc(a.score, b.score).then_with(|| a.id.cmp(&b.id)));
    for (position, entity) in ranked.iter_mut().enumerate() {
        entity.rank = position + 1;
    }

    ranked
}

fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}
