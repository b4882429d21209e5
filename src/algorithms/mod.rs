//! Graph algorithms (Louvain, incremental Louvain, `PageRank`, betweenness)
//!
//! Every algorithm is a synchronous function over an owned snapshot. Random
//! choices draw from a caller-supplied [`rand::Rng`].

pub mod aggregation;
pub mod betweenness;
pub mod incremental;
pub mod local_moving;
pub mod louvain;
pub mod modularity;
pub mod pagerank;
pub mod ranking;

pub use aggregation::{aggregate, Aggregation, LevelGraph};
pub use betweenness::{betweenness, BetweennessMetadata, BetweennessResult, BetweennessScores};
pub use incremental::{
    check_eligibility, frontier, update_communities, ChangeSet, Eligibility, FrontierUpdate,
    GraphDelta,
};
pub use local_moving::{LocalMovingPhase, ModularityOptimizer};
pub use louvain::{
    louvain, Community, CommunityMetadata, CommunityResult, DetectionOutcome, FallbackReason,
    Partition,
};
pub use modularity::{modularity, modularity_of};
pub use pagerank::{pagerank, PageRankMetadata, PageRankResult, PageRankScores};
pub use ranking::{percentile, rank_entities, EntityStanding, RankedEntity, ScoreMap};
