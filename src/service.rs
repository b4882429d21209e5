//! Analytics service over a [`GraphStore`]
//!
//! Every call fetches one snapshot, then runs synchronously on it. No state is
//! kept between calls: incremental detection takes the previous result as an
//! argument instead of caching it.
//!
//! # Example
//!
//! ```
//! use trueno_kg::{GraphAnalytics, InMemoryGraphStore, LouvainOptions, Node, Edge};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trueno_kg::Result<()> {
//! let store = InMemoryGraphStore::new();
//! for id in ["a", "b", "c"] {
//!     store.upsert_node(Node::new(id, id, "Process")).await;
//! }
//! store.add_edge(Edge::new("a", "b", "FLOWS_TO")).await;
//! store.add_edge(Edge::new("b", "c", "FLOWS_TO")).await;
//!
//! let analytics = GraphAnalytics::new(store);
//! let communities = analytics.detect_communities(&LouvainOptions::default().with_seed(1)).await?;
//! assert_eq!(communities.metadata.node_count, 3);
//!
//! let top = analytics.top_pagerank(1).await?;
//! assert_eq!(top[0].id.as_str(), "c");
//! # Ok(())
//! # }
//! ```

use crate::algorithms::{
    betweenness, check_eligibility, louvain, pagerank, update_communities, BetweennessResult,
    Community, CommunityResult, DetectionOutcome, Eligibility, EntityStanding, FallbackReason,
    FrontierUpdate, GraphDelta, PageRankResult, RankedEntity,
};
use crate::config::{AnalyticsConfig, BetweennessOptions, LouvainOptions, PageRankOptions};
use crate::error::AnalyticsError;
use crate::storage::{AdjacencyBuilder, AdjacencyMap, GraphSnapshot, GraphStore, NodeId};
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Community detection, `PageRank` and betweenness over one store
#[derive(Debug)]
pub struct GraphAnalytics<S> {
    store: S,
    config: AnalyticsConfig,
}

impl<S: GraphStore> GraphAnalytics<S> {
    /// Service with default options
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, AnalyticsConfig::default())
    }

    /// Service with explicit options
    ///
    /// The config supplies incremental thresholds and the options used by the
    /// convenience wrappers (`top_pagerank`, `community_of`, ...).
    #[must_use]
    pub const fn with_config(store: S, config: AnalyticsConfig) -> Self {
        Self { store, config }
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Full multi-level Louvain
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn detect_communities(&self, options: &LouvainOptions) -> Result<CommunityResult> {
        let start = Instant::now();
        let (snapshot, read_at) = self.fetch("louvain").await?;
        let adjacency = undirected(&snapshot);

        Ok(full_detection(
            &snapshot,
            &adjacency,
            options,
            DetectionOutcome::Full,
            Clock { start, read_at },
        ))
    }

    /// Update `previous` for the changes in `delta`, or run full detection
    ///
    /// Full detection runs when the change is ineligible (no previous result,
    /// small graph, too much changed) or when the update itself fails, either
    /// with an error or a panic. The result's outcome says which happened.
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn detect_communities_incremental(
        &self,
        previous: Option<&CommunityResult>,
        delta: &GraphDelta,
        options: &LouvainOptions,
    ) -> Result<CommunityResult> {
        let start = Instant::now();
        let (snapshot, read_at) = self.fetch("incremental louvain").await?;
        Ok(self.incremental_or_full(&snapshot, previous, delta, options, Clock { start, read_at }))
    }

    /// Choose between cached, incremental and full detection from the store's
    /// change summary since `previous` was computed
    ///
    /// Failures of the change-summary or diff queries degrade to full detection.
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn detect_communities_smart(
        &self,
        previous: Option<&CommunityResult>,
        options: &LouvainOptions,
    ) -> Result<CommunityResult> {
        let start = Instant::now();

        let Some(previous) = previous.filter(|prev| !prev.assignment.is_empty()) else {
            info!("smart detection: no previous result, running full detection");
            return self
                .full_fallback(
                    DetectionOutcome::FallbackByPolicy {
                        reason: FallbackReason::NoPreviousResult,
                    },
                    options,
                    start,
                )
                .await;
        };

        let since = previous.metadata.computed_at;
        let summary = match self.store.change_summary(since).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!("smart detection: change summary failed, running full detection: {err:#}");
                return self
                    .full_fallback(error_outcome(&err), options, start)
                    .await;
            }
        };

        if !summary.has_changes {
            info!("smart detection: no changes since {since}, reusing previous result");
            let mut cached = previous.clone();
            cached.metadata.outcome = DetectionOutcome::Cached;
            return Ok(cached);
        }

        let max_ratio = self.config.incremental.max_change_ratio;
        let policy = if summary.change_ratio > max_ratio {
            Some(FallbackReason::ChangeRatioExceeded {
                ratio: summary.change_ratio,
                max_ratio,
            })
        } else if !summary.recommend_incremental {
            Some(FallbackReason::NotRecommended {
                ratio: summary.change_ratio,
            })
        } else {
            None
        };
        if let Some(reason) = policy {
            info!("smart detection: {reason:?}, running full detection");
            return self
                .full_fallback(DetectionOutcome::FallbackByPolicy { reason }, options, start)
                .await;
        }

        // Taken before the diff queries
        let read_at = Utc::now();
        let delta = match self.fetch_delta(since).await {
            Ok(delta) => delta,
            Err(err) => {
                warn!("smart detection: diff queries failed, running full detection: {err:#}");
                return self
                    .full_fallback(error_outcome(&err), options, start)
                    .await;
            }
        };
        debug!(
            "smart detection: {} changes ({:.3} ratio), {} new edges, {} modified nodes",
            summary.total_changes,
            summary.change_ratio,
            delta.new_edges.len(),
            delta.modified_nodes.len()
        );

        let (snapshot, _) = self.fetch("incremental louvain").await?;
        Ok(self.incremental_or_full(
            &snapshot,
            Some(previous),
            &delta,
            options,
            Clock { start, read_at },
        ))
    }

    /// `PageRank` over the directed graph
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn calculate_pagerank(&self, options: &PageRankOptions) -> Result<PageRankResult> {
        let start = Instant::now();
        let (snapshot, _) = self.fetch("pagerank").await?;

        let raw = pagerank(&snapshot.node_ids(), &snapshot.edges, options);
        let mut result = PageRankResult::from_scores(raw, &snapshot);
        result.metadata.execution_time = start.elapsed();

        info!(
            "pagerank: {} nodes, {} iterations, converged={} in {:?}",
            result.metadata.node_count,
            result.metadata.iterations,
            result.metadata.converged,
            result.metadata.execution_time
        );
        Ok(result)
    }

    /// Brandes betweenness centrality
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn calculate_betweenness(
        &self,
        options: &BetweennessOptions,
    ) -> Result<BetweennessResult> {
        let start = Instant::now();
        let (snapshot, _) = self.fetch("betweenness").await?;

        let raw = betweenness(&snapshot.node_ids(), &snapshot.edges, options, &mut options.rng());
        let mut result = BetweennessResult::from_scores(raw, &snapshot, options);
        result.metadata.execution_time = start.elapsed();

        info!(
            "betweenness: {} nodes, {} sources in {:?}",
            result.metadata.node_count, result.metadata.sources, result.metadata.execution_time
        );
        Ok(result)
    }

    /// Community containing `node`, if the node exists
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn community_of(&self, node: &NodeId) -> Result<Option<Community>> {
        let result = self.detect_communities(&self.config.louvain).await?;
        Ok(result
            .community_of(node)
            .and_then(|id| result.community(id))
            .cloned())
    }

    /// `PageRank` score, rank and percentile of `node`
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn pagerank_of(&self, node: &NodeId) -> Result<Option<EntityStanding>> {
        let result = self.calculate_pagerank(&self.config.pagerank).await?;
        Ok(result.standing(node))
    }

    /// Betweenness score, rank and percentile of `node`
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn betweenness_of(&self, node: &NodeId) -> Result<Option<EntityStanding>> {
        let result = self.calculate_betweenness(&self.config.betweenness).await?;
        Ok(result.standing(node))
    }

    /// The `n` highest-`PageRank` entities
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn top_pagerank(&self, n: usize) -> Result<Vec<RankedEntity>> {
        let result = self.calculate_pagerank(&self.config.pagerank).await?;
        Ok(result.top(n).to_vec())
    }

    /// The `n` highest-betweenness entities
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn top_betweenness(&self, n: usize) -> Result<Vec<RankedEntity>> {
        let result = self.calculate_betweenness(&self.config.betweenness).await?;
        Ok(result.top(n).to_vec())
    }

    /// The `n` largest communities
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn largest_communities(&self, n: usize) -> Result<Vec<Community>> {
        let result = self.detect_communities(&self.config.louvain).await?;
        Ok(result.largest(n).into_iter().cloned().collect())
    }

    /// Entities whose normalized betweenness is at least `threshold`
    ///
    /// Normalization is forced on regardless of the configured betweenness
    /// options so the threshold is comparable across graph sizes.
    ///
    /// # Errors
    ///
    /// Propagates snapshot fetch errors from the store.
    pub async fn find_bridge_entities(&self, threshold: f64) -> Result<Vec<RankedEntity>> {
        let options = self.config.betweenness.with_normalized(true);
        let result = self.calculate_betweenness(&options).await?;
        Ok(result.bridges(threshold).into_iter().cloned().collect())
    }

    /// Snapshot plus the time taken just before reading it
    async fn fetch(&self, operation: &str) -> Result<(GraphSnapshot, DateTime<Utc>)> {
        let read_at = Utc::now();
        let snapshot = self.store.fetch_snapshot().await?;
        debug!(
            "{operation}: fetched snapshot with {} nodes, {} edges",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        Ok((snapshot, read_at))
    }

    async fn fetch_delta(&self, since: DateTime<Utc>) -> Result<GraphDelta> {
        let modified = self.store.modified_nodes_since(since).await?;
        let new_edges = self.store.edges_created_since(since).await?;
        Ok(GraphDelta::new(
            new_edges,
            modified.into_iter().map(|node| node.id).collect(),
        ))
    }

    async fn full_fallback(
        &self,
        outcome: DetectionOutcome,
        options: &LouvainOptions,
        start: Instant,
    ) -> Result<CommunityResult> {
        let (snapshot, read_at) = self.fetch("louvain").await?;
        let adjacency = undirected(&snapshot);
        Ok(full_detection(&snapshot, &adjacency, options, outcome, Clock { start, read_at }))
    }

    fn incremental_or_full(
        &self,
        snapshot: &GraphSnapshot,
        previous: Option<&CommunityResult>,
        delta: &GraphDelta,
        options: &LouvainOptions,
        clock: Clock,
    ) -> CommunityResult {
        let adjacency = undirected(snapshot);

        let changes = match check_eligibility(previous, &adjacency, delta, &self.config.incremental)
        {
            Eligibility::Eligible(changes) => changes,
            Eligibility::Ineligible(reason) => {
                info!("incremental louvain: {reason:?}, running full detection");
                let outcome = DetectionOutcome::FallbackByPolicy { reason };
                return full_detection(snapshot, &adjacency, options, outcome, clock);
            }
        };
        let Some(previous) = previous else {
            let outcome = DetectionOutcome::FallbackByPolicy {
                reason: FallbackReason::NoPreviousResult,
            };
            return full_detection(snapshot, &adjacency, options, outcome, clock);
        };

        debug!(
            "incremental louvain: {} new nodes, {} modified, {} new edges, ratio {:.3}",
            changes.new_nodes.len(),
            changes.modified_nodes.len(),
            changes.new_edge_count,
            changes.change_ratio
        );

        let mut rng = options.rng();
        let update = guarded(|| {
            update_communities(previous, &adjacency, &changes, &delta.new_edges, options, &mut rng)
        });

        match update {
            Ok(update) => {
                let mut result = CommunityResult::from_partition(
                    update.partition,
                    snapshot,
                    adjacency.edge_count(),
                    DetectionOutcome::Incremental,
                    clock.read_at,
                );
                result.metadata.frontier_size = Some(update.frontier.len());
                result.metadata.changed_communities = update.changed_communities;
                result.metadata.execution_time = clock.start.elapsed();

                info!(
                    "incremental louvain: {} communities, modularity {:.4}, frontier {} in {:?}",
                    result.metadata.community_count,
                    result.metadata.modularity,
                    update.frontier.len(),
                    result.metadata.execution_time
                );
                result
            }
            Err(error) => {
                warn!("incremental louvain failed, running full detection: {error}");
                let outcome = DetectionOutcome::FallbackByError { error };
                full_detection(snapshot, &adjacency, options, outcome, clock)
            }
        }
    }
}

/// Call start plus the snapshot read time stamped into results
#[derive(Debug, Clone, Copy)]
struct Clock {
    start: Instant,
    read_at: DateTime<Utc>,
}

/// Run an incremental update, turning errors and panics into a message
fn guarded<F>(update: F) -> std::result::Result<FrontierUpdate, String>
where
    F: FnOnce() -> std::result::Result<FrontierUpdate, AnalyticsError>,
{
    match panic::catch_unwind(AssertUnwindSafe(update)) {
        Ok(result) => result.map_err(|err| err.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    format!("incremental update panicked: {detail}")
}

fn undirected(snapshot: &GraphSnapshot) -> AdjacencyMap {
    AdjacencyBuilder::new(&snapshot.node_ids(), &snapshot.edges).undirected()
}

fn error_outcome(err: &anyhow::Error) -> DetectionOutcome {
    DetectionOutcome::FallbackByError {
        error: format!("{err:#}"),
    }
}

fn full_detection(
    snapshot: &GraphSnapshot,
    adjacency: &AdjacencyMap,
    options: &LouvainOptions,
    outcome: DetectionOutcome,
    clock: Clock,
) -> CommunityResult {
    let partition = louvain(adjacency, options, &mut options.rng());
    let mut result = CommunityResult::from_partition(
        partition,
        snapshot,
        adjacency.edge_count(),
        outcome,
        clock.read_at,
    );
    result.metadata.execution_time = clock.start.elapsed();

    info!(
        "louvain: {} nodes, {} communities, modularity {:.4}, {} levels in {:?}",
        result.metadata.node_count,
        result.metadata.community_count,
        result.metadata.modularity,
        result.metadata.hierarchy_levels,
        result.metadata.execution_time
    );
    result
}
