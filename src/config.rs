//! Algorithm options and YAML configuration
//!
//! Every field is optional in YAML; missing fields take the defaults below.
//!
//! ```yaml
//! louvain:
//!   resolution: 1.2
//!   seed: 7
//! pagerank:
//!   damping_factor: 0.9
//! betweenness:
//!   directed: false
//!   sample_size: 200
//! incremental:
//!   max_change_ratio: 0.25
//! ```
//!
//! Values are not validated: a resolution of zero or a damping factor above
//! one is passed through to the algorithms as given.

use crate::error::AnalyticsError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Louvain options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LouvainOptions {
    /// Maximum sweeps per local-moving phase. Default: 100
    pub max_iterations: usize,

    /// A move must gain strictly more than this. Default: 1e-7
    pub min_modularity_gain: f64,

    /// Higher values favor more, smaller communities. Default: 1.0
    pub resolution: f64,

    /// Seed for sweep order; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for LouvainOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            min_modularity_gain: 1e-7,
            resolution: 1.0,
            seed: None,
        }
    }
}

impl LouvainOptions {
    /// Options with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of sweeps per phase
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the minimum modularity gain for a move
    #[must_use]
    pub const fn with_min_modularity_gain(mut self, gain: f64) -> Self {
        self.min_modularity_gain = gain;
        self
    }

    /// Set the resolution parameter
    #[must_use]
    pub const fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Fix the sweep order for reproducible runs
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Random source for this run
    #[must_use]
    pub fn rng(&self) -> StdRng {
        rng_from_seed(self.seed)
    }
}

/// Incremental (frontier) Louvain eligibility thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncrementalOptions {
    /// Graphs smaller than this always get full detection. Default: 10
    pub min_nodes: usize,

    /// Changes / node count above this trigger full detection. Default: 0.30
    pub max_change_ratio: f64,
}

impl Default for IncrementalOptions {
    fn default() -> Self {
        Self {
            min_nodes: 10,
            max_change_ratio: 0.30,
        }
    }
}

impl IncrementalOptions {
    /// Set the minimum node count
    #[must_use]
    pub const fn with_min_nodes(mut self, min_nodes: usize) -> Self {
        self.min_nodes = min_nodes;
        self
    }

    /// Set the maximum change ratio
    #[must_use]
    pub const fn with_max_change_ratio(mut self, ratio: f64) -> Self {
        self.max_change_ratio = ratio;
        self
    }
}

/// `PageRank` options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankOptions {
    /// Continuation probability. Default: 0.85
    pub damping_factor: f64,

    /// Power-iteration cap. Default: 100
    pub max_iterations: usize,

    /// Stop once the largest per-node change is below this. Default: 1e-6
    pub convergence_threshold: f64,
}

impl Default for PageRankOptions {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            max_iterations: 100,
            convergence_threshold: 1e-6,
        }
    }
}

impl PageRankOptions {
    /// Set the damping factor
    #[must_use]
    pub const fn with_damping_factor(mut self, damping_factor: f64) -> Self {
        self.damping_factor = damping_factor;
        self
    }

    /// Set the iteration cap
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence threshold
    #[must_use]
    pub const fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }
}

/// Betweenness options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetweennessOptions {
    /// Divide by the number of node pairs. Default: true
    pub normalized: bool,

    /// Follow edge direction. Default: true
    pub directed: bool,

    /// Number of sampled BFS sources; `None` runs every source. Default: `None`
    pub sample_size: Option<usize>,

    /// Seed for source sampling; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for BetweennessOptions {
    fn default() -> Self {
        Self {
            normalized: true,
            directed: true,
            sample_size: None,
            seed: None,
        }
    }
}

impl BetweennessOptions {
    /// Set normalization
    #[must_use]
    pub const fn with_normalized(mut self, normalized: bool) -> Self {
        self.normalized = normalized;
        self
    }

    /// Set directed/undirected mode
    #[must_use]
    pub const fn with_directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Sample this many sources instead of running all of them
    #[must_use]
    pub const fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    /// Fix the sampled sources for reproducible runs
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Random source for this run
    #[must_use]
    pub fn rng(&self) -> StdRng {
        rng_from_seed(self.seed)
    }
}

/// All analytics options, loadable from YAML
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Louvain options
    pub louvain: LouvainOptions,

    /// Incremental eligibility thresholds
    pub incremental: IncrementalOptions,

    /// `PageRank` options
    pub pagerank: PageRankOptions,

    /// Betweenness options
    pub betweenness: BetweennessOptions,
}

impl AnalyticsConfig {
    /// Parse a YAML document
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Config`] if the text is not valid YAML for this shape.
    pub fn from_yaml_str(text: &str) -> Result<Self, AnalyticsError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a YAML file
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::ConfigIo`] if the file cannot be read, or
    /// [`AnalyticsError::Config`] if it cannot be parsed.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalyticsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AnalyticsError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}
