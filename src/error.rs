//! Typed analytics errors
//!
//! Public operations return [`anyhow::Result`]; these variants are the failures
//! raised inside the crate. Store errors are not wrapped here, they pass
//! through unchanged.

use crate::storage::NodeId;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the analytics core
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Previous community result points at a community id it does not list
    #[error(
        "previous result assigns {node} to community {community}, but it only has {count} communities"
    )]
    CorruptPreviousResult {
        /// Offending node
        node: NodeId,
        /// Out-of-range community id
        community: usize,
        /// Number of communities the previous result reports
        count: usize,
    },

    /// Config text could not be parsed
    #[error("invalid analytics config: {0}")]
    Config(#[from] serde_yaml::Error),

    /// Config file could not be read
    #[error("cannot read config file {path}: {source}")]
    ConfigIo {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
