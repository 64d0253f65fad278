//! Ingestion and split ledger configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ingest::DEFAULT_CHANNEL_CAPACITY;

/// Ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bound of each per-symbol channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// File of back-to-back tick records to replay at startup.
    #[serde(default)]
    pub replay_path: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            replay_path: None,
        }
    }
}

const fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

/// Split ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitsConfig {
    /// CSV ledger loaded at startup and saved on shutdown.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}
