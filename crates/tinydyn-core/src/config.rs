//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_SHARD_COUNT, MAX_ITEM_SIZE};

/// Configuration for a [`TinyDynDB`](crate::api::TinyDynDB) instance.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```
/// use tinydyn_core::config::StoreConfig;
///
/// let config: StoreConfig = serde_json::from_str(r#"{"shard_count": 4}"#).unwrap();
/// assert_eq!(config.shard_count, 4);
/// assert_eq!(config.max_item_size, 64 * 1024);
/// assert!(config.snapshot_path.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Largest encoded item accepted by `put_item`, in bytes.
    pub max_item_size: usize,
    /// Lock shards per table. Values below 1 are treated as 1.
    pub shard_count: usize,
    /// Snapshot file for the durable backend. `None` keeps the store purely in memory.
    pub snapshot_path: Option<PathBuf>,
}

impl StoreConfig {
    /// An in-memory configuration with default limits.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A configuration persisted to `path` on [`checkpoint`](crate::api::TinyDynDB::checkpoint).
    pub fn durable(path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub(crate) fn effective_shard_count(&self) -> usize {
        self.shard_count.max(1)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_item_size: MAX_ITEM_SIZE,
            shard_count: DEFAULT_SHARD_COUNT,
            snapshot_path: None,
        }
    }
}
