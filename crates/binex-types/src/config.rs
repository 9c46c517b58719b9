//! Configuration types for Binex nodes.
//!
//! Every section implements `Default`, and every field is optional in the
//! JSON config file (`#[serde(default)]`), so an empty `{}` is a valid
//! configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Top-level configuration of a Binex node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub engine: EngineConfig,
    pub dispatch: DispatchConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

/// Matching engine behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Accept `CANCEL` commands.
    pub cancel_enabled: bool,
    /// Number of recent order records the price estimator averages.
    pub price_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cancel_enabled: false,
            price_window: constants::DEFAULT_PRICE_WINDOW,
        }
    }
}

/// Command queue and result delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Bound of the inbound command queue.
    pub queue_capacity: usize,
    /// How long a caller waits for its correlated result.
    pub response_timeout_ms: u64,
    /// Buffer of the broadcast event channel.
    pub broadcast_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: constants::DEFAULT_QUEUE_CAPACITY,
            response_timeout_ms: constants::DEFAULT_RESPONSE_TIMEOUT_MS,
            broadcast_capacity: constants::DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

/// Periodic snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub interval_ms: u64,
    /// Number of snapshot bodies kept in the store.
    pub retain: usize,
    /// Object-key prefix, e.g. `snapshots/`.
    pub prefix: String,
    pub store: StoreConfig,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            interval_ms: constants::DEFAULT_SNAPSHOT_INTERVAL_MS,
            retain: constants::DEFAULT_SNAPSHOT_RETAIN,
            prefix: constants::DEFAULT_SNAPSHOT_PREFIX.to_string(),
            store: StoreConfig::default(),
        }
    }
}

/// Object-store backend for snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local; lost on exit.
    Memory,
    /// Directory on the local filesystem.
    Local { root: String },
    /// S3-compatible bucket.
    S3 {
        bucket: String,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Local {
            root: "data".to_string(),
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
