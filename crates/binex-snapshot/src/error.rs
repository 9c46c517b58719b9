//! Snapshot error type.

use binex_types::BinexError;
use thiserror::Error;

pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

/// Failures of the snapshot subsystem. None of them is fatal to the node.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("object not found: {0}")]
    NotFound(String),

    /// The backend refused or failed an operation.
    #[error("store {op} failed for {key}: {reason}")]
    Store {
        op: &'static str,
        key: String,
        reason: String,
    },

    #[error("snapshot {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("snapshot {key} checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("snapshot {key} has unsupported version {version}")]
    UnsupportedVersion { key: String, version: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ledger could not be captured.
    #[error("capture failed: {0}")]
    Capture(String),
}

impl SnapshotError {
    pub(crate) fn store(op: &'static str, key: &str, reason: impl ToString) -> Self {
        Self::Store {
            op,
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<SnapshotError> for BinexError {
    fn from(err: SnapshotError) -> Self {
        BinexError::Snapshot(err.to_string())
    }
}
