//! On-store snapshot formats.

use binex_ledger::LedgerState;
use binex_types::constants::SNAPSHOT_VERSION;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SnapshotError, SnapshotResult};

/// A snapshot body: the full ledger plus integrity metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    /// Hex SHA-256 of the serialized `data`.
    pub checksum: String,
    pub data: LedgerState,
}

/// The `latest.json` pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPointer {
    pub latest_snapshot: String,
}

/// Hex SHA-256 over the canonical JSON of `state`.
pub fn checksum(state: &LedgerState) -> SnapshotResult<String> {
    let bytes = serde_json::to_vec(state)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// `<prefix>snapshot-<ISO8601 with millis>.json`. Keys sort by time.
#[must_use]
pub fn body_key(prefix: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "{prefix}snapshot-{}.json",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

#[must_use]
pub fn pointer_key(prefix: &str) -> String {
    format!("{prefix}latest.json")
}

/// Whether `key` names a snapshot body under `prefix`.
#[must_use]
pub fn is_body_key(prefix: &str, key: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|name| name.starts_with("snapshot-") && name.ends_with(".json"))
}

impl SnapshotEnvelope {
    pub fn seal(data: LedgerState, timestamp: DateTime<Utc>) -> SnapshotResult<Self> {
        Ok(Self {
            timestamp,
            version: SNAPSHOT_VERSION.to_string(),
            checksum: checksum(&data)?,
            data,
        })
    }

    /// Parse a stored body and check version and checksum. `key` is only
    /// used in errors.
    pub fn open(key: &str, body: &[u8]) -> SnapshotResult<Self> {
        let envelope: Self = serde_json::from_slice(body).map_err(|e| SnapshotError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        if envelope.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                key: key.to_string(),
                version: envelope.version,
            });
        }
        let actual = checksum(&envelope.data)?;
        if actual != envelope.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                key: key.to_string(),
                expected: envelope.checksum,
                actual,
            });
        }
        Ok(envelope)
    }

    pub fn to_bytes(&self) -> SnapshotResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
