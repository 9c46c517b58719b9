//! # binex-snapshot
//!
//! **Durable copies of the ledger in object storage.**
//!
//! Layout under the configured prefix (default `snapshots/`):
//!
//! ```text
//! snapshots/snapshot-2026-03-01T10:15:30.123Z.json   { timestamp, version, checksum, data }
//! snapshots/snapshot-2026-03-01T10:15:40.125Z.json
//! snapshots/latest.json                              { latestSnapshot: <key> }
//! ```
//!
//! A write puts the body, then moves the pointer, then prunes old bodies
//! down to `retain`. Recovery follows the pointer and verifies version and
//! SHA-256 checksum before handing the state back.
//!
//! Backends: [`MemoryStore`] (tests), [`LocalStore`] (default) and, behind
//! the `s3` feature, `S3Store`.

pub mod envelope;
pub mod error;
pub mod fs;
pub mod manager;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3_store;
pub mod store;

pub use envelope::{SnapshotEnvelope, SnapshotPointer};
pub use error::{SnapshotError, SnapshotResult};
pub use fs::LocalStore;
pub use manager::{Recovered, SnapshotManager};
pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3_store::S3Store;
pub use store::{ObjectStore, open_store};
