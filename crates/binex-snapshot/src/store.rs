//! Object-store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use binex_types::StoreConfig;

use crate::error::SnapshotResult;
use crate::fs::LocalStore;
use crate::memory::MemoryStore;

/// Flat key/value object storage, S3-style.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Fetch an object; `None` when the key does not exist.
    async fn get(&self, key: &str) -> SnapshotResult<Option<Vec<u8>>>;

    /// Create or replace an object.
    async fn put(&self, key: &str, body: Vec<u8>) -> SnapshotResult<()>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> SnapshotResult<()>;

    /// Keys starting with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> SnapshotResult<Vec<String>>;
}

/// Build the backend named by `config`.
pub async fn open_store(config: &StoreConfig) -> SnapshotResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Local { root } => Arc::new(LocalStore::open(root).await?),
        #[cfg(feature = "s3")]
        StoreConfig::S3 {
            bucket,
            region,
            endpoint,
        } => Arc::new(crate::s3_store::S3Store::new(bucket, region, endpoint.as_deref())?),
        #[cfg(not(feature = "s3"))]
        StoreConfig::S3 { bucket, .. } => {
            return Err(crate::error::SnapshotError::store(
                "open",
                bucket,
                "built without the `s3` feature",
            ));
        }
    };
    tracing::info!(backend = store.name(), "Snapshot store opened");
    Ok(store)
}
