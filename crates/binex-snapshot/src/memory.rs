//! In-process object store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{SnapshotError, SnapshotResult};
use crate::store::ObjectStore;

/// Objects held in a map. Writes can be made to fail for testing error
/// paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> SnapshotResult<Option<Vec<u8>>> {
        Ok(self.objects().get(key).cloned())
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> SnapshotResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SnapshotError::store("put", key, "writes disabled"));
        }
        self.objects().insert(key.to_string(), body);
        Ok(())
    }

    async fn delete(&self, key: &str) -> SnapshotResult<()> {
        self.objects().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> SnapshotResult<Vec<String>> {
        Ok(self
            .objects()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_list_delete() {
        let store = MemoryStore::new();
        store.put("a/1", b"one".to_vec()).await.unwrap();
        store.put("b/2", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("a/1").await.unwrap().as_deref(), Some(&b"one"[..]));
        assert_eq!(store.list("a/").await.unwrap(), vec!["a/1".to_string()]);
        store.delete("a/1").await.unwrap();
        store.delete("a/1").await.unwrap();
        assert!(store.get("a/1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failing_writes() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.put("k", vec![]).await.is_err());
        store.set_fail_writes(false);
        assert!(store.put("k", vec![]).await.is_ok());
    }
}
