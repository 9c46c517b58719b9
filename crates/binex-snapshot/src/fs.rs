//! Object store on the local filesystem. Keys map to relative paths under a
//! root directory; `/` in a key becomes a directory separator.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::{SnapshotError, SnapshotResult};
use crate::store::ObjectStore;

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> SnapshotResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> SnapshotResult<PathBuf> {
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(SnapshotError::store("resolve", key, "invalid object key"));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, key: &str) -> SnapshotResult<Option<Vec<u8>>> {
        match fs::read(self.path(key)?).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SnapshotError::store("get", key, e)),
        }
    }

    /// Writes go to a temporary sibling first and are renamed into place,
    /// so readers never see a partial object.
    async fn put(&self, key: &str, body: Vec<u8>) -> SnapshotResult<()> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, body)
            .await
            .map_err(|e| SnapshotError::store("put", key, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| SnapshotError::store("put", key, e))
    }

    async fn delete(&self, key: &str) -> SnapshotResult<()> {
        match fs::remove_file(self.path(key)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SnapshotError::store("delete", key, e)),
        }
    }

    /// Lists the directory that `prefix` points into; not recursive.
    async fn list(&self, prefix: &str) -> SnapshotResult<Vec<String>> {
        let (dir_key, name_prefix) = prefix.rsplit_once('/').unwrap_or(("", prefix));
        let dir = if dir_key.is_empty() {
            self.root.clone()
        } else {
            self.path(dir_key)?
        };
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SnapshotError::store("list", prefix, e)),
        };
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(name_prefix) && !name.ends_with(".tmp") {
                keys.push(if dir_key.is_empty() {
                    name
                } else {
                    format!("{dir_key}/{name}")
                });
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        store.put("snapshots/a.json", b"{}".to_vec()).await.unwrap();
        store.put("snapshots/b.json", b"[]".to_vec()).await.unwrap();
        store.put("other.json", b"1".to_vec()).await.unwrap();
        assert!(dir.path().join("snapshots").join("a.json").exists());

        let mut keys = store.list("snapshots/").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["snapshots/a.json", "snapshots/b.json"]);
        assert_eq!(store.list("snapshots/b").await.unwrap(), vec!["snapshots/b.json"]);
        assert_eq!(store.list("other").await.unwrap(), vec!["other.json"]);

        assert_eq!(store.get("snapshots/b.json").await.unwrap(), Some(b"[]".to_vec()));
        store.delete("snapshots/b.json").await.unwrap();
        store.delete("snapshots/b.json").await.unwrap();
        assert!(store.get("snapshots/b.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_directory_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        assert!(store.list("snapshots/").await.unwrap().is_empty());
        assert!(store.get("snapshots/latest.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        assert!(store.put("../escape", vec![]).await.is_err());
        assert!(store.get("a//b").await.is_err());
    }
}
