//! Snapshot writer, pruner, recoverer and timer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use binex_ledger::LedgerState;
use binex_types::SnapshotConfig;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::envelope::{self, SnapshotEnvelope, SnapshotPointer};
use crate::error::{SnapshotError, SnapshotResult};
use crate::store::ObjectStore;

/// A snapshot found at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub state: LedgerState,
}

/// Writes and recovers ledger snapshots in one object store.
#[derive(Clone)]
pub struct SnapshotManager {
    store: Arc<dyn ObjectStore>,
    config: SnapshotConfig,
}

impl SnapshotManager {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, config: SnapshotConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    // =================================================================
    // Write
    // =================================================================

    /// Persist `state`: body first, then the pointer, then prune. Returns the
    /// body key. A failed prune is logged and does not fail the write.
    pub async fn write(&self, state: LedgerState, now: DateTime<Utc>) -> SnapshotResult<String> {
        let prefix = &self.config.prefix;
        let key = envelope::body_key(prefix, now);
        let body = SnapshotEnvelope::seal(state, now)?.to_bytes()?;
        let size = body.len();
        self.store.put(&key, body).await?;

        let pointer = serde_json::to_vec(&SnapshotPointer {
            latest_snapshot: key.clone(),
        })?;
        self.store.put(&envelope::pointer_key(prefix), pointer).await?;
        tracing::info!(key = %key, bytes = size, "Snapshot written");

        match self.prune(&key).await {
            Ok(0) => {}
            Ok(deleted) => tracing::debug!(deleted, "Old snapshots pruned"),
            Err(err) => tracing::warn!(error = %err, "Snapshot pruning failed"),
        }
        Ok(key)
    }

    /// Delete bodies beyond the newest `retain`, never `keep`. Returns how
    /// many were deleted.
    pub async fn prune(&self, keep: &str) -> SnapshotResult<usize> {
        let prefix = &self.config.prefix;
        let mut bodies: Vec<String> = self
            .store
            .list(prefix)
            .await?
            .into_iter()
            .filter(|key| envelope::is_body_key(prefix, key))
            .collect();
        // Newest first: timestamps in keys sort lexicographically.
        bodies.sort_unstable_by(|a, b| b.cmp(a));

        let mut deleted = 0;
        for key in bodies.iter().skip(self.config.retain.max(1)) {
            if key == keep {
                continue;
            }
            self.store.delete(key).await?;
            tracing::debug!(key = %key, "Snapshot deleted");
            deleted += 1;
        }
        Ok(deleted)
    }

    // =================================================================
    // Recover
    // =================================================================

    /// Load the snapshot the pointer names. `Ok(None)` when there is no
    /// pointer yet.
    ///
    /// # Errors
    /// A pointer that is unreadable or names a missing, corrupt or
    /// mismatching body.
    pub async fn load_latest(&self) -> SnapshotResult<Option<Recovered>> {
        let pointer_key = envelope::pointer_key(&self.config.prefix);
        let Some(raw) = self.store.get(&pointer_key).await? else {
            return Ok(None);
        };
        let pointer: SnapshotPointer =
            serde_json::from_slice(&raw).map_err(|e| SnapshotError::Corrupt {
                key: pointer_key.clone(),
                reason: e.to_string(),
            })?;
        let key = pointer.latest_snapshot;
        let body = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| SnapshotError::NotFound(key.clone()))?;
        let envelope = SnapshotEnvelope::open(&key, &body)?;
        Ok(Some(Recovered {
            key,
            timestamp: envelope.timestamp,
            state: envelope.data,
        }))
    }

    /// Startup recovery. Any failure is logged and treated as a fresh
    /// start.
    pub async fn recover(&self) -> Option<Recovered> {
        match self.load_latest().await {
            Ok(Some(recovered)) => {
                tracing::info!(
                    key = %recovered.key,
                    taken_at = %recovered.timestamp,
                    users = recovered.state.inr_balances.len(),
                    markets = recovered.state.markets.len(),
                    orders = recovered.state.orders_list.len(),
                    "Snapshot recovered"
                );
                Some(recovered)
            }
            Ok(None) => {
                tracing::info!("No snapshot found, starting fresh");
                None
            }
            Err(err) => {
                tracing::error!(error = %err, "Snapshot recovery failed, starting fresh");
                None
            }
        }
    }

    // =================================================================
    // Timer
    // =================================================================

    /// Capture and write a snapshot every `interval_ms` until `stop` flips
    /// to `true` or its sender is dropped. The first tick fires at once.
    /// `capture` returning `None` (the ledger owner is gone) ends the loop.
    pub async fn run<F, Fut>(&self, capture: F, mut stop: watch::Receiver<bool>)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Option<LedgerState>>,
    {
        let period = Duration::from_millis(self.config.interval_ms.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.config.interval_ms, "Snapshot timer started");

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let Some(state) = capture().await else {
                        tracing::warn!("Ledger capture unavailable, stopping snapshot timer");
                        break;
                    };
                    if let Err(err) = self.write(state, Utc::now()).await {
                        tracing::warn!(error = %err, "Snapshot failed");
                    }
                }
            }
        }
        tracing::info!("Snapshot timer stopped");
    }
}

impl std::fmt::Debug for SnapshotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotManager")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use binex_engine::MatchingEngine;
    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::memory::MemoryStore;

    fn config() -> SnapshotConfig {
        SnapshotConfig {
            interval_ms: 10,
            ..SnapshotConfig::default()
        }
    }

    fn state(amount: u64) -> LedgerState {
        MatchingEngine::dummy_with_users("M", &[("a", amount)]).export_state()
    }

    fn manager() -> (Arc<MemoryStore>, SnapshotManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = SnapshotManager::new(store.clone(), config());
        (store, manager)
    }

    #[tokio::test]
    async fn write_then_recover() {
        let (store, manager) = manager();
        assert!(manager.load_latest().await.unwrap().is_none());

        let original = state(1_000);
        let key = manager.write(original.clone(), Utc::now()).await.unwrap();
        assert!(store.keys().contains(&"snapshots/latest.json".to_string()));

        let recovered = manager.recover().await.unwrap();
        assert_eq!(recovered.key, key);
        assert_eq!(recovered.state, original);
    }

    #[tokio::test]
    async fn retains_newest_three() {
        let (store, manager) = manager();
        let start = Utc::now();
        let mut keys = Vec::new();
        for i in 0..5 {
            let at = start + ChronoDuration::seconds(i);
            keys.push(manager.write(state(1_000 + u64::try_from(i).unwrap()), at).await.unwrap());
        }
        let bodies: Vec<String> = store
            .keys()
            .into_iter()
            .filter(|k| envelope::is_body_key("snapshots/", k))
            .collect();
        assert_eq!(bodies, keys[2..].to_vec());
        let recovered = manager.recover().await.unwrap();
        assert_eq!(recovered.key, keys[4]);
        assert_eq!(recovered.state.total_onramped, 1_004);
    }

    #[tokio::test]
    async fn failed_body_write_keeps_previous_pointer() {
        let (store, manager) = manager();
        let first = manager.write(state(1_000), Utc::now()).await.unwrap();
        store.set_fail_writes(true);
        assert!(manager.write(state(2_000), Utc::now()).await.is_err());
        store.set_fail_writes(false);
        assert_eq!(manager.recover().await.unwrap().key, first);
    }

    #[tokio::test]
    async fn broken_pointer_target_falls_back_to_fresh() {
        let (store, manager) = manager();
        let key = manager.write(state(1_000), Utc::now()).await.unwrap();
        store.delete(&key).await.unwrap();
        assert!(matches!(
            manager.load_latest().await,
            Err(SnapshotError::NotFound(_))
        ));
        assert!(manager.recover().await.is_none());

        store
            .put("snapshots/latest.json", b"not json".to_vec())
            .await
            .unwrap();
        assert!(matches!(
            manager.load_latest().await,
            Err(SnapshotError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn timer_writes_until_stopped() {
        let (store, manager) = manager();
        let (stop_tx, stop_rx) = watch::channel(false);
        let timer = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager.run(|| async { Some(state(500)) }, stop_rx).await;
            })
        };
        while store.keys().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        stop_tx.send(true).unwrap();
        timer.await.unwrap();
        assert!(manager.load_latest().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn timer_stops_when_capture_is_gone() {
        let (_store, manager) = manager();
        let (_stop_tx, stop_rx) = watch::channel(false);
        manager.run(|| async { None }, stop_rx).await;
    }
}
