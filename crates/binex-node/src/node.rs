//! Running services of one node and their ordered shutdown.

use anyhow::Context;
use binex_dispatch::DispatchClient;
use binex_engine::MatchingEngine;
use binex_snapshot::SnapshotManager;
use binex_types::DispatchConfig;
use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Dispatcher task plus snapshot timer sharing one command queue.
pub struct Node {
    client: DispatchClient,
    snapshots: SnapshotManager,
    stop: watch::Sender<bool>,
    timer: JoinHandle<()>,
    dispatcher: JoinHandle<MatchingEngine>,
}

impl Node {
    /// Hand `engine` to a dispatcher task and start the snapshot timer.
    pub fn start(engine: MatchingEngine, dispatch: &DispatchConfig, snapshots: SnapshotManager) -> Self {
        let (client, dispatcher) = binex_dispatch::spawn(engine, dispatch);
        let (stop, stop_rx) = watch::channel(false);
        let timer = {
            let snapshots = snapshots.clone();
            let client = client.clone();
            tokio::spawn(async move {
                let capture = move || {
                    let client = client.clone();
                    async move { client.capture().await.ok() }
                };
                snapshots.run(capture, stop_rx).await;
            })
        };
        Self {
            client,
            snapshots,
            stop,
            timer,
            dispatcher,
        }
    }

    #[must_use]
    pub fn client(&self) -> &DispatchClient {
        &self.client
    }

    /// Stop the timer, write a final snapshot, then drain the queue and
    /// return the engine. The capture is queued behind every command already
    /// submitted, so the final snapshot includes all of them. A failed final
    /// snapshot is logged and does not prevent the drain.
    pub async fn shutdown(self) -> anyhow::Result<MatchingEngine> {
        self.stop.send_replace(true);
        if let Err(err) = self.timer.await {
            tracing::error!(error = %err, "Snapshot timer panicked");
        }

        match self.client.capture().await {
            Ok(state) => {
                if let Err(err) = self.snapshots.write(state, Utc::now()).await {
                    tracing::error!(error = %err, "Final snapshot failed");
                }
            }
            Err(err) => tracing::warn!(error = %err, "Ledger unavailable for final snapshot"),
        }

        self.client.shutdown().await.context("stopping dispatcher")?;
        let engine = self.dispatcher.await.context("dispatcher task panicked")?;
        tracing::info!(
            markets = engine.ledger().markets.len(),
            orders = engine.ledger().orders.len(),
            "Binex node stopped"
        );
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use binex_snapshot::MemoryStore;
    use binex_types::{BinexError, Command, SnapshotConfig, UserId};

    use super::*;

    /// A node whose timer ticks once at start and then not for an hour.
    fn start() -> (Arc<MemoryStore>, SnapshotManager, Node) {
        let store = Arc::new(MemoryStore::new());
        let snapshots = SnapshotManager::new(
            store.clone(),
            SnapshotConfig {
                interval_ms: 3_600_000,
                ..SnapshotConfig::default()
            },
        );
        let node = Node::start(
            MatchingEngine::default(),
            &DispatchConfig::default(),
            snapshots.clone(),
        );
        (store, snapshots, node)
    }

    async fn first_tick(snapshots: &SnapshotManager) {
        while snapshots.load_latest().await.unwrap().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn create_user(id: &str) -> Command {
        Command::CreateUser { user_id: id.into() }
    }

    #[tokio::test]
    async fn final_snapshot_covers_commands_after_last_tick() {
        let (_store, snapshots, node) = start();
        first_tick(&snapshots).await;
        let ticked = snapshots.load_latest().await.unwrap().unwrap();
        assert!(ticked.state.inr_balances.is_empty());

        let client = node.client().clone();
        let created = client.submit(create_user("late")).await.unwrap();
        assert_eq!(created.status_code, 201);

        let engine = node.shutdown().await.unwrap();
        assert!(engine.inr_balance(&UserId::from("late")).is_ok());

        let latest = snapshots.load_latest().await.unwrap().unwrap();
        assert!(latest.state.inr_balances.contains_key(&UserId::from("late")));
        assert_eq!(latest.state, engine.export_state());

        assert!(matches!(
            client.submit(create_user("after")).await,
            Err(BinexError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn failed_final_snapshot_still_drains() {
        let (store, snapshots, node) = start();
        first_tick(&snapshots).await;
        node.client().submit(create_user("late")).await.unwrap();

        store.set_fail_writes(true);
        let engine = node.shutdown().await.unwrap();
        assert!(engine.inr_balance(&UserId::from("late")).is_ok());

        store.set_fail_writes(false);
        let latest = snapshots.load_latest().await.unwrap().unwrap();
        assert!(latest.state.inr_balances.is_empty());
    }
}
