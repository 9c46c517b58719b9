//! `binex-node`: one exchange process.
//!
//! ```text
//!   startup   store ──recover──▶ MatchingEngine ──▶ dispatcher task
//!   running   stdin feed / gateway ──▶ DispatchClient ──▶ queue
//!             snapshot timer ──capture──▶ queue ──▶ store
//!   shutdown  stop timer ─▶ final snapshot ─▶ drain queue ─▶ exit
//! ```

mod config;
mod feed;
mod logging;
mod node;

use anyhow::Context;
use binex_engine::MatchingEngine;
use binex_snapshot::SnapshotManager;
use binex_types::EngineConfig;
use clap::Parser;

use crate::config::Cli;
use crate::node::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load()?;
    logging::init(&config.logging)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        cancel_enabled = config.engine.cancel_enabled,
        "Starting binex node"
    );

    let store = binex_snapshot::open_store(&config.snapshot.store)
        .await
        .context("opening snapshot store")?;
    let snapshots = SnapshotManager::new(store, config.snapshot.clone());
    let engine = restore(&snapshots, &config.engine).await;

    let node = Node::start(engine, &config.dispatch, snapshots);

    let feed = async {
        if cli.stdin {
            feed::run(node.client()).await
        } else {
            std::future::pending().await
        }
    };
    tokio::select! {
        () = shutdown_signal() => tracing::info!("Shutdown signal received"),
        result = feed => match result {
            Ok(()) => tracing::info!("Command feed closed"),
            Err(err) => tracing::error!(error = %err, "Command feed failed"),
        },
    }

    node.shutdown().await?;
    Ok(())
}

/// Engine from the latest snapshot, or an empty one.
async fn restore(snapshots: &SnapshotManager, config: &EngineConfig) -> MatchingEngine {
    let Some(recovered) = snapshots.recover().await else {
        return MatchingEngine::new(config.clone());
    };
    match MatchingEngine::from_state(recovered.state, config.clone()) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(key = %recovered.key, error = %err, "Snapshot rejected, starting fresh");
            MatchingEngine::new(config.clone())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
