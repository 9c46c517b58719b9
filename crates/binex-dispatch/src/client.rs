//! Caller-side handle to a running dispatcher.

use std::sync::Arc;
use std::time::Duration;

use binex_engine::MatchingEngine;
use binex_ledger::LedgerState;
use binex_types::{
    BinexError, Command, CommandResponse, DispatchConfig, Event, InboundCommand, Result,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::correlation::CorrelationTable;
use crate::dispatcher::Dispatcher;
use crate::envelope::Envelope;
use crate::publisher::ChannelPublisher;

/// Start a dispatcher task that owns `engine`.
///
/// The task ends on [`DispatchClient::shutdown`] or once every client is
/// dropped, and yields the engine back.
pub fn spawn(
    engine: MatchingEngine,
    config: &DispatchConfig,
) -> (DispatchClient, JoinHandle<MatchingEngine>) {
    let (queue, inbox) = mpsc::channel(config.queue_capacity.max(1));
    let (events, _) = broadcast::channel(config.broadcast_capacity.max(1));
    let table = Arc::new(CorrelationTable::new());
    let publisher = ChannelPublisher::new(Arc::clone(&table), events.clone());
    let handle = tokio::spawn(Dispatcher::new(engine, publisher).run(inbox));
    tracing::info!(
        queue_capacity = config.queue_capacity,
        timeout_ms = config.response_timeout_ms,
        "Dispatcher spawned"
    );
    let client = DispatchClient {
        queue,
        table,
        events,
        timeout: Duration::from_millis(config.response_timeout_ms),
    };
    (client, handle)
}

/// Cloneable handle used by the gateway and the snapshot timer.
#[derive(Debug, Clone)]
pub struct DispatchClient {
    queue: mpsc::Sender<Envelope>,
    table: Arc<CorrelationTable>,
    events: broadcast::Sender<Event>,
    timeout: Duration,
}

impl DispatchClient {
    /// Submit a command under a fresh correlation id and await its result.
    pub async fn submit(&self, command: Command) -> Result<CommandResponse> {
        self.submit_inbound(InboundCommand::new(command, Uuid::now_v7().to_string()))
            .await
    }

    /// Submit a command under the caller's correlation id.
    ///
    /// # Errors
    /// `InvalidCommand` for a correlation id already in flight;
    /// `QueueClosed` once the dispatcher stopped; `ResponseTimeout` when no
    /// result arrives in time. The waiter never outlives this call.
    pub async fn submit_inbound(&self, inbound: InboundCommand) -> Result<CommandResponse> {
        let correlation_id = inbound.correlation_id.clone();
        let waiter = self.table.register(&correlation_id)?;
        if self.queue.send(Envelope::Command(inbound)).await.is_err() {
            self.table.remove(&correlation_id);
            return Err(BinexError::QueueClosed);
        }
        self.await_result(&correlation_id, waiter).await
    }

    /// Submit a raw JSON envelope. Its `correlationId` must be readable;
    /// anything else about it may be malformed and is answered with a 400.
    pub async fn submit_raw(&self, correlation_id: &str, raw: String) -> Result<CommandResponse> {
        let waiter = self.table.register(correlation_id)?;
        if self.queue.send(Envelope::Raw(raw)).await.is_err() {
            self.table.remove(correlation_id);
            return Err(BinexError::QueueClosed);
        }
        self.await_result(correlation_id, waiter).await
    }

    async fn await_result(
        &self,
        correlation_id: &str,
        waiter: oneshot::Receiver<CommandResponse>,
    ) -> Result<CommandResponse> {
        match tokio::time::timeout(self.timeout, waiter).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => {
                self.table.remove(correlation_id);
                Err(BinexError::QueueClosed)
            }
            Err(_) => {
                self.table.remove(correlation_id);
                tracing::warn!(correlation_id, "Timed out waiting for result");
                Err(BinexError::ResponseTimeout {
                    correlation_id: correlation_id.to_string(),
                })
            }
        }
    }

    /// Copy of the ledger taken between two commands.
    pub async fn capture(&self) -> Result<LedgerState> {
        let (reply, state) = oneshot::channel();
        self.queue
            .send(Envelope::Capture(reply))
            .await
            .map_err(|_| BinexError::QueueClosed)?;
        state.await.map_err(|_| BinexError::QueueClosed)
    }

    /// Ask the dispatcher to stop once the commands ahead are processed.
    pub async fn shutdown(&self) -> Result<()> {
        self.queue
            .send(Envelope::Shutdown)
            .await
            .map_err(|_| BinexError::QueueClosed)
    }

    /// Order-book deltas and settlement notices.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Waiters currently registered.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use binex_types::{Side, Symbol};

    use super::*;
    use crate::publisher::Publisher;

    /// Client wired to a queue nobody drains.
    fn stalled(timeout_ms: u64) -> (DispatchClient, mpsc::Receiver<Envelope>, ChannelPublisher) {
        let (queue, inbox) = mpsc::channel(8);
        let (events, _) = broadcast::channel(8);
        let table = Arc::new(CorrelationTable::new());
        let publisher = ChannelPublisher::new(Arc::clone(&table), events.clone());
        let client = DispatchClient {
            queue,
            table,
            events,
            timeout: Duration::from_millis(timeout_ms),
        };
        (client, inbox, publisher)
    }

    fn price_query(id: &str) -> InboundCommand {
        InboundCommand::new(
            Command::GetPrice {
                stock_symbol: Symbol::from("M"),
            },
            id,
        )
    }

    #[tokio::test]
    async fn timeout_removes_waiter_and_late_result_is_dropped() {
        let (client, _inbox, publisher) = stalled(20);
        let err = client.submit_inbound(price_query("slow")).await.unwrap_err();
        assert!(matches!(err, BinexError::ResponseTimeout { .. }));
        assert_eq!(client.pending(), 0);
        publisher.publish_result("slow", CommandResponse::ok("late", serde_json::Value::Null));
        assert_eq!(client.pending(), 0);
    }

    #[tokio::test]
    async fn duplicate_in_flight_id_is_rejected() {
        let (client, _inbox, _publisher) = stalled(200);
        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.submit_inbound(price_query("dup")).await })
        };
        tokio::task::yield_now().await;
        while client.pending() == 0 {
            tokio::task::yield_now().await;
        }
        let err = client.submit_inbound(price_query("dup")).await.unwrap_err();
        assert!(matches!(err, BinexError::InvalidCommand { .. }));
        assert!(first.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn closed_queue_is_reported() {
        let (client, inbox, _publisher) = stalled(200);
        drop(inbox);
        assert!(client.is_closed());
        let err = client
            .submit(Command::GetOrders {
                user_id: "u".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BinexError::QueueClosed));
        assert_eq!(client.pending(), 0);
        assert!(client.capture().await.is_err());
    }

    #[tokio::test]
    async fn spawned_dispatcher_answers_and_stops() {
        let engine = MatchingEngine::dummy_with_users("M", &[("a", 5_000)]);
        let (client, handle) = spawn(engine, &DispatchConfig::default());
        let response = client
            .submit(Command::BuyStock {
                user_id: "a".into(),
                stock_symbol: "M".into(),
                stock_type: Side::Yes,
                quantity: 1,
                price: 500,
            })
            .await
            .unwrap();
        assert!(response.is_success());

        client.shutdown().await.unwrap();
        let engine = handle.await.unwrap();
        assert_eq!(engine.ledger().orders.len(), 1);
    }
}
