//! Outbound side of the dispatcher: correlated results and broadcast events.

use std::sync::Arc;

use binex_types::{CommandResponse, Event};
use tokio::sync::broadcast;

use crate::correlation::CorrelationTable;

/// Where the dispatcher sends what it produces. Publishing is best-effort
/// and never fails the command that produced it.
pub trait Publisher: Send + Sync {
    fn publish_result(&self, correlation_id: &str, response: CommandResponse);

    fn publish_event(&self, event: Event);
}

/// In-process publisher over a [`CorrelationTable`] and a tokio broadcast.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    table: Arc<CorrelationTable>,
    events: broadcast::Sender<Event>,
}

impl ChannelPublisher {
    #[must_use]
    pub fn new(table: Arc<CorrelationTable>, events: broadcast::Sender<Event>) -> Self {
        Self { table, events }
    }
}

impl Publisher for ChannelPublisher {
    fn publish_result(&self, correlation_id: &str, response: CommandResponse) {
        let status = response.status_code;
        if !self.table.resolve(correlation_id, response) {
            tracing::debug!(
                correlation_id,
                status,
                "Dropping result without a waiter"
            );
        }
    }

    fn publish_event(&self, event: Event) {
        let channel = event.channel();
        if self.events.send(event).is_err() {
            tracing::trace!(channel, "No event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use binex_types::{SettlementEvent, Side};

    use super::*;

    #[tokio::test]
    async fn results_and_events_are_delivered() {
        let table = Arc::new(CorrelationTable::new());
        let (tx, mut events) = broadcast::channel(8);
        let publisher = ChannelPublisher::new(Arc::clone(&table), tx);

        let rx = table.register("c").unwrap();
        publisher.publish_result("c", CommandResponse::ok("done", serde_json::Value::Null));
        assert_eq!(rx.await.unwrap().message, "done");

        publisher.publish_event(Event::Settlement(SettlementEvent {
            symbol: "M".into(),
            result: Side::No,
        }));
        assert_eq!(events.recv().await.unwrap().channel(), "MARKET_SETTLEMENT");
    }

    #[test]
    fn publishing_without_listeners_is_harmless() {
        let (tx, rx) = broadcast::channel(1);
        drop(rx);
        let publisher = ChannelPublisher::new(Arc::new(CorrelationTable::new()), tx);
        publisher.publish_result("nobody", CommandResponse::ok("x", serde_json::Value::Null));
        publisher.publish_event(Event::Settlement(SettlementEvent {
            symbol: "M".into(),
            result: Side::Yes,
        }));
    }
}
