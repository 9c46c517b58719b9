//! Pending waiters keyed by correlation id.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use binex_types::{BinexError, CommandResponse, Result};
use tokio::sync::oneshot;

type Waiter = oneshot::Sender<CommandResponse>;

/// Waiters registered by callers, resolved by the publisher.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: Mutex<HashMap<String, Waiter>>,
}

impl CorrelationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, Waiter>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter. Must happen before the command is enqueued.
    ///
    /// # Errors
    /// `InvalidCommand` if the id is already waiting.
    pub fn register(&self, correlation_id: &str) -> Result<oneshot::Receiver<CommandResponse>> {
        let mut pending = self.pending();
        if pending.contains_key(correlation_id) {
            return Err(BinexError::InvalidCommand {
                reason: format!("duplicate correlation id {correlation_id}"),
            });
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(correlation_id.to_string(), tx);
        Ok(rx)
    }

    /// Hand `response` to its waiter. Returns `false` if nobody is waiting
    /// any more.
    pub fn resolve(&self, correlation_id: &str, response: CommandResponse) -> bool {
        let Some(waiter) = self.pending().remove(correlation_id) else {
            return false;
        };
        waiter.send(response).is_ok()
    }

    /// Drop a waiter, e.g. after a timeout.
    pub fn remove(&self, correlation_id: &str) -> bool {
        self.pending().remove(correlation_id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_reaches_waiter_once() {
        let table = CorrelationTable::new();
        let mut rx = table.register("c-1").unwrap();
        assert!(table.resolve("c-1", CommandResponse::ok("ok", serde_json::Value::Null)));
        assert_eq!(rx.try_recv().unwrap().status_code, 200);
        assert!(!table.resolve("c-1", CommandResponse::ok("again", serde_json::Value::Null)));
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let table = CorrelationTable::new();
        let _rx = table.register("c").unwrap();
        assert!(table.register("c").is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removed_waiter_is_not_resolved() {
        let table = CorrelationTable::new();
        let _rx = table.register("c").unwrap();
        assert!(table.remove("c"));
        assert!(!table.resolve("c", CommandResponse::ok("late", serde_json::Value::Null)));
    }

    #[test]
    fn dropped_receiver_counts_as_gone() {
        let table = CorrelationTable::new();
        drop(table.register("c").unwrap());
        assert!(!table.resolve("c", CommandResponse::ok("late", serde_json::Value::Null)));
        assert!(table.is_empty());
    }
}
