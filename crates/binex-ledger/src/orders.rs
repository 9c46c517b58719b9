//! Append-only order ledger.
//!
//! Records are kept in placement order; an auxiliary index gives O(1)
//! lookup by id for maker fills and cancellation.

use std::collections::HashMap;

use binex_types::{BinexError, OrderId, OrderRecord, Result, Symbol, UserId};

#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    records: Vec<OrderRecord>,
    index: HashMap<OrderId, usize>,
}

impl OrderLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a list of records.
    ///
    /// # Errors
    /// `Internal` if two records share an id.
    pub fn from_records(records: Vec<OrderRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if index.insert(record.id, pos).is_some() {
                return Err(BinexError::Internal(format!(
                    "duplicate order record {}",
                    record.id
                )));
            }
        }
        Ok(Self { records, index })
    }

    #[must_use]
    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    /// Append a record.
    ///
    /// # Errors
    /// `Internal` if the id is already recorded.
    pub fn append(&mut self, record: OrderRecord) -> Result<OrderId> {
        let id = record.id;
        if self.index.contains_key(&id) {
            return Err(BinexError::Internal(format!("duplicate order record {id}")));
        }
        self.index.insert(id, self.records.len());
        self.records.push(record);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&OrderRecord> {
        self.index.get(order_id).map(|&pos| &self.records[pos])
    }

    fn get_mut(&mut self, order_id: &OrderId) -> Result<&mut OrderRecord> {
        let pos = *self
            .index
            .get(order_id)
            .ok_or(BinexError::OrderNotFound(*order_id))?;
        Ok(&mut self.records[pos])
    }

    /// Record a fill on an order.
    pub fn record_fill(&mut self, order_id: &OrderId, quantity: u64) -> Result<()> {
        self.get_mut(order_id)?.apply_fill(quantity)
    }

    /// Record cancellation of an order's resting remainder.
    pub fn record_cancel(&mut self, order_id: &OrderId, quantity: u64) -> Result<()> {
        self.get_mut(order_id)?.apply_cancel(quantity)
    }

    /// A user's records, newest first.
    #[must_use]
    pub fn for_user(&self, user_id: &UserId) -> Vec<&OrderRecord> {
        self.records
            .iter()
            .rev()
            .filter(|r| &r.user_id == user_id)
            .collect()
    }

    /// The most recent `limit` records of a market, in ledger order.
    #[must_use]
    pub fn recent_for_market(&self, symbol: &Symbol, limit: usize) -> Vec<&OrderRecord> {
        let mut recent: Vec<&OrderRecord> = self
            .records
            .iter()
            .rev()
            .filter(|r| &r.symbol == symbol)
            .take(limit)
            .collect();
        recent.reverse();
        recent
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PartialEq for OrderLedger {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Eq for OrderLedger {}

#[cfg(test)]
mod tests {
    use binex_types::{OrderKind, OrderStatus, Price, Side};
    use chrono::Utc;

    use super::*;

    fn record(user: &str, symbol: &str, qty: u64) -> OrderRecord {
        OrderRecord::new(
            Symbol::from(symbol),
            UserId::from(user),
            Side::Yes,
            OrderKind::Buy,
            Price::from_ticks(40).unwrap(),
            qty,
            Utc::now(),
        )
    }

    #[test]
    fn append_and_fill() {
        let mut ledger = OrderLedger::new();
        let id = ledger.append(record("a", "M", 5)).unwrap();
        ledger.record_fill(&id, 2).unwrap();
        assert_eq!(ledger.get(&id).unwrap().status, OrderStatus::Partial);
        assert!(matches!(
            ledger.record_fill(&OrderId::new(), 1),
            Err(BinexError::OrderNotFound(_))
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut ledger = OrderLedger::new();
        let r = record("a", "M", 1);
        ledger.append(r.clone()).unwrap();
        assert!(ledger.append(r.clone()).is_err());
        assert!(OrderLedger::from_records(vec![r.clone(), r]).is_err());
    }

    #[test]
    fn user_orders_newest_first() {
        let mut ledger = OrderLedger::new();
        let first = ledger.append(record("a", "M", 1)).unwrap();
        ledger.append(record("b", "M", 1)).unwrap();
        let last = ledger.append(record("a", "N", 1)).unwrap();
        let mine = ledger.for_user(&UserId::from("a"));
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, last);
        assert_eq!(mine[1].id, first);
    }

    #[test]
    fn recent_for_market_keeps_window_in_order() {
        let mut ledger = OrderLedger::new();
        for qty in 1..=12 {
            ledger.append(record("a", "M", qty)).unwrap();
        }
        ledger.append(record("a", "N", 99)).unwrap();
        let recent = ledger.recent_for_market(&Symbol::from("M"), 10);
        let quantities: Vec<u64> = recent.iter().map(|r| r.quantity).collect();
        assert_eq!(quantities, (3..=12).collect::<Vec<_>>());
    }

    #[test]
    fn from_records_rebuilds_index() {
        let mut ledger = OrderLedger::new();
        let id = ledger.append(record("a", "M", 1)).unwrap();
        let rebuilt = OrderLedger::from_records(ledger.records().to_vec()).unwrap();
        assert!(rebuilt.get(&id).is_some());
        assert_eq!(rebuilt, ledger);
    }
}
