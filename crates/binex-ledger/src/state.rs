//! The [`Ledger`] aggregate and its serializable [`LedgerState`].
//!
//! `LedgerState` is the snapshot payload: plain ordered collections, so the
//! same ledger always serializes to the same bytes. `Ledger::import`
//! rebuilds indexes and rejects states that break structural invariants.

use std::collections::{BTreeMap, BTreeSet};

use binex_types::{
    BinexError, InrBalance, Market, OrderRecord, Position, Result, Symbol, UserId,
};
use serde::{Deserialize, Serialize};

use crate::funds::FundsLedger;
use crate::markets::MarketRegistry;
use crate::orderbook::OrderBook;
use crate::orders::OrderLedger;
use crate::positions::PositionLedger;

/// Serialized form of the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    pub inr_balances: BTreeMap<UserId, InrBalance>,
    pub stock_balances: BTreeMap<UserId, BTreeMap<Symbol, Position>>,
    pub order_book: BTreeMap<Symbol, OrderBook>,
    pub markets: BTreeMap<Symbol, Market>,
    pub orders_list: Vec<OrderRecord>,
    #[serde(default)]
    pub traders: BTreeMap<Symbol, BTreeSet<UserId>>,
    #[serde(default)]
    pub total_onramped: u128,
}

/// Authoritative in-memory state of the exchange.
///
/// Owned by exactly one writer; there is no internal locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub funds: FundsLedger,
    pub positions: PositionLedger,
    pub books: BTreeMap<Symbol, OrderBook>,
    pub markets: MarketRegistry,
    pub orders: OrderLedger,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The book of an open market.
    ///
    /// # Errors
    /// `MarketNotFound` when no book exists.
    pub fn book(&self, symbol: &Symbol) -> Result<&OrderBook> {
        self.books
            .get(symbol)
            .ok_or_else(|| BinexError::MarketNotFound(symbol.clone()))
    }

    pub fn book_mut(&mut self, symbol: &Symbol) -> Result<&mut OrderBook> {
        self.books
            .get_mut(symbol)
            .ok_or_else(|| BinexError::MarketNotFound(symbol.clone()))
    }

    /// Copy out everything for a snapshot.
    #[must_use]
    pub fn export(&self) -> LedgerState {
        LedgerState {
            inr_balances: self.funds.balances().clone(),
            stock_balances: self.positions.all().clone(),
            order_book: self.books.clone(),
            markets: self.markets.iter().map(|m| (m.symbol.clone(), m.clone())).collect(),
            orders_list: self.orders.records().to_vec(),
            traders: self.markets.traders_all().clone(),
            total_onramped: self.funds.total_onramped(),
        }
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// # Errors
    /// `Internal` if the state is structurally inconsistent: a book without
    /// an open market, an open market without a book, a level whose total
    /// disagrees with its entries, holdings of an unregistered user, or a
    /// duplicate order id.
    pub fn import(state: LedgerState) -> Result<Self> {
        for (symbol, book) in &state.order_book {
            match state.markets.get(symbol) {
                Some(market) if market.result.is_none() => {}
                _ => {
                    return Err(BinexError::Internal(format!(
                        "book for {symbol} has no open market"
                    )));
                }
            }
            if !book.is_consistent() {
                return Err(BinexError::Internal(format!(
                    "book for {symbol} has inconsistent level totals"
                )));
            }
        }
        for market in state.markets.values() {
            if market.result.is_none() && !state.order_book.contains_key(&market.symbol) {
                return Err(BinexError::Internal(format!(
                    "open market {} has no book",
                    market.symbol
                )));
            }
        }
        if let Some(user) = state
            .stock_balances
            .keys()
            .find(|u| !state.inr_balances.contains_key(*u))
        {
            return Err(BinexError::Internal(format!(
                "positions held by unregistered user {user}"
            )));
        }

        let orders = OrderLedger::from_records(state.orders_list)?;
        Ok(Self {
            funds: FundsLedger::from_parts(state.inr_balances, state.total_onramped),
            positions: PositionLedger::from_parts(state.stock_balances),
            books: state.order_book,
            markets: MarketRegistry::from_parts(state.markets, state.traders),
            orders,
        })
    }
}

#[cfg(test)]
mod tests {
    use binex_types::{OrderId, Price, Side};
    use chrono::{Duration, Utc};

    use super::*;
    use crate::price_level::BookEntry;

    fn populated() -> Ledger {
        let now = Utc::now();
        let symbol = Symbol::from("M");
        let alice = UserId::from("alice");
        let mut ledger = Ledger::new();
        ledger.funds.create_user(&alice).unwrap();
        ledger.funds.onramp(&alice, 1000).unwrap();
        ledger.funds.lock(&alice, 400).unwrap();
        ledger
            .markets
            .insert(Market {
                symbol: symbol.clone(),
                title: "M".into(),
                description: String::new(),
                start_time: now,
                end_time: now + Duration::hours(1),
                source_of_truth: None,
                result: None,
                is_open: true,
                traders_count: 0,
            })
            .unwrap();
        ledger.markets.add_trader(&symbol, &alice);
        let mut book = OrderBook::new();
        book.push(
            Side::No,
            Price::from_ticks(60).unwrap(),
            BookEntry::Reversed {
                order_id: OrderId::new(),
                user_id: alice.clone(),
                quantity: 1,
            },
        );
        ledger.books.insert(symbol.clone(), book);
        ledger.positions.credit(&alice, &symbol, Side::Yes, 2).unwrap();
        ledger
    }

    #[test]
    fn export_import_is_identity() {
        let ledger = populated();
        let state = ledger.export();
        let restored = Ledger::import(state.clone()).unwrap();
        assert_eq!(restored, ledger);
        assert_eq!(restored.export(), state);
    }

    #[test]
    fn state_survives_json() {
        let state = populated().export();
        let json = serde_json::to_string(&state).unwrap();
        let back: LedgerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert!(json.contains("\"inrBalances\""));
        assert!(json.contains("\"ordersList\""));
    }

    #[test]
    fn import_rejects_orphan_book() {
        let mut state = populated().export();
        state.markets.clear();
        assert!(Ledger::import(state).is_err());
    }

    #[test]
    fn import_rejects_open_market_without_book() {
        let mut state = populated().export();
        state.order_book.clear();
        assert!(Ledger::import(state).is_err());
    }

    #[test]
    fn import_rejects_inconsistent_level() {
        let mut state = populated().export();
        for book in state.order_book.values_mut() {
            for level in book.no.values_mut() {
                level.total += 1;
            }
        }
        assert!(Ledger::import(state).is_err());
    }

    #[test]
    fn book_lookup_errors_for_unknown_market() {
        let ledger = Ledger::new();
        assert!(matches!(
            ledger.book(&Symbol::from("X")),
            Err(BinexError::MarketNotFound(_))
        ));
    }
}
