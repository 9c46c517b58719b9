//! The [`MatchingEngine`]: owner of the ledger and entry point for every
//! state change.
//!
//! Trading operations live in [`crate::matching`], settlement in
//! [`crate::settlement`], quoting in [`crate::pricing`]; this module holds
//! construction, account and market administration, and read-only queries.

use std::collections::BTreeMap;

use binex_ledger::{Ledger, LedgerState, OrderBook, SupplyAudit};
use binex_types::{
    BinexError, BookDepth, BookView, EngineConfig, InrBalance, Market, OrderRecord, Paise,
    Position, Result, Symbol, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters of a new market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMarket {
    pub symbol: Symbol,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub source_of_truth: Option<String>,
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl NewMarket {
    /// Parameters of a market open for the current hour.
    pub fn dummy_open(symbol: &str) -> Self {
        let market = Market::dummy_open(symbol);
        Self {
            symbol: market.symbol,
            title: market.title,
            description: market.description,
            start_time: market.start_time,
            end_time: market.end_time,
            source_of_truth: Some("https://example.org".into()),
        }
    }
}

/// Single-writer matching engine.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    pub(crate) ledger: Ledger,
    pub(crate) config: EngineConfig,
}

impl MatchingEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            ledger: Ledger::new(),
            config,
        }
    }

    /// Restore an engine from a snapshot.
    pub fn from_state(state: LedgerState, config: EngineConfig) -> Result<Self> {
        let ledger = Ledger::import(state)?;
        tracing::info!(
            users = ledger.funds.user_count(),
            markets = ledger.markets.len(),
            orders = ledger.orders.len(),
            "Ledger restored"
        );
        Ok(Self { ledger, config })
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consistent copy of the ledger for a snapshot.
    #[must_use]
    pub fn export_state(&self) -> LedgerState {
        self.ledger.export()
    }

    /// Check conservation invariants over the current ledger.
    pub fn audit(&self) -> Result<binex_ledger::AuditReport> {
        SupplyAudit::verify(&self.ledger)
    }

    // =================================================================
    // Accounts
    // =================================================================

    pub fn create_user(&mut self, user_id: &UserId) -> Result<InrBalance> {
        let balance = self.ledger.funds.create_user(user_id)?;
        tracing::info!(user = %user_id, "User created");
        Ok(balance)
    }

    pub fn onramp(&mut self, user_id: &UserId, amount: Paise) -> Result<InrBalance> {
        let balance = self.ledger.funds.onramp(user_id, amount)?;
        tracing::info!(user = %user_id, amount, "Funds onramped");
        Ok(balance)
    }

    // =================================================================
    // Markets
    // =================================================================

    /// Register a market and open its empty book.
    ///
    /// # Errors
    /// `InvalidMarket` for a blank symbol or `end <= start`;
    /// `MarketAlreadyExists` if the symbol is taken.
    pub fn create_market(&mut self, params: NewMarket) -> Result<Market> {
        if params.symbol.is_empty() {
            return Err(BinexError::InvalidMarket {
                reason: "symbol must not be empty".into(),
            });
        }
        if params.end_time <= params.start_time {
            return Err(BinexError::InvalidMarket {
                reason: format!(
                    "end time {} is not after start time {}",
                    params.end_time, params.start_time
                ),
            });
        }
        let market = Market {
            symbol: params.symbol,
            title: params.title,
            description: params.description,
            start_time: params.start_time,
            end_time: params.end_time,
            source_of_truth: params.source_of_truth,
            result: None,
            is_open: true,
            traders_count: 0,
        };
        self.ledger.markets.insert(market.clone())?;
        self.ledger
            .books
            .insert(market.symbol.clone(), OrderBook::new());
        tracing::info!(
            symbol = %market.symbol,
            end = %market.end_time,
            "Market created"
        );
        Ok(market)
    }

    #[must_use]
    pub fn market(&self, symbol: &Symbol) -> Option<&Market> {
        self.ledger.markets.get(symbol)
    }

    // =================================================================
    // Queries
    // =================================================================

    pub fn inr_balance(&self, user_id: &UserId) -> Result<InrBalance> {
        self.ledger.funds.get(user_id)
    }

    /// All positions of a registered user; empty when they hold nothing.
    pub fn stock_balances(&self, user_id: &UserId) -> Result<BTreeMap<Symbol, Position>> {
        if !self.ledger.funds.contains(user_id) {
            return Err(BinexError::UserNotFound(user_id.clone()));
        }
        Ok(self
            .ledger
            .positions
            .user_positions(user_id)
            .cloned()
            .unwrap_or_default())
    }

    /// A user's order records, newest first.
    pub fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<OrderRecord>> {
        if !self.ledger.funds.contains(user_id) {
            return Err(BinexError::UserNotFound(user_id.clone()));
        }
        Ok(self
            .ledger
            .orders
            .for_user(user_id)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn order_book(&self, symbol: &Symbol) -> Result<BookView> {
        Ok(self.ledger.book(symbol)?.view())
    }

    /// Views of every open book.
    #[must_use]
    pub fn order_books(&self) -> BTreeMap<Symbol, BookView> {
        self.ledger
            .books
            .iter()
            .map(|(symbol, book)| (symbol.clone(), book.view()))
            .collect()
    }

    /// Level totals for an order-book delta.
    #[must_use]
    pub fn depth(&self, symbol: &Symbol) -> Option<BookDepth> {
        self.ledger.books.get(symbol).map(OrderBook::depth)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl MatchingEngine {
    /// Engine with one open market and funded users.
    pub fn dummy_with_users(symbol: &str, users: &[(&str, Paise)]) -> Self {
        let mut engine = Self::default();
        engine
            .create_market(NewMarket::dummy_open(symbol))
            .expect("dummy market");
        for (user, amount) in users {
            let id = UserId::from(*user);
            engine.create_user(&id).expect("dummy user");
            if *amount > 0 {
                engine.onramp(&id, *amount).expect("dummy onramp");
            }
        }
        engine
    }
}
