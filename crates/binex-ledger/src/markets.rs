//! Market registry and per-market trader sets.

use std::collections::{BTreeMap, BTreeSet};

use binex_types::{BinexError, Market, Result, Symbol, UserId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketRegistry {
    markets: BTreeMap<Symbol, Market>,
    traders: BTreeMap<Symbol, BTreeSet<UserId>>,
}

impl MarketRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        markets: BTreeMap<Symbol, Market>,
        traders: BTreeMap<Symbol, BTreeSet<UserId>>,
    ) -> Self {
        Self { markets, traders }
    }

    pub(crate) fn traders_all(&self) -> &BTreeMap<Symbol, BTreeSet<UserId>> {
        &self.traders
    }

    /// Register a new market.
    ///
    /// # Errors
    /// `MarketAlreadyExists` if the symbol is taken.
    pub fn insert(&mut self, market: Market) -> Result<()> {
        if self.markets.contains_key(&market.symbol) {
            return Err(BinexError::MarketAlreadyExists(market.symbol));
        }
        self.markets.insert(market.symbol.clone(), market);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Market> {
        self.markets.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &Symbol) -> Option<&mut Market> {
        self.markets.get_mut(symbol)
    }

    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.markets.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// Record that `user_id` traded `symbol`, keeping `traders_count` in step.
    pub fn add_trader(&mut self, symbol: &Symbol, user_id: &UserId) {
        let traders = self.traders.entry(symbol.clone()).or_default();
        if traders.insert(user_id.clone()) {
            if let Some(market) = self.markets.get_mut(symbol) {
                market.traders_count = traders.len() as u64;
            }
        }
    }

    #[must_use]
    pub fn traders(&self, symbol: &Symbol) -> Option<&BTreeSet<UserId>> {
        self.traders.get(symbol)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn market(symbol: &str) -> Market {
        let now = Utc::now();
        Market {
            symbol: Symbol::from(symbol),
            title: symbol.to_string(),
            description: String::new(),
            start_time: now,
            end_time: now + Duration::hours(1),
            source_of_truth: None,
            result: None,
            is_open: true,
            traders_count: 0,
        }
    }

    #[test]
    fn insert_rejects_duplicate_symbol() {
        let mut registry = MarketRegistry::new();
        registry.insert(market("M")).unwrap();
        assert!(matches!(
            registry.insert(market("M")),
            Err(BinexError::MarketAlreadyExists(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn traders_are_counted_once() {
        let mut registry = MarketRegistry::new();
        registry.insert(market("M")).unwrap();
        let m = Symbol::from("M");
        registry.add_trader(&m, &UserId::from("a"));
        registry.add_trader(&m, &UserId::from("a"));
        registry.add_trader(&m, &UserId::from("b"));
        assert_eq!(registry.get(&m).unwrap().traders_count, 2);
        assert_eq!(registry.traders(&m).unwrap().len(), 2);
    }
}
