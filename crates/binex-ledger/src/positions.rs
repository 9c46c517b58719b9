//! Contract positions per user per market.
//!
//! Mirrors the funds ledger for contracts: `quantity` is owned and
//! tradeable, `locked` is pledged to resting sell entries. A user's map of
//! markets is created on first credit and removed once it is empty.

use std::collections::BTreeMap;

use binex_types::{BinexError, Position, Result, Side, Symbol, UserId};

type UserPositions = BTreeMap<Symbol, Position>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionLedger {
    positions: BTreeMap<UserId, UserPositions>,
}

impl PositionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(positions: BTreeMap<UserId, UserPositions>) -> Self {
        Self { positions }
    }

    pub(crate) fn all(&self) -> &BTreeMap<UserId, UserPositions> {
        &self.positions
    }

    #[must_use]
    pub fn position(&self, user_id: &UserId, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(user_id)?.get(symbol)
    }

    /// Every market position held by a user.
    #[must_use]
    pub fn user_positions(&self, user_id: &UserId) -> Option<&UserPositions> {
        self.positions.get(user_id)
    }

    fn side_mut(
        &mut self,
        user_id: &UserId,
        symbol: &Symbol,
        side: Side,
    ) -> Option<&mut binex_types::StockBalance> {
        self.positions
            .get_mut(user_id)?
            .get_mut(symbol)
            .map(|p| p.side_mut(side))
    }

    // =================================================================
    // Core operations
    // =================================================================

    /// Pledge `quantity` owned contracts to a sell entry.
    ///
    /// # Errors
    /// `InsufficientStock` if fewer than `quantity` are owned.
    pub fn lock(&mut self, user_id: &UserId, symbol: &Symbol, side: Side, quantity: u64) -> Result<()> {
        let available = self
            .position(user_id, symbol)
            .map_or(0, |p| p.side(side).quantity);
        if available < quantity {
            return Err(BinexError::InsufficientStock {
                needed: quantity,
                available,
            });
        }
        if let Some(stock) = self.side_mut(user_id, symbol, side) {
            stock.quantity -= quantity;
            stock.locked += quantity;
        }
        Ok(())
    }

    /// Return pledged contracts to the owner.
    ///
    /// # Errors
    /// `BalanceUnderflow` if fewer than `quantity` are pledged.
    pub fn release(&mut self, user_id: &UserId, symbol: &Symbol, side: Side, quantity: u64) -> Result<()> {
        let stock = self.locked_at_least(user_id, symbol, side, quantity)?;
        stock.locked -= quantity;
        stock.quantity += quantity;
        Ok(())
    }

    /// Remove pledged contracts that were sold.
    ///
    /// # Errors
    /// `BalanceUnderflow` if fewer than `quantity` are pledged.
    pub fn consume_locked(
        &mut self,
        user_id: &UserId,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
    ) -> Result<()> {
        let stock = self.locked_at_least(user_id, symbol, side, quantity)?;
        stock.locked -= quantity;
        Ok(())
    }

    fn locked_at_least(
        &mut self,
        user_id: &UserId,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
    ) -> Result<&mut binex_types::StockBalance> {
        match self.side_mut(user_id, symbol, side) {
            Some(stock) if stock.locked >= quantity => Ok(stock),
            other => Err(BinexError::BalanceUnderflow {
                reason: format!(
                    "{user_id} has {} {side} locked in {symbol}, needs {quantity}",
                    other.map_or(0, |s| s.locked)
                ),
            }),
        }
    }

    /// Add owned contracts, creating the position if needed.
    ///
    /// # Errors
    /// `BalanceOverflow` if the count would wrap.
    pub fn credit(&mut self, user_id: &UserId, symbol: &Symbol, side: Side, quantity: u64) -> Result<()> {
        let stock = self
            .positions
            .entry(user_id.clone())
            .or_default()
            .entry(symbol.clone())
            .or_default()
            .side_mut(side);
        stock.quantity = stock
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| BinexError::BalanceOverflow {
                reason: format!("{quantity} {side} contracts to {user_id}"),
            })?;
        Ok(())
    }

    /// Delete the position if both sides are empty, and the user's map if it
    /// has no markets left. Returns whether the position was removed.
    pub fn prune(&mut self, user_id: &UserId, symbol: &Symbol) -> bool {
        let Some(markets) = self.positions.get_mut(user_id) else {
            return false;
        };
        let removed = match markets.get(symbol) {
            Some(position) if position.is_empty() => markets.remove(symbol).is_some(),
            _ => false,
        };
        if markets.is_empty() {
            self.positions.remove(user_id);
        }
        removed
    }

    /// Remove every position in `symbol`, returning them. Users left without
    /// any market are dropped.
    pub fn remove_market(&mut self, symbol: &Symbol) -> Vec<(UserId, Position)> {
        let mut removed = Vec::new();
        self.positions.retain(|user_id, markets| {
            if let Some(position) = markets.remove(symbol) {
                removed.push((user_id.clone(), position));
            }
            !markets.is_empty()
        });
        removed
    }

    // =================================================================
    // Aggregates
    // =================================================================

    /// Outstanding contracts (owned + pledged) of one side of a market.
    #[must_use]
    pub fn contract_supply(&self, symbol: &Symbol, side: Side) -> u64 {
        self.positions
            .values()
            .filter_map(|markets| markets.get(symbol))
            .map(|p| p.side(side).total())
            .sum()
    }

    /// Contracts a user has pledged on one side of a market.
    #[must_use]
    pub fn locked(&self, user_id: &UserId, symbol: &Symbol, side: Side) -> u64 {
        self.position(user_id, symbol)
            .map_or(0, |p| p.side(side).locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(id: &str) -> UserId {
        UserId::from(id)
    }

    fn m() -> Symbol {
        Symbol::from("M")
    }

    #[test]
    fn credit_creates_position() {
        let mut ledger = PositionLedger::new();
        ledger.credit(&u("a"), &m(), Side::Yes, 3).unwrap();
        assert_eq!(ledger.position(&u("a"), &m()).unwrap().yes.quantity, 3);
        assert_eq!(ledger.contract_supply(&m(), Side::Yes), 3);
        assert_eq!(ledger.contract_supply(&m(), Side::No), 0);
    }

    #[test]
    fn no_short_selling() {
        let mut ledger = PositionLedger::new();
        assert!(matches!(
            ledger.lock(&u("a"), &m(), Side::Yes, 1),
            Err(BinexError::InsufficientStock {
                needed: 1,
                available: 0
            })
        ));
        ledger.credit(&u("a"), &m(), Side::Yes, 2).unwrap();
        assert!(ledger.lock(&u("a"), &m(), Side::Yes, 3).is_err());
        ledger.lock(&u("a"), &m(), Side::Yes, 2).unwrap();
        let yes = ledger.position(&u("a"), &m()).unwrap().yes;
        assert_eq!((yes.quantity, yes.locked), (0, 2));
    }

    #[test]
    fn release_and_consume() {
        let mut ledger = PositionLedger::new();
        ledger.credit(&u("a"), &m(), Side::No, 5).unwrap();
        ledger.lock(&u("a"), &m(), Side::No, 4).unwrap();
        ledger.release(&u("a"), &m(), Side::No, 1).unwrap();
        ledger.consume_locked(&u("a"), &m(), Side::No, 3).unwrap();
        assert!(ledger.consume_locked(&u("a"), &m(), Side::No, 1).is_err());
        let no = ledger.position(&u("a"), &m()).unwrap().no;
        assert_eq!((no.quantity, no.locked), (2, 0));
        assert_eq!(ledger.contract_supply(&m(), Side::No), 2);
    }

    #[test]
    fn prune_removes_empty_position_and_user() {
        let mut ledger = PositionLedger::new();
        ledger.credit(&u("a"), &m(), Side::Yes, 1).unwrap();
        assert!(!ledger.prune(&u("a"), &m()));
        ledger.lock(&u("a"), &m(), Side::Yes, 1).unwrap();
        ledger.consume_locked(&u("a"), &m(), Side::Yes, 1).unwrap();
        assert!(ledger.prune(&u("a"), &m()));
        assert!(ledger.user_positions(&u("a")).is_none());
    }

    #[test]
    fn remove_market_keeps_other_markets() {
        let mut ledger = PositionLedger::new();
        let other = Symbol::from("OTHER");
        ledger.credit(&u("a"), &m(), Side::Yes, 1).unwrap();
        ledger.credit(&u("a"), &other, Side::No, 1).unwrap();
        ledger.credit(&u("b"), &m(), Side::No, 1).unwrap();
        let removed = ledger.remove_market(&m());
        assert_eq!(removed.len(), 2);
        assert!(ledger.user_positions(&u("b")).is_none());
        assert!(ledger.position(&u("a"), &other).is_some());
    }
}
