//! Balance tracking types.
//!
//! Every user has an INR balance split into `balance` (disposable) and
//! `locked` (reserved by resting buy liquidity), and per market a
//! [`Position`] holding a [`StockBalance`] for each side.

use serde::{Deserialize, Serialize};

use crate::{Paise, Side};

/// Funds of a single user, in paise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InrBalance {
    /// Disposable funds.
    pub balance: Paise,
    /// Funds reserved by resting buy orders.
    pub locked: Paise,
}

impl InrBalance {
    #[must_use]
    pub fn new(balance: Paise) -> Self {
        Self { balance, locked: 0 }
    }

    /// Total funds (balance + locked). Saturates rather than wrapping.
    #[must_use]
    pub fn total(&self) -> Paise {
        self.balance.saturating_add(self.locked)
    }
}

/// Contracts of one side of one market held by a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBalance {
    /// Owned and tradeable.
    pub quantity: u64,
    /// Pledged to resting sell orders.
    pub locked: u64,
}

impl StockBalance {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.quantity.saturating_add(self.locked)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.quantity == 0 && self.locked == 0
    }
}

/// A user's holdings in one market.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub yes: StockBalance,
    pub no: StockBalance,
}

impl Position {
    #[must_use]
    pub fn side(&self, side: Side) -> &StockBalance {
        match side {
            Side::Yes => &self.yes,
            Side::No => &self.no,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut StockBalance {
        match side {
            Side::Yes => &mut self.yes,
            Side::No => &mut self.no,
        }
    }

    /// Both sides empty: the position can be pruned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.yes.is_zero() && self.no.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inr_balance_total() {
        let b = InrBalance {
            balance: 1500,
            locked: 500,
        };
        assert_eq!(b.total(), 2000);
        assert_eq!(InrBalance::new(700).locked, 0);
    }

    #[test]
    fn position_side_access() {
        let mut pos = Position::default();
        assert!(pos.is_empty());
        pos.side_mut(Side::No).quantity = 3;
        assert_eq!(pos.side(Side::No).quantity, 3);
        assert_eq!(pos.side(Side::Yes).quantity, 0);
        assert!(!pos.is_empty());
    }

    #[test]
    fn position_serializes_both_sides() {
        let pos = Position {
            yes: StockBalance {
                quantity: 2,
                locked: 1,
            },
            no: StockBalance::default(),
        };
        let json = serde_json::to_value(pos).unwrap();
        assert_eq!(json["yes"]["quantity"], 2);
        assert_eq!(json["yes"]["locked"], 1);
        assert_eq!(json["no"]["quantity"], 0);
    }
}
