//! A single price level of one book side.
//!
//! Entries at the same price are stored in FIFO order (time priority)
//! using a [`VecDeque`]. `total` always equals the sum of entry quantities.

use std::collections::VecDeque;

use binex_types::{LiquidityKind, OrderId, UserId};
use serde::{Deserialize, Serialize};

/// A resting book entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BookEntry {
    /// Contracts pledged for sale.
    Sell {
        order_id: OrderId,
        user_id: UserId,
        quantity: u64,
    },
    /// Minted liquidity: the unmatched remainder of an opposite-side buy at
    /// the complementary price.
    Reversed {
        order_id: OrderId,
        user_id: UserId,
        quantity: u64,
    },
}

impl BookEntry {
    #[must_use]
    pub fn kind(&self) -> LiquidityKind {
        match self {
            Self::Sell { .. } => LiquidityKind::Sell,
            Self::Reversed { .. } => LiquidityKind::Reversed,
        }
    }

    #[must_use]
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::Sell { order_id, .. } | Self::Reversed { order_id, .. } => *order_id,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::Sell { user_id, .. } | Self::Reversed { user_id, .. } => user_id,
        }
    }

    #[must_use]
    pub fn quantity(&self) -> u64 {
        match self {
            Self::Sell { quantity, .. } | Self::Reversed { quantity, .. } => *quantity,
        }
    }

    fn quantity_mut(&mut self) -> &mut u64 {
        match self {
            Self::Sell { quantity, .. } | Self::Reversed { quantity, .. } => quantity,
        }
    }
}

/// Result of taking liquidity from a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Take {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub quantity: u64,
}

/// All resting entries at one price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Quantity resting at this level.
    pub total: u64,
    /// Entries in time-priority order (front = oldest).
    pub entries: VecDeque<BookEntry>,
}

impl PriceLevel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to the back of this level (lowest time priority).
    pub fn push_back(&mut self, entry: BookEntry) {
        self.total += entry.quantity();
        self.entries.push_back(entry);
    }

    /// Resting quantity of one kind.
    #[must_use]
    pub fn available(&self, kind: LiquidityKind) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.kind() == kind)
            .map(BookEntry::quantity)
            .sum()
    }

    /// Take up to `quantity` from the oldest entry of `kind`.
    ///
    /// Emptied entries are removed. Returns `None` when no entry of that
    /// kind is resting.
    pub fn take_front(&mut self, kind: LiquidityKind, quantity: u64) -> Option<Take> {
        let pos = self.entries.iter().position(|e| e.kind() == kind)?;
        let entry = &mut self.entries[pos];
        let taken = entry.quantity().min(quantity);
        *entry.quantity_mut() -= taken;
        let take = Take {
            order_id: entry.order_id(),
            user_id: entry.user_id().clone(),
            quantity: taken,
        };
        if entry.quantity() == 0 {
            self.entries.remove(pos);
        }
        self.total -= taken;
        Some(take)
    }

    /// Remove an order's entry. Returns the removed entry, or `None`.
    pub fn remove_order(&mut self, order_id: &OrderId) -> Option<BookEntry> {
        let pos = self.entries.iter().position(|e| e.order_id() == *order_id)?;
        let entry = self.entries.remove(pos)?;
        self.total -= entry.quantity();
        Some(entry)
    }

    #[must_use]
    pub fn find(&self, order_id: &OrderId) -> Option<&BookEntry> {
        self.entries.iter().find(|e| e.order_id() == *order_id)
    }

    /// Returns `true` if there are no entries at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether `total` matches the entries.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.entries.iter().map(BookEntry::quantity).sum::<u64>()
            && self.entries.iter().all(|e| e.quantity() > 0)
    }
}
