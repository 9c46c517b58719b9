//! The order book for a single market.
//!
//! Each outcome side is a `BTreeMap<Price, PriceLevel>`, so levels iterate
//! lowest price first. A `Reversed` entry on one side always mirrors a buy
//! on the other side at `10 - price`.

use std::collections::BTreeMap;

use binex_types::{BookDepth, BookView, LevelShare, LevelView, LiquidityKind, OrderId, Price, Side};
use serde::{Deserialize, Serialize};

use crate::price_level::{BookEntry, PriceLevel, Take};

/// Levels of one outcome side.
pub type BookSide = BTreeMap<Price, PriceLevel>;

/// Both sides of one market's book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub yes: BookSide,
    pub no: BookSide,
}

impl OrderBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Yes => &self.yes,
            Side::No => &self.no,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Yes => &mut self.yes,
            Side::No => &mut self.no,
        }
    }

    // =================================================================
    // Mutation
    // =================================================================

    /// Rest an entry at the back of a level.
    pub fn push(&mut self, side: Side, price: Price, entry: BookEntry) {
        self.side_mut(side).entry(price).or_default().push_back(entry);
    }

    /// Take from the oldest entry of `kind` at a level, dropping the level
    /// once it is empty.
    pub fn take(
        &mut self,
        side: Side,
        price: Price,
        kind: LiquidityKind,
        quantity: u64,
    ) -> Option<Take> {
        let levels = self.side_mut(side);
        let level = levels.get_mut(&price)?;
        let take = level.take_front(kind, quantity);
        if level.is_empty() {
            levels.remove(&price);
        }
        take
    }

    /// Remove an order's entry from a level, dropping the level once empty.
    pub fn remove_order(&mut self, side: Side, price: Price, order_id: &OrderId) -> Option<BookEntry> {
        let levels = self.side_mut(side);
        let level = levels.get_mut(&price)?;
        let entry = level.remove_order(order_id);
        if level.is_empty() {
            levels.remove(&price);
        }
        entry
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Resting quantity of `kind` at a level.
    #[must_use]
    pub fn available(&self, side: Side, price: Price, kind: LiquidityKind) -> u64 {
        self.side(side)
            .get(&price)
            .map_or(0, |level| level.available(kind))
    }

    #[must_use]
    pub fn find(&self, side: Side, price: Price, order_id: &OrderId) -> Option<&BookEntry> {
        self.side(side).get(&price)?.find(order_id)
    }

    /// Levels holding `kind` liquidity at or below `limit`, lowest first.
    #[must_use]
    pub fn prices_at_or_below(&self, side: Side, limit: Price, kind: LiquidityKind) -> Vec<Price> {
        self.side(side)
            .range(..=limit)
            .filter(|(_, level)| level.available(kind) > 0)
            .map(|(price, _)| *price)
            .collect()
    }

    /// Every resting entry with its side and price.
    pub fn entries(&self) -> impl Iterator<Item = (Side, Price, &BookEntry)> {
        Side::BOTH.into_iter().flat_map(move |side| {
            self.side(side).iter().flat_map(move |(price, level)| {
                level.entries.iter().map(move |entry| (side, *price, entry))
            })
        })
    }

    /// Returns `true` if neither side has liquidity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.yes.is_empty() && self.no.is_empty()
    }

    /// Every level total matches its entries and no level is empty.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        Side::BOTH.into_iter().all(|side| {
            self.side(side)
                .values()
                .all(|level| !level.is_empty() && level.is_consistent())
        })
    }

    // =================================================================
    // Views
    // =================================================================

    /// Per-level totals with per-user aggregates, keyed by price in paise.
    #[must_use]
    pub fn view(&self) -> BookView {
        let side_view = |levels: &BookSide| {
            levels
                .iter()
                .map(|(price, level)| {
                    let mut orders: Vec<LevelShare> = Vec::new();
                    for entry in &level.entries {
                        match orders
                            .iter_mut()
                            .find(|s| &s.user_id == entry.user_id() && s.kind == entry.kind())
                        {
                            Some(share) => share.quantity += entry.quantity(),
                            None => orders.push(LevelShare {
                                user_id: entry.user_id().clone(),
                                kind: entry.kind(),
                                quantity: entry.quantity(),
                            }),
                        }
                    }
                    (
                        price.unit_cost(),
                        LevelView {
                            total: level.total,
                            orders,
                        },
                    )
                })
                .collect()
        };
        BookView {
            yes: side_view(&self.yes),
            no: side_view(&self.no),
        }
    }

    #[must_use]
    pub fn depth(&self) -> BookDepth {
        self.view().depth()
    }
}
