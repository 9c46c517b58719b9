//! Price estimation from recent order flow.
//!
//! The yes-probability of a market is the quantity-weighted mean implied
//! yes-price of its most recent orders, over the payout. A `no` order at
//! `p` implies a yes-price of `10 − p`. With no history the estimate is
//! `0.5`.

use binex_ledger::OrderLedger;
use binex_types::constants::PAYOUT_TICKS;
use binex_types::{BinexError, Price, PriceQuote, Result, Side, Symbol};
use rust_decimal::Decimal;

use crate::engine::MatchingEngine;

/// Estimated yes-probability over the last `window` records of `symbol`.
#[must_use]
pub fn estimate_yes_probability(orders: &OrderLedger, symbol: &Symbol, window: usize) -> Decimal {
    let (weighted, quantity) = orders
        .recent_for_market(symbol, window)
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(weighted, quantity), record| {
            let qty = Decimal::from(record.quantity);
            (
                weighted + Decimal::from(record.implied_yes_ticks()) * qty,
                quantity + qty,
            )
        });
    if quantity.is_zero() {
        return Decimal::new(5, 1);
    }
    weighted / quantity / Decimal::from(PAYOUT_TICKS)
}

/// Quoted price for `side`, rounded to a tick.
#[must_use]
pub fn quote_price(orders: &OrderLedger, symbol: &Symbol, side: Side, window: usize) -> Price {
    let yes = Price::from_probability(estimate_yes_probability(orders, symbol, window));
    match side {
        Side::Yes => yes,
        Side::No => yes.complement(),
    }
}

impl MatchingEngine {
    /// Live quote for a market.
    ///
    /// # Errors
    /// `MarketNotFound` for an unknown symbol.
    pub fn quote(&self, symbol: &Symbol) -> Result<PriceQuote> {
        if !self.ledger.markets.contains(symbol) {
            return Err(BinexError::MarketNotFound(symbol.clone()));
        }
        let window = self.config.price_window;
        let probability = estimate_yes_probability(&self.ledger.orders, symbol, window);
        let yes = Price::from_probability(probability);
        Ok(PriceQuote {
            probability,
            yes_price: yes.unit_cost(),
            no_price: yes.complement().unit_cost(),
        })
    }
}
