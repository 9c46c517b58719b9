//! Continuous matching: buys with liquidity sweep and minting, sells against
//! minted bids, exits and cancellation.
//!
//! ## Money flow
//!
//! A buy of `q` at `p` reserves `q × p`. Every unit is then either
//! - bought from a resting `Sell` at level `L ≤ p`: `L` goes to the seller,
//!   `p − L` is released back to the buyer;
//! - paired with a resting `Reversed` entry at `L ≤ p`: the holder had
//!   reserved `10 − L` for the opposite side, the buyer pays `L`, and the two
//!   reservations become the `10`-rupee collateral of a new contract pair;
//! - or minted: it rests as `Reversed` at `10 − p` on the opposite side and
//!   its reservation stays locked until it is paired, cancelled or refunded.
//!
//! A sell of `q` at `p` pledges `q` contracts and fills against `Reversed`
//! entries on the opposite side at levels `≤ 10 − p`; the holder's
//! reservation pays the seller and the holder receives the contracts.

use std::iter;

use binex_ledger::Take;
use binex_types::{
    BinexError, ExecutionReport, Fill, LiquidityKind, MarketState, OrderId, OrderKind,
    OrderRecord, Price, Result, Side, Symbol, UserId,
};
use chrono::{DateTime, Utc};

use crate::engine::MatchingEngine;
use crate::pricing;

/// A buy or sell request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Price,
    pub quantity: u64,
}

/// Taker state threaded through the fill loops.
struct Taker<'a> {
    order_id: OrderId,
    request: &'a OrderRequest,
    remaining: u64,
    fills: Vec<Fill>,
}

impl MatchingEngine {
    // =================================================================
    // Validation
    // =================================================================

    /// Checks shared by every trading operation. Nothing is mutated.
    fn validate_trade(&self, request: &OrderRequest, now: DateTime<Utc>) -> Result<()> {
        if request.quantity == 0 {
            return Err(BinexError::InvalidQuantity {
                reason: "quantity must be positive".into(),
            });
        }
        self.ledger.book(&request.symbol)?;
        let market = self
            .ledger
            .markets
            .get(&request.symbol)
            .ok_or_else(|| BinexError::MarketNotFound(request.symbol.clone()))?;
        if market.state(now) != MarketState::Open {
            return Err(BinexError::MarketClosed(request.symbol.clone()));
        }
        if !self.ledger.funds.contains(&request.user_id) {
            return Err(BinexError::UserNotFound(request.user_id.clone()));
        }
        Ok(())
    }

    // =================================================================
    // Buy
    // =================================================================

    /// Place a buy. The full quantity is always committed: filled against
    /// resting liquidity at or below `price`, the rest minted as `Reversed`
    /// liquidity at `10 − price` on the opposite side.
    ///
    /// # Errors
    /// `InvalidQuantity`, `MarketNotFound`, `MarketClosed`, `UserNotFound`,
    /// `InsufficientFunds`. A rejected buy leaves the ledger untouched.
    pub fn place_buy(&mut self, request: &OrderRequest, now: DateTime<Utc>) -> Result<ExecutionReport> {
        self.validate_trade(request, now)?;
        let reservation = request
            .price
            .notional(request.quantity)
            .ok_or_else(|| BinexError::InvalidQuantity {
                reason: format!("notional of {} overflows", request.quantity),
            })?;
        self.ledger.funds.lock(&request.user_id, reservation)?;

        let record = OrderRecord::new(
            request.symbol.clone(),
            request.user_id.clone(),
            request.side,
            OrderKind::Buy,
            request.price,
            request.quantity,
            now,
        );
        let order_id = self.ledger.orders.append(record)?;
        self.ledger
            .markets
            .add_trader(&request.symbol, &request.user_id);

        let mut taker = Taker {
            order_id,
            request,
            remaining: request.quantity,
            fills: Vec::new(),
        };

        // Whole-rupee levels below the limit, then the limit itself.
        let levels = request
            .price
            .whole_rupee_levels_below()
            .chain(iter::once(request.price));
        for level in levels {
            if taker.remaining == 0 {
                break;
            }
            self.buy_from_sellers(&mut taker, level)?;
            self.pair_with_reversed(&mut taker, level)?;
        }

        if taker.remaining > 0 {
            self.ledger.book_mut(&request.symbol)?.push(
                request.side.opposite(),
                request.price.complement(),
                binex_ledger::BookEntry::Reversed {
                    order_id,
                    user_id: request.user_id.clone(),
                    quantity: taker.remaining,
                },
            );
            tracing::debug!(
                order = %order_id,
                side = %request.side.opposite(),
                price = %request.price.complement(),
                qty = taker.remaining,
                "Minted opposite liquidity"
            );
        }

        let report = self.report(taker, OrderKind::Buy)?;
        tracing::info!(
            order = %report.order_id,
            user = %request.user_id,
            symbol = %request.symbol,
            side = %request.side,
            price = %request.price,
            qty = request.quantity,
            filled = report.filled_quantity,
            minted = report.resting_quantity,
            "Buy placed"
        );
        Ok(report)
    }

    /// Fill against resting `Sell` entries at `level`, oldest first.
    fn buy_from_sellers(&mut self, taker: &mut Taker<'_>, level: Price) -> Result<()> {
        let request = taker.request;
        while taker.remaining > 0 {
            let Some(take) = self.ledger.book_mut(&request.symbol)?.take(
                request.side,
                level,
                LiquidityKind::Sell,
                taker.remaining,
            ) else {
                break;
            };
            let amount = level.unit_cost() * take.quantity;
            let improvement = (request.price.unit_cost() - level.unit_cost()) * take.quantity;

            let funds = &mut self.ledger.funds;
            funds.consume_locked(&request.user_id, amount)?;
            funds.release(&request.user_id, improvement)?;
            funds.credit(&take.user_id, amount)?;

            let positions = &mut self.ledger.positions;
            positions.consume_locked(&take.user_id, &request.symbol, request.side, take.quantity)?;
            positions.credit(&request.user_id, &request.symbol, request.side, take.quantity)?;

            self.record_fill(taker, &take, LiquidityKind::Sell, level, amount)?;
        }
        Ok(())
    }

    /// Pair with resting `Reversed` entries at `level`, oldest first. Each
    /// entry's holder bid the opposite side at `10 − level`.
    fn pair_with_reversed(&mut self, taker: &mut Taker<'_>, level: Price) -> Result<()> {
        let request = taker.request;
        let opposite = request.side.opposite();
        while taker.remaining > 0 {
            let Some(take) = self.ledger.book_mut(&request.symbol)?.take(
                request.side,
                level,
                LiquidityKind::Reversed,
                taker.remaining,
            ) else {
                break;
            };
            let amount = level.unit_cost() * take.quantity;
            let holder_amount = level.complement().unit_cost() * take.quantity;
            let improvement = (request.price.unit_cost() - level.unit_cost()) * take.quantity;

            let funds = &mut self.ledger.funds;
            funds.consume_locked(&request.user_id, amount)?;
            funds.release(&request.user_id, improvement)?;
            funds.consume_locked(&take.user_id, holder_amount)?;

            let positions = &mut self.ledger.positions;
            positions.credit(&take.user_id, &request.symbol, opposite, take.quantity)?;
            positions.credit(&request.user_id, &request.symbol, request.side, take.quantity)?;

            self.record_fill(taker, &take, LiquidityKind::Reversed, level, amount)?;
        }
        Ok(())
    }

    // =================================================================
    // Sell
    // =================================================================

    /// Place a sell of owned contracts. Fills against minted bids on the
    /// opposite side at mirrored levels `≤ 10 − price`, best bid first; the
    /// rest rests as a `Sell` entry at `price`. Never mints.
    ///
    /// # Errors
    /// `InvalidQuantity`, `MarketNotFound`, `MarketClosed`, `UserNotFound`,
    /// `InsufficientStock`.
    pub fn place_sell(&mut self, request: &OrderRequest, now: DateTime<Utc>) -> Result<ExecutionReport> {
        self.validate_trade(request, now)?;
        self.ledger.positions.lock(
            &request.user_id,
            &request.symbol,
            request.side,
            request.quantity,
        )?;

        let record = OrderRecord::new(
            request.symbol.clone(),
            request.user_id.clone(),
            request.side,
            OrderKind::Sell,
            request.price,
            request.quantity,
            now,
        );
        let order_id = self.ledger.orders.append(record)?;
        self.ledger
            .markets
            .add_trader(&request.symbol, &request.user_id);

        let mut taker = Taker {
            order_id,
            request,
            remaining: request.quantity,
            fills: Vec::new(),
        };

        let opposite = request.side.opposite();
        let levels = self.ledger.book(&request.symbol)?.prices_at_or_below(
            opposite,
            request.price.complement(),
            LiquidityKind::Reversed,
        );
        for level in levels {
            if taker.remaining == 0 {
                break;
            }
            self.sell_to_bidders(&mut taker, level)?;
        }

        if taker.remaining > 0 {
            self.ledger.book_mut(&request.symbol)?.push(
                request.side,
                request.price,
                binex_ledger::BookEntry::Sell {
                    order_id,
                    user_id: request.user_id.clone(),
                    quantity: taker.remaining,
                },
            );
        }

        let report = self.report(taker, OrderKind::Sell)?;
        tracing::info!(
            order = %report.order_id,
            user = %request.user_id,
            symbol = %request.symbol,
            side = %request.side,
            price = %request.price,
            qty = request.quantity,
            filled = report.filled_quantity,
            resting = report.resting_quantity,
            "Sell placed"
        );
        Ok(report)
    }

    /// Fill against `Reversed` entries on the opposite side at `level`. The
    /// holder bid `10 − level` for the seller's side.
    fn sell_to_bidders(&mut self, taker: &mut Taker<'_>, level: Price) -> Result<()> {
        let request = taker.request;
        while taker.remaining > 0 {
            let Some(take) = self.ledger.book_mut(&request.symbol)?.take(
                request.side.opposite(),
                level,
                LiquidityKind::Reversed,
                taker.remaining,
            ) else {
                break;
            };
            let bid = level.complement();
            let amount = bid.unit_cost() * take.quantity;

            let funds = &mut self.ledger.funds;
            funds.consume_locked(&take.user_id, amount)?;
            funds.credit(&request.user_id, amount)?;

            let positions = &mut self.ledger.positions;
            positions.consume_locked(&request.user_id, &request.symbol, request.side, take.quantity)?;
            positions.credit(&take.user_id, &request.symbol, request.side, take.quantity)?;

            self.record_fill(taker, &take, LiquidityKind::Reversed, bid, amount)?;
        }
        Ok(())
    }

    // =================================================================
    // Exit
    // =================================================================

    /// Sell held contracts at `reference`, or at the live quote for `side`
    /// when absent. The position is deleted once it is completely empty.
    ///
    /// # Errors
    /// `NoPosition`, `InsufficientStock`, plus those of [`Self::place_sell`].
    pub fn exit(
        &mut self,
        user_id: &UserId,
        symbol: &Symbol,
        side: Side,
        quantity: u64,
        reference: Option<Price>,
        now: DateTime<Utc>,
    ) -> Result<ExecutionReport> {
        let position = self
            .ledger
            .positions
            .position(user_id, symbol)
            .ok_or_else(|| BinexError::NoPosition {
                user_id: user_id.clone(),
                symbol: symbol.clone(),
            })?;
        let held = position.side(side).quantity;
        if held < quantity {
            return Err(BinexError::InsufficientStock {
                needed: quantity,
                available: held,
            });
        }
        let price = match reference {
            Some(price) => price,
            None => pricing::quote_price(&self.ledger.orders, symbol, side, self.config.price_window),
        };
        let report = self.place_sell(
            &OrderRequest {
                user_id: user_id.clone(),
                symbol: symbol.clone(),
                side,
                price,
                quantity,
            },
            now,
        )?;
        if self.ledger.positions.prune(user_id, symbol) {
            tracing::debug!(user = %user_id, symbol = %symbol, "Position closed");
        }
        Ok(report)
    }

    // =================================================================
    // Cancel
    // =================================================================

    /// Withdraw an order's resting remainder and release its reservation.
    ///
    /// # Errors
    /// `CommandDisabled` unless cancellation is enabled; `OrderNotFound`;
    /// `OrderNotOwned`; `OrderNotCancellable` when nothing rests.
    pub fn cancel(&mut self, user_id: &UserId, order_id: &OrderId) -> Result<OrderRecord> {
        if !self.config.cancel_enabled {
            return Err(BinexError::CommandDisabled("CANCEL".into()));
        }
        let record = self
            .ledger
            .orders
            .get(order_id)
            .ok_or(BinexError::OrderNotFound(*order_id))?
            .clone();
        if &record.user_id != user_id {
            return Err(BinexError::OrderNotOwned {
                order_id: *order_id,
                user_id: user_id.clone(),
            });
        }
        let (side, price) = match record.kind {
            OrderKind::Sell => (record.side, record.price),
            OrderKind::Buy => (record.side.opposite(), record.price.complement()),
        };
        let entry = self
            .ledger
            .books
            .get_mut(&record.symbol)
            .and_then(|book| book.remove_order(side, price, order_id))
            .ok_or(BinexError::OrderNotCancellable(*order_id))?;
        let quantity = entry.quantity();

        match record.kind {
            OrderKind::Sell => {
                self.ledger
                    .positions
                    .release(user_id, &record.symbol, record.side, quantity)?;
            }
            OrderKind::Buy => {
                self.ledger
                    .funds
                    .release(user_id, record.price.unit_cost() * quantity)?;
            }
        }
        self.ledger.orders.record_cancel(order_id, quantity)?;

        tracing::info!(
            order = %order_id,
            user = %user_id,
            symbol = %record.symbol,
            qty = quantity,
            "Order cancelled"
        );
        self.ledger
            .orders
            .get(order_id)
            .cloned()
            .ok_or(BinexError::OrderNotFound(*order_id))
    }

    // =================================================================
    // Bookkeeping
    // =================================================================

    fn record_fill(
        &mut self,
        taker: &mut Taker<'_>,
        take: &Take,
        kind: LiquidityKind,
        price: Price,
        amount: u64,
    ) -> Result<()> {
        self.ledger.orders.record_fill(&take.order_id, take.quantity)?;
        self.ledger.orders.record_fill(&taker.order_id, take.quantity)?;
        taker.remaining -= take.quantity;
        tracing::debug!(
            taker = %taker.order_id,
            maker = %take.order_id,
            kind = ?kind,
            price = %price,
            qty = take.quantity,
            amount,
            "Fill"
        );
        taker.fills.push(Fill {
            maker_order_id: take.order_id,
            maker_user_id: take.user_id.clone(),
            kind,
            price,
            quantity: take.quantity,
            amount,
        });
        Ok(())
    }

    fn report(&self, taker: Taker<'_>, kind: OrderKind) -> Result<ExecutionReport> {
        let record = self
            .ledger
            .orders
            .get(&taker.order_id)
            .ok_or(BinexError::OrderNotFound(taker.order_id))?;
        Ok(ExecutionReport {
            order_id: taker.order_id,
            symbol: taker.request.symbol.clone(),
            side: taker.request.side,
            kind,
            quantity: taker.request.quantity,
            filled_quantity: taker.request.quantity - taker.remaining,
            resting_quantity: taker.remaining,
            status: record.status,
            fills: taker.fills,
        })
    }
}
