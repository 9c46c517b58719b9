//! Market settlement: unwind the book, pay the winning side, close the market.
//!
//! Order of effects:
//! 1. every resting entry is withdrawn; `Reversed` reservations are refunded
//!    and the remainder recorded as cancelled;
//! 2. every position in the market is removed, pledged contracts included;
//! 3. each winning contract pays [`PAYOUT_PAISE`] from the pair collateral;
//! 4. the result is recorded and the market closed for good.

use std::collections::BTreeMap;

use binex_ledger::BookEntry;
use binex_types::constants::PAYOUT_PAISE;
use binex_types::{BinexError, Paise, Result, Side, Symbol, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::MatchingEngine;

/// Outcome of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub symbol: Symbol,
    pub result: Side,
    /// Paise credited per winning holder.
    pub payouts: BTreeMap<UserId, Paise>,
    /// Reservations returned per holder of unpaired minted liquidity.
    pub refunds: BTreeMap<UserId, Paise>,
    pub cancelled_orders: usize,
    pub total_payout: u128,
}

impl MatchingEngine {
    /// Settle `symbol` with `result`.
    ///
    /// # Errors
    /// `MarketNotFound`; `AlreadySettled`; `NotYetClosed` before the end time.
    pub fn settle(&mut self, symbol: &Symbol, result: Side, now: DateTime<Utc>) -> Result<SettlementReport> {
        let market = self
            .ledger
            .markets
            .get(symbol)
            .ok_or_else(|| BinexError::MarketNotFound(symbol.clone()))?;
        if market.result.is_some() {
            return Err(BinexError::AlreadySettled(symbol.clone()));
        }
        if now < market.end_time {
            return Err(BinexError::NotYetClosed(symbol.clone()));
        }

        let mut report = SettlementReport {
            symbol: symbol.clone(),
            result,
            payouts: BTreeMap::new(),
            refunds: BTreeMap::new(),
            cancelled_orders: 0,
            total_payout: 0,
        };

        if let Some(book) = self.ledger.books.remove(symbol) {
            for (_, price, entry) in book.entries() {
                if let BookEntry::Reversed {
                    user_id, quantity, ..
                } = entry
                {
                    let refund = price.complement().unit_cost() * quantity;
                    self.ledger.funds.release(user_id, refund)?;
                    *report.refunds.entry(user_id.clone()).or_default() += refund;
                }
                self.ledger
                    .orders
                    .record_cancel(&entry.order_id(), entry.quantity())?;
                report.cancelled_orders += 1;
            }
        }

        for (user_id, position) in self.ledger.positions.remove_market(symbol) {
            let winning = position.side(result).total();
            if winning == 0 {
                continue;
            }
            let payout = winning.checked_mul(PAYOUT_PAISE).ok_or_else(|| {
                BinexError::BalanceOverflow {
                    reason: format!("payout of {winning} contracts to {user_id}"),
                }
            })?;
            self.ledger.funds.credit(&user_id, payout)?;
            report.total_payout += u128::from(payout);
            report.payouts.insert(user_id, payout);
        }

        if let Some(market) = self.ledger.markets.get_mut(symbol) {
            market.result = Some(result);
            market.is_open = false;
        }
        debug_assert!(self.audit().is_ok(), "settlement broke conservation");

        tracing::info!(
            symbol = %symbol,
            result = %result,
            winners = report.payouts.len(),
            total_payout = %report.total_payout,
            cancelled = report.cancelled_orders,
            "Market settled"
        );
        Ok(report)
    }
}
