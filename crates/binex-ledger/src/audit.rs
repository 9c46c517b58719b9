//! Conservation invariant checker.
//!
//! Invariants checked against a [`Ledger`]:
//! ```text
//! Σ(balance + locked) + PAYOUT × Σ_open_markets yes_supply == Σ onramped
//! ∀ open market: yes_supply == no_supply
//! ∀ user: locked funds == Σ own Reversed entries × (10 - level)
//! ∀ user, market, side: locked stock == Σ own Sell entries
//! ```
//!
//! Every contract pair is backed by exactly one payout of collateral, every
//! reservation is visible in the book, and nothing else holds money.

use std::collections::BTreeMap;

use binex_types::constants::PAYOUT_PAISE;
use binex_types::{BinexError, Result, Side, Symbol, UserId};

use crate::price_level::BookEntry;
use crate::state::Ledger;

/// Totals computed by one audit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditReport {
    /// Σ(balance + locked).
    pub funds: u128,
    /// Paise backing outstanding contract pairs.
    pub collateral: u128,
    pub onramped: u128,
}

/// Stateless auditor over a ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupplyAudit;

impl SupplyAudit {
    /// Run every check.
    ///
    /// # Errors
    /// [`BinexError::SupplyInvariantViolation`] naming the first broken
    /// invariant.
    pub fn verify(ledger: &Ledger) -> Result<AuditReport> {
        let mut collateral: u128 = 0;
        for market in ledger.markets.iter().filter(|m| m.result.is_none()) {
            let yes = ledger.positions.contract_supply(&market.symbol, Side::Yes);
            let no = ledger.positions.contract_supply(&market.symbol, Side::No);
            if yes != no {
                return Err(violation(format!(
                    "market {}: yes supply {yes} != no supply {no}",
                    market.symbol
                )));
            }
            collateral += u128::from(yes) * u128::from(PAYOUT_PAISE);
        }

        let report = AuditReport {
            funds: ledger.funds.total(),
            collateral,
            onramped: ledger.funds.total_onramped(),
        };
        if report.funds + report.collateral != report.onramped {
            return Err(violation(format!(
                "funds {} + collateral {} != onramped {}",
                report.funds, report.collateral, report.onramped
            )));
        }

        Self::verify_reservations(ledger)?;
        Ok(report)
    }

    /// Locked funds and locked stock must match what rests in the books.
    fn verify_reservations(ledger: &Ledger) -> Result<()> {
        let mut reserved_funds: BTreeMap<&UserId, u128> = BTreeMap::new();
        let mut pledged: BTreeMap<(&UserId, &Symbol, Side), u64> = BTreeMap::new();

        for (symbol, book) in &ledger.books {
            if !book.is_consistent() {
                return Err(violation(format!("book {symbol} level totals disagree")));
            }
            for (side, price, entry) in book.entries() {
                match entry {
                    BookEntry::Reversed {
                        user_id, quantity, ..
                    } => {
                        let unit = price.complement().unit_cost();
                        *reserved_funds.entry(user_id).or_default() +=
                            u128::from(*quantity) * u128::from(unit);
                    }
                    BookEntry::Sell {
                        user_id, quantity, ..
                    } => {
                        *pledged.entry((user_id, symbol, side)).or_default() += quantity;
                    }
                }
            }
        }

        for (user_id, balance) in ledger.funds.balances() {
            let reserved = reserved_funds.get(user_id).copied().unwrap_or(0);
            if u128::from(balance.locked) != reserved {
                return Err(violation(format!(
                    "user {user_id}: locked {} != resting reservations {reserved}",
                    balance.locked
                )));
            }
        }
        if let Some(user_id) = reserved_funds
            .keys()
            .find(|u| !ledger.funds.contains(u))
        {
            return Err(violation(format!(
                "resting reservation for unregistered user {user_id}"
            )));
        }

        for (user_id, markets) in ledger.positions.all() {
            for (symbol, position) in markets {
                for side in Side::BOTH {
                    let expected = pledged.remove(&(user_id, symbol, side)).unwrap_or(0);
                    if position.side(side).locked != expected {
                        return Err(violation(format!(
                            "user {user_id} {symbol} {side}: locked stock {} != resting sells {expected}",
                            position.side(side).locked
                        )));
                    }
                }
            }
        }
        if let Some(((user_id, symbol, side), qty)) = pledged.into_iter().next() {
            return Err(violation(format!(
                "user {user_id} rests {qty} {side} in {symbol} without a position"
            )));
        }
        Ok(())
    }
}

fn violation(reason: String) -> BinexError {
    tracing::error!(%reason, "supply invariant violated");
    BinexError::SupplyInvariantViolation { reason }
}

#[cfg(test)]
mod tests {
    use binex_types::{Market, OrderId, Price};
    use chrono::{Duration, Utc};

    use super::*;
    use crate::orderbook::OrderBook;

    fn ledger_with_market() -> (Ledger, Symbol) {
        let now = Utc::now();
        let symbol = Symbol::from("M");
        let mut ledger = Ledger::new();
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
        ledger.books.insert(symbol.clone(), OrderBook::new());
        for user in ["a", "b"] {
            let id = UserId::from(user);
            ledger.funds.create_user(&id).unwrap();
            ledger.funds.onramp(&id, 1000).unwrap();
        }
        (ledger, symbol)
    }

    #[test]
    fn fresh_ledger_passes() {
        let (ledger, _) = ledger_with_market();
        let report = SupplyAudit::verify(&ledger).unwrap();
        assert_eq!(report.funds, 2000);
        assert_eq!(report.collateral, 0);
    }

    #[test]
    fn minted_pair_is_collateralized() {
        let (mut ledger, m) = ledger_with_market();
        let (a, b) = (UserId::from("a"), UserId::from("b"));
        ledger.funds.lock(&a, 400).unwrap();
        ledger.funds.consume_locked(&a, 400).unwrap();
        ledger.funds.lock(&b, 600).unwrap();
        ledger.funds.consume_locked(&b, 600).unwrap();
        ledger.positions.credit(&a, &m, Side::Yes, 1).unwrap();
        ledger.positions.credit(&b, &m, Side::No, 1).unwrap();
        let report = SupplyAudit::verify(&ledger).unwrap();
        assert_eq!(report.collateral, 1000);
    }

    #[test]
    fn unbacked_contract_is_detected() {
        let (mut ledger, m) = ledger_with_market();
        ledger
            .positions
            .credit(&UserId::from("a"), &m, Side::Yes, 1)
            .unwrap();
        assert!(matches!(
            SupplyAudit::verify(&ledger),
            Err(BinexError::SupplyInvariantViolation { .. })
        ));
    }

    #[test]
    fn locked_funds_must_match_resting_reservation() {
        let (mut ledger, m) = ledger_with_market();
        let a = UserId::from("a");
        ledger.funds.lock(&a, 400).unwrap();
        assert!(SupplyAudit::verify(&ledger).is_err());

        ledger.book_mut(&m).unwrap().push(
            Side::No,
            Price::from_ticks(60).unwrap(),
            BookEntry::Reversed {
                order_id: OrderId::new(),
                user_id: a,
                quantity: 1,
            },
        );
        assert!(SupplyAudit::verify(&ledger).is_ok());
    }
}
