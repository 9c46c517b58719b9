//! Order ledger records.
//!
//! Every placed order leaves an [`OrderRecord`] in the append-only ledger.
//! Records are mutated only by fills and by cancellation of the resting
//! remainder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BinexError, OrderId, Paise, Price, Result, Side, Symbol, UserId};

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Buy,
    Sell,
}

/// Fill status of an order record.
///
/// ```text
/// Pending ──(fill)──► Partial ──(fill)──► Completed
///    └──────────(fill all / cancel rest)──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Partial,
    Completed,
}

/// One entry of the order ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub user_id: UserId,
    pub quantity: u64,
    pub price: Price,
    #[serde(rename = "orderType")]
    pub kind: OrderKind,
    /// Notional at the limit price, in paise.
    pub total_price: Paise,
    pub traded_quantity: u64,
    pub cancelled_quantity: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Create a pending record with a fresh UUIDv7 id.
    #[must_use]
    pub fn new(
        symbol: Symbol,
        user_id: UserId,
        side: Side,
        kind: OrderKind,
        price: Price,
        quantity: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            symbol,
            side,
            user_id,
            quantity,
            price,
            kind,
            total_price: price.notional(quantity).unwrap_or(Paise::MAX),
            traded_quantity: 0,
            cancelled_quantity: 0,
            status: OrderStatus::Pending,
            created_at,
        }
    }

    /// Quantity neither traded nor cancelled.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.quantity
            .saturating_sub(self.traded_quantity)
            .saturating_sub(self.cancelled_quantity)
    }

    /// Record a fill of `quantity`.
    pub fn apply_fill(&mut self, quantity: u64) -> Result<()> {
        if quantity > self.remaining() {
            return Err(BinexError::MatchingFailed {
                reason: format!(
                    "fill of {quantity} exceeds remaining {} on order {}",
                    self.remaining(),
                    self.id
                ),
            });
        }
        self.traded_quantity += quantity;
        self.refresh_status();
        Ok(())
    }

    /// Record cancellation of `quantity` of the resting remainder.
    pub fn apply_cancel(&mut self, quantity: u64) -> Result<()> {
        if quantity > self.remaining() {
            return Err(BinexError::Internal(format!(
                "cancel of {quantity} exceeds remaining {} on order {}",
                self.remaining(),
                self.id
            )));
        }
        self.cancelled_quantity += quantity;
        self.refresh_status();
        Ok(())
    }

    /// Implied yes-price of this record, in ticks.
    #[must_use]
    pub fn implied_yes_ticks(&self) -> u8 {
        match self.side {
            Side::Yes => self.price.ticks(),
            Side::No => self.price.complement().ticks(),
        }
    }

    fn refresh_status(&mut self) {
        self.status = if self.remaining() == 0 {
            OrderStatus::Completed
        } else if self.traded_quantity > 0 {
            OrderStatus::Partial
        } else {
            OrderStatus::Pending
        };
    }
}
