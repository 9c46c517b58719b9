//! Fill reports produced by the matching engine.
//!
//! A [`Fill`] is one match between the incoming order and a resting book
//! entry. An [`ExecutionReport`] summarizes everything that happened to an
//! order in a single engine call.

use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderKind, OrderStatus, Paise, Price, Side, Symbol, UserId};

/// Kind of resting liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityKind {
    /// Contracts pledged for sale.
    Sell,
    /// Minted liquidity mirrored from an opposite-side buy.
    Reversed,
}

/// A single fill between the taker and a resting entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub maker_order_id: OrderId,
    pub maker_user_id: UserId,
    pub kind: LiquidityKind,
    /// Execution price on the taker's side.
    pub price: Price,
    pub quantity: u64,
    /// Paise that changed hands (or were committed as collateral).
    pub amount: Paise,
}

/// Outcome of a buy, sell or exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    #[serde(rename = "orderType")]
    pub kind: OrderKind,
    pub quantity: u64,
    pub filled_quantity: u64,
    /// Quantity left resting (a sell entry, or minted liquidity for a buy).
    pub resting_quantity: u64,
    pub status: OrderStatus,
    pub fills: Vec<Fill>,
}

impl ExecutionReport {
    /// Total paise exchanged across all fills.
    #[must_use]
    pub fn filled_amount(&self) -> Paise {
        self.fills.iter().map(|f| f.amount).sum()
    }

    #[must_use]
    pub fn is_fully_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }
}
