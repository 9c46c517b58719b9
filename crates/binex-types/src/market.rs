//! Market model: outcome sides, market records and lifecycle state.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Paise, Symbol};

/// Outcome side of a binary contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// The other outcome.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    pub const BOTH: [Side; 2] = [Side::Yes, Side::No];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

/// Lifecycle of a market, derived from its result and end time.
///
/// ```text
/// Open ──(now >= end)──► Closed ──(settle)──► Settled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketState {
    Open,
    Closed,
    Settled,
}

/// An event market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub symbol: Symbol,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub source_of_truth: Option<String>,
    /// Set exactly once, by settlement.
    pub result: Option<Side>,
    pub is_open: bool,
    pub traders_count: u64,
}

impl Market {
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> MarketState {
        if self.result.is_some() {
            MarketState::Settled
        } else if now >= self.end_time {
            MarketState::Closed
        } else {
            MarketState::Open
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Market {
    /// An open market whose trading window spans the current hour.
    pub fn dummy_open(symbol: &str) -> Self {
        let now = Utc::now();
        Self {
            symbol: Symbol::from(symbol),
            title: format!("Will {symbol} happen?"),
            description: String::new(),
            start_time: now - chrono::Duration::hours(1),
            end_time: now + chrono::Duration::hours(1),
            source_of_truth: None,
            result: None,
            is_open: true,
            traders_count: 0,
        }
    }
}

/// Live price quote for a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// Estimated probability of `yes`, in `[0, 1]`.
    pub probability: Decimal,
    /// Yes price in paise, rounded to a tick.
    pub yes_price: Paise,
    /// No price in paise, rounded to a tick.
    pub no_price: Paise,
}
