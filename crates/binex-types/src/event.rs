//! Outbound messages: correlated command responses and broadcast events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{ORDERBOOK_CHANNEL, SETTLEMENT_CHANNEL};
use crate::{BinexError, LiquidityKind, Paise, Side, Symbol, UserId};

// ---------------------------------------------------------------------------
// Command responses
// ---------------------------------------------------------------------------

/// Result delivered to the waiter registered under a correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub status_code: u16,
    pub message: String,
    pub data: serde_json::Value,
}

impl CommandResponse {
    #[must_use]
    pub fn ok(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
            data,
        }
    }

    #[must_use]
    pub fn created(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            status_code: 201,
            message: message.into(),
            data,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl From<&BinexError> for CommandResponse {
    fn from(err: &BinexError) -> Self {
        Self {
            status_code: err.status_code(),
            message: err.to_string(),
            data: serde_json::Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Book views
// ---------------------------------------------------------------------------

/// Aggregate at one price level, as broadcast in deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTotal {
    pub total: u64,
}

/// Level totals of both sides of one book, keyed by price in paise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDepth {
    pub yes: BTreeMap<Paise, LevelTotal>,
    pub no: BTreeMap<Paise, LevelTotal>,
}

/// One user's share of a price level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelShare {
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: LiquidityKind,
    pub quantity: u64,
}

/// A price level with its per-user aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelView {
    pub total: u64,
    pub orders: Vec<LevelShare>,
}

/// Full view of one book, keyed by price in paise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub yes: BTreeMap<Paise, LevelView>,
    pub no: BTreeMap<Paise, LevelView>,
}

impl BookView {
    /// Drop per-user detail, keeping only level totals.
    #[must_use]
    pub fn depth(&self) -> BookDepth {
        let totals = |side: &BTreeMap<Paise, LevelView>| {
            side.iter()
                .map(|(price, level)| (*price, LevelTotal { total: level.total }))
                .collect()
        };
        BookDepth {
            yes: totals(&self.yes),
            no: totals(&self.no),
        }
    }
}

// ---------------------------------------------------------------------------
// Broadcast events
// ---------------------------------------------------------------------------

/// Fire-and-forget order-book delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBookDelta {
    pub symbol: Symbol,
    pub order_book: BookDepth,
}

/// Notice that a market has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub symbol: Symbol,
    pub result: Side,
}

/// Events published on broadcast channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Event {
    OrderBook(OrderBookDelta),
    Settlement(SettlementEvent),
}

impl Event {
    /// Name of the broadcast channel the event belongs to.
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            Self::OrderBook(_) => ORDERBOOK_CHANNEL,
            Self::Settlement(_) => SETTLEMENT_CHANNEL,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        match self {
            Self::OrderBook(delta) => &delta.symbol,
            Self::Settlement(event) => &event.symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_carries_status() {
        let err = BinexError::UserNotFound("ghost".into());
        let resp = CommandResponse::from(&err);
        assert_eq!(resp.status_code, 404);
        assert!(resp.message.contains("ghost"));
        assert!(!resp.is_success());
        assert!(CommandResponse::created("User created", serde_json::Value::Null).is_success());
    }

    #[test]
    fn response_wire_names() {
        let json = serde_json::to_value(CommandResponse::ok("Success", serde_json::json!(1))).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["message"], "Success");
    }

    #[test]
    fn delta_shape() {
        let mut view = BookView::default();
        view.yes.insert(
            400,
            LevelView {
                total: 3,
                orders: vec![LevelShare {
                    user_id: "u".into(),
                    kind: LiquidityKind::Sell,
                    quantity: 3,
                }],
            },
        );
        let event = Event::OrderBook(OrderBookDelta {
            symbol: "M".into(),
            order_book: view.depth(),
        });
        assert_eq!(event.channel(), "MESSAGE");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["symbol"], "M");
        assert_eq!(json["orderBook"]["yes"]["400"]["total"], 3);
        assert!(json["orderBook"]["no"].as_object().unwrap().is_empty());
    }

    #[test]
    fn settlement_channel() {
        let event = Event::Settlement(SettlementEvent {
            symbol: "M".into(),
            result: Side::Yes,
        });
        assert_eq!(event.channel(), "MARKET_SETTLEMENT");
        assert_eq!(event.symbol().as_str(), "M");
    }
}
