//! Inbound command envelopes.
//!
//! Wire shape:
//!
//! ```json
//! { "command": "BUY_STOCK",
//!   "payload": { "userId": "u1", "stockSymbol": "M", "quantity": 5, "price": 400, "stockType": "yes" },
//!   "correlationId": "c-42" }
//! ```
//!
//! Prices on the wire are paise; they are validated into [`crate::Price`] by
//! the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BinexError, Side, Symbol, UserId};

/// A command with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "command",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    CreateMarket {
        stock_symbol: Symbol,
        title: String,
        #[serde(default)]
        description: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        #[serde(default)]
        source_of_truth: Option<String>,
    },
    SettleMarket {
        stock_symbol: Symbol,
        result: Side,
    },
    BuyStock {
        user_id: UserId,
        stock_symbol: Symbol,
        stock_type: Side,
        quantity: u64,
        price: i64,
    },
    SellStock {
        user_id: UserId,
        stock_symbol: Symbol,
        stock_type: Side,
        quantity: u64,
        price: i64,
    },
    Exit {
        user_id: UserId,
        stock_symbol: Symbol,
        stock_type: Side,
        quantity: u64,
        /// Reference price in paise; the live quote when absent.
        #[serde(default)]
        price: Option<i64>,
    },
    Cancel {
        user_id: UserId,
        order_id: String,
    },
    GetPrice {
        stock_symbol: Symbol,
    },
    GetOrders {
        user_id: UserId,
    },
    GetOrderBook {
        #[serde(default)]
        stock_symbol: Option<Symbol>,
    },
    GetInrBalance {
        user_id: UserId,
    },
    GetStockBalance {
        user_id: UserId,
    },
    Onramp {
        user_id: UserId,
        amount: u64,
    },
    CreateUser {
        user_id: UserId,
    },
}

impl Command {
    /// Wire name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMarket { .. } => "CREATE_MARKET",
            Self::SettleMarket { .. } => "SETTLE_MARKET",
            Self::BuyStock { .. } => "BUY_STOCK",
            Self::SellStock { .. } => "SELL_STOCK",
            Self::Exit { .. } => "EXIT",
            Self::Cancel { .. } => "CANCEL",
            Self::GetPrice { .. } => "GET_PRICE",
            Self::GetOrders { .. } => "GET_ORDERS",
            Self::GetOrderBook { .. } => "GET_ORDER_BOOK",
            Self::GetInrBalance { .. } => "GET_INR_BALANCE",
            Self::GetStockBalance { .. } => "GET_STOCK_BALANCE",
            Self::Onramp { .. } => "ONRAMP",
            Self::CreateUser { .. } => "CREATE_USER",
        }
    }

    /// Whether the command changes ledger state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::GetPrice { .. }
                | Self::GetOrders { .. }
                | Self::GetOrderBook { .. }
                | Self::GetInrBalance { .. }
                | Self::GetStockBalance { .. }
        )
    }

    /// Market touched by the command, if any.
    #[must_use]
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Self::CreateMarket { stock_symbol, .. }
            | Self::SettleMarket { stock_symbol, .. }
            | Self::BuyStock { stock_symbol, .. }
            | Self::SellStock { stock_symbol, .. }
            | Self::Exit { stock_symbol, .. }
            | Self::GetPrice { stock_symbol } => Some(stock_symbol),
            Self::GetOrderBook { stock_symbol } => stock_symbol.as_ref(),
            _ => None,
        }
    }
}

/// A command tagged with the caller's correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundCommand {
    #[serde(flatten)]
    pub command: Command,
    pub correlation_id: String,
}

/// Loosely-typed first pass over an envelope, so the correlation id survives
/// a malformed payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    command: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    correlation_id: Option<String>,
}

/// An envelope that could not be decoded.
#[derive(Debug)]
pub struct DecodeFailure {
    /// Present when the envelope itself parsed but the payload did not.
    pub correlation_id: Option<String>,
    pub error: BinexError,
}

impl InboundCommand {
    #[must_use]
    pub fn new(command: Command, correlation_id: impl Into<String>) -> Self {
        Self {
            command,
            correlation_id: correlation_id.into(),
        }
    }

    /// Decode a JSON envelope.
    pub fn from_json(raw: &str) -> std::result::Result<Self, DecodeFailure> {
        let envelope: RawEnvelope =
            serde_json::from_str(raw).map_err(|e| DecodeFailure {
                correlation_id: None,
                error: BinexError::InvalidCommand {
                    reason: e.to_string(),
                },
            })?;
        let Some(correlation_id) = envelope.correlation_id else {
            return Err(DecodeFailure {
                correlation_id: None,
                error: BinexError::InvalidCommand {
                    reason: "missing correlationId".to_string(),
                },
            });
        };
        let payload = if envelope.payload.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            envelope.payload
        };
        let tagged = serde_json::json!({ "command": envelope.command, "payload": payload });
        match serde_json::from_value::<Command>(tagged) {
            Ok(command) => Ok(Self {
                command,
                correlation_id,
            }),
            Err(e) => Err(DecodeFailure {
                correlation_id: Some(correlation_id),
                error: BinexError::InvalidCommand {
                    reason: format!("{}: {e}", envelope.command),
                },
            }),
        }
    }

    /// Encode as a JSON envelope.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
