//! Error types for the Binex exchange core.
//!
//! All errors use the `BX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance / position errors
//! - 3xx: Market errors
//! - 4xx: User errors
//! - 5xx: Matching errors
//! - 6xx: Settlement errors
//! - 7xx: Dispatch errors
//! - 8xx: Persistence errors
//! - 9xx: General / internal errors
//!
//! Every variant maps onto a coarse [`ErrorKind`], which in turn determines
//! the `statusCode` returned to the gateway.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{OrderId, Paise, Symbol, UserId};

/// Coarse error taxonomy exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    InsufficientResource,
    Forbidden,
    Disabled,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code carried in command responses.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Validation | Self::InsufficientResource => 400,
            Self::Forbidden | Self::Disabled => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// Central error enum for all Binex operations.
#[derive(Debug, Error)]
pub enum BinexError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The order id is unknown.
    #[error("BX_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Price outside `0.1..=9.9` or not a whole tick.
    #[error("BX_ERR_101: Invalid price: {reason}")]
    InvalidPrice { reason: String },

    /// Quantity is zero or otherwise unusable.
    #[error("BX_ERR_102: Invalid quantity: {reason}")]
    InvalidQuantity { reason: String },

    /// The order has no live entry left in the book.
    #[error("BX_ERR_103: Order {0} has nothing resting to cancel")]
    OrderNotCancellable(OrderId),

    /// The order belongs to another user.
    #[error("BX_ERR_104: Order {order_id} does not belong to {user_id}")]
    OrderNotOwned { order_id: OrderId, user_id: UserId },

    // =================================================================
    // Balance / Position Errors (2xx)
    // =================================================================
    /// Not enough disposable funds for the reservation.
    #[error("BX_ERR_200: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Paise, available: Paise },

    /// Not enough unpledged contracts to sell.
    #[error("BX_ERR_201: Insufficient stock: need {needed}, have {available}")]
    InsufficientStock { needed: u64, available: u64 },

    /// The user holds nothing in this market.
    #[error("BX_ERR_202: No position in {symbol} for {user_id}")]
    NoPosition { user_id: UserId, symbol: Symbol },

    /// An onramp amount was zero.
    #[error("BX_ERR_203: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A ledger mutation would drive a counter below zero.
    #[error("BX_ERR_204: Balance underflow: {reason}")]
    BalanceUnderflow { reason: String },

    /// A ledger counter would exceed its representable range.
    #[error("BX_ERR_205: Balance overflow: {reason}")]
    BalanceOverflow { reason: String },

    // =================================================================
    // Market Errors (3xx)
    // =================================================================
    /// No open book exists for the symbol.
    #[error("BX_ERR_300: Market not found: {0}")]
    MarketNotFound(Symbol),

    /// The symbol is already registered.
    #[error("BX_ERR_301: Market already exists: {0}")]
    MarketAlreadyExists(Symbol),

    /// Market definition failed validation.
    #[error("BX_ERR_302: Invalid market: {reason}")]
    InvalidMarket { reason: String },

    /// Trading attempted after the market's end time.
    #[error("BX_ERR_303: Market closed: {0}")]
    MarketClosed(Symbol),

    // =================================================================
    // User Errors (4xx)
    // =================================================================
    #[error("BX_ERR_400: User not found: {0}")]
    UserNotFound(UserId),

    #[error("BX_ERR_401: User already exists: {0}")]
    UserAlreadyExists(UserId),

    // =================================================================
    // Matching Errors (5xx)
    // =================================================================
    /// The matching algorithm hit an inconsistent book.
    #[error("BX_ERR_500: Matching failed: {reason}")]
    MatchingFailed { reason: String },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    #[error("BX_ERR_600: Market already settled: {0}")]
    AlreadySettled(Symbol),

    /// Settlement requested before the market's end time.
    #[error("BX_ERR_601: Market not yet closed: {0}")]
    NotYetClosed(Symbol),

    /// Conservation invariant violated. Critical.
    #[error("BX_ERR_602: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Dispatch Errors (7xx)
    // =================================================================
    /// The command is switched off by configuration.
    #[error("BX_ERR_700: Command disabled: {0}")]
    CommandDisabled(String),

    /// The inbound envelope could not be decoded.
    #[error("BX_ERR_701: Invalid command: {reason}")]
    InvalidCommand { reason: String },

    /// The dispatcher is no longer accepting commands.
    #[error("BX_ERR_702: Command queue closed")]
    QueueClosed,

    /// No result arrived for a correlation id in time.
    #[error("BX_ERR_703: Timed out waiting for result of {correlation_id}")]
    ResponseTimeout { correlation_id: String },

    // =================================================================
    // Persistence Errors (8xx)
    // =================================================================
    #[error("BX_ERR_800: Snapshot error: {0}")]
    Snapshot(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("BX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("BX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("BX_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (disk, network).
    #[error("BX_ERR_903: I/O error: {0}")]
    Io(String),
}

impl BinexError {
    /// Coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPrice { .. }
            | Self::InvalidQuantity { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidMarket { .. }
            | Self::MarketClosed(_)
            | Self::InvalidCommand { .. } => ErrorKind::Validation,

            Self::MarketAlreadyExists(_)
            | Self::UserAlreadyExists(_)
            | Self::AlreadySettled(_)
            | Self::NotYetClosed(_) => ErrorKind::Conflict,

            Self::OrderNotFound(_)
            | Self::OrderNotCancellable(_)
            | Self::MarketNotFound(_)
            | Self::UserNotFound(_)
            | Self::NoPosition { .. } => ErrorKind::NotFound,

            Self::InsufficientFunds { .. } | Self::InsufficientStock { .. } => {
                ErrorKind::InsufficientResource
            }

            Self::OrderNotOwned { .. } => ErrorKind::Forbidden,
            Self::CommandDisabled(_) => ErrorKind::Disabled,

            Self::BalanceUnderflow { .. }
            | Self::BalanceOverflow { .. }
            | Self::MatchingFailed { .. }
            | Self::SupplyInvariantViolation { .. }
            | Self::QueueClosed
            | Self::ResponseTimeout { .. }
            | Self::Snapshot(_)
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Status code for the command response.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BinexError>;

impl From<std::io::Error> for BinexError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BinexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
