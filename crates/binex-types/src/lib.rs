//! # binex-types
//!
//! Shared types, errors, and configuration for the **Binex** prediction-market
//! exchange.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`UserId`], [`Symbol`]
//! - **Prices**: [`Price`] (fixed-point tenths of a rupee), [`Paise`]
//! - **Market model**: [`Market`], [`MarketState`], [`Side`]
//! - **Order model**: [`OrderRecord`], [`OrderKind`], [`OrderStatus`], [`Fill`]
//! - **Balance model**: [`InrBalance`], [`StockBalance`], [`Position`]
//! - **Wire model**: [`InboundCommand`], [`Command`], [`CommandResponse`], [`Event`]
//! - **Configuration**: [`NodeConfig`], [`EngineConfig`], [`DispatchConfig`], [`SnapshotConfig`]
//! - **Errors**: [`BinexError`] with `BX_ERR_` prefix codes
//! - **Constants**: payout, price bounds and defaults

pub mod balance;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod market;
pub mod order;
pub mod price;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use binex_types::{Price, Side, OrderRecord, BinexError, ...};

pub use balance::*;
pub use command::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use market::*;
pub use order::*;
pub use price::*;
pub use trade::*;

// Constants are accessed via `binex_types::constants::FOO`
// (not re-exported to avoid name collisions).
