//! # binex-ledger
//!
//! **Authoritative in-memory state of the Binex exchange.**
//!
//! The ledger holds user funds, contract positions, one order book per open
//! market, the market registry with trader sets, and the append-only order
//! history. It has:
//!
//! - **A single owner**: the matching engine; no internal locking
//! - **Validate-then-commit primitives**: a rejected call never mutates
//! - **Deterministic layout**: ordered maps throughout, so snapshots are stable
//! - **An auditor**: [`SupplyAudit`] checks money and contract conservation

pub mod audit;
pub mod funds;
pub mod markets;
pub mod orderbook;
pub mod orders;
pub mod positions;
pub mod price_level;
pub mod state;

pub use audit::{AuditReport, SupplyAudit};
pub use funds::FundsLedger;
pub use markets::MarketRegistry;
pub use orderbook::{BookSide, OrderBook};
pub use orders::OrderLedger;
pub use positions::PositionLedger;
pub use price_level::{BookEntry, PriceLevel, Take};
pub use state::{Ledger, LedgerState};
