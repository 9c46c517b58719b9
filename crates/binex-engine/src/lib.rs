//! # binex-engine
//!
//! **Continuous matching engine for binary event markets.**
//!
//! Every market trades two complementary contracts, `yes` and `no`, each
//! priced between ₹0.1 and ₹9.9 and paying ₹10 to the winning side. The
//! engine owns the [`binex_ledger::Ledger`] and is the only writer to it.
//!
//! - [`MatchingEngine::place_buy`]: sweep cheaper whole-rupee levels, then
//!   the limit; mint the remainder as opposite-side liquidity
//! - [`MatchingEngine::place_sell`]: sell pledged contracts to minted bids
//! - [`MatchingEngine::exit`]: sell at a reference or the live quote
//! - [`MatchingEngine::cancel`]: withdraw a resting remainder (opt-in)
//! - [`MatchingEngine::settle`]: pay the winning side, refund and close
//! - [`MatchingEngine::quote`]: price from recent order flow
//!
//! ## Order Flow
//!
//! ```text
//! buy yes@p ──► Sell(yes, L ≤ p) ──► Reversed(yes, L ≤ p) ──► mint Reversed(no, 10−p)
//! sell yes@p ─► Reversed(no, L ≤ 10−p) ──► rest Sell(yes, p)
//! ```

pub mod engine;
pub mod matching;
pub mod pricing;
pub mod settlement;

pub use engine::{MatchingEngine, NewMarket};
pub use matching::OrderRequest;
pub use settlement::SettlementReport;
