//! # binex-dispatch
//!
//! **Single-writer command loop in front of the matching engine.**
//!
//! One tokio task owns the [`binex_engine::MatchingEngine`] and drains a
//! bounded queue of [`Envelope`]s, one at a time, each to completion.
//! Results go back to the caller through a [`CorrelationTable`]; order-book
//! deltas and settlement notices go out on a broadcast channel.
//!
//! ```text
//! DispatchClient ──register──► CorrelationTable ◄──resolve── ChannelPublisher
//!       │                                                        ▲
//!       └──enqueue──► mpsc<Envelope> ──► Dispatcher ──publish────┘
//!                                           │
//!                                           └──► broadcast<Event>
//! ```
//!
//! Snapshot capture rides the same queue, so a captured state never holds a
//! half-applied command.

pub mod client;
pub mod correlation;
pub mod dispatcher;
pub mod envelope;
pub mod publisher;

pub use client::{DispatchClient, spawn};
pub use correlation::CorrelationTable;
pub use dispatcher::Dispatcher;
pub use envelope::Envelope;
pub use publisher::{ChannelPublisher, Publisher};
