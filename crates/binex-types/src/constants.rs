//! System-wide constants for the Binex exchange.

/// Paise per rupee. All balances are held in paise.
pub const PAISE_PER_RUPEE: u64 = 100;

/// Price ticks per rupee (prices are fixed-point tenths of a rupee).
pub const TICKS_PER_RUPEE: u8 = 10;

/// Paise per price tick.
pub const PAISE_PER_TICK: u64 = PAISE_PER_RUPEE / TICKS_PER_RUPEE as u64;

/// The payout constant, in ticks: one winning contract is worth 10 rupees.
/// A yes price `p` and a no price `PAYOUT_TICKS - p` are the two faces of
/// the same contract pair.
pub const PAYOUT_TICKS: u8 = 100;

/// Paise paid out for one winning contract at settlement.
pub const PAYOUT_PAISE: u64 = PAYOUT_TICKS as u64 * PAISE_PER_TICK;

/// Lowest valid price tick (0.1 rupee).
pub const MIN_PRICE_TICKS: u8 = 1;

/// Highest valid price tick (9.9 rupees).
pub const MAX_PRICE_TICKS: u8 = PAYOUT_TICKS - 1;

/// Number of most recent order records the price estimator looks at.
pub const DEFAULT_PRICE_WINDOW: usize = 10;

/// Default snapshot interval in milliseconds.
pub const DEFAULT_SNAPSHOT_INTERVAL_MS: u64 = 10_000;

/// Default number of snapshot bodies retained in object storage.
pub const DEFAULT_SNAPSHOT_RETAIN: usize = 3;

/// Default object-key prefix for snapshots.
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "snapshots/";

/// Snapshot format version written into every snapshot body.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Default capacity of the inbound command queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Default time a caller waits for a correlated result, in milliseconds.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5_000;

/// Default capacity of the broadcast event channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// Broadcast channel carrying order-book deltas.
pub const ORDERBOOK_CHANNEL: &str = "MESSAGE";

/// Broadcast channel carrying market settlement notices.
pub const SETTLEMENT_CHANNEL: &str = "MARKET_SETTLEMENT";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Binex";
