//! Fixed-point contract prices.
//!
//! A [`Price`] is an integer number of ticks, one tick being a tenth of a
//! rupee. Valid prices are `1..=99` ticks (0.1 .. 9.9 rupees). Using an integer
//! key keeps price levels collision-free and gives the book a total order.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_PRICE_TICKS, MIN_PRICE_TICKS, PAISE_PER_TICK, PAYOUT_TICKS, TICKS_PER_RUPEE,
};
use crate::{BinexError, Result};

/// Amount of money in paise (minor units).
pub type Paise = u64;

/// Contract price in tenths of a rupee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Price(u8);

impl Price {
    /// Create a price from ticks.
    ///
    /// # Errors
    /// Returns `InvalidPrice` if `ticks` is outside `1..=99`.
    pub fn from_ticks(ticks: u8) -> Result<Self> {
        if (MIN_PRICE_TICKS..=MAX_PRICE_TICKS).contains(&ticks) {
            Ok(Self(ticks))
        } else {
            Err(BinexError::InvalidPrice {
                reason: format!("{ticks} ticks is outside 1..=99"),
            })
        }
    }

    /// Create a price from a whole number of rupees (1..=9).
    ///
    /// # Errors
    /// Returns `InvalidPrice` if `rupees` is outside `1..=9`.
    pub fn from_rupees(rupees: u8) -> Result<Self> {
        rupees
            .checked_mul(TICKS_PER_RUPEE)
            .ok_or_else(|| BinexError::InvalidPrice {
                reason: format!("{rupees} rupees overflows"),
            })
            .and_then(Self::from_ticks)
    }

    /// Parse the wire representation: a price in paise (e.g. `450` = 4.5).
    ///
    /// # Errors
    /// Returns `InvalidPrice` for non-positive prices, prices that are not a
    /// whole number of ticks, or prices outside the valid range.
    pub fn from_paise(paise: i64) -> Result<Self> {
        if paise <= 0 {
            return Err(BinexError::InvalidPrice {
                reason: format!("price must be positive, got {paise}"),
            });
        }
        let tick = i64::try_from(PAISE_PER_TICK).unwrap_or(i64::MAX);
        if paise % tick != 0 {
            return Err(BinexError::InvalidPrice {
                reason: format!("price {paise} is not a multiple of {tick} paise"),
            });
        }
        let ticks = u8::try_from(paise / tick).map_err(|_| BinexError::InvalidPrice {
            reason: format!("price {paise} is out of range"),
        })?;
        Self::from_ticks(ticks)
    }

    /// Raw tick count.
    #[must_use]
    pub fn ticks(self) -> u8 {
        self.0
    }

    /// Cost of one contract at this price, in paise.
    #[must_use]
    pub fn unit_cost(self) -> Paise {
        u64::from(self.0) * PAISE_PER_TICK
    }

    /// Notional of `quantity` contracts at this price, in paise.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn notional(self, quantity: u64) -> Option<Paise> {
        quantity.checked_mul(self.unit_cost())
    }

    /// The mirrored price on the other side of the book: `10 - p`.
    #[must_use]
    pub fn complement(self) -> Self {
        Self(PAYOUT_TICKS - self.0)
    }

    /// Whether this price is a whole number of rupees.
    #[must_use]
    pub fn is_whole_rupee(self) -> bool {
        self.0 % TICKS_PER_RUPEE == 0
    }

    /// Whole-rupee price levels strictly below `self`, lowest first.
    pub fn whole_rupee_levels_below(self) -> impl Iterator<Item = Price> {
        (1..TICKS_PER_RUPEE)
            .map(|r| r * TICKS_PER_RUPEE)
            .take_while(move |ticks| *ticks < self.0)
            .map(Price)
    }

    /// Price in rupees as a decimal (e.g. `4.5`).
    #[must_use]
    pub fn rupees(self) -> Decimal {
        Decimal::new(i64::from(self.0), 1)
    }

    /// Nearest valid price for a probability in `[0, 1]`, clamped to the
    /// valid tick range.
    #[must_use]
    pub fn from_probability(probability: Decimal) -> Self {
        let ticks = (probability * Decimal::from(PAYOUT_TICKS))
            .round()
            .clamp(Decimal::from(MIN_PRICE_TICKS), Decimal::from(MAX_PRICE_TICKS));
        let ticks = ticks.mantissa() / 10_i128.pow(ticks.scale());
        Self(u8::try_from(ticks).unwrap_or(MAX_PRICE_TICKS))
    }
}

impl TryFrom<u8> for Price {
    type Error = BinexError;

    fn try_from(ticks: u8) -> Result<Self> {
        Self::from_ticks(ticks)
    }
}

impl From<Price> for u8 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / TICKS_PER_RUPEE, self.0 % TICKS_PER_RUPEE)
    }
}
