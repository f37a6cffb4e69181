//! Core data types for book levels and slippage records.
//!
//! These types are designed to be:
//! - Value-like and immutable once built (handed forward, never referenced back)
//! - Serializable with serde for the ingestion/reporting collaborators
//! - Cheap to copy between the walk, reduce and merge stages

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlippageError};

/// Book side a level is quoted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    /// Bid (buy interest); walked by sell orders
    Bid = b'B',
    /// Ask (sell interest); walked by buy orders
    Ask = b'A',
}

impl Side {
    /// Parse side from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' | b'b' => Some(Side::Bid),
            b'A' | b'a' => Some(Side::Ask),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if this is an ask.
    #[inline(always)]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }

    /// Direction of the order that consumes this side of the book.
    #[inline]
    pub fn taker_direction(self) -> OrderDirection {
        match self {
            Side::Bid => OrderDirection::Sell,
            Side::Ask => OrderDirection::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("bid"),
            Side::Ask => f.write_str("ask"),
        }
    }
}

impl FromStr for Side {
    type Err = SlippageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bid" | "bids" | "b" => Ok(Side::Bid),
            "ask" | "asks" | "a" => Ok(Side::Ask),
            other => Err(SlippageError::generic(format!("Unknown side: {other}"))),
        }
    }
}

/// Direction of the hypothetical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Buy order, walks the ask ladder
    Buy,
    /// Sell order, walks the bid ladder
    Sell,
}

impl OrderDirection {
    /// Book side this order consumes.
    #[inline]
    pub fn book_side(self) -> Side {
        match self {
            OrderDirection::Buy => Side::Ask,
            OrderDirection::Sell => Side::Bid,
        }
    }

    /// Multiplier applied to raw deviations (+1 buy, -1 sell).
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            OrderDirection::Buy => 1.0,
            OrderDirection::Sell => -1.0,
        }
    }
}

/// One quoted price level at one instant on one side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    /// Exchange-reported instant (milliseconds since epoch)
    pub timestamp: i64,

    /// Bid or ask
    pub side: Side,

    /// Quote-currency price of the level
    pub price: f64,

    /// Base-asset units available at this price
    pub quantity: f64,
}

impl BookLevel {
    /// Create a new book level.
    pub fn new(timestamp: i64, side: Side, price: f64, quantity: f64) -> Self {
        Self {
            timestamp,
            side,
            price,
            quantity,
        }
    }

    /// Shorthand for a bid level.
    pub fn bid(timestamp: i64, price: f64, quantity: f64) -> Self {
        Self::new(timestamp, Side::Bid, price, quantity)
    }

    /// Shorthand for an ask level.
    pub fn ask(timestamp: i64, price: f64, quantity: f64) -> Self {
        Self::new(timestamp, Side::Ask, price, quantity)
    }

    /// Partition key of this level.
    #[inline]
    pub fn key(&self) -> LadderKey {
        LadderKey::new(self.timestamp, self.side)
    }

    /// Notional value of the level (`price * quantity`).
    #[inline]
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// Validate the level fields.
    ///
    /// Price and quantity must both be finite and strictly positive.
    pub fn validate(&self) -> Result<()> {
        let reason = if !self.price.is_finite() {
            Some(format!("non-finite price {}", self.price))
        } else if self.price <= 0.0 {
            Some(format!("non-positive price {}", self.price))
        } else if !self.quantity.is_finite() {
            Some(format!("non-finite quantity {}", self.quantity))
        } else if self.quantity <= 0.0 {
            Some(format!("non-positive quantity {}", self.quantity))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(SlippageError::MalformedLevel {
                timestamp: self.timestamp,
                side: self.side,
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Partition key: one ladder per `(timestamp, side)`.
///
/// Orders by timestamp first, so sorted collections of keys read in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LadderKey {
    pub timestamp: i64,
    pub side: Side,
}

impl LadderKey {
    pub fn new(timestamp: i64, side: Side) -> Self {
        Self { timestamp, side }
    }
}

impl fmt::Display for LadderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.timestamp, self.side)
    }
}

/// Signed slippage figures for one fill.
///
/// Positive values are adverse to the trader.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlippageMetrics {
    /// Base-asset shortfall vs. the top-of-book quantity
    pub currency_slippage: f64,

    /// Quote-currency deviation vs. top-of-book execution
    pub dollar_slippage: f64,

    /// Relative deviation (`desired / filled - 1`, signed)
    pub percent_slippage: f64,
}

impl SlippageMetrics {
    /// All-zero metrics (the exact-fill boundary, distinct from "no fill").
    pub const ZERO: SlippageMetrics = SlippageMetrics {
        currency_slippage: 0.0,
        dollar_slippage: 0.0,
        percent_slippage: 0.0,
    };

    /// Derive signed metrics for a completed fill.
    ///
    /// # Arguments
    /// * `direction` - Buy (ask ladder) or Sell (bid ladder)
    /// * `desired_amount` - `order_amount / best_price`
    /// * `filled_quantity` - quantity actually needed to spend `order_amount`
    /// * `order_amount` - fixed notional
    /// * `best_price` - top-of-book price of the walked ladder
    pub fn for_fill(
        direction: OrderDirection,
        desired_amount: f64,
        filled_quantity: f64,
        order_amount: f64,
        best_price: f64,
    ) -> Self {
        let sign = direction.sign();
        Self {
            currency_slippage: sign * (desired_amount - filled_quantity),
            dollar_slippage: sign * (order_amount - filled_quantity * best_price),
            percent_slippage: sign * (desired_amount / filled_quantity - 1.0),
        }
    }

    /// Check that all three figures are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.currency_slippage.is_finite()
            && self.dollar_slippage.is_finite()
            && self.percent_slippage.is_finite()
    }
}

/// The single clearing outcome for one `(timestamp, side)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClearingRecord {
    /// Snapshot instant
    pub timestamp: i64,

    /// Book side that was walked
    pub side: Side,

    /// Direction of the hypothetical order
    pub direction: OrderDirection,

    /// Signed slippage figures
    pub metrics: SlippageMetrics,

    /// Top-of-book price of the ladder
    pub best_price: f64,

    /// Price of the clearing row
    pub clearing_price: f64,

    /// Index of the clearing row in walk order
    pub clearing_row: usize,

    /// Total filled quantity `Q`
    pub filled_quantity: f64,

    /// Zero-slippage quantity `order_amount / best_price`
    pub desired_amount: f64,
}

impl ClearingRecord {
    #[inline]
    pub fn key(&self) -> LadderKey {
        LadderKey::new(self.timestamp, self.side)
    }
}

/// Buy and sell clearing metrics for one timestamp.
///
/// Only exists when both sides had enough depth to fill the notional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub timestamp: i64,
    pub buy_currency_slippage: f64,
    pub buy_dollar_slippage: f64,
    pub buy_percent_slippage: f64,
    pub sell_currency_slippage: f64,
    pub sell_dollar_slippage: f64,
    pub sell_percent_slippage: f64,
}

impl CombinedRecord {
    /// Combine a buy (ask-derived) and sell (bid-derived) record.
    ///
    /// Returns an error if the records do not share a timestamp or are
    /// passed in the wrong roles.
    pub fn from_sides(buy: &ClearingRecord, sell: &ClearingRecord) -> Result<Self> {
        if buy.direction != OrderDirection::Buy || sell.direction != OrderDirection::Sell {
            return Err(SlippageError::InvariantViolation(format!(
                "expected buy/sell records, got {:?}/{:?}",
                buy.direction, sell.direction
            )));
        }
        if buy.timestamp != sell.timestamp {
            return Err(SlippageError::InvariantViolation(format!(
                "timestamp mismatch: buy={} sell={}",
                buy.timestamp, sell.timestamp
            )));
        }

        Ok(Self {
            timestamp: buy.timestamp,
            buy_currency_slippage: buy.metrics.currency_slippage,
            buy_dollar_slippage: buy.metrics.dollar_slippage,
            buy_percent_slippage: buy.metrics.percent_slippage,
            sell_currency_slippage: sell.metrics.currency_slippage,
            sell_dollar_slippage: sell.metrics.dollar_slippage,
            sell_percent_slippage: sell.metrics.percent_slippage,
        })
    }

    /// Buy-side metrics.
    pub fn buy_metrics(&self) -> SlippageMetrics {
        SlippageMetrics {
            currency_slippage: self.buy_currency_slippage,
            dollar_slippage: self.buy_dollar_slippage,
            percent_slippage: self.buy_percent_slippage,
        }
    }

    /// Sell-side metrics.
    pub fn sell_metrics(&self) -> SlippageMetrics {
        SlippageMetrics {
            currency_slippage: self.sell_currency_slippage,
            dollar_slippage: self.sell_dollar_slippage,
            percent_slippage: self.sell_percent_slippage,
        }
    }
}
