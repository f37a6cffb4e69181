//! Depth walk for a fixed-notional order.
//!
//! For one ladder (one side, one instant) the walker accumulates quantity and
//! cost row by row and finds the clearing row: the first row at which the
//! cumulative notional reaches the order amount.
//!
//! ```text
//! cum_cost[i] >= order_amount  &&  cum_cost[i-1] < order_amount   (cum_cost[-1] = 0)
//! ```
//!
//! At the clearing row the unfilled notional is bought at that row's price:
//!
//! ```text
//! remaining = order_amount - cum_cost[i-1]
//! Q         = cum_quantity[i-1] + remaining / price[i]
//! ```
//!
//! and the slippage figures compare `Q` with `desired = order_amount / best_price`
//! (see [`SlippageMetrics::for_fill`]). Every other row reports
//! [`SlippageCandidate::NoFill`]. If the whole ladder cannot absorb the
//! notional no row crosses and the instant has no clearing record.

use serde::{Deserialize, Serialize};

use crate::depth::ladder::Ladder;
use crate::error::{Result, SlippageError};
use crate::types::{BookLevel, LadderKey, OrderDirection, SlippageMetrics};

/// Per-row walk output.
///
/// `Fill` with all-zero metrics (exact fill at top of book) is a real result
/// and is never folded into `NoFill`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SlippageCandidate {
    NoFill,
    Fill(SlippageMetrics),
}

impl SlippageCandidate {
    #[inline]
    pub fn is_fill(&self) -> bool {
        matches!(self, SlippageCandidate::Fill(_))
    }

    #[inline]
    pub fn metrics(&self) -> Option<&SlippageMetrics> {
        match self {
            SlippageCandidate::Fill(m) => Some(m),
            SlippageCandidate::NoFill => None,
        }
    }
}

/// Running totals while walking one ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearingState {
    /// Sum of quantity up to and including the current row
    pub cum_quantity: f64,
    /// Sum of `price * quantity` up to and including the current row
    pub cum_cost: f64,
    /// Top-of-book price, fixed for the ladder
    pub best_price: f64,
    /// Fixed notional
    pub order_amount: f64,
    /// `order_amount / best_price`
    pub desired_amount: f64,
}

impl ClearingState {
    /// Start a walk at zero depth.
    pub fn new(best_price: f64, order_amount: f64) -> Result<Self> {
        if !(best_price.is_finite() && best_price > 0.0) {
            return Err(SlippageError::config(format!(
                "best_price must be positive and finite, got {best_price}"
            )));
        }
        validate_order_amount(order_amount)?;

        Ok(Self {
            cum_quantity: 0.0,
            cum_cost: 0.0,
            best_price,
            order_amount,
            desired_amount: order_amount / best_price,
        })
    }

    /// Consume one row. Returns the candidate for that row.
    ///
    /// Fails if a running total would decrease.
    pub fn advance(&mut self, level: &BookLevel, direction: OrderDirection) -> Result<SlippageCandidate> {
        let prev_quantity = self.cum_quantity;
        let prev_cost = self.cum_cost;

        self.cum_quantity += level.quantity;
        self.cum_cost += level.notional();

        if !(self.cum_quantity >= prev_quantity && self.cum_cost >= prev_cost) {
            return Err(SlippageError::InvariantViolation(format!(
                "cumulative depth decreased at ts={} price={}: qty {} -> {}, cost {} -> {}",
                level.timestamp, level.price, prev_quantity, self.cum_quantity, prev_cost, self.cum_cost
            )));
        }

        let crosses = self.cum_cost >= self.order_amount && prev_cost < self.order_amount;
        if !crosses {
            return Ok(SlippageCandidate::NoFill);
        }

        let remaining = self.order_amount - prev_cost;
        let filled_quantity = prev_quantity + remaining / level.price;
        Ok(SlippageCandidate::Fill(SlippageMetrics::for_fill(
            direction,
            self.desired_amount,
            filled_quantity,
            self.order_amount,
            self.best_price,
        )))
    }

    /// Whether the notional has been reached.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.cum_cost >= self.order_amount
    }
}

/// One walked ladder row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkRow {
    /// Index in walk order
    pub row: usize,
    pub price: f64,
    pub quantity: f64,
    pub cum_quantity: f64,
    pub cum_cost: f64,
    /// Total filled quantity `Q`, set on the clearing row only
    pub filled_quantity: Option<f64>,
    pub candidate: SlippageCandidate,
}

/// Full result of walking one ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderWalk {
    pub key: LadderKey,
    pub direction: OrderDirection,
    pub best_price: f64,
    pub order_amount: f64,
    pub desired_amount: f64,
    pub rows: Vec<WalkRow>,
}

impl LadderWalk {
    /// Rows carrying a fill.
    pub fn fills(&self) -> impl Iterator<Item = &WalkRow> {
        self.rows.iter().filter(|r| r.candidate.is_fill())
    }

    /// True when the ladder could not absorb the notional.
    pub fn is_insufficient(&self) -> bool {
        self.rows
            .last()
            .map_or(true, |r| r.cum_cost < self.order_amount)
    }
}

fn validate_order_amount(order_amount: f64) -> Result<()> {
    if order_amount.is_finite() && order_amount > 0.0 {
        Ok(())
    } else {
        Err(SlippageError::config(format!(
            "order_amount must be positive and finite, got {order_amount}"
        )))
    }
}

/// Walks ladders for one configured notional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthWalker {
    order_amount: f64,
}

impl DepthWalker {
    /// Create a walker for a fixed notional.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `order_amount` is not positive and finite.
    ///
    /// # Example
    /// ```
    /// use lob_slippage::{BookLevel, DepthWalker, Ladder, Side};
    ///
    /// let ladder = Ladder::new(
    ///     1,
    ///     Side::Ask,
    ///     vec![BookLevel::ask(1, 100.0, 5.0), BookLevel::ask(1, 101.0, 5.0)],
    /// )
    /// .unwrap();
    ///
    /// let walk = DepthWalker::new(700.0).unwrap().walk(&ladder).unwrap();
    /// assert_eq!(walk.fills().count(), 1);
    /// assert!(walk.rows[1].candidate.is_fill());
    /// ```
    pub fn new(order_amount: f64) -> Result<Self> {
        validate_order_amount(order_amount)?;
        Ok(Self { order_amount })
    }

    #[inline]
    pub fn order_amount(&self) -> f64 {
        self.order_amount
    }

    /// Walk one ladder in order and emit a candidate per row.
    ///
    /// # Errors
    /// - `EmptyLadder` for a ladder with no rows (a no-fill outcome)
    /// - `InvalidConfiguration` if the top-of-book price is not positive
    /// - `InvariantViolation` if cumulative depth ever decreases
    pub fn walk(&self, ladder: &Ladder) -> Result<LadderWalk> {
        let key = ladder.key();
        let best_price = ladder.best_price().ok_or(SlippageError::EmptyLadder {
            timestamp: key.timestamp,
            side: key.side,
        })?;

        let direction = key.side.taker_direction();
        let mut state = ClearingState::new(best_price, self.order_amount)?;
        let mut rows = Vec::with_capacity(ladder.len());

        for (row, level) in ladder.levels().iter().enumerate() {
            let prev_quantity = state.cum_quantity;
            let prev_cost = state.cum_cost;
            let candidate = state.advance(level, direction)?;

            let filled_quantity = candidate
                .is_fill()
                .then(|| prev_quantity + (self.order_amount - prev_cost) / level.price);

            rows.push(WalkRow {
                row,
                price: level.price,
                quantity: level.quantity,
                cum_quantity: state.cum_quantity,
                cum_cost: state.cum_cost,
                filled_quantity,
                candidate,
            });
        }

        Ok(LadderWalk {
            key,
            direction,
            best_price,
            order_amount: self.order_amount,
            desired_amount: state.desired_amount,
            rows,
        })
    }
}
