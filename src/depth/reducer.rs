//! Reduction of a walked ladder to its single clearing record.

use serde::{Deserialize, Serialize};

use crate::depth::walker::LadderWalk;
use crate::error::{Result, SlippageError};
use crate::types::ClearingRecord;

/// How to treat a walk where more than one row carries a fill.
///
/// The walker's first-crossing test can only produce one fill on a
/// monotonically accumulating ladder, so multiplicity means the rows were
/// produced elsewhere or something upstream is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearingPolicy {
    /// Fail the partition with `AmbiguousClearing` (default)
    #[default]
    Strict,

    /// Take the first filled row in walk order and log a warning
    FirstInWalkOrder,
}

/// Selects the clearing row of a walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearingReducer {
    policy: ClearingPolicy,
}

impl ClearingReducer {
    pub fn new(policy: ClearingPolicy) -> Self {
        Self { policy }
    }

    #[inline]
    pub fn policy(&self) -> ClearingPolicy {
        self.policy
    }

    /// Reduce one walk.
    ///
    /// # Returns
    /// - `Ok(Some(record))` when exactly one row qualifies
    /// - `Ok(None)` when no row qualifies (insufficient depth)
    /// - `Err(AmbiguousClearing)` when several rows qualify under `Strict`
    pub fn reduce(&self, walk: &LadderWalk) -> Result<Option<ClearingRecord>> {
        let mut fills = walk.fills();
        let Some(first) = fills.next() else {
            return Ok(None);
        };

        let extra = fills.count();
        if extra > 0 {
            match self.policy {
                ClearingPolicy::Strict => {
                    return Err(SlippageError::AmbiguousClearing {
                        timestamp: walk.key.timestamp,
                        side: walk.key.side,
                        rows: extra + 1,
                    });
                }
                ClearingPolicy::FirstInWalkOrder => {
                    log::warn!(
                        "{} rows qualify for clearing at {}; using row {}",
                        extra + 1,
                        walk.key,
                        first.row
                    );
                }
            }
        }

        let (Some(metrics), Some(filled_quantity)) =
            (first.candidate.metrics(), first.filled_quantity)
        else {
            return Err(SlippageError::InvariantViolation(format!(
                "clearing row {} at {} carries no fill quantity",
                first.row, walk.key
            )));
        };

        Ok(Some(ClearingRecord {
            timestamp: walk.key.timestamp,
            side: walk.key.side,
            direction: walk.direction,
            metrics: *metrics,
            best_price: walk.best_price,
            clearing_price: first.price,
            clearing_row: first.row,
            filled_quantity,
            desired_amount: walk.desired_amount,
        }))
    }
}
