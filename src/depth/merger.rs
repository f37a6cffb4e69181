//! Inner join of buy-side and sell-side clearing records.
//!
//! Only timestamps with a record on both sides appear in the output. An
//! instant where one side could not absorb the notional is dropped from the
//! combined result on purpose: one-sided liquidity is an order-book health
//! signal, not missing data. The dropped timestamps are still reported in
//! [`MergeOutcome::buy_only`] and [`MergeOutcome::sell_only`] so callers can
//! count or inspect them.

use std::collections::BTreeMap;

use crate::error::{Result, SlippageError};
use crate::types::{ClearingRecord, CombinedRecord, OrderDirection};

/// Result of merging both sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Combined records, ascending by timestamp
    pub records: Vec<CombinedRecord>,

    /// Timestamps with a buy record but no sell record
    pub buy_only: Vec<i64>,

    /// Timestamps with a sell record but no buy record
    pub sell_only: Vec<i64>,
}

impl MergeOutcome {
    /// Number of instants dropped for one-sided liquidity.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.buy_only.len() + self.sell_only.len()
    }
}

/// Joins clearing records by timestamp.
pub struct SideMerger;

impl SideMerger {
    /// Merge clearing records of both directions.
    ///
    /// # Errors
    /// `InvariantViolation` if two records share a `(timestamp, direction)`.
    pub fn merge<I>(records: I) -> Result<MergeOutcome>
    where
        I: IntoIterator<Item = ClearingRecord>,
    {
        let mut buys: BTreeMap<i64, ClearingRecord> = BTreeMap::new();
        let mut sells: BTreeMap<i64, ClearingRecord> = BTreeMap::new();

        for record in records {
            let target = match record.direction {
                OrderDirection::Buy => &mut buys,
                OrderDirection::Sell => &mut sells,
            };
            if target.insert(record.timestamp, record).is_some() {
                return Err(SlippageError::InvariantViolation(format!(
                    "duplicate {:?} clearing record at ts={}",
                    record.direction, record.timestamp
                )));
            }
        }

        Self::join(buys, sells)
    }

    /// Merge already-separated sides.
    pub fn join(
        buys: BTreeMap<i64, ClearingRecord>,
        mut sells: BTreeMap<i64, ClearingRecord>,
    ) -> Result<MergeOutcome> {
        let mut outcome = MergeOutcome::default();

        for (timestamp, buy) in buys {
            match sells.remove(&timestamp) {
                Some(sell) => outcome.records.push(CombinedRecord::from_sides(&buy, &sell)?),
                None => outcome.buy_only.push(timestamp),
            }
        }
        outcome.sell_only.extend(sells.into_keys());

        if outcome.dropped() > 0 {
            log::debug!(
                "Merge dropped {} one-sided instants ({} buy-only, {} sell-only)",
                outcome.dropped(),
                outcome.buy_only.len(),
                outcome.sell_only.len()
            );
        }

        Ok(outcome)
    }
}
