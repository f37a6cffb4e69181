//! Ladder construction from a flat stream of book levels.
//!
//! Levels arrive unordered and mixed across instants. They are grouped by
//! `(timestamp, side)` and each group is stable-sorted into walk order:
//! bids by descending price, asks by ascending price. Equal prices are not
//! merged; they keep arrival order and are walked as separate rows.

use ahash::AHashMap;
use std::collections::BTreeMap;

use crate::error::{Result, SlippageError};
use crate::types::{BookLevel, LadderKey, Side};

/// Ordered price levels for one side of the book at one instant.
///
/// Immutable once built. Row 0 is the top of book.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    key: LadderKey,
    levels: Vec<BookLevel>,
}

impl Ladder {
    /// Build a ladder from levels belonging to one `(timestamp, side)`.
    ///
    /// Levels are validated and sorted into walk order. An empty vector is
    /// accepted; walking it reports [`SlippageError::EmptyLadder`].
    pub fn new(timestamp: i64, side: Side, mut levels: Vec<BookLevel>) -> Result<Self> {
        let key = LadderKey::new(timestamp, side);
        for level in &levels {
            level.validate()?;
            if level.key() != key {
                return Err(SlippageError::MalformedLevel {
                    timestamp: level.timestamp,
                    side: level.side,
                    reason: format!("level does not belong to ladder {key}"),
                });
            }
        }
        sort_for_walk(side, &mut levels);
        Ok(Self { key, levels })
    }

    /// Skip validation; the caller guarantees the levels are valid and keyed.
    fn from_validated(key: LadderKey, mut levels: Vec<BookLevel>) -> Self {
        sort_for_walk(key.side, &mut levels);
        Self { key, levels }
    }

    #[inline]
    pub fn key(&self) -> LadderKey {
        self.key
    }

    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.key.timestamp
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.key.side
    }

    /// Levels in walk order.
    #[inline]
    pub fn levels(&self) -> &[BookLevel] {
        &self.levels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Top-of-book price.
    #[inline]
    pub fn best_price(&self) -> Option<f64> {
        self.levels.first().map(|l| l.price)
    }

    /// Total base quantity across all rows.
    pub fn total_quantity(&self) -> f64 {
        self.levels.iter().map(|l| l.quantity).sum()
    }

    /// Total notional (`sum(price * quantity)`) across all rows.
    pub fn total_notional(&self) -> f64 {
        self.levels.iter().map(BookLevel::notional).sum()
    }
}

fn sort_for_walk(side: Side, levels: &mut [BookLevel]) {
    match side {
        Side::Bid => levels.sort_by(|a, b| b.price.total_cmp(&a.price)),
        Side::Ask => levels.sort_by(|a, b| a.price.total_cmp(&b.price)),
    }
}

/// Groups raw levels into ladders.
///
/// A malformed level poisons its own `(timestamp, side)` partition: that
/// partition yields no ladder and its errors are reported in
/// [`LadderSet::rejected`]. Other partitions are unaffected.
#[derive(Debug, Default)]
pub struct LadderBuilder {
    groups: AHashMap<LadderKey, Vec<BookLevel>>,
    rejected: AHashMap<LadderKey, Vec<SlippageError>>,
    accepted_levels: u64,
    rejected_levels: u64,
}

impl LadderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one level.
    ///
    /// Returns the validation error if the level is malformed; the level's
    /// partition is then excluded from [`LadderBuilder::finish`].
    pub fn push(&mut self, level: BookLevel) -> Result<()> {
        match level.validate() {
            Ok(()) => {
                self.groups.entry(level.key()).or_default().push(level);
                self.accepted_levels += 1;
                Ok(())
            }
            Err(err) => {
                self.rejected
                    .entry(level.key())
                    .or_default()
                    .push(err.clone());
                self.rejected_levels += 1;
                Err(err)
            }
        }
    }

    /// Add many levels, returning how many were rejected.
    pub fn extend<I>(&mut self, levels: I) -> usize
    where
        I: IntoIterator<Item = BookLevel>,
    {
        let before = self.rejected_levels;
        for level in levels {
            if let Err(err) = self.push(level) {
                log::warn!("Rejected book level: {err}");
            }
        }
        (self.rejected_levels - before) as usize
    }

    /// Levels accepted so far.
    pub fn accepted_levels(&self) -> u64 {
        self.accepted_levels
    }

    /// Levels rejected so far.
    pub fn rejected_levels(&self) -> u64 {
        self.rejected_levels
    }

    /// Sort every clean partition into a ladder.
    pub fn finish(self) -> LadderSet {
        let rejected: BTreeMap<LadderKey, Vec<SlippageError>> =
            self.rejected.into_iter().collect();

        let ladders = self
            .groups
            .into_iter()
            .filter(|(key, _)| !rejected.contains_key(key))
            .map(|(key, levels)| (key, Ladder::from_validated(key, levels)))
            .collect();

        LadderSet { ladders, rejected }
    }
}

/// Ladders for a processing window, keyed and ordered by `(timestamp, side)`.
#[derive(Debug, Clone, Default)]
pub struct LadderSet {
    ladders: BTreeMap<LadderKey, Ladder>,
    rejected: BTreeMap<LadderKey, Vec<SlippageError>>,
}

impl LadderSet {
    /// Build all ladders from an unordered level stream.
    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = BookLevel>,
    {
        let mut builder = LadderBuilder::new();
        builder.extend(levels);
        builder.finish()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ladders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ladders.is_empty()
    }

    pub fn get(&self, key: &LadderKey) -> Option<&Ladder> {
        self.ladders.get(key)
    }

    pub fn ladders(&self) -> impl Iterator<Item = &Ladder> {
        self.ladders.values()
    }

    /// Partitions excluded because of malformed levels.
    pub fn rejected(&self) -> &BTreeMap<LadderKey, Vec<SlippageError>> {
        &self.rejected
    }

    /// Split into clean ladders and rejected partitions.
    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<LadderKey, Ladder>,
        BTreeMap<LadderKey, Vec<SlippageError>>,
    ) {
        (self.ladders, self.rejected)
    }
}
