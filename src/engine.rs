//! Partitioned slippage pipeline.
//!
//! Every `(timestamp, side)` ladder is an independent partition: it is walked
//! and reduced without reading any other partition's state, so partitions can
//! run on any number of rayon workers. The only shared step is the final
//! read-only merge over materialised clearing records.
//!
//! ```text
//! levels ─► LadderBuilder ─► [ walk ─► reduce ]* (parallel) ─► SideMerger ─► CombinedRecord*
//! ```
//!
//! Failure isolation:
//! - configuration errors stop the run before any partition is evaluated
//! - malformed levels, ambiguous clearing and invariant breaches fail only
//!   their own partition and are listed in [`SlippageReport::failures`]
//! - empty ladders and insufficient depth are not failures; the partition
//!   simply produces no clearing record
//!
//! # Example
//!
//! ```
//! use lob_slippage::{BookLevel, EngineConfig, SlippageEngine};
//!
//! let engine = SlippageEngine::new(EngineConfig::new(1_000.0)).unwrap();
//! let report = engine
//!     .run(vec![
//!         BookLevel::bid(1, 99.0, 20.0),
//!         BookLevel::ask(1, 101.0, 5.0),
//!         BookLevel::ask(1, 102.0, 5.0),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(report.records.len(), 1);
//! assert!(report.records[0].buy_percent_slippage > 0.0);
//! ```

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, Parallelism};
use crate::depth::{ClearingReducer, DepthWalker, Ladder, LadderBuilder, LadderSet, SideMerger};
use crate::error::{Result, SlippageError};
use crate::source::LevelSource;
use crate::types::{BookLevel, ClearingRecord, CombinedRecord, LadderKey, Side};
use crate::warnings::{WarningCategory, WarningSummary, WarningTracker};

/// Outcome of one partition.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome {
    /// Exactly one clearing row
    Cleared(ClearingRecord),
    /// Whole ladder below the notional
    InsufficientDepth,
    /// Ladder with no rows
    Empty,
    /// Partition-local failure
    Failed(SlippageError),
}

/// A partition that failed without affecting the rest of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionFailure {
    pub key: LadderKey,
    pub error: SlippageError,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Levels accepted into ladders
    pub levels_accepted: u64,
    /// Levels rejected as malformed
    pub levels_rejected: u64,
    /// Source records that could not be decoded
    pub parse_errors: u64,
    /// Ladders evaluated
    pub partitions: u64,
    /// Partitions that produced a clearing record
    pub cleared: u64,
    /// Partitions whose depth could not absorb the notional
    pub insufficient_depth: u64,
    /// Partitions with no rows
    pub empty: u64,
    /// Partitions that failed (including those poisoned at ingestion)
    pub failed: u64,
    /// Timestamps in the combined output
    pub combined: u64,
    /// Timestamps dropped at merge: buy side only
    pub buy_only: u64,
    /// Timestamps dropped at merge: sell side only
    pub sell_only: u64,
}

/// Everything a run produces.
#[derive(Debug, Clone, Default)]
pub struct SlippageReport {
    /// Combined records, ascending by timestamp
    pub records: Vec<CombinedRecord>,
    /// Per-side clearing records, ordered by `(timestamp, side)`
    pub clearing: Vec<ClearingRecord>,
    /// Isolated partition failures, ordered by key
    pub failures: Vec<PartitionFailure>,
    pub stats: RunStats,
    pub warnings: WarningSummary,
}

/// Runs the walk / reduce / merge pipeline for one notional.
pub struct SlippageEngine {
    config: EngineConfig,
    walker: DepthWalker,
    reducer: ClearingReducer,
    pool: Option<ThreadPool>,
}

impl SlippageEngine {
    /// Create an engine.
    ///
    /// # Errors
    /// `InvalidConfiguration` if the config does not validate or a dedicated
    /// thread pool cannot be built.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let walker = DepthWalker::new(config.order_amount)?;
        let reducer = ClearingReducer::new(config.clearing_policy);

        let pool = match config.parallelism {
            Parallelism::Threads(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("slippage-worker-{i}"))
                    .build()
                    .map_err(|e| SlippageError::config(format!("thread pool: {e}")))?,
            ),
            Parallelism::Sequential | Parallelism::Auto => None,
        };

        Ok(Self {
            config,
            walker,
            reducer,
            pool,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Walk and reduce one ladder.
    pub fn evaluate(&self, ladder: &Ladder) -> PartitionOutcome {
        let walk = match self.walker.walk(ladder) {
            Ok(walk) => walk,
            Err(err) if err.is_no_fill() => return PartitionOutcome::Empty,
            Err(err) => return PartitionOutcome::Failed(err),
        };

        match self.reducer.reduce(&walk) {
            Ok(Some(record)) => PartitionOutcome::Cleared(record),
            Ok(None) => PartitionOutcome::InsufficientDepth,
            Err(err) => PartitionOutcome::Failed(err),
        }
    }

    /// Run over an unordered level stream.
    pub fn run<I>(&self, levels: I) -> Result<SlippageReport>
    where
        I: IntoIterator<Item = BookLevel>,
    {
        self.run_tracked(levels, &mut WarningTracker::new())
    }

    /// [`SlippageEngine::run`] with a caller-owned tracker, so the full
    /// warning log outlives the run.
    pub fn run_tracked<I>(&self, levels: I, tracker: &mut WarningTracker) -> Result<SlippageReport>
    where
        I: IntoIterator<Item = BookLevel>,
    {
        let mut builder = LadderBuilder::new();
        for level in levels {
            if let Err(err) = builder.push(level) {
                tracker.record_error(&err, level.timestamp, level.side);
            }
        }

        let stats = RunStats {
            levels_accepted: builder.accepted_levels(),
            levels_rejected: builder.rejected_levels(),
            ..Default::default()
        };
        self.run_with(builder.finish(), stats, tracker)
    }

    /// Run over a [`LevelSource`].
    ///
    /// Undecodable records are counted and tracked, not fatal. Failing to
    /// open or read the source is.
    pub fn run_source<S: LevelSource>(&self, source: S) -> Result<SlippageReport> {
        self.run_source_tracked(source, &mut WarningTracker::new())
    }

    /// [`SlippageEngine::run_source`] with a caller-owned tracker.
    pub fn run_source_tracked<S: LevelSource>(
        &self,
        source: S,
        tracker: &mut WarningTracker,
    ) -> Result<SlippageReport> {
        let metadata = source.metadata().clone();
        log::info!(
            "Reading levels: exchange={:?} pair={:?} date={:?}",
            metadata.exchange,
            metadata.pair,
            metadata.date
        );

        let mut builder = LadderBuilder::new();
        let mut parse_errors = 0u64;

        for item in source.levels()? {
            match item {
                Ok(level) => {
                    if let Err(err) = builder.push(level) {
                        tracker.record_error(&err, level.timestamp, level.side);
                    }
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    parse_errors += 1;
                    tracker.record_simple(WarningCategory::Other, err.to_string());
                }
            }
        }

        let stats = RunStats {
            levels_accepted: builder.accepted_levels(),
            levels_rejected: builder.rejected_levels(),
            parse_errors,
            ..Default::default()
        };
        self.run_with(builder.finish(), stats, tracker)
    }

    /// Run over prebuilt ladders.
    pub fn run_ladders(&self, set: LadderSet) -> Result<SlippageReport> {
        self.run_with(set, RunStats::default(), &mut WarningTracker::new())
    }

    fn run_with(
        &self,
        set: LadderSet,
        mut stats: RunStats,
        tracker: &mut WarningTracker,
    ) -> Result<SlippageReport> {
        let (ladders, rejected) = set.into_parts();
        let ladders: Vec<Ladder> = ladders.into_values().collect();

        log::info!(
            "Evaluating {} partitions (order_amount={}, parallelism={:?})",
            ladders.len(),
            self.config.order_amount,
            self.config.parallelism
        );

        let outcomes = self.evaluate_all(&ladders);

        let mut failures: Vec<PartitionFailure> = rejected
            .into_iter()
            .filter_map(|(key, errors)| {
                errors
                    .into_iter()
                    .next()
                    .map(|error| PartitionFailure { key, error })
            })
            .collect();
        let mut clearing = Vec::with_capacity(outcomes.len());

        stats.partitions = outcomes.len() as u64;
        for (key, outcome) in outcomes {
            match outcome {
                PartitionOutcome::Cleared(record) => {
                    log::debug!("{key}: cleared at row {}", record.clearing_row);
                    stats.cleared += 1;
                    clearing.push(record);
                }
                PartitionOutcome::InsufficientDepth => {
                    log::debug!("{key}: depth below notional");
                    stats.insufficient_depth += 1;
                    tracker.record_partition(
                        WarningCategory::InsufficientDepth,
                        format!("{key}: visible depth cannot fill {}", self.config.order_amount),
                        key.timestamp,
                        key.side,
                    );
                }
                PartitionOutcome::Empty => {
                    stats.empty += 1;
                    tracker.record_partition(
                        WarningCategory::EmptyLadder,
                        format!("{key}: empty ladder"),
                        key.timestamp,
                        key.side,
                    );
                }
                PartitionOutcome::Failed(error) => {
                    log::warn!("{key}: partition failed: {error}");
                    tracker.record_error(&error, key.timestamp, key.side);
                    failures.push(PartitionFailure { key, error });
                }
            }
        }
        failures.sort_by_key(|f| f.key);
        stats.failed = failures.len() as u64;

        let merged = SideMerger::merge(clearing.iter().copied())?;
        for &ts in &merged.buy_only {
            tracker.record_partition(
                WarningCategory::OneSidedLiquidity,
                format!("ts={ts}: buy side filled, sell side did not"),
                ts,
                Side::Ask,
            );
        }
        for &ts in &merged.sell_only {
            tracker.record_partition(
                WarningCategory::OneSidedLiquidity,
                format!("ts={ts}: sell side filled, buy side did not"),
                ts,
                Side::Bid,
            );
        }

        if merged.dropped() > 0 {
            log::warn!(
                "{} instants dropped with one-sided liquidity ({} buy-only, {} sell-only)",
                merged.dropped(),
                merged.buy_only.len(),
                merged.sell_only.len()
            );
        }

        stats.combined = merged.records.len() as u64;
        stats.buy_only = merged.buy_only.len() as u64;
        stats.sell_only = merged.sell_only.len() as u64;

        log::info!(
            "Run complete: {} partitions, {} cleared, {} combined records, {} failed, {} one-sided",
            stats.partitions,
            stats.cleared,
            stats.combined,
            stats.failed,
            stats.buy_only + stats.sell_only
        );

        Ok(SlippageReport {
            records: merged.records,
            clearing,
            failures,
            stats,
            warnings: tracker.summary(),
        })
    }

    /// Fan out over partitions. Output keeps the input (key) order.
    fn evaluate_all(&self, ladders: &[Ladder]) -> Vec<(LadderKey, PartitionOutcome)> {
        let eval = |ladder: &Ladder| (ladder.key(), self.evaluate(ladder));

        match (&self.config.parallelism, &self.pool) {
            (Parallelism::Sequential, _) => ladders.iter().map(eval).collect(),
            (_, Some(pool)) => pool.install(|| ladders.par_iter().map(eval).collect()),
            (_, None) => ladders.par_iter().map(eval).collect(),
        }
    }
}
