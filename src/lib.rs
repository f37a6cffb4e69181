//! # LOB-Slippage
//!
//! Fixed-notional slippage metrics from historical limit order book snapshots.
//!
//! For every snapshot instant the crate asks: if a market order for a fixed
//! quote-currency notional `N` had been sent against the visible depth, how
//! much worse than the top of book would it have filled? The buy side walks
//! the asks, the sell side walks the bids, and an instant is reported only
//! when both sides could absorb `N`.
//!
//! ## Features
//!
//! - **Depth walk**: price-priority cumulative quantity and cost per ladder
//! - **Clearing detection**: exactly one crossing row per fillable ladder
//! - **Three metrics per side**: currency, dollar and percent slippage
//! - **Inner join across sides**: one-sided instants are dropped and counted
//! - **Partition parallelism**: every `(timestamp, side)` ladder is independent
//! - **Failure isolation**: a bad partition never aborts the run
//!
//! ## Quick Start
//!
//! ### Walking a single ladder
//!
//! ```rust
//! use lob_slippage::{BookLevel, DepthWalker, Ladder, Side};
//!
//! let asks = Ladder::new(
//!     1,
//!     Side::Ask,
//!     vec![BookLevel::ask(1, 100.5, 3.0), BookLevel::ask(1, 100.0, 2.0)],
//! )
//! .unwrap();
//!
//! let walk = DepthWalker::new(300.0).unwrap().walk(&asks).unwrap();
//! let fill = walk.fills().next().unwrap();
//! assert_eq!(fill.row, 1);
//! ```
//!
//! ### Running a whole window
//!
//! ```rust
//! use lob_slippage::{BookLevel, EngineConfig, SlippageEngine, SlippageSummary};
//!
//! let engine = SlippageEngine::new(EngineConfig::new(500.0)).unwrap();
//! let report = engine
//!     .run(vec![
//!         BookLevel::bid(10, 99.0, 4.0),
//!         BookLevel::bid(10, 98.0, 4.0),
//!         BookLevel::ask(10, 101.0, 4.0),
//!         BookLevel::ask(10, 102.0, 4.0),
//!     ])
//!     .unwrap();
//!
//! let summary = SlippageSummary::from_records(&report.records);
//! assert_eq!(summary.records, 1);
//! assert!(report.failures.is_empty());
//! ```
//!
//! ### Reading from a file
//!
//! ```ignore
//! use lob_slippage::{EngineConfig, JsonLinesSource, SlippageEngine};
//!
//! let source = JsonLinesSource::open("data/BINANCE_ETH-USDT_2021-05-19.jsonl")?;
//! let report = SlippageEngine::new(EngineConfig::new(1_000_000.0))?.run_source(source)?;
//! println!("{} combined records", report.records.len());
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `BookLevel`, `Side`, `SlippageMetrics`, `ClearingRecord`, `CombinedRecord` |
//! | [`depth`] | Ladder building, depth walk, clearing reduction and side merge |
//! | [`engine`] | Partitioned pipeline: `SlippageEngine`, `SlippageReport`, `RunStats` |
//! | [`config`] | Run configuration: `EngineConfig`, `Parallelism` |
//! | [`source`] | Level sources: `LevelSource`, `VecSource`, `JsonLinesSource` |
//! | [`export`] | Record sinks: `MetricsSink`, `JsonLinesSink`, `VecSink` |
//! | [`statistics`] | Window summaries: `SlippageSummary`, `RunningStats` |
//! | [`warnings`] | Warning tracking: `WarningTracker`, `Warning`, `WarningCategory` |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod depth;
pub mod engine;
pub mod error;
pub mod export;
pub mod source;
pub mod statistics;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{Result, SlippageError};
pub use types::{
    BookLevel, ClearingRecord, CombinedRecord, LadderKey, OrderDirection, Side, SlippageMetrics,
};

// Re-exports - Depth walk
pub use depth::{
    ClearingPolicy, ClearingReducer, DepthWalker, Ladder, LadderBuilder, LadderSet, LadderWalk,
    MergeOutcome, SideMerger, SlippageCandidate,
};

// Re-exports - Pipeline
pub use config::{EngineConfig, Parallelism};
pub use engine::{PartitionFailure, PartitionOutcome, RunStats, SlippageEngine, SlippageReport};

// Re-exports - Statistics
pub use statistics::{MetricStats, RunningStats, SlippageSummary};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};

// Re-exports - Source and sink abstraction
pub use export::{JsonLinesSink, MetricsSink, VecSink};
pub use source::{JsonLinesSource, LevelSource, SourceMetadata, VecSource};
