//! Warning and issue tracking for slippage runs.
//!
//! Partition-level problems never abort a run; they are recorded here so a
//! run can be audited afterwards. Warnings are categorised, carry the data
//! timestamp and side they refer to, and can be exported as JSON.
//!
//! # Example
//!
//! ```
//! use lob_slippage::warnings::{WarningCategory, WarningTracker};
//! use lob_slippage::Side;
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_partition(
//!     WarningCategory::InsufficientDepth,
//!     "ask depth below notional",
//!     1_700_000_000_000,
//!     Side::Ask,
//! );
//!
//! let summary = tracker.summary();
//! assert_eq!(summary.total, 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SlippageError;
use crate::types::Side;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Level rejected at ingestion (non-positive or non-finite)
    MalformedLevel,

    /// Ladder with no rows
    EmptyLadder,

    /// Ladder could not absorb the notional
    InsufficientDepth,

    /// More than one row qualified as clearing row
    AmbiguousClearing,

    /// Instant dropped at merge because only one side filled
    OneSidedLiquidity,

    /// Internal invariant broken
    InvariantViolation,

    /// Other/uncategorized warning
    Other,
}

impl WarningCategory {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::MalformedLevel => "MALFORMED_LEVEL",
            WarningCategory::EmptyLadder => "EMPTY_LADDER",
            WarningCategory::InsufficientDepth => "INSUFFICIENT_DEPTH",
            WarningCategory::AmbiguousClearing => "AMBIGUOUS_CLEARING",
            WarningCategory::OneSidedLiquidity => "ONE_SIDED_LIQUIDITY",
            WarningCategory::InvariantViolation => "INVARIANT_VIOLATION",
            WarningCategory::Other => "OTHER",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::EmptyLadder => 1,
            WarningCategory::InsufficientDepth => 1,
            WarningCategory::OneSidedLiquidity => 1,
            WarningCategory::MalformedLevel => 2,
            WarningCategory::Other => 2,
            WarningCategory::AmbiguousClearing => 3,
            WarningCategory::InvariantViolation => 3,
        }
    }

    /// Category for a partition error.
    pub fn for_error(err: &SlippageError) -> Self {
        match err {
            SlippageError::MalformedLevel { .. } => WarningCategory::MalformedLevel,
            SlippageError::EmptyLadder { .. } => WarningCategory::EmptyLadder,
            SlippageError::AmbiguousClearing { .. } => WarningCategory::AmbiguousClearing,
            SlippageError::InvariantViolation(_) => WarningCategory::InvariantViolation,
            _ => WarningCategory::Other,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Sequential ID within the tracker
    pub id: u64,

    pub category: WarningCategory,

    pub message: String,

    /// Snapshot instant the warning refers to (ms since epoch)
    pub data_timestamp: Option<i64>,

    /// Book side the warning refers to
    pub side: Option<Side>,

    /// Additional context as key-value pairs
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub context: IndexMap<String, String>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            message: message.into(),
            data_timestamp: None,
            side: None,
            context: IndexMap::new(),
        }
    }

    /// Set the data timestamp.
    pub fn with_data_timestamp(mut self, ts: i64) -> Self {
        self.data_timestamp = Some(ts);
        self
    }

    /// Set the side.
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// Add context key-value pair.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings (including deduplicated)
    pub total: u64,

    /// Count by category name, in first-seen order
    pub by_category: IndexMap<String, u64>,

    /// Count by severity
    pub by_severity: IndexMap<u8, u64>,

    /// Earliest data timestamp referenced
    pub first_timestamp: Option<i64>,

    /// Latest data timestamp referenced
    pub last_timestamp: Option<i64>,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings to keep in memory
    pub max_warnings: usize,

    /// Whether to forward warnings to the `log` facade
    pub log_warnings: bool,

    /// Minimum severity to log (1=all, 2=medium+, 3=high only)
    pub min_log_severity: u8,

    /// Drop repeats of an identical category + message
    pub deduplicate: bool,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
            log_warnings: true,
            min_log_severity: 2,
            deduplicate: true,
        }
    }
}

/// Collects warnings for one run.
#[derive(Debug)]
pub struct WarningTracker {
    config: WarningTrackerConfig,
    warnings: Vec<Warning>,
    next_id: u64,
    category_counts: IndexMap<WarningCategory, u64>,
    seen: HashSet<u64>,
    first_timestamp: Option<i64>,
    last_timestamp: Option<i64>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: IndexMap::new(),
            seen: HashSet::new(),
            first_timestamp: None,
            last_timestamp: None,
        }
    }

    /// Record a warning.
    ///
    /// Returns the warning ID if stored, or `None` if it was a duplicate.
    /// Duplicates still count towards the totals.
    pub fn record(&mut self, mut warning: Warning) -> Option<u64> {
        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        if let Some(ts) = warning.data_timestamp {
            self.first_timestamp = Some(self.first_timestamp.map_or(ts, |t| t.min(ts)));
            self.last_timestamp = Some(self.last_timestamp.map_or(ts, |t| t.max(ts)));
        }

        let has_room = self.warnings.len() < self.config.max_warnings;
        if self.config.deduplicate {
            let hash = Self::hash_warning(&warning);
            if self.seen.contains(&hash) {
                return None;
            }
            // Dedup keys are only kept for stored warnings
            if has_room {
                self.seen.insert(hash);
            }
        }

        warning.id = self.next_id;
        self.next_id += 1;

        if self.config.log_warnings && warning.category.severity() >= self.config.min_log_severity {
            log::warn!("[{}] {}", warning.category.name(), warning.message);
        }

        let id = warning.id;
        if has_room {
            self.warnings.push(warning);
        }
        Some(id)
    }

    /// Record a simple warning with just category and message.
    pub fn record_simple(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
    ) -> Option<u64> {
        self.record(Warning::new(0, category, message))
    }

    /// Record a warning tied to one `(timestamp, side)` partition.
    pub fn record_partition(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        timestamp: i64,
        side: Side,
    ) -> Option<u64> {
        let warning = Warning::new(0, category, message)
            .with_data_timestamp(timestamp)
            .with_side(side);
        self.record(warning)
    }

    /// Record a partition error under its matching category.
    pub fn record_error(&mut self, err: &SlippageError, timestamp: i64, side: Side) -> Option<u64> {
        self.record_partition(WarningCategory::for_error(err), err.to_string(), timestamp, side)
    }

    /// Get the number of stored warnings.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Check if no warnings have been stored.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Get total count including deduplicated.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    /// Get count for a specific category.
    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Get all stored warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Get warnings by category.
    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = IndexMap::new();
        let mut by_severity = IndexMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            by_category,
            by_severity,
            first_timestamp: self.first_timestamp,
            last_timestamp: self.last_timestamp,
        }
    }

    /// Export summary and stored warnings to a JSON file.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            summary: WarningSummary,
            warnings: &'a [Warning],
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(
            &mut writer,
            &Export {
                summary: self.summary(),
                warnings: &self.warnings,
            },
        )?;
        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.seen.clear();
        self.first_timestamp = None;
        self.last_timestamp = None;
    }

    fn hash_warning(warning: &Warning) -> u64 {
        let mut hasher = DefaultHasher::new();
        warning.category.hash(&mut hasher);
        warning.message.hash(&mut hasher);
        warning.data_timestamp.hash(&mut hasher);
        warning.side.hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
