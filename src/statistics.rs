//! Aggregate statistics over combined slippage records.
//!
//! Reporting usually wants "how bad was slippage over the window" rather than
//! one figure per snapshot. [`SlippageSummary`] folds a record stream into
//! per-metric running statistics without keeping the records around.

use serde::{Deserialize, Serialize};

use crate::types::{CombinedRecord, SlippageMetrics};

// ============================================================================
// Running Statistics (Welford's Algorithm)
// ============================================================================

/// Online mean / standard deviation / min / max.
///
/// Welford's update keeps the computation numerically stable over long
/// windows; [`RunningStats::merge`] combines partial results from parallel
/// workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    pub count: u64,
    pub mean: f64,
    m2: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Add one observation. Non-finite values are ignored.
    #[inline]
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Population variance.
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Population standard deviation.
    #[inline]
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Combine with statistics gathered elsewhere (Chan et al.).
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let total = self.count + other.count;
        let delta = other.mean - self.mean;
        let weight = other.count as f64 / total as f64;

        self.m2 += other.m2 + delta * delta * self.count as f64 * weight;
        self.mean += delta * weight;
        self.count = total;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// ============================================================================
// Per-direction and combined summaries
// ============================================================================

/// Running statistics for the three metrics of one direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub currency_slippage: RunningStats,
    pub dollar_slippage: RunningStats,
    pub percent_slippage: RunningStats,
}

impl MetricStats {
    pub fn update(&mut self, metrics: &SlippageMetrics) {
        self.currency_slippage.update(metrics.currency_slippage);
        self.dollar_slippage.update(metrics.dollar_slippage);
        self.percent_slippage.update(metrics.percent_slippage);
    }

    pub fn merge(&mut self, other: &MetricStats) {
        self.currency_slippage.merge(&other.currency_slippage);
        self.dollar_slippage.merge(&other.dollar_slippage);
        self.percent_slippage.merge(&other.percent_slippage);
    }
}

/// Window summary of combined records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlippageSummary {
    /// Number of records folded in
    pub records: u64,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub buy: MetricStats,
    pub sell: MetricStats,
}

impl SlippageSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record in.
    pub fn update(&mut self, record: &CombinedRecord) {
        self.records += 1;
        let ts = record.timestamp;
        self.first_timestamp = Some(self.first_timestamp.map_or(ts, |t| t.min(ts)));
        self.last_timestamp = Some(self.last_timestamp.map_or(ts, |t| t.max(ts)));
        self.buy.update(&record.buy_metrics());
        self.sell.update(&record.sell_metrics());
    }

    /// Summarise a record slice.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a CombinedRecord>,
    {
        let mut summary = Self::new();
        for record in records {
            summary.update(record);
        }
        summary
    }

    /// Combine with a summary of a disjoint window.
    pub fn merge(&mut self, other: &SlippageSummary) {
        self.records += other.records;
        self.first_timestamp = match (self.first_timestamp, other.first_timestamp) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_timestamp = match (self.last_timestamp, other.last_timestamp) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.buy.merge(&other.buy);
        self.sell.merge(&other.sell);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    fn record(ts: i64, buy_pct: f64, sell_pct: f64) -> CombinedRecord {
        CombinedRecord {
            timestamp: ts,
            buy_currency_slippage: buy_pct * 10.0,
            buy_dollar_slippage: buy_pct * 1000.0,
            buy_percent_slippage: buy_pct,
            sell_currency_slippage: sell_pct * 10.0,
            sell_dollar_slippage: sell_pct * 1000.0,
            sell_percent_slippage: sell_pct,
        }
    }

    #[test]
    fn test_running_stats_basic() {
        let mut stats = RunningStats::new();
        assert!(stats.is_empty());

        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.update(v);
        }
        assert_eq!(stats.count, 8);
        assert!(approx(stats.mean, 5.0));
        assert!(approx(stats.std(), 2.0));
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_running_stats_skips_non_finite() {
        let mut stats = RunningStats::new();
        stats.update(f64::NAN);
        stats.update(f64::INFINITY);
        stats.update(1.0);
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_running_stats_merge_matches_single_pass() {
        let values = [1.0, 3.0, 8.0, -2.0, 5.5, 0.25];
        let mut all = RunningStats::new();
        values.iter().for_each(|v| all.update(*v));

        let mut left = RunningStats::new();
        let mut right = RunningStats::new();
        values[..2].iter().for_each(|v| left.update(*v));
        values[2..].iter().for_each(|v| right.update(*v));
        left.merge(&right);

        assert_eq!(left.count, all.count);
        assert!(approx(left.mean, all.mean));
        assert!(approx(left.variance(), all.variance()));
        assert_eq!(left.min, all.min);
        assert_eq!(left.max, all.max);
    }

    #[test]
    fn test_summary_from_records() {
        let records = vec![record(30, 0.001, 0.002), record(10, 0.003, 0.004)];
        let summary = SlippageSummary::from_records(&records);

        assert_eq!(summary.records, 2);
        assert_eq!(summary.first_timestamp, Some(10));
        assert_eq!(summary.last_timestamp, Some(30));
        assert!(approx(summary.buy.percent_slippage.mean, 0.002));
        assert!(approx(summary.sell.dollar_slippage.max, 4.0));
    }

    #[test]
    fn test_summary_merge() {
        let mut a = SlippageSummary::from_records(&[record(5, 0.1, 0.1)]);
        let b = SlippageSummary::from_records(&[record(1, 0.3, 0.3)]);
        a.merge(&b);

        assert_eq!(a.records, 2);
        assert_eq!(a.first_timestamp, Some(1));
        assert_eq!(a.last_timestamp, Some(5));
        assert!(approx(a.buy.percent_slippage.mean, 0.2));

        let mut empty = SlippageSummary::new();
        empty.merge(&a);
        assert_eq!(empty, a);
    }
}
