//! End-to-end tests for the slippage pipeline.
//!
//! Covers the worked scenarios (a two-row ask walk at a 1,000,000 notional,
//! one-sided instants dropped at merge), determinism across reruns and
//! scheduling modes, and failure isolation.

use std::io::Cursor;

use lob_slippage::{
    BookLevel, EngineConfig, JsonLinesSink, JsonLinesSource, LadderKey, MetricsSink,
    OrderDirection, Parallelism, Side, SlippageEngine, SlippageError, SlippageSummary, VecSource,
    WarningCategory, WarningTracker,
};

const ORDER_AMOUNT: f64 = 1_000_000.0;

/// Absolute-or-relative float comparison.
fn approx(actual: f64, expected: f64, eps: f64) -> bool {
    let diff = (actual - expected).abs();
    diff <= eps || diff <= eps * expected.abs()
}

fn sequential(order_amount: f64) -> SlippageEngine {
    SlippageEngine::new(EngineConfig::new(order_amount).with_parallelism(Parallelism::Sequential))
        .unwrap()
}

/// The ask ladder from the worked example plus a mirrored bid ladder.
fn scenario_levels(ts: i64) -> Vec<BookLevel> {
    vec![
        BookLevel::ask(ts, 1701.00, 400.0),
        BookLevel::bid(ts, 1699.00, 400.0),
        BookLevel::ask(ts, 1700.00, 400.0),
        BookLevel::bid(ts, 1700.00, 400.0),
        BookLevel::ask(ts, 1700.50, 400.0),
        BookLevel::bid(ts, 1699.50, 400.0),
    ]
}

/// A varied multi-instant window: some instants thin on one side.
fn window(instants: i64) -> Vec<BookLevel> {
    let mut levels = Vec::new();
    for ts in 0..instants {
        let mid = 2_000.0 + (ts % 17) as f64 * 0.25;
        let thin_bids = ts % 5 == 0;
        let thin_asks = ts % 7 == 0;
        for i in 0..12 {
            let step = 0.05 * (i + 1) as f64;
            let qty = 1.0 + ((ts + i) % 4) as f64;
            levels.push(BookLevel::bid(
                ts * 100,
                mid - step,
                if thin_bids { qty * 0.01 } else { qty },
            ));
            levels.push(BookLevel::ask(
                ts * 100,
                mid + step,
                if thin_asks { qty * 0.01 } else { qty },
            ));
        }
    }
    levels
}

// ============================================================================
// Worked scenarios
// ============================================================================

#[test]
fn test_scenario_buy_clears_on_second_ask_row() {
    let report = sequential(ORDER_AMOUNT).run(scenario_levels(1_621_382_400_000)).unwrap();

    let buy = report
        .clearing
        .iter()
        .find(|r| r.direction == OrderDirection::Buy)
        .expect("buy side clears");

    assert_eq!(buy.side, Side::Ask);
    assert_eq!(buy.clearing_row, 1);
    assert_eq!(buy.best_price, 1700.0);
    assert_eq!(buy.clearing_price, 1700.5);
    assert!(approx(buy.desired_amount, 588.235_294_1, 1e-6));
    assert!(approx(buy.filled_quantity, 588.179_947_1, 1e-6));
    assert!(approx(buy.metrics.currency_slippage, 0.055_347_04, 1e-7));
    assert!(approx(buy.metrics.dollar_slippage, 94.089_973_5, 1e-6));
    assert!(approx(buy.metrics.percent_slippage, 9.409_882_7e-5, 1e-10));
}

#[test]
fn test_scenario_sell_mirrors_on_bids() {
    let report = sequential(ORDER_AMOUNT).run(scenario_levels(7)).unwrap();

    assert_eq!(report.records.len(), 1);
    let record = report.records[0];
    assert_eq!(record.timestamp, 7);

    // Both directions report cost to the trader as positive
    assert!(approx(record.sell_currency_slippage, 0.055_379_61, 1e-7));
    assert!(approx(record.sell_dollar_slippage, 94.145_336_9, 1e-6));
    assert!(approx(record.sell_percent_slippage, 9.413_647_4e-5, 1e-10));
    assert!(record.buy_dollar_slippage > 0.0);
    assert!(record.sell_dollar_slippage > 0.0);
}

#[test]
fn test_merge_drops_instant_with_thin_bids() {
    let mut levels = scenario_levels(1);
    // T2: asks deep, bids worth far less than the notional
    levels.extend([
        BookLevel::ask(2, 1700.0, 400.0),
        BookLevel::ask(2, 1700.5, 400.0),
        BookLevel::bid(2, 1699.0, 10.0),
        BookLevel::bid(2, 1698.0, 10.0),
    ]);

    let report = sequential(ORDER_AMOUNT).run(levels).unwrap();

    let stamps: Vec<i64> = report.records.iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec![1]);
    assert_eq!(report.stats.insufficient_depth, 1);
    assert_eq!(report.stats.buy_only, 1);
    assert_eq!(report.stats.sell_only, 0);
    assert!(report.failures.is_empty());
    assert_eq!(
        report.warnings.by_category.get(WarningCategory::OneSidedLiquidity.name()),
        Some(&1)
    );
}

#[test]
fn test_exact_fill_reports_zero_not_absence() {
    let report = sequential(1_000.0)
        .run(vec![BookLevel::bid(3, 100.0, 10.0), BookLevel::ask(3, 125.0, 8.0)])
        .unwrap();

    assert_eq!(report.records.len(), 1);
    let record = report.records[0];
    assert_eq!(record.buy_percent_slippage, 0.0);
    assert_eq!(record.buy_dollar_slippage, 0.0);
    assert_eq!(record.sell_percent_slippage, 0.0);
    assert_eq!(record.sell_currency_slippage, 0.0);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_rerun_is_byte_identical() {
    let levels = window(60);
    let engine = SlippageEngine::new(EngineConfig::new(8_000.0)).unwrap();

    let first = serde_json::to_string(&engine.run(levels.clone()).unwrap().records).unwrap();
    let second = serde_json::to_string(&engine.run(levels.clone()).unwrap().records).unwrap();
    assert_eq!(first, second);

    // Arrival order does not matter for distinct prices
    let mut reversed = levels;
    reversed.reverse();
    let third = serde_json::to_string(&engine.run(reversed).unwrap().records).unwrap();
    assert_eq!(first, third);
}

#[test]
fn test_scheduling_modes_agree() {
    let levels = window(80);

    let reports: Vec<_> = [
        Parallelism::Sequential,
        Parallelism::Auto,
        Parallelism::Threads(1),
        Parallelism::Threads(4),
    ]
    .into_iter()
    .map(|p| {
        SlippageEngine::new(EngineConfig::new(8_000.0).with_parallelism(p))
            .unwrap()
            .run(levels.clone())
            .unwrap()
    })
    .collect();

    for report in &reports[1..] {
        assert_eq!(report.records, reports[0].records);
        assert_eq!(report.clearing, reports[0].clearing);
        assert_eq!(report.stats, reports[0].stats);
    }

    let records = &reports[0].records;
    assert!(!records.is_empty());
    assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert!(reports[0].stats.buy_only + reports[0].stats.sell_only > 0);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_invalid_order_amount_is_fatal() {
    for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let err = SlippageEngine::new(EngineConfig::new(bad)).err().unwrap();
        assert!(err.is_fatal(), "{bad} should be fatal");
    }
}

#[test]
fn test_malformed_levels_isolated_per_partition() {
    let mut levels = scenario_levels(1);
    levels.extend(scenario_levels(2));
    levels.extend(scenario_levels(3));
    levels.push(BookLevel::ask(2, -1700.0, 400.0));
    levels.push(BookLevel::bid(3, 1699.0, 0.0));

    let report = sequential(ORDER_AMOUNT).run(levels).unwrap();

    let failed: Vec<LadderKey> = report.failures.iter().map(|f| f.key).collect();
    assert_eq!(
        failed,
        vec![LadderKey::new(2, Side::Ask), LadderKey::new(3, Side::Bid)]
    );
    assert!(report
        .failures
        .iter()
        .all(|f| matches!(f.error, SlippageError::MalformedLevel { .. })));

    let stamps: Vec<i64> = report.records.iter().map(|r| r.timestamp).collect();
    assert_eq!(stamps, vec![1]);
    assert_eq!(report.stats.failed, 2);
    assert_eq!(report.stats.levels_rejected, 2);
}

// ============================================================================
// Sources and sinks
// ============================================================================

#[test]
fn test_jsonl_source_to_sink() {
    let input = r#"{"timestamp":10,"side":"ask","price":101.0,"quantity":5.0}
{"timestamp":10,"side":"ask","price":102.0,"quantity":5.0}

{"timestamp":10,"side":"bid","price":99.0,"quantity":5.0}
not json
{"timestamp":10,"side":"bid","price":98.0,"quantity":5.0}
"#;
    let source = JsonLinesSource::from_reader(Cursor::new(input));
    let mut tracker = WarningTracker::new();
    let report = sequential(700.0)
        .run_source_tracked(source, &mut tracker)
        .unwrap();

    assert_eq!(report.stats.parse_errors, 1);
    assert_eq!(report.stats.levels_accepted, 4);
    assert_eq!(tracker.count_by_category(WarningCategory::Other), 1);
    assert_eq!(report.records.len(), 1);

    let mut sink = JsonLinesSink::new(Vec::new());
    assert_eq!(sink.write_all(&report.records).unwrap(), 1);
    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    assert!(text.starts_with("{\"timestamp\":10,"));
    assert!(text.ends_with('\n'));
}

#[test]
fn test_vec_source_and_summary() {
    let levels = window(30);
    let direct = sequential(8_000.0).run(levels.clone()).unwrap();
    let via_source = sequential(8_000.0).run_source(VecSource::new(levels)).unwrap();
    assert_eq!(direct.records, via_source.records);

    let summary = SlippageSummary::from_records(&direct.records);
    assert_eq!(summary.records, direct.records.len() as u64);
    assert!(summary.buy.percent_slippage.min >= 0.0);
    assert!(summary.sell.percent_slippage.min >= 0.0);
}

#[test]
fn test_invalid_utf8_line_does_not_abort_run() {
    let mut input: Vec<u8> = Vec::new();
    input.extend_from_slice(b"{\"timestamp\":10,\"side\":\"ask\",\"price\":101.0,\"quantity\":5.0}\n");
    input.extend_from_slice(b"{\"timestamp\":10,\"side\":\"ask\",\"price\":102.0,\"quantity\":5.0}\n");
    input.extend_from_slice(b"\xff\xfe x\n");
    input.extend_from_slice(b"{\"timestamp\":10,\"side\":\"bid\",\"price\":99.0,\"quantity\":10.0}\n");

    let source = JsonLinesSource::from_reader(Cursor::new(input));
    let report = sequential(700.0).run_source(source).unwrap();

    assert_eq!(report.stats.parse_errors, 1);
    assert_eq!(report.stats.levels_accepted, 3);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].timestamp, 10);
}
