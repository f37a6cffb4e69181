//! Property-based tests for depth walk invariants
//!
//! - Cumulative quantity and cost never decrease along walk order
//! - A ladder has at most one clearing row, and exactly one when its depth
//!   reaches the notional
//! - A side that cannot absorb the notional never appears in the output
//! - A single level worth exactly the notional clears at zero slippage
//! - Output does not depend on input arrival order

use lob_slippage::{
    BookLevel, DepthWalker, EngineConfig, Ladder, Parallelism, Side, SlippageEngine,
};
use proptest::prelude::*;

/// Positive, reasonable price range
fn arb_price() -> impl Strategy<Value = f64> {
    1.0f64..5_000.0f64
}

/// Positive, reasonable quantity range
fn arb_quantity() -> impl Strategy<Value = f64> {
    0.001f64..100.0f64
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Bid), Just(Side::Ask)]
}

fn arb_rows() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((arb_price(), arb_quantity()), 1..40)
}

fn arb_order_amount() -> impl Strategy<Value = f64> {
    1.0f64..2_000_000.0f64
}

fn build_ladder(ts: i64, side: Side, rows: &[(f64, f64)]) -> Ladder {
    let levels = rows
        .iter()
        .map(|&(price, quantity)| BookLevel::new(ts, side, price, quantity))
        .collect();
    Ladder::new(ts, side, levels).unwrap()
}

fn sequential_engine(order_amount: f64) -> SlippageEngine {
    SlippageEngine::new(EngineConfig::new(order_amount).with_parallelism(Parallelism::Sequential))
        .unwrap()
}

proptest! {
    #[test]
    fn prop_cumulative_sums_monotone(
        rows in arb_rows(),
        side in arb_side(),
        order_amount in arb_order_amount(),
    ) {
        let ladder = build_ladder(1, side, &rows);
        let walk = DepthWalker::new(order_amount).unwrap().walk(&ladder).unwrap();

        prop_assert_eq!(walk.rows.len(), rows.len());
        for pair in walk.rows.windows(2) {
            prop_assert!(pair[1].cum_quantity >= pair[0].cum_quantity);
            prop_assert!(pair[1].cum_cost >= pair[0].cum_cost);
        }
    }

    #[test]
    fn prop_at_most_one_clearing_row(
        rows in arb_rows(),
        side in arb_side(),
        order_amount in arb_order_amount(),
    ) {
        let ladder = build_ladder(1, side, &rows);
        let walk = DepthWalker::new(order_amount).unwrap().walk(&ladder).unwrap();

        let fills = walk.fills().count();
        let reaches = walk.rows.last().map_or(false, |r| r.cum_cost >= order_amount);

        prop_assert!(fills <= 1);
        prop_assert_eq!(fills == 1, reaches);
        prop_assert_eq!(walk.is_insufficient(), !reaches);
    }

    #[test]
    fn prop_clearing_row_is_first_crossing(
        rows in arb_rows(),
        side in arb_side(),
        order_amount in arb_order_amount(),
    ) {
        let ladder = build_ladder(1, side, &rows);
        let walk = DepthWalker::new(order_amount).unwrap().walk(&ladder).unwrap();

        if let Some(fill) = walk.fills().next() {
            prop_assert!(fill.cum_cost >= order_amount);
            if fill.row > 0 {
                prop_assert!(walk.rows[fill.row - 1].cum_cost < order_amount);
            }
            let q = fill.filled_quantity.unwrap();
            prop_assert!(q > 0.0);
            prop_assert!(q <= fill.cum_quantity * (1.0 + 1e-12));
        };
    }

    #[test]
    fn prop_slippage_is_adverse_on_both_sides(
        bids in arb_rows(),
        asks in arb_rows(),
        order_amount in arb_order_amount(),
    ) {
        let mut levels: Vec<BookLevel> =
            bids.iter().map(|&(p, q)| BookLevel::bid(9, p, q)).collect();
        levels.extend(asks.iter().map(|&(p, q)| BookLevel::ask(9, p, q)));

        let report = sequential_engine(order_amount).run(levels).unwrap();
        for record in &report.records {
            prop_assert!(record.buy_percent_slippage >= -1e-12);
            prop_assert!(record.sell_percent_slippage >= -1e-12);
            prop_assert!(record.buy_dollar_slippage >= -1e-6 * order_amount);
            prop_assert!(record.sell_dollar_slippage >= -1e-6 * order_amount);
        }
    }

    #[test]
    fn prop_insufficient_side_dropped(
        rows in arb_rows(),
        deep_side in arb_side(),
    ) {
        // The other side is a single tiny level that never reaches the notional
        let ladder = build_ladder(5, deep_side, &rows);
        let depth = ladder.total_notional();
        let order_amount = depth * 0.5;
        prop_assume!(order_amount > 1.0);

        let thin_side = match deep_side {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        };
        let mut levels = ladder.levels().to_vec();
        levels.push(BookLevel::new(5, thin_side, 1.0, 0.5));

        let report = sequential_engine(order_amount).run(levels).unwrap();
        prop_assert!(report.records.is_empty());
        prop_assert_eq!(report.stats.insufficient_depth, 1);
        prop_assert_eq!(report.stats.buy_only + report.stats.sell_only, 1);
    }

    #[test]
    fn prop_exact_single_level_is_zero(
        price in 1u32..10_000u32,
        quantity in 1u32..10_000u32,
        side in arb_side(),
    ) {
        let order_amount = price as f64 * quantity as f64;
        let ladder = build_ladder(1, side, &[(price as f64, quantity as f64)]);
        let walk = DepthWalker::new(order_amount).unwrap().walk(&ladder).unwrap();

        let fill = walk.fills().next();
        prop_assert!(fill.is_some());
        let metrics = fill.unwrap().candidate.metrics().copied().unwrap();
        prop_assert_eq!(metrics.percent_slippage, 0.0);
        prop_assert_eq!(metrics.currency_slippage, 0.0);
    }

    #[test]
    fn prop_arrival_order_irrelevant(
        bids in prop::collection::btree_set(100u32..2_000u32, 1..20),
        asks in prop::collection::btree_set(2_001u32..4_000u32, 1..20),
        order_amount in 1_000.0f64..50_000.0f64,
    ) {
        // Distinct prices per side, so the sorted ladder is unique
        let mut levels: Vec<BookLevel> = bids
            .iter()
            .map(|&p| BookLevel::bid(1, p as f64 / 10.0, 3.0))
            .chain(asks.iter().map(|&p| BookLevel::ask(1, p as f64 / 10.0, 3.0)))
            .collect();

        let engine = sequential_engine(order_amount);
        let forward = serde_json::to_string(&engine.run(levels.clone()).unwrap().records).unwrap();
        levels.reverse();
        let backward = serde_json::to_string(&engine.run(levels).unwrap().records).unwrap();

        prop_assert_eq!(forward, backward);
    }
}
