//! Integration tests for the schedule-driven backtest engine.
//!
//! Tests:
//! 1. Reference roll scenario with slippage
//! 2. Same-day ordering: rolls strictly before orders
//! 3. Conservation: no activity leaves cash untouched
//! 4. Missing prices abort trades and valuations
//! 5. Multipliers and builder-produced roll schedules

use chrono::NaiveDate;
use futurelab_core::data::{ContractPanel, Multipliers, PricePanel};
use futurelab_core::domain::{ContractRecord, OrderSchedule, PriceConvention, RollSchedule, TradeSource};
use futurelab_core::engine::{BacktestEngine, BacktestError, Operation};
use futurelab_core::roll::RollPolicy;
use futurelab_core::series::ContinuousSeriesBuilder;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

/// F1 `[100, 101, 101]`, F2 `[102, 102, 103]` over three days.
fn reference_prices() -> PricePanel {
    PricePanel::from_rows(vec![
        (d(1), "F1", 100.0),
        (d(2), "F1", 101.0),
        (d(3), "F1", 101.0),
        (d(1), "F2", 102.0),
        (d(2), "F2", 102.0),
        (d(3), "F2", 103.0),
    ])
}

fn reference_schedules() -> (OrderSchedule, RollSchedule) {
    let mut orders = OrderSchedule::new();
    orders.push(d(1), "F1", 1.0);
    orders.push(d(3), "F2", -1.0);
    let mut rolls = RollSchedule::new();
    rolls.push(d(2), "F1", "F2");
    (orders, rolls)
}

// ── 1. Reference scenario ────────────────────────────────────────────

#[test]
fn reference_roll_scenario_with_slippage() {
    let (orders, rolls) = reference_schedules();
    let engine = BacktestEngine::new(reference_prices()).with_slippage_bps(10.0);
    let result = engine.run(&orders, &rolls).unwrap();

    // buy 100.1, roll sell 100.899, roll buy 102.102, sell 102.897
    let fills: Vec<f64> = result.trades.iter().map(|t| t.fill_price).collect();
    let expected = [100.1, 100.899, 102.102, 102.897];
    for (fill, want) in fills.iter().zip(expected) {
        assert!((fill - want).abs() < 1e-9, "fill {fill} != {want}");
    }

    assert_eq!(result.values.len(), 3);
    assert!((result.values[0].value - (-0.1)).abs() < 1e-9);
    assert!((result.values[1].value - 0.697).abs() < 1e-9);
    let final_value = result.final_value().unwrap();
    assert!((final_value - 1.594).abs() < 1e-9, "final value {final_value}");
    assert!((result.final_cash - 1.594).abs() < 1e-9);
    assert!(result.final_positions.values().all(|&q| q == 0.0));
}

#[test]
fn frictionless_reference_scenario() {
    let (orders, rolls) = reference_schedules();
    let result = BacktestEngine::new(reference_prices())
        .run(&orders, &rolls)
        .unwrap();
    // +1 on F1 (100 -> 101), +1 on F2 (102 -> 103)
    assert!((result.final_value().unwrap() - 2.0).abs() < 1e-12);
    assert_eq!(result.slippage_paid, 0.0);
}

#[test]
fn slippage_paid_is_the_frictionless_gap() {
    let (orders, rolls) = reference_schedules();
    let prices = reference_prices();
    let with_slip = BacktestEngine::new(prices.clone())
        .with_slippage_bps(10.0)
        .run(&orders, &rolls)
        .unwrap();
    let frictionless = BacktestEngine::new(prices).run(&orders, &rolls).unwrap();

    let gap = frictionless.final_value().unwrap() - with_slip.final_value().unwrap();
    assert!((with_slip.slippage_paid - gap).abs() < 1e-9);
}

// ── 2. Same-day ordering ─────────────────────────────────────────────

#[test]
fn rolls_execute_before_orders_on_the_same_date() {
    let (mut orders, rolls) = reference_schedules();
    orders.push(d(2), "F2", 2.0);

    let result = BacktestEngine::new(reference_prices())
        .run(&orders, &rolls)
        .unwrap();
    let day2: Vec<_> = result
        .trades
        .iter()
        .filter(|t| t.date == d(2))
        .map(|t| (t.contract.as_str(), t.quantity, t.source))
        .collect();
    assert_eq!(
        day2,
        vec![
            ("F1", -1.0, TradeSource::Roll),
            ("F2", 1.0, TradeSource::Roll),
            ("F2", 2.0, TradeSource::Order),
        ]
    );
    assert_eq!(result.final_positions.get("F2"), Some(&2.0));
}

#[test]
fn orders_on_one_date_execute_in_list_order() {
    let mut orders = OrderSchedule::new();
    orders.push(d(1), "F2", 1.0);
    orders.push(d(1), "F1", -3.0);
    orders.push(d(1), "F2", -1.0);
    let result = BacktestEngine::new(reference_prices())
        .run(&orders, &RollSchedule::new())
        .unwrap();
    let sequence: Vec<_> = result
        .trades
        .iter()
        .map(|t| (t.contract.as_str(), t.quantity))
        .collect();
    assert_eq!(sequence, vec![("F2", 1.0), ("F1", -3.0), ("F2", -1.0)]);
}

#[test]
fn short_position_rolls_with_its_sign() {
    let mut orders = OrderSchedule::new();
    orders.push(d(1), "F1", -2.0);
    let mut rolls = RollSchedule::new();
    rolls.push(d(2), "F1", "F2");

    let result = BacktestEngine::new(reference_prices())
        .run(&orders, &rolls)
        .unwrap();
    let legs: Vec<_> = result.roll_trades().map(|t| t.quantity).collect();
    assert_eq!(legs, vec![2.0, -2.0]);
    assert_eq!(result.final_positions.get("F2"), Some(&-2.0));
}

// ── 3. Conservation ──────────────────────────────────────────────────

#[test]
fn no_activity_keeps_value_at_initial_cash() {
    let result = BacktestEngine::new(reference_prices())
        .with_initial_cash(25_000.0)
        .with_slippage_bps(5.0)
        .run(&OrderSchedule::new(), &RollSchedule::new())
        .unwrap();
    assert_eq!(result.values.len(), 3);
    for point in &result.values {
        assert_eq!(point.value, 25_000.0);
    }
    assert_eq!(result.final_cash, 25_000.0);
}

// ── 4. Missing prices ────────────────────────────────────────────────

#[test]
fn valuation_without_price_aborts() {
    let prices = PricePanel::from_rows(vec![
        (d(1), "F1", 100.0),
        (d(2), "F2", 102.0),
    ]);
    let mut orders = OrderSchedule::new();
    orders.push(d(1), "F1", 1.0);

    let err = BacktestEngine::new(prices)
        .run(&orders, &RollSchedule::new())
        .unwrap_err();
    assert_eq!(
        err,
        BacktestError::MissingPrice {
            date: d(2),
            contract: "F1".into(),
            operation: Operation::Valuation,
        }
    );
}

#[test]
fn roll_into_unpriced_contract_aborts() {
    let (orders, mut rolls) = reference_schedules();
    rolls.push(d(2), "F2", "F9");
    let err = BacktestEngine::new(reference_prices())
        .run(&orders, &rolls)
        .unwrap_err();
    assert!(matches!(
        err,
        BacktestError::MissingPrice { ref contract, operation: Operation::Trade, .. } if contract == "F9"
    ));
}

// ── 5. Multipliers and builder integration ───────────────────────────

#[test]
fn multiplier_scales_cash_and_value() {
    let (orders, rolls) = reference_schedules();
    let multipliers = Multipliers::new().with("F1", 50.0).with("F2", 50.0);
    let result = BacktestEngine::new(reference_prices())
        .with_multipliers(multipliers)
        .with_slippage_bps(10.0)
        .run(&orders, &rolls)
        .unwrap();
    assert!((result.final_value().unwrap() - 1.594 * 50.0).abs() < 1e-6);
}

#[test]
fn builder_roll_schedule_drives_the_engine() {
    let mut records = Vec::new();
    let f1 = [100.0, 101.0, 101.0];
    let f2 = [102.0, 102.0, 103.0];
    let f1_volume = [10.0, 5.0, 1.0];
    let f2_volume = [1.0, 8.0, 20.0];
    for i in 0..3 {
        let date = d(1 + i as u32);
        records.push(ContractRecord::new(date, "F1", f1[i], f1_volume[i], 0.0, d(20)));
        records.push(ContractRecord::new(date, "F2", f2[i], f2_volume[i], 0.0, d(31)));
    }
    let panel = ContractPanel::from_records(records).unwrap();
    let series = ContinuousSeriesBuilder::new(RollPolicy::volume())
        .build(&panel)
        .unwrap();

    let rolls = series.roll_schedule();
    assert_eq!(rolls.on(d(2)).len(), 1);

    let mut orders = OrderSchedule::new();
    orders.push(d(1), "F1", 1.0);
    orders.push(d(3), "F2", -1.0);

    let result = BacktestEngine::new(PricePanel::from_contract_panel(&panel))
        .with_slippage_bps(10.0)
        .run(&orders, &rolls)
        .unwrap();
    assert!((result.final_value().unwrap() - 1.594).abs() < 1e-9);

    // Trading the back-adjusted series directly captures the same price path
    let continuous = PricePanel::from_series(series.bars(), "CONT", PriceConvention::BackAdjusted);
    let mut cont_orders = OrderSchedule::new();
    cont_orders.push(d(1), "CONT", 1.0);
    cont_orders.push(d(3), "CONT", -1.0);
    let cont = BacktestEngine::new(continuous)
        .run(&cont_orders, &RollSchedule::new())
        .unwrap();
    assert!((cont.final_value().unwrap() - 2.0).abs() < 1e-9);
}
