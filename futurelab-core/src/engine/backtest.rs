//! Date-by-date backtest loop over roll and order schedules.
//!
//! Each date of the price panel is settled in three phases before the next
//! date begins:
//! 1. Scheduled rolls: close the old leg, open the new leg, zero the old position
//! 2. Scheduled orders, in list order
//! 3. Mark-to-market valuation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::ledger::Ledger;
use super::simulator::ExecutionSimulator;
use crate::data::{Multipliers, PricePanel};
use crate::domain::{ContractId, OrderSchedule, RollSchedule, Trade, TradeSource};

/// What the engine was doing when a price lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Trade,
    Valuation,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Trade => write!(f, "trade"),
            Operation::Valuation => write!(f, "valuation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("no price for '{contract}' on {date} during {operation}")]
    MissingPrice {
        date: NaiveDate,
        contract: ContractId,
        operation: Operation,
    },
}

/// Portfolio value at the close of one date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Complete output of one backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub values: Vec<ValuePoint>,
    pub trades: Vec<Trade>,
    pub final_cash: f64,
    pub final_positions: BTreeMap<ContractId, f64>,
    pub slippage_paid: f64,
    /// Schedule dates that never appeared in the price panel.
    pub unprocessed_dates: Vec<NaiveDate>,
}

impl BacktestResult {
    /// Value on the last processed date, or `None` for an empty panel.
    pub fn final_value(&self) -> Option<f64> {
        self.values.last().map(|p| p.value)
    }

    pub fn roll_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.source == TradeSource::Roll)
    }

    pub fn order_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.source == TradeSource::Order)
    }
}

/// Drives roll and order schedules through a price panel.
///
/// The engine is immutable during a run; all mutable state lives in the
/// [`Ledger`] owned by that run.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    prices: PricePanel,
    multipliers: Multipliers,
    simulator: ExecutionSimulator,
    initial_cash: f64,
}

impl BacktestEngine {
    pub fn new(prices: PricePanel) -> Self {
        Self {
            prices,
            multipliers: Multipliers::new(),
            simulator: ExecutionSimulator::frictionless(),
            initial_cash: 0.0,
        }
    }

    pub fn with_multipliers(mut self, multipliers: Multipliers) -> Self {
        self.multipliers = multipliers;
        self
    }

    pub fn with_slippage_bps(mut self, slippage_bps: f64) -> Self {
        self.simulator = ExecutionSimulator::new(slippage_bps);
        self
    }

    pub fn with_initial_cash(mut self, initial_cash: f64) -> Self {
        self.initial_cash = initial_cash;
        self
    }

    pub fn prices(&self) -> &PricePanel {
        &self.prices
    }

    pub fn multipliers(&self) -> &Multipliers {
        &self.multipliers
    }

    pub fn simulator(&self) -> ExecutionSimulator {
        self.simulator
    }

    /// Run the full date range. Aborts on the first missing price.
    pub fn run(
        &self,
        orders: &OrderSchedule,
        rolls: &RollSchedule,
    ) -> Result<BacktestResult, BacktestError> {
        let mut ledger = Ledger::new(self.initial_cash);
        let mut values = Vec::with_capacity(self.prices.len());

        for date in self.prices.dates() {
            let value = self.step(&mut ledger, date, orders, rolls)?;
            values.push(ValuePoint { date, value });
        }

        let unprocessed_dates = self.unprocessed_dates(orders, rolls);
        if !unprocessed_dates.is_empty() {
            warn!(
                count = unprocessed_dates.len(),
                first = %unprocessed_dates[0],
                "scheduled dates absent from the price panel were skipped"
            );
        }

        let final_value = values.last().map(|p| p.value).unwrap_or(ledger.cash());
        info!(
            dates = values.len(),
            trades = ledger.trades().len(),
            final_value,
            slippage_paid = ledger.slippage_paid(),
            "backtest complete"
        );

        let final_cash = ledger.cash();
        let final_positions = ledger.positions().clone();
        let slippage_paid = ledger.slippage_paid();
        Ok(BacktestResult {
            values,
            trades: ledger.into_trades(),
            final_cash,
            final_positions,
            slippage_paid,
            unprocessed_dates,
        })
    }

    /// Settle one date: rolls, then orders, then valuation.
    pub fn step(
        &self,
        ledger: &mut Ledger,
        date: NaiveDate,
        orders: &OrderSchedule,
        rolls: &RollSchedule,
    ) -> Result<f64, BacktestError> {
        for roll in rolls.on(date) {
            let qty = ledger.position(&roll.from);
            if qty == 0.0 {
                debug!(%date, from = %roll.from, to = %roll.to, "roll skipped, no position");
                continue;
            }
            self.trade(ledger, date, &roll.from, -qty, TradeSource::Roll)?;
            self.trade(ledger, date, &roll.to, qty, TradeSource::Roll)?;
            ledger.flatten(&roll.from);
        }

        for order in orders.on(date) {
            self.trade(ledger, date, &order.contract, order.quantity, TradeSource::Order)?;
        }

        ledger.value(date, &self.prices, &self.multipliers)
    }

    fn trade(
        &self,
        ledger: &mut Ledger,
        date: NaiveDate,
        contract: &str,
        quantity: f64,
        source: TradeSource,
    ) -> Result<(), BacktestError> {
        self.simulator.execute(
            ledger,
            &self.prices,
            &self.multipliers,
            date,
            contract,
            quantity,
            source,
        )?;
        debug!(%date, contract, quantity, ?source, "trade filled");
        Ok(())
    }

    fn unprocessed_dates(&self, orders: &OrderSchedule, rolls: &RollSchedule) -> Vec<NaiveDate> {
        orders
            .dates()
            .chain(rolls.dates())
            .filter(|d| !self.prices.contains_date(*d))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn two_contract_prices() -> PricePanel {
        PricePanel::from_rows(vec![
            (d(1), "F1", 100.0),
            (d(1), "F2", 102.0),
            (d(2), "F1", 101.0),
            (d(2), "F2", 102.0),
            (d(3), "F1", 101.0),
            (d(3), "F2", 103.0),
        ])
    }

    #[test]
    fn empty_schedules_hold_cash_flat() {
        let engine = BacktestEngine::new(two_contract_prices()).with_initial_cash(1_000.0);
        let result = engine
            .run(&OrderSchedule::new(), &RollSchedule::new())
            .unwrap();
        assert_eq!(result.values.len(), 3);
        assert!(result.values.iter().all(|p| p.value == 1_000.0));
        assert!(result.trades.is_empty());
    }

    #[test]
    fn roll_without_position_is_a_no_op() {
        let mut rolls = RollSchedule::new();
        rolls.push(d(2), "F1", "F2");
        let engine = BacktestEngine::new(two_contract_prices()).with_slippage_bps(10.0);
        let result = engine.run(&OrderSchedule::new(), &rolls).unwrap();
        assert!(result.trades.is_empty());
        assert_eq!(result.final_value(), Some(0.0));
    }

    #[test]
    fn roll_moves_position_and_zeroes_old_leg() {
        let mut orders = OrderSchedule::new();
        orders.push(d(1), "F1", 3.0);
        let mut rolls = RollSchedule::new();
        rolls.push(d(2), "F1", "F2");

        let engine = BacktestEngine::new(two_contract_prices());
        let result = engine.run(&orders, &rolls).unwrap();

        assert_eq!(result.final_positions.get("F1"), Some(&0.0));
        assert_eq!(result.final_positions.get("F2"), Some(&3.0));
        let roll_legs: Vec<_> = result
            .roll_trades()
            .map(|t| (t.contract.as_str(), t.quantity))
            .collect();
        assert_eq!(roll_legs, vec![("F1", -3.0), ("F2", 3.0)]);
    }

    #[test]
    fn unprocessed_schedule_dates_are_reported() {
        let mut orders = OrderSchedule::new();
        orders.push(d(9), "F1", 1.0);
        let mut rolls = RollSchedule::new();
        rolls.push(d(8), "F1", "F2");
        rolls.push(d(9), "F1", "F2");

        let engine = BacktestEngine::new(two_contract_prices());
        let result = engine.run(&orders, &rolls).unwrap();
        assert_eq!(result.unprocessed_dates, vec![d(8), d(9)]);
        assert!(result.trades.is_empty());
    }

    #[test]
    fn missing_trade_price_aborts() {
        let mut orders = OrderSchedule::new();
        orders.push(d(2), "F3", 1.0);
        let engine = BacktestEngine::new(two_contract_prices());
        let err = engine.run(&orders, &RollSchedule::new()).unwrap_err();
        assert_eq!(
            err,
            BacktestError::MissingPrice {
                date: d(2),
                contract: "F3".into(),
                operation: Operation::Trade,
            }
        );
        assert!(err.to_string().contains("during trade"));
    }

    #[test]
    fn empty_panel_has_no_final_value() {
        let engine = BacktestEngine::new(PricePanel::new());
        let result = engine
            .run(&OrderSchedule::new(), &RollSchedule::new())
            .unwrap();
        assert_eq!(result.final_value(), None);
    }
}
