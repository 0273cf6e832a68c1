//! Execution simulator — slippage-adjusted fills applied to a ledger.
//!
//! Slippage is directional: buyers pay more (higher price), sellers receive less (lower price).
//! Zero-quantity trades fill at the reference price.

use chrono::NaiveDate;

use super::backtest::{BacktestError, Operation};
use super::ledger::Ledger;
use crate::data::{Multipliers, PricePanel};
use crate::domain::{Trade, TradeSource};

/// Fixed basis-point slippage model and fill executor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecutionSimulator {
    /// Slippage in basis points, applied directionally.
    pub slippage_bps: f64,
}

impl ExecutionSimulator {
    pub fn new(slippage_bps: f64) -> Self {
        Self { slippage_bps }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0)
    }

    /// Fill price for a signed quantity at reference price `price`.
    ///
    /// `price * (1 + slip * sign(quantity))` with `slip = bps / 10_000`.
    pub fn fill_price(&self, price: f64, quantity: f64) -> f64 {
        let slip_fraction = self.slippage_bps / 10_000.0;
        price * (1.0 + slip_fraction * direction(quantity))
    }

    /// Execute one trade at `date`'s panel price and record it in the ledger.
    pub fn execute(
        &self,
        ledger: &mut Ledger,
        prices: &PricePanel,
        multipliers: &Multipliers,
        date: NaiveDate,
        contract: &str,
        quantity: f64,
        source: TradeSource,
    ) -> Result<(), BacktestError> {
        let reference_price =
            prices
                .price(date, contract)
                .ok_or_else(|| BacktestError::MissingPrice {
                    date,
                    contract: contract.to_string(),
                    operation: Operation::Trade,
                })?;

        let trade = Trade {
            date,
            contract: contract.to_string(),
            quantity,
            fill_price: self.fill_price(reference_price, quantity),
            reference_price,
            source,
        };
        ledger.record(trade, multipliers.get(contract));
        Ok(())
    }
}

/// -1, 0 or +1. Unlike `f64::signum`, zero maps to zero.
fn direction(quantity: f64) -> f64 {
    if quantity > 0.0 {
        1.0
    } else if quantity < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    #[test]
    fn frictionless_returns_raw_price() {
        let sim = ExecutionSimulator::frictionless();
        assert_eq!(sim.fill_price(100.0, 5.0), 100.0);
        assert_eq!(sim.fill_price(100.0, -5.0), 100.0);
    }

    #[test]
    fn buy_slippage_increases_price() {
        let sim = ExecutionSimulator::new(10.0); // 10 bps
        // 100 * (1 + 10/10000) = 100.10
        assert!((sim.fill_price(100.0, 3.0) - 100.10).abs() < 1e-10);
    }

    #[test]
    fn sell_slippage_decreases_price() {
        let sim = ExecutionSimulator::new(10.0);
        // 100 * (1 - 10/10000) = 99.90
        assert!((sim.fill_price(100.0, -3.0) - 99.90).abs() < 1e-10);
    }

    #[test]
    fn zero_quantity_pays_no_slippage() {
        let sim = ExecutionSimulator::new(50.0);
        assert_eq!(sim.fill_price(100.0, 0.0), 100.0);
    }

    #[test]
    fn execute_applies_multiplier_to_cash() {
        let sim = ExecutionSimulator::new(10.0);
        let prices = PricePanel::from_rows(vec![(d(1), "ES", 4000.0)]);
        let multipliers = Multipliers::new().with("ES", 50.0);
        let mut ledger = Ledger::new(0.0);

        sim.execute(&mut ledger, &prices, &multipliers, d(1), "ES", 1.0, TradeSource::Order)
            .unwrap();

        let fill = 4000.0 * 1.001;
        assert!((ledger.cash() + fill * 50.0).abs() < 1e-6);
        assert_eq!(ledger.position("ES"), 1.0);
        let trade = &ledger.trades()[0];
        assert_eq!(trade.reference_price, 4000.0);
        assert!((trade.fill_price - fill).abs() < 1e-9);
    }

    #[test]
    fn execute_missing_price_is_a_lookup_error() {
        let sim = ExecutionSimulator::default();
        let mut ledger = Ledger::default();
        let err = sim
            .execute(
                &mut ledger,
                &PricePanel::new(),
                &Multipliers::new(),
                d(2),
                "F1",
                1.0,
                TradeSource::Order,
            )
            .unwrap_err();
        assert_eq!(
            err,
            BacktestError::MissingPrice {
                date: d(2),
                contract: "F1".into(),
                operation: Operation::Trade,
            }
        );
        assert!(ledger.trades().is_empty());
    }
}
