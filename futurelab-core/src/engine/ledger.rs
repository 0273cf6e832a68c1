//! Ledger — cash, signed positions and the append-only trade log of one run.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::backtest::{BacktestError, Operation};
use crate::data::{Multipliers, PricePanel};
use crate::domain::{ContractId, Trade};

/// Account state of a single backtest.
///
/// The ledger is owned by exactly one run and only changes through
/// [`Ledger::record`] and [`Ledger::flatten`]. Value identity at every date:
/// `value == cash + Σ position × price × multiplier`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: f64,
    positions: BTreeMap<ContractId, f64>,
    trades: Vec<Trade>,
    slippage_paid: f64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Ledger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            slippage_paid: 0.0,
        }
    }

    /// Apply a fill to cash and position, then append it to the log.
    pub fn record(&mut self, trade: Trade, multiplier: f64) {
        self.cash -= trade.quantity * trade.fill_price * multiplier;
        *self.positions.entry(trade.contract.clone()).or_insert(0.0) += trade.quantity;
        self.slippage_paid += trade.slippage_cost(multiplier);
        self.trades.push(trade);
    }

    /// Force a position to exactly zero, discarding floating-point residue.
    pub fn flatten(&mut self, contract: &str) {
        if let Some(qty) = self.positions.get_mut(contract) {
            *qty = 0.0;
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Signed quantity held (0.0 if never traded).
    pub fn position(&self, contract: &str) -> f64 {
        self.positions.get(contract).copied().unwrap_or(0.0)
    }

    pub fn positions(&self) -> &BTreeMap<ContractId, f64> {
        &self.positions
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Cumulative dollar slippage across all recorded trades.
    pub fn slippage_paid(&self) -> f64 {
        self.slippage_paid
    }

    /// Mark-to-market value on `date`.
    ///
    /// Contracts with an exactly-zero position are skipped and need no price.
    pub fn value(
        &self,
        date: NaiveDate,
        prices: &PricePanel,
        multipliers: &Multipliers,
    ) -> Result<f64, BacktestError> {
        let mut value = self.cash;
        for (contract, &qty) in &self.positions {
            if qty == 0.0 {
                continue;
            }
            let price = prices
                .price(date, contract)
                .ok_or_else(|| BacktestError::MissingPrice {
                    date,
                    contract: contract.clone(),
                    operation: Operation::Valuation,
                })?;
            value += qty * price * multipliers.get(contract);
        }
        Ok(value)
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}
