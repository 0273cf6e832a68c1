//! Backtesting engine — ledger, slippage simulator and the date-by-date loop.
//!
//! Per date of the price panel:
//! 1. Scheduled rolls (close old leg, open new leg)
//! 2. Scheduled orders
//! 3. Valuation: `cash + Σ position × price × multiplier`

pub mod backtest;
pub mod ledger;
pub mod simulator;

pub use backtest::{BacktestEngine, BacktestError, BacktestResult, Operation, ValuePoint};
pub use ledger::Ledger;
pub use simulator::ExecutionSimulator;
