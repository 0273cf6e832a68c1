//! FutureLab Core — continuous futures series and schedule-driven backtesting.
//!
//! This crate contains:
//! - Domain types (contract observations, continuous bars, schedules, trades)
//! - Panel ingestion with one explicit schema validation pass
//! - Roll policy with a closed set of prioritized triggers
//! - Continuous series builder with back- and ratio-adjustment
//! - Ledger, slippage simulator and the date-by-date backtest loop
//!
//! Nothing here performs I/O; file formats and orchestration live in
//! `futurelab-runner`.

pub mod data;
pub mod domain;
pub mod engine;
pub mod roll;
pub mod series;

pub use data::{ContractPanel, Multipliers, PricePanel, SchemaError};
pub use domain::{
    ContinuousBar, ContractId, ContractRecord, OrderSchedule, PriceConvention, RollSchedule, Trade,
};
pub use engine::{BacktestEngine, BacktestError, BacktestResult};
pub use roll::{RollPolicy, RollTrigger};
pub use series::{ContinuousSeries, ContinuousSeriesBuilder, ExpiryPolicy, SeriesError};
