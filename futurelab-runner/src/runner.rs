//! Job runner — wires together loading, series construction and the backtest.
//!
//! Entry points:
//! - `run_job()`: one config → series + backtest result. Used by the CLI `run` command.
//! - `run_batch()`: independent jobs in parallel with Rayon, results in input order.
//! - `build_series()`: panel file → continuous series only. Used by the CLI `build` command.

use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use futurelab_core::data::PricePanel;
use futurelab_core::domain::OrderSchedule;
use futurelab_core::engine::{BacktestEngine, BacktestError, BacktestResult};
use futurelab_core::series::{ContinuousSeries, SeriesError};

use crate::config::{ConfigError, FutureLabConfig, RollConfig, RunId};
use crate::loader::{load_orders, load_panel, load_rolls, LoadError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("series error: {0}")]
    Series(#[from] SeriesError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for persisted summaries.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete output of one job.
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub run_id: RunId,
    pub name: String,
    pub series: ContinuousSeries,
    pub backtest: BacktestResult,
}

/// Headline numbers of a job, persisted as `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub name: String,
    pub final_value: Option<f64>,
    pub final_cash: f64,
    pub trade_count: usize,
    pub roll_count: usize,
    pub slippage_paid: f64,
    pub value_points: usize,
    pub carried_forward_days: usize,
    pub unprocessed_dates: Vec<chrono::NaiveDate>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl JobOutput {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            schema_version: SCHEMA_VERSION,
            run_id: self.run_id.clone(),
            name: self.name.clone(),
            final_value: self.backtest.final_value(),
            final_cash: self.backtest.final_cash,
            trade_count: self.backtest.trades.len(),
            roll_count: self.series.rolls().len(),
            slippage_paid: self.backtest.slippage_paid,
            value_points: self.backtest.values.len(),
            carried_forward_days: self.series.carried_forward_days(),
            unprocessed_dates: self.backtest.unprocessed_dates.clone(),
        }
    }
}

/// Load a panel file and build its continuous series.
pub fn build_series(panel_path: &Path, roll: &RollConfig) -> Result<ContinuousSeries, RunError> {
    let panel = load_panel(panel_path)?;
    Ok(roll.builder().build(&panel)?)
}

/// Run one job end to end.
///
/// The backtest trades individual contracts at their raw panel prices. The
/// roll schedule comes from the config's `rolls` file if given, otherwise
/// from the builder's own rolls.
pub fn run_job(config: &FutureLabConfig) -> Result<JobOutput, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    info!(name = %config.name, run_id = %short_id(&run_id), "job started");

    let panel = load_panel(&config.resolve(&config.panel))?;
    let series = config.roll.builder().build(&panel)?;

    let orders = match &config.orders {
        Some(path) => load_orders(&config.resolve(path))?,
        None => OrderSchedule::new(),
    };
    let rolls = match &config.rolls {
        Some(path) => load_rolls(&config.resolve(path))?,
        None => series.roll_schedule(),
    };

    let engine = BacktestEngine::new(PricePanel::from_contract_panel(&panel))
        .with_multipliers(config.multipliers.clone())
        .with_slippage_bps(config.backtest.slippage_bps)
        .with_initial_cash(config.backtest.initial_cash);
    let backtest = engine.run(&orders, &rolls)?;

    info!(
        name = %config.name,
        final_value = backtest.final_value().unwrap_or(backtest.final_cash),
        trades = backtest.trades.len(),
        rolls = series.rolls().len(),
        "job finished"
    );

    Ok(JobOutput {
        run_id,
        name: config.name.clone(),
        series,
        backtest,
    })
}

/// Load a config file and run it.
pub fn run_config_file(path: &Path) -> Result<JobOutput, RunError> {
    let config = FutureLabConfig::from_file(path)?;
    run_job(&config)
}

/// Run independent jobs in parallel.
///
/// Each job owns its own builder, engine and ledger. One failing job does
/// not stop the others; results come back in input order.
pub fn run_batch(configs: &[FutureLabConfig]) -> Vec<Result<JobOutput, RunError>> {
    configs.par_iter().map(run_job).collect()
}

/// First 12 hex digits of a run id, for logs and console output.
pub fn short_id(run_id: &str) -> &str {
    run_id.get(..12).unwrap_or(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_truncates_long_ids_only() {
        let id = blake3::hash(b"job").to_hex().to_string();
        assert_eq!(short_id(&id), &id[..12]);
        assert_eq!(short_id("abc"), "abc");
    }
}
