//! FutureLab Runner — job configuration, file loading, batch runs and artifacts.
//!
//! This crate builds on `futurelab-core` to provide:
//! - TOML job configs with a content-hash run id
//! - CSV loading of contract panels and order/roll schedules
//! - Single-job and parallel batch runners
//! - CSV/JSON artifact export

pub mod config;
pub mod export;
pub mod loader;
pub mod runner;

pub use config::{BacktestSettings, ConfigError, CrossoverConfig, FutureLabConfig, RollConfig, RunId};
pub use export::{read_summary_json, save_artifacts, write_series_csv};
pub use loader::{load_orders, load_panel, load_rolls, LoadError};
pub use runner::{
    build_series, run_batch, run_config_file, run_job, short_id, JobOutput, RunError, RunSummary,
};
