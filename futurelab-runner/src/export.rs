//! Artifact export — CSV tables and a JSON summary per job.
//!
//! Layout under the output directory:
//! ```text
//! <output_dir>/<run_id>/
//!     series.csv   date, contract, raw, back_adjusted, ratio_adjusted
//!     rolls.csv    date, from, to, trigger, diff, ratio
//!     values.csv   date, value
//!     trades.csv   date, contract, quantity, fill_price, reference_price, source
//!     summary.json
//! ```

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use futurelab_core::domain::{Trade, TradeSource};
use futurelab_core::engine::ValuePoint;
use futurelab_core::series::{ContinuousSeries, RollEvent};

use crate::runner::{JobOutput, RunSummary, SCHEMA_VERSION};

/// Write every artifact of a job into `<output_dir>/<run_id>/`.
pub fn save_artifacts(output: &JobOutput, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(&output.run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create {}", run_dir.display()))?;

    write_series_csv(&run_dir.join("series.csv"), &output.series)?;
    write_rolls_csv(&run_dir.join("rolls.csv"), output.series.rolls())?;
    write_values_csv(&run_dir.join("values.csv"), &output.backtest.values)?;
    write_trades_csv(&run_dir.join("trades.csv"), &output.backtest.trades)?;
    write_summary_json(&run_dir.join("summary.json"), &output.summary())?;

    Ok(run_dir)
}

// ─── CSV export ─────────────────────────────────────────────────────

pub fn write_series_csv(path: &Path, series: &ContinuousSeries) -> Result<()> {
    let mut wtr = csv_writer(path)?;
    wtr.write_record(["date", "contract", "raw", "back_adjusted", "ratio_adjusted"])?;
    for bar in series.bars() {
        wtr.write_record([
            &bar.date.to_string(),
            &bar.contract,
            &format!("{:.6}", bar.raw_price),
            &format!("{:.6}", bar.back_adjusted),
            &format!("{:.6}", bar.ratio_adjusted),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_rolls_csv(path: &Path, rolls: &[RollEvent]) -> Result<()> {
    let mut wtr = csv_writer(path)?;
    wtr.write_record(["date", "from", "to", "trigger", "diff", "ratio"])?;
    for roll in rolls {
        wtr.write_record([
            &roll.date.to_string(),
            &roll.from,
            &roll.to,
            &roll.trigger.to_string(),
            &format!("{:.6}", roll.diff),
            &format!("{:.8}", roll.ratio),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_values_csv(path: &Path, values: &[ValuePoint]) -> Result<()> {
    let mut wtr = csv_writer(path)?;
    wtr.write_record(["date", "value"])?;
    for point in values {
        wtr.write_record([&point.date.to_string(), &format!("{:.6}", point.value)])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<()> {
    let mut wtr = csv_writer(path)?;
    wtr.write_record([
        "date",
        "contract",
        "quantity",
        "fill_price",
        "reference_price",
        "source",
    ])?;
    for t in trades {
        let source = match t.source {
            TradeSource::Roll => "roll",
            TradeSource::Order => "order",
        };
        wtr.write_record([
            &t.date.to_string(),
            &t.contract,
            &t.quantity.to_string(),
            &format!("{:.6}", t.fill_price),
            &format!("{:.6}", t.reference_price),
            &source.to_string(),
        ])?;
    }
    wtr.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))
}

// ─── JSON summary ───────────────────────────────────────────────────

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to serialize run summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write summary to {}", path.display()))?;
    Ok(())
}

/// Read a summary back, rejecting unknown schema versions.
pub fn read_summary_json(path: &Path) -> Result<RunSummary> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let summary: RunSummary =
        serde_json::from_str(&json).context("failed to deserialize run summary")?;
    if summary.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            summary.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(summary)
}
