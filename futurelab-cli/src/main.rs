//! FutureLab CLI — build continuous series and run schedule-driven backtests.
//!
//! Commands:
//! - `build` — stitch a contract panel CSV into a continuous series CSV
//! - `run` — execute one job from a TOML config file
//! - `batch` — execute several job configs in parallel
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use futurelab_core::series::ExpiryPolicy;
use futurelab_runner::export::write_rolls_csv;
use futurelab_runner::{
    build_series, run_batch, run_config_file, save_artifacts, short_id, write_series_csv, CrossoverConfig,
    FutureLabConfig, JobOutput, RollConfig,
};

#[derive(Parser)]
#[command(
    name = "futurelab",
    about = "FutureLab CLI — continuous futures series and roll-aware backtests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a continuous series from a contract panel CSV.
    Build {
        /// Panel CSV with columns date,contract,price,volume,open_interest,expiry.
        #[arg(long)]
        panel: PathBuf,

        /// Crossover signal that may trigger a roll.
        #[arg(long, value_enum, default_value_t = CrossoverArg::Volume)]
        crossover: CrossoverArg,

        /// Roll when the active contract is within this many days of expiry.
        #[arg(long)]
        days_before_expiry: Option<i64>,

        /// Abort instead of carrying the last price when the active contract
        /// expires with no successor.
        #[arg(long, default_value_t = false)]
        fail_on_expired: bool,

        /// Output CSV for the series. Rolls are written next to it as `<stem>_rolls.csv`.
        #[arg(long)]
        out: PathBuf,
    },
    /// Execute a job from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Execute several job configs in parallel.
    Batch {
        /// TOML config files.
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CrossoverArg {
    Volume,
    OpenInterest,
    None,
}

impl From<CrossoverArg> for CrossoverConfig {
    fn from(arg: CrossoverArg) -> Self {
        match arg {
            CrossoverArg::Volume => CrossoverConfig::Volume,
            CrossoverArg::OpenInterest => CrossoverConfig::OpenInterest,
            CrossoverArg::None => CrossoverConfig::None,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            panel,
            crossover,
            days_before_expiry,
            fail_on_expired,
            out,
        } => run_build(&panel, crossover, days_before_expiry, fail_on_expired, &out),
        Commands::Run { config, output_dir } => run_job_cmd(&config, &output_dir),
        Commands::Batch {
            configs,
            output_dir,
        } => run_batch_cmd(&configs, &output_dir),
    }
}

fn run_build(
    panel: &Path,
    crossover: CrossoverArg,
    days_before_expiry: Option<i64>,
    fail_on_expired: bool,
    out: &Path,
) -> Result<()> {
    if let Some(days) = days_before_expiry {
        if days < 0 {
            bail!("--days-before-expiry must be >= 0, got {days}");
        }
    }
    let roll = RollConfig {
        crossover: crossover.into(),
        days_before_expiry,
        expiry_policy: if fail_on_expired {
            ExpiryPolicy::Fail
        } else {
            ExpiryPolicy::CarryForward
        },
    };

    let series = build_series(panel, &roll)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    write_series_csv(out, &series)?;
    let rolls_path = rolls_path_for(out);
    write_rolls_csv(&rolls_path, series.rolls())?;

    println!(
        "Built {} bars with {} rolls → {} ({})",
        series.len(),
        series.rolls().len(),
        out.display(),
        rolls_path.display()
    );
    if series.carried_forward_days() > 0 {
        println!(
            "  {} days carried forward after final expiry",
            series.carried_forward_days()
        );
    }
    Ok(())
}

fn run_job_cmd(config_path: &Path, output_dir: &Path) -> Result<()> {
    let output = run_config_file(config_path)
        .with_context(|| format!("job {} failed", config_path.display()))?;
    report(&output, output_dir)
}

fn run_batch_cmd(config_paths: &[PathBuf], output_dir: &Path) -> Result<()> {
    let mut failures = 0usize;
    let mut loaded = Vec::new();
    let mut configs = Vec::new();
    for path in config_paths {
        match FutureLabConfig::from_file(path) {
            Ok(config) => {
                loaded.push(path);
                configs.push(config);
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error loading {}: {e}", path.display());
            }
        }
    }

    for (path, result) in loaded.into_iter().zip(run_batch(&configs)) {
        let reported = result
            .map_err(anyhow::Error::from)
            .and_then(|output| report(&output, output_dir));
        if let Err(e) = reported {
            failures += 1;
            eprintln!("Error for {}: {e:#}", path.display());
        }
    }

    if failures > 0 {
        bail!("{failures} of {} jobs failed", config_paths.len());
    }
    Ok(())
}

fn report(output: &JobOutput, output_dir: &Path) -> Result<()> {
    let run_dir = save_artifacts(output, output_dir)?;
    let summary = output.summary();

    println!("Job: {} ({})", summary.name, short_id(&summary.run_id));
    match summary.final_value {
        Some(value) => println!("  Final value:   {value:.4}"),
        None => println!("  Final value:   n/a (empty price panel)"),
    }
    println!("  Trades:        {}", summary.trade_count);
    println!("  Rolls:         {}", summary.roll_count);
    println!("  Slippage paid: {:.4}", summary.slippage_paid);
    if !summary.unprocessed_dates.is_empty() {
        println!(
            "  Skipped {} schedule dates not in the price panel",
            summary.unprocessed_dates.len()
        );
    }
    println!("  Artifacts:     {}", run_dir.display());
    Ok(())
}

fn rolls_path_for(series_path: &Path) -> PathBuf {
    let stem = series_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "series".to_string());
    series_path.with_file_name(format!("{stem}_rolls.csv"))
}
