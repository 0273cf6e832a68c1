//! CSV loading for panels and schedules.
//!
//! Every file needs a header row naming all required columns; the header is
//! checked before any row is read. Dates are `YYYY-MM-DD`. Rows are
//! deserialized with serde, then handed to core for validation: the panel
//! goes through `ContractPanel::from_records`, schedules keep file order
//! within each date.

use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use futurelab_core::data::{ContractPanel, PanelSchema, SchemaError};
use futurelab_core::domain::{ContractRecord, OrderSchedule, RollSchedule};

/// Errors from the file loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("schema error in {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    #[error("{path} row {row}: {reason}")]
    InvalidRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },
}

const ORDER_COLUMNS: [&str; 3] = ["date", "contract", "quantity"];
const ROLL_COLUMNS: [&str; 3] = ["date", "from", "to"];

#[derive(Debug, Deserialize)]
struct PanelRow {
    date: NaiveDate,
    contract: String,
    price: f64,
    volume: f64,
    open_interest: f64,
    expiry: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    date: NaiveDate,
    contract: String,
    quantity: f64,
}

#[derive(Debug, Deserialize)]
struct RollRow {
    date: NaiveDate,
    from: String,
    to: String,
}

/// Load and validate a contract panel CSV.
pub fn load_panel(path: &Path) -> Result<ContractPanel, LoadError> {
    let reader = open(path)?;
    read_panel(reader, path)
}

/// Load an order schedule CSV.
pub fn load_orders(path: &Path) -> Result<OrderSchedule, LoadError> {
    let reader = open(path)?;
    read_orders(reader, path)
}

/// Load a roll schedule CSV.
pub fn load_rolls(path: &Path) -> Result<RollSchedule, LoadError> {
    let reader = open(path)?;
    read_rolls(reader, path)
}

/// Parse a panel from any reader. `origin` is only used in error messages.
pub fn read_panel<R: Read>(reader: R, origin: &Path) -> Result<ContractPanel, LoadError> {
    let columns = PanelSchema::columns().map(|(name, _)| name);
    let rows: Vec<PanelRow> = deserialize_all(reader, origin, &columns)?;
    let records = rows.into_iter().map(|r| {
        ContractRecord::new(r.date, r.contract, r.price, r.volume, r.open_interest, r.expiry)
    });
    let panel = ContractPanel::from_records(records).map_err(|source| LoadError::Schema {
        path: origin.to_path_buf(),
        source,
    })?;
    debug!(
        path = %origin.display(),
        contracts = panel.len(),
        dates = panel.dates().len(),
        "panel loaded"
    );
    Ok(panel)
}

pub fn read_orders<R: Read>(reader: R, origin: &Path) -> Result<OrderSchedule, LoadError> {
    let rows: Vec<OrderRow> = deserialize_all(reader, origin, &ORDER_COLUMNS)?;
    let mut schedule = OrderSchedule::new();
    for (i, row) in rows.into_iter().enumerate() {
        if !row.quantity.is_finite() {
            return Err(LoadError::InvalidRow {
                path: origin.to_path_buf(),
                row: i + 1,
                reason: format!("quantity must be finite, got {}", row.quantity),
            });
        }
        schedule.push(row.date, row.contract, row.quantity);
    }
    Ok(schedule)
}

pub fn read_rolls<R: Read>(reader: R, origin: &Path) -> Result<RollSchedule, LoadError> {
    let rows: Vec<RollRow> = deserialize_all(reader, origin, &ROLL_COLUMNS)?;
    let mut schedule = RollSchedule::new();
    for (i, row) in rows.into_iter().enumerate() {
        if row.from == row.to {
            return Err(LoadError::InvalidRow {
                path: origin.to_path_buf(),
                row: i + 1,
                reason: format!("roll from '{}' into itself", row.from),
            });
        }
        schedule.push(row.date, row.from, row.to);
    }
    Ok(schedule)
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|e| LoadError::Csv {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

fn deserialize_all<R, T>(reader: R, origin: &Path, required: &[&str]) -> Result<Vec<T>, LoadError>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers().map_err(|source| LoadError::Csv {
        path: origin.to_path_buf(),
        source,
    })?;
    if let Some(missing) = required.iter().find(|name| !headers.iter().any(|h| h == **name)) {
        return Err(LoadError::Schema {
            path: origin.to_path_buf(),
            source: SchemaError::MissingColumn((*missing).to_string()),
        });
    }
    rdr.deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| LoadError::Csv {
            path: origin.to_path_buf(),
            source,
        })
}
