use chrono::NaiveDate;
use polars::prelude::*;

use crate::domain::ContractRecord;

/// Expected schema for contract panel data
pub struct PanelSchema;

impl PanelSchema {
    /// Required columns and their canonical types.
    pub fn columns() -> [(&'static str, DataType); 6] {
        [
            ("date", DataType::Date),
            ("contract", DataType::String),
            ("price", DataType::Float64),
            ("volume", DataType::Float64),
            ("open_interest", DataType::Float64),
            ("expiry", DataType::Date),
        ]
    }

    /// Get the canonical panel schema
    pub fn schema() -> Schema {
        Schema::from_iter(
            Self::columns()
                .into_iter()
                .map(|(name, dtype)| Field::new(name.into(), dtype)),
        )
    }

    /// Validate DataFrame against schema
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let columns = Self::columns();

        // Every column must exist before any type is checked
        for (name, _) in &columns {
            if df.column(name).is_err() {
                return Err(SchemaError::MissingColumn((*name).to_string()));
            }
        }

        for (name, expected) in &columns {
            let column = df
                .column(name)
                .map_err(|_| SchemaError::MissingColumn((*name).to_string()))?;
            if column.dtype() != expected {
                return Err(SchemaError::TypeMismatch {
                    column: (*name).to_string(),
                    expected: expected.clone(),
                    actual: column.dtype().clone(),
                });
            }
        }

        Ok(())
    }

    /// Validate and convert a DataFrame into typed records.
    ///
    /// Nulls in any required column are rejected with the offending row.
    pub fn to_records(df: &DataFrame) -> Result<Vec<ContractRecord>, SchemaError> {
        Self::validate(df)?;

        let read = |name: &str| {
            df.column(name)
                .map_err(|_| SchemaError::MissingColumn(name.to_string()))
        };
        let type_err = |name: &str, e: PolarsError| SchemaError::Unreadable {
            column: name.to_string(),
            reason: e.to_string(),
        };

        let date_ca = read("date")?.date().map_err(|e| type_err("date", e))?;
        let contract_ca = read("contract")?.str().map_err(|e| type_err("contract", e))?;
        let price_ca = read("price")?.f64().map_err(|e| type_err("price", e))?;
        let volume_ca = read("volume")?.f64().map_err(|e| type_err("volume", e))?;
        let oi_ca = read("open_interest")?
            .f64()
            .map_err(|e| type_err("open_interest", e))?;
        let expiry_ca = read("expiry")?.date().map_err(|e| type_err("expiry", e))?;

        let null = |column: &str, row: usize| SchemaError::NullValue {
            column: column.to_string(),
            row,
        };

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let date = date_ca.get(row).ok_or_else(|| null("date", row))?;
            let expiry = expiry_ca.get(row).ok_or_else(|| null("expiry", row))?;
            records.push(ContractRecord {
                date: epoch_days_to_date(date),
                contract: contract_ca
                    .get(row)
                    .ok_or_else(|| null("contract", row))?
                    .to_string(),
                price: price_ca.get(row).ok_or_else(|| null("price", row))?,
                volume: volume_ca.get(row).ok_or_else(|| null("volume", row))?,
                open_interest: oi_ca.get(row).ok_or_else(|| null("open_interest", row))?,
                expiry: epoch_days_to_date(expiry),
            });
        }

        Ok(records)
    }
}

/// Polars stores dates as days since 1970-01-01 (`NaiveDate::default()`).
fn epoch_days_to_date(days: i32) -> NaiveDate {
    NaiveDate::default() + chrono::Duration::days(days as i64)
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("Column {column} could not be read: {reason}")]
    Unreadable { column: String, reason: String },

    #[error("Null value in column {column} at row {row}")]
    NullValue { column: String, row: usize },

    #[error("Empty contract id at row {row}")]
    EmptyContractId { row: usize },

    #[error("Non-finite {field} for {contract} on {date}: {value}")]
    NonFinite {
        contract: String,
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("Contract {contract} has inconsistent expiry: {first} vs {conflicting}")]
    InconsistentExpiry {
        contract: String,
        first: NaiveDate,
        conflicting: NaiveDate,
    },

    #[error("Duplicate row for {contract} on {date}")]
    DuplicateRow { contract: String, date: NaiveDate },
}
