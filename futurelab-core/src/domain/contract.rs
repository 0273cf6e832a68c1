//! Contract records — one row of the raw multi-contract panel.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ContractId;

/// One observation of one futures contract on one date.
///
/// `expiry` is constant for a given `contract`; ingestion rejects panels
/// where it is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub date: NaiveDate,
    pub contract: ContractId,
    pub price: f64,
    pub volume: f64,
    pub open_interest: f64,
    pub expiry: NaiveDate,
}

impl ContractRecord {
    pub fn new(
        date: NaiveDate,
        contract: impl Into<ContractId>,
        price: f64,
        volume: f64,
        open_interest: f64,
        expiry: NaiveDate,
    ) -> Self {
        Self {
            date,
            contract: contract.into(),
            price,
            volume,
            open_interest,
            expiry,
        }
    }

    /// Strip the contract-level fields, keeping the per-date market data.
    pub fn observation(&self) -> Observation {
        Observation {
            date: self.date,
            price: self.price,
            volume: self.volume,
            open_interest: self.open_interest,
        }
    }
}

/// Per-date market data of a single contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub price: f64,
    pub volume: f64,
    pub open_interest: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_drops_contract_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let expiry = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let record = ContractRecord::new(date, "ESH4", 4750.25, 1200.0, 35_000.0, expiry);

        let obs = record.observation();
        assert_eq!(obs.date, date);
        assert_eq!(obs.price, 4750.25);
        assert_eq!(obs.volume, 1200.0);
        assert_eq!(obs.open_interest, 35_000.0);
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = ContractRecord::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            "CLG4",
            71.3,
            500.0,
            9000.0,
            NaiveDate::from_ymd_opt(2024, 1, 22).unwrap(),
        );
        let json = serde_json::to_string(&record).unwrap();
        let deser: ContractRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, deser);
    }
}
