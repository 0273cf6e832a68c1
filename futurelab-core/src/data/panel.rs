//! Typed contract panel — the validated, per-contract view of raw panel rows.
//!
//! All ingestion goes through [`ContractPanel::from_records`], which performs
//! the single validation pass: finite numbers, non-empty ids, one expiry per
//! contract, no duplicate `(date, contract)` rows. Downstream code never
//! re-checks these.

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::schema::{PanelSchema, SchemaError};
use crate::domain::{ContractId, ContractRecord, Observation};

/// Date-sorted history of a single contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractHistory {
    pub id: ContractId,
    pub expiry: NaiveDate,
    observations: Vec<Observation>,
}

impl ContractHistory {
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Observation on exactly `date`.
    pub fn at(&self, date: NaiveDate) -> Option<&Observation> {
        self.observations
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|i| &self.observations[i])
    }

    /// Latest observation on or before `date`.
    pub fn as_of(&self, date: NaiveDate) -> Option<&Observation> {
        let end = self.observations.partition_point(|o| o.date <= date);
        end.checked_sub(1).map(|i| &self.observations[i])
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Calendar days from `date` until expiry (negative once expired).
    pub fn days_to_expiry(&self, date: NaiveDate) -> i64 {
        (self.expiry - date).num_days()
    }

    pub fn is_expired(&self, date: NaiveDate) -> bool {
        date > self.expiry
    }
}

/// Validated multi-contract panel.
///
/// Contracts are held in `(expiry, id)` order, which is also the roll order:
/// two contracts sharing an expiry are ranked by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractPanel {
    contracts: Vec<ContractHistory>,
    index: HashMap<ContractId, usize>,
    dates: Vec<NaiveDate>,
}

impl ContractPanel {
    /// Build a panel from raw records in any order.
    pub fn from_records<I>(records: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = ContractRecord>,
    {
        let mut grouped: BTreeMap<ContractId, (NaiveDate, Vec<Observation>)> = BTreeMap::new();

        for (row, record) in records.into_iter().enumerate() {
            validate_record(row, &record)?;

            let (expiry, observations) = grouped
                .entry(record.contract.clone())
                .or_insert_with(|| (record.expiry, Vec::new()));
            if *expiry != record.expiry {
                return Err(SchemaError::InconsistentExpiry {
                    contract: record.contract,
                    first: *expiry,
                    conflicting: record.expiry,
                });
            }
            observations.push(record.observation());
        }

        let mut contracts = Vec::with_capacity(grouped.len());
        let mut dates = BTreeSet::new();

        for (id, (expiry, mut observations)) in grouped {
            observations.sort_by_key(|o| o.date);
            if let Some(dup) = observations.windows(2).find(|w| w[0].date == w[1].date) {
                return Err(SchemaError::DuplicateRow {
                    contract: id,
                    date: dup[0].date,
                });
            }
            dates.extend(observations.iter().map(|o| o.date));
            contracts.push(ContractHistory {
                id,
                expiry,
                observations,
            });
        }

        // BTreeMap iteration already ordered by id; a stable sort keeps that
        // as the tie-break within one expiry.
        contracts.sort_by_key(|c| c.expiry);

        let index = contracts
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();

        Ok(Self {
            contracts,
            index,
            dates: dates.into_iter().collect(),
        })
    }

    /// Validate a Polars frame against [`PanelSchema`] and build a panel from it.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self, SchemaError> {
        Self::from_records(PanelSchema::to_records(df)?)
    }

    /// Contracts in roll order.
    pub fn contracts(&self) -> &[ContractHistory] {
        &self.contracts
    }

    pub fn contract(&self, id: &str) -> Option<&ContractHistory> {
        self.index.get(id).map(|&i| &self.contracts[i])
    }

    /// Position of a contract in roll order.
    pub fn rank(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Union of all contracts' dates, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Flatten back into records, contract by contract in roll order.
    pub fn records(&self) -> impl Iterator<Item = ContractRecord> + '_ {
        self.contracts.iter().flat_map(|c| {
            c.observations.iter().map(move |o| ContractRecord {
                date: o.date,
                contract: c.id.clone(),
                price: o.price,
                volume: o.volume,
                open_interest: o.open_interest,
                expiry: c.expiry,
            })
        })
    }
}

fn validate_record(row: usize, record: &ContractRecord) -> Result<(), SchemaError> {
    if record.contract.trim().is_empty() {
        return Err(SchemaError::EmptyContractId { row });
    }
    for (field, value) in [
        ("price", record.price),
        ("volume", record.volume),
        ("open_interest", record.open_interest),
    ] {
        if !value.is_finite() {
            return Err(SchemaError::NonFinite {
                contract: record.contract.clone(),
                date: record.date,
                field,
                value,
            });
        }
    }
    Ok(())
}
