//! Price panel and multiplier table read by the backtester.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::panel::ContractPanel;
use crate::domain::{ContinuousBar, ContractId, PriceConvention};

/// `(date, contract) → price` lookup with an ascending date axis.
///
/// Missing pairs are simply absent; the engine decides what a miss means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricePanel {
    rows: BTreeMap<NaiveDate, HashMap<ContractId, f64>>,
}

impl PricePanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(date, contract, price)` triples. Later duplicates win.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, S, f64)>,
        S: Into<ContractId>,
    {
        let mut panel = Self::new();
        for (date, contract, price) in rows {
            panel.insert(date, contract, price);
        }
        panel
    }

    /// Raw prices of every contract in a validated panel.
    pub fn from_contract_panel(panel: &ContractPanel) -> Self {
        Self::from_rows(panel.records().map(|r| (r.date, r.contract, r.price)))
    }

    /// A continuous series as a single synthetic instrument named `label`.
    pub fn from_series(bars: &[ContinuousBar], label: &str, convention: PriceConvention) -> Self {
        Self::from_rows(
            bars.iter()
                .map(|bar| (bar.date, label.to_string(), bar.price(convention))),
        )
    }

    pub fn insert(&mut self, date: NaiveDate, contract: impl Into<ContractId>, price: f64) {
        self.rows
            .entry(date)
            .or_default()
            .insert(contract.into(), price);
    }

    pub fn price(&self, date: NaiveDate, contract: &str) -> Option<f64> {
        self.rows.get(&date).and_then(|row| row.get(contract)).copied()
    }

    /// Dates in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.rows.contains_key(&date)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Contract → dollar multiplier. Unlisted contracts use the default (1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    #[serde(default)]
    table: BTreeMap<ContractId, f64>,
    #[serde(default = "default_multiplier")]
    default: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            table: BTreeMap::new(),
            default: default_multiplier(),
        }
    }
}

impl Multipliers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, contract: impl Into<ContractId>, multiplier: f64) -> Self {
        self.table.insert(contract.into(), multiplier);
        self
    }

    pub fn get(&self, contract: &str) -> f64 {
        self.table.get(contract).copied().unwrap_or(self.default)
    }

    /// Explicit entries plus the `"default"` fallback.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.table
            .iter()
            .map(|(k, &v)| (k.as_str(), v))
            .chain(std::iter::once(("default", self.default)))
    }
}

impl<S: Into<ContractId>> FromIterator<(S, f64)> for Multipliers {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        Self {
            table: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            default: default_multiplier(),
        }
    }
}
