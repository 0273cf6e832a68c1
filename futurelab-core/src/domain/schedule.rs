//! Order and roll schedules consumed by the backtest engine.
//!
//! Both schedules map a date to an ordered list of instructions. List order
//! is execution order within the date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ContractId;

/// A signed quantity to trade in one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub contract: ContractId,
    pub quantity: f64,
}

/// Move whatever is held in `from` into `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollInstruction {
    pub from: ContractId,
    pub to: ContractId,
}

/// Date → ordered orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSchedule {
    entries: BTreeMap<NaiveDate, Vec<Order>>,
}

impl OrderSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order after any already scheduled for `date`.
    pub fn push(&mut self, date: NaiveDate, contract: impl Into<ContractId>, quantity: f64) {
        self.entries.entry(date).or_default().push(Order {
            contract: contract.into(),
            quantity,
        });
    }

    pub fn on(&self, date: NaiveDate) -> &[Order] {
        self.entries.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Date → ordered roll instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollSchedule {
    entries: BTreeMap<NaiveDate, Vec<RollInstruction>>,
}

impl RollSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a roll after any already scheduled for `date`.
    pub fn push(
        &mut self,
        date: NaiveDate,
        from: impl Into<ContractId>,
        to: impl Into<ContractId>,
    ) {
        self.entries.entry(date).or_default().push(RollInstruction {
            from: from.into(),
            to: to.into(),
        });
    }

    pub fn on(&self, date: NaiveDate) -> &[RollInstruction] {
        self.entries.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &RollInstruction)> + '_ {
        self.entries
            .iter()
            .flat_map(|(date, rolls)| rolls.iter().map(move |r| (*date, r)))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
