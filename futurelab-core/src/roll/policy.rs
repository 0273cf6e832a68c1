//! Roll policy — the pure decision of whether to leave the active contract.
//!
//! A policy is a configured, prioritized list of [`RollTrigger`]s. Evaluation
//! walks the list and stops at the first trigger that fires:
//!
//! 1. `DaysBeforeExpiry` (only if a threshold is configured)
//! 2. `VolumeCrossover` or `OpenInterestCrossover` (whichever is configured)
//! 3. `Expired` (always present; forces a roll once past expiry)
//!
//! Nothing here holds state. Everything a trigger may look at is carried in
//! the [`RollContext`] passed to it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Observation;

/// Liquidity measure compared between the active and next contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    Volume,
    OpenInterest,
}

/// One condition that can cause a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollTrigger {
    /// Active contract is within `days` calendar days of expiry.
    DaysBeforeExpiry { days: i64 },
    /// Next contract trades more volume than the active one.
    VolumeCrossover,
    /// Next contract carries more open interest than the active one.
    OpenInterestCrossover,
    /// Date is past the active contract's expiry.
    Expired,
}

/// Everything a trigger is allowed to see.
#[derive(Debug, Clone, Copy)]
pub struct RollContext<'a> {
    pub date: NaiveDate,
    pub active_expiry: NaiveDate,
    pub active: &'a Observation,
    pub next: &'a Observation,
}

impl RollTrigger {
    /// Single dispatch point for all trigger conditions.
    pub fn fires(&self, ctx: &RollContext<'_>) -> bool {
        match *self {
            RollTrigger::DaysBeforeExpiry { days } => {
                (ctx.active_expiry - ctx.date).num_days() <= days
            }
            RollTrigger::VolumeCrossover => ctx.next.volume > ctx.active.volume,
            RollTrigger::OpenInterestCrossover => {
                ctx.next.open_interest > ctx.active.open_interest
            }
            RollTrigger::Expired => ctx.date > ctx.active_expiry,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RollTrigger::DaysBeforeExpiry { .. } => "days_before_expiry",
            RollTrigger::VolumeCrossover => "volume_crossover",
            RollTrigger::OpenInterestCrossover => "open_interest_crossover",
            RollTrigger::Expired => "expired",
        }
    }
}

impl fmt::Display for RollTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollTrigger::DaysBeforeExpiry { days } => write!(f, "days_before_expiry({days})"),
            other => f.write_str(other.name()),
        }
    }
}

impl From<Crossover> for RollTrigger {
    fn from(crossover: Crossover) -> Self {
        match crossover {
            Crossover::Volume => RollTrigger::VolumeCrossover,
            Crossover::OpenInterest => RollTrigger::OpenInterestCrossover,
        }
    }
}

/// Configured roll rule.
///
/// The default is a volume crossover with no days-before-expiry threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollPolicy {
    #[serde(default)]
    pub crossover: Option<Crossover>,
    #[serde(default)]
    pub days_before_expiry: Option<i64>,
}

impl Default for RollPolicy {
    fn default() -> Self {
        Self::volume()
    }
}

impl RollPolicy {
    pub fn volume() -> Self {
        Self {
            crossover: Some(Crossover::Volume),
            days_before_expiry: None,
        }
    }

    pub fn open_interest() -> Self {
        Self {
            crossover: Some(Crossover::OpenInterest),
            days_before_expiry: None,
        }
    }

    /// Roll only on the calendar: `days` before expiry, or once expired.
    pub fn days_before_expiry(days: i64) -> Self {
        Self {
            crossover: None,
            days_before_expiry: Some(days),
        }
    }

    /// Roll only when forced by expiry.
    pub fn expiry_only() -> Self {
        Self {
            crossover: None,
            days_before_expiry: None,
        }
    }

    pub fn with_days_before_expiry(mut self, days: i64) -> Self {
        self.days_before_expiry = Some(days);
        self
    }

    /// Triggers in priority order.
    pub fn triggers(&self) -> impl Iterator<Item = RollTrigger> {
        [
            self.days_before_expiry
                .map(|days| RollTrigger::DaysBeforeExpiry { days }),
            self.crossover.map(RollTrigger::from),
            Some(RollTrigger::Expired),
        ]
        .into_iter()
        .flatten()
    }

    /// First trigger that fires, if any.
    pub fn evaluate(&self, ctx: &RollContext<'_>) -> Option<RollTrigger> {
        self.triggers().find(|trigger| trigger.fires(ctx))
    }
}
