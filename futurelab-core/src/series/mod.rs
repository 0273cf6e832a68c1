//! Continuous futures series construction.
//!
//! [`ContinuousSeriesBuilder`] stitches a [`ContractPanel`](crate::data::ContractPanel)
//! into one [`ContinuousSeries`], threading an explicit [`RollState`] through
//! its per-date step.

pub mod builder;
pub mod state;

pub use builder::{ContinuousSeriesBuilder, ExpiryPolicy, SeriesError, StepOutput};
pub use state::{RollEvent, RollState};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{ContinuousBar, PriceConvention, RollSchedule};

/// Output of a build: one bar per emitted date plus the rolls that happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousSeries {
    bars: Vec<ContinuousBar>,
    rolls: Vec<RollEvent>,
    carried_forward_days: usize,
}

impl ContinuousSeries {
    pub fn bars(&self) -> &[ContinuousBar] {
        &self.bars
    }

    pub fn rolls(&self) -> &[RollEvent] {
        &self.rolls
    }

    /// Number of bars emitted from an expired contract with no successor.
    pub fn carried_forward_days(&self) -> usize {
        self.carried_forward_days
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Active contract per emitted date.
    pub fn active_contracts(&self) -> Vec<&str> {
        self.bars.iter().map(|b| b.contract.as_str()).collect()
    }

    /// `(date, price)` pairs under one adjustment convention.
    pub fn prices(&self, convention: PriceConvention) -> Vec<(NaiveDate, f64)> {
        self.bars
            .iter()
            .map(|b| (b.date, b.price(convention)))
            .collect()
    }

    /// The builder's rolls as a schedule the backtest engine can replay.
    pub fn roll_schedule(&self) -> RollSchedule {
        let mut schedule = RollSchedule::new();
        for roll in &self.rolls {
            schedule.push(roll.date, roll.from.clone(), roll.to.clone());
        }
        schedule
    }
}
