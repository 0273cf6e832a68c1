//! Roll state threaded through the per-date builder step, and the roll log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::ContractId;
use crate::roll::RollTrigger;

/// Running state of a continuous-series build.
///
/// `cumulative_ratio` starts at 1.0 and is only ever multiplied by positive
/// ratios, so it stays strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollState {
    pub active: Option<ContractId>,
    pub cumulative_diff: f64,
    pub cumulative_ratio: f64,
}

impl Default for RollState {
    fn default() -> Self {
        Self::new()
    }
}

impl RollState {
    pub fn new() -> Self {
        Self {
            active: None,
            cumulative_diff: 0.0,
            cumulative_ratio: 1.0,
        }
    }

    /// Switch to `to`, folding the roll gap into the running adjustments.
    pub fn apply_roll(&mut self, to: ContractId, diff: f64, ratio: f64) {
        debug_assert!(ratio > 0.0, "roll ratio must be positive, got {ratio}");
        self.cumulative_diff += diff;
        self.cumulative_ratio *= ratio;
        self.active = Some(to);
    }

    pub fn back_adjust(&self, raw_price: f64) -> f64 {
        raw_price - self.cumulative_diff
    }

    pub fn ratio_adjust(&self, raw_price: f64) -> f64 {
        raw_price / self.cumulative_ratio
    }
}

/// A roll performed by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollEvent {
    pub date: NaiveDate,
    pub from: ContractId,
    pub to: ContractId,
    pub trigger: RollTrigger,
    /// `price(to) - price(from)` on the roll date.
    pub diff: f64,
    /// `price(to) / price(from)` on the roll date.
    pub ratio: f64,
}
