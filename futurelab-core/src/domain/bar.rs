//! ContinuousBar — one emitted row of a continuous futures series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ContractId;

/// One date of a continuous series, stitched from the contract active on that date.
///
/// `raw_price` is the active contract's own price. The two adjusted prices
/// remove the roll gaps accumulated so far: additively for `back_adjusted`,
/// multiplicatively for `ratio_adjusted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousBar {
    pub date: NaiveDate,
    pub contract: ContractId,
    pub raw_price: f64,
    pub back_adjusted: f64,
    pub ratio_adjusted: f64,
}

impl ContinuousBar {
    /// Price under the requested adjustment convention.
    pub fn price(&self, convention: PriceConvention) -> f64 {
        match convention {
            PriceConvention::Raw => self.raw_price,
            PriceConvention::BackAdjusted => self.back_adjusted,
            PriceConvention::RatioAdjusted => self.ratio_adjusted,
        }
    }
}

/// Which of a continuous bar's prices to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceConvention {
    #[default]
    Raw,
    BackAdjusted,
    RatioAdjusted,
}
