//! Trade — one fill appended to a backtest's trade log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ContractId;

/// What caused a trade to be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSource {
    /// One leg of a scheduled roll.
    Roll,
    /// A scheduled order.
    Order,
}

/// A single executed trade. Positive quantity buys, negative sells.
///
/// `fill_price` already includes slippage; `reference_price` is the panel
/// price the fill was derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub contract: ContractId,
    pub quantity: f64,
    pub fill_price: f64,
    pub reference_price: f64,
    pub source: TradeSource,
}

impl Trade {
    pub fn is_buy(&self) -> bool {
        self.quantity > 0.0
    }

    /// Dollar cost of slippage on this trade, always non-negative.
    pub fn slippage_cost(&self, multiplier: f64) -> f64 {
        (self.quantity * (self.fill_price - self.reference_price) * multiplier).abs()
    }
}
