//! Domain types for FutureLab

pub mod bar;
pub mod contract;
pub mod schedule;
pub mod trade;

pub use bar::{ContinuousBar, PriceConvention};
pub use contract::{ContractRecord, Observation};
pub use schedule::{Order, OrderSchedule, RollInstruction, RollSchedule};
pub use trade::{Trade, TradeSource};

/// Contract identifier type alias (e.g. `"ESH4"`).
pub type ContractId = String;
