//! Roll decisions: trigger policy and linear roll weights.

pub mod policy;
pub mod weights;

pub use policy::{Crossover, RollContext, RollPolicy, RollTrigger};
pub use weights::{roll_weight, roll_weights};
