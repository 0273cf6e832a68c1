//! Linear roll weights for spreading a roll over several days.

use std::collections::BTreeMap;

use crate::domain::ContractId;

/// Fraction of a position to hold in the next contract.
///
/// 0.0 while more than `window` days remain, rising linearly to 1.0 at
/// expiry. A non-positive window never rolls.
pub fn roll_weight(days_to_expiry: i64, window: i64) -> f64 {
    if window <= 0 {
        return 0.0;
    }
    ((window - days_to_expiry) as f64 / window as f64).clamp(0.0, 1.0)
}

/// [`roll_weight`] for every contract in a `contract → days to expiry` map.
pub fn roll_weights(
    days_to_expiry: &BTreeMap<ContractId, i64>,
    window: i64,
) -> BTreeMap<ContractId, f64> {
    days_to_expiry
        .iter()
        .map(|(contract, &dte)| (contract.clone(), roll_weight(dte, window)))
        .collect()
}
