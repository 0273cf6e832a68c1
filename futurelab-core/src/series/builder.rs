//! Continuous series builder — walks the panel's dates, rolling per policy.
//!
//! For each date, ascending:
//! 1. Pick the first active contract if none is active yet
//! 2. Find the next contract (smallest expiry beyond the active one, with data today)
//! 3. Ask the [`RollPolicy`] whether to roll
//! 4. On a roll, fold the price gap into the [`RollState`] and switch contracts
//! 5. Emit a [`ContinuousBar`] from the (possibly new) active contract
//!
//! The active contract's values are read as of the date (last observation on
//! or before it). This is what lets an expired contract with no successor
//! keep emitting its last price under [`ExpiryPolicy::CarryForward`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::state::{RollEvent, RollState};
use super::ContinuousSeries;
use crate::data::{ContractHistory, ContractPanel};
use crate::domain::{ContinuousBar, ContractId, Observation};
use crate::roll::{RollContext, RollPolicy};

/// Errors raised while building a continuous series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("degenerate roll price {price} for {contract} on {date}: ratio undefined")]
    DegenerateInput {
        date: NaiveDate,
        contract: ContractId,
        price: f64,
    },

    #[error("{contract} expired on {expiry} and no successor has data on {date}")]
    ExpiredWithoutSuccessor {
        date: NaiveDate,
        contract: ContractId,
        expiry: NaiveDate,
    },

    #[error("roll state refers to unknown contract '{0}'")]
    UnknownContract(ContractId),

    #[error("{contract} has no observation on or before {date}")]
    MissingObservation {
        date: NaiveDate,
        contract: ContractId,
    },
}

/// What to do once the active contract has expired and nothing can replace it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Keep emitting the expired contract's last available price.
    #[default]
    CarryForward,
    /// Abort the build.
    Fail,
}

/// Result of one builder step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub bar: ContinuousBar,
    pub roll: Option<RollEvent>,
    /// The bar came from an expired contract with no successor.
    pub carried_forward: bool,
}

/// Builds a [`ContinuousSeries`] from a [`ContractPanel`].
#[derive(Debug, Clone, Default)]
pub struct ContinuousSeriesBuilder {
    policy: RollPolicy,
    expiry_policy: ExpiryPolicy,
}

impl ContinuousSeriesBuilder {
    pub fn new(policy: RollPolicy) -> Self {
        Self {
            policy,
            expiry_policy: ExpiryPolicy::default(),
        }
    }

    pub fn with_expiry_policy(mut self, expiry_policy: ExpiryPolicy) -> Self {
        self.expiry_policy = expiry_policy;
        self
    }

    pub fn policy(&self) -> &RollPolicy {
        &self.policy
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        self.expiry_policy
    }

    /// Run the step over every panel date with a fresh [`RollState`].
    pub fn build(&self, panel: &ContractPanel) -> Result<ContinuousSeries, SeriesError> {
        let mut state = RollState::new();
        let mut series = ContinuousSeries::default();

        for &date in panel.dates() {
            let Some(output) = self.step(panel, &mut state, date)? else {
                continue;
            };
            if output.carried_forward {
                if series.carried_forward_days == 0 {
                    warn!(
                        date = %date,
                        contract = %output.bar.contract,
                        "active contract expired with no successor; carrying last price forward"
                    );
                }
                series.carried_forward_days += 1;
            }
            if let Some(roll) = output.roll {
                series.rolls.push(roll);
            }
            series.bars.push(output.bar);
        }

        info!(
            bars = series.bars.len(),
            rolls = series.rolls.len(),
            carried_forward_days = series.carried_forward_days,
            "continuous series built"
        );
        Ok(series)
    }

    /// Advance the build by one date.
    ///
    /// Returns `None` when no contract can be active yet on `date`.
    pub fn step(
        &self,
        panel: &ContractPanel,
        state: &mut RollState,
        date: NaiveDate,
    ) -> Result<Option<StepOutput>, SeriesError> {
        let active_id = match &state.active {
            Some(id) => id.clone(),
            None => match first_active(panel, date) {
                Some(contract) => {
                    debug!(date = %date, contract = %contract.id, "first active contract");
                    state.active = Some(contract.id.clone());
                    contract.id.clone()
                }
                None => return Ok(None),
            },
        };

        let active = lookup(panel, &active_id)?;
        let active_obs = observation_as_of(active, date)?;

        let mut roll = None;
        let mut carried_forward = false;

        match next_contract(panel, active, date) {
            Some((next, next_obs)) => {
                let ctx = RollContext {
                    date,
                    active_expiry: active.expiry,
                    active: active_obs,
                    next: next_obs,
                };
                if let Some(trigger) = self.policy.evaluate(&ctx) {
                    let price_old = positive_price(date, &active.id, active_obs.price)?;
                    let price_new = positive_price(date, &next.id, next_obs.price)?;
                    let diff = price_new - price_old;
                    let ratio = price_new / price_old;
                    state.apply_roll(next.id.clone(), diff, ratio);

                    debug!(
                        date = %date,
                        from = %active.id,
                        to = %next.id,
                        trigger = %trigger,
                        diff,
                        ratio,
                        "roll"
                    );
                    roll = Some(RollEvent {
                        date,
                        from: active.id.clone(),
                        to: next.id.clone(),
                        trigger,
                        diff,
                        ratio,
                    });
                }
            }
            None if active.is_expired(date) => match self.expiry_policy {
                ExpiryPolicy::Fail => {
                    return Err(SeriesError::ExpiredWithoutSuccessor {
                        date,
                        contract: active.id.clone(),
                        expiry: active.expiry,
                    })
                }
                ExpiryPolicy::CarryForward => carried_forward = true,
            },
            None => {}
        }

        let current = match &roll {
            Some(event) => lookup(panel, &event.to)?,
            None => active,
        };
        let raw_price = observation_as_of(current, date)?.price;

        Ok(Some(StepOutput {
            bar: ContinuousBar {
                date,
                contract: current.id.clone(),
                raw_price,
                back_adjusted: state.back_adjust(raw_price),
                ratio_adjusted: state.ratio_adjust(raw_price),
            },
            roll,
            carried_forward,
        }))
    }
}

/// Earliest-expiring contract that has started trading and not yet expired.
fn first_active(panel: &ContractPanel, date: NaiveDate) -> Option<&ContractHistory> {
    panel.contracts().iter().find(|c| {
        c.first_date().is_some_and(|first| first <= date) && !c.is_expired(date)
    })
}

/// Smallest-expiry contract beyond `active` with an observation on `date`.
///
/// Roll order is `(expiry, id)`, so the first match also carries the
/// lexicographic tie-break among equal expiries.
fn next_contract<'a>(
    panel: &'a ContractPanel,
    active: &ContractHistory,
    date: NaiveDate,
) -> Option<(&'a ContractHistory, &'a Observation)> {
    panel
        .contracts()
        .iter()
        .filter(|c| c.expiry > active.expiry)
        .find_map(|c| c.at(date).map(|obs| (c, obs)))
}

fn lookup<'a>(panel: &'a ContractPanel, id: &str) -> Result<&'a ContractHistory, SeriesError> {
    panel
        .contract(id)
        .ok_or_else(|| SeriesError::UnknownContract(id.to_string()))
}

fn observation_as_of(
    contract: &ContractHistory,
    date: NaiveDate,
) -> Result<&Observation, SeriesError> {
    contract
        .as_of(date)
        .ok_or_else(|| SeriesError::MissingObservation {
            date,
            contract: contract.id.clone(),
        })
}

fn positive_price(date: NaiveDate, contract: &str, price: f64) -> Result<f64, SeriesError> {
    if price > 0.0 && price.is_finite() {
        Ok(price)
    } else {
        Err(SeriesError::DegenerateInput {
            date,
            contract: contract.to_string(),
            price,
        })
    }
}
