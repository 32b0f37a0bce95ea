use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SqlPoolError;

/// Rule for picking the slot that serves the next request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
pub enum SelectionPolicy {
    /// Strict rotation through the slots.
    #[value(name = "round-robin")]
    #[serde(rename = "round-robin")]
    RoundRobin,
    /// Rotation, except that a busy candidate is swapped for the slot with
    /// the fewest requests in flight.
    #[default]
    #[value(name = "load", alias = "least-loaded")]
    #[serde(rename = "load", alias = "least-loaded")]
    LeastLoaded,
}

impl FromStr for SelectionPolicy {
    type Err = SqlPoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
            .map_err(|_| SqlPoolError::invalid(format!("unknown selection policy `{s}`")))
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SelectionPolicy::RoundRobin => "round-robin",
            SelectionPolicy::LeastLoaded => "load",
        })
    }
}

/// Slot selection state. Callers hold it behind a mutex so that choosing a
/// slot and bumping its counter happen as one step.
#[derive(Debug)]
pub(crate) struct Scheduler {
    in_flight: Vec<usize>,
    cursor: usize,
    policy: SelectionPolicy,
}

impl Scheduler {
    pub(crate) fn new(size: usize, policy: SelectionPolicy) -> Self {
        debug_assert!(size > 0, "scheduler needs at least one slot");
        Self {
            in_flight: vec![0; size],
            cursor: 0,
            policy,
        }
    }

    /// Pick a slot and count one more request against it.
    ///
    /// The cursor advances on every call. Under [`SelectionPolicy::LeastLoaded`]
    /// a busy candidate is replaced by the least-loaded slot, lowest index
    /// first on ties.
    pub(crate) fn acquire(&mut self) -> usize {
        let candidate = self.cursor;
        self.cursor = (self.cursor + 1) % self.in_flight.len();

        let chosen = match self.policy {
            SelectionPolicy::LeastLoaded if self.in_flight[candidate] > 0 => self.least_loaded(),
            _ => candidate,
        };
        self.in_flight[chosen] += 1;
        chosen
    }

    /// Count one request against `slot` as settled.
    pub(crate) fn release(&mut self, slot: usize) -> Result<(), SqlPoolError> {
        let counter = self
            .in_flight
            .get_mut(slot)
            .ok_or(SqlPoolError::SelectionInvariantViolation { slot })?;
        *counter = counter
            .checked_sub(1)
            .ok_or(SqlPoolError::SelectionInvariantViolation { slot })?;
        Ok(())
    }

    fn least_loaded(&self) -> usize {
        self.in_flight
            .iter()
            .enumerate()
            .min_by_key(|(_, count)| **count)
            .map_or(0, |(idx, _)| idx)
    }

    pub(crate) fn in_flight(&self) -> Vec<usize> {
        self.in_flight.clone()
    }

    pub(crate) fn policy(&self) -> SelectionPolicy {
        self.policy
    }
}
