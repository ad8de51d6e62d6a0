//! Observable position events — one per completed state change.

use alloy_primitives::{Address, U256};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

use crate::position::PositionId;

/// A state change that completed successfully. Events are recorded only
/// after every sub-step of their operation has succeeded; an aborted
/// operation leaves no event behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Deposit {
        position: PositionId,
        caller: Address,
        amount: U256,
    },
    Withdrawal {
        position: PositionId,
        amount: U256,
    },
    FullWithdrawal {
        position: PositionId,
        amount: U256,
    },
    /// `needed` is the full gap below the threshold; `transferred` may be
    /// smaller when capacity is short.
    Rebalance {
        position: PositionId,
        needed: U256,
        transferred: U256,
    },
    DebtRepaid {
        position: PositionId,
        caller: Address,
        amount: U256,
    },
    ThresholdUpdated {
        position: PositionId,
        threshold: U256,
    },
    RecipientUpdated {
        position: PositionId,
        recipient: Address,
    },
    MaxBorrowingRateUpdated {
        position: PositionId,
        rate: U256,
    },
}

/// Append-only journal of events across all positions of a registry.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Mutex<Vec<Event>>,
}

impl EventLog {
    pub(crate) fn record(&self, event: Event) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Copy of all recorded events, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return all recorded events.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
