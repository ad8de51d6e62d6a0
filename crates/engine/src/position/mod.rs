//! Position records, the registry that stamps them out, and the operation
//! entry points.
//!
//! The registry replaces the original clone-factory deployment: it allocates
//! a record (id + derived custody address + configuration cell) per position
//! and hands out [`Position`] handles; every operation of both kinds runs
//! through the one shared implementation in [`manager`], with
//! variant-specific behavior selected by [`PositionKind`].

pub mod debt;
mod leveraged;
mod manager;
mod redemption;

pub use debt::DebtPosition;

use alloy_primitives::{keccak256, Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::adapters::{LendingPool, Tokens, Vault};
use crate::clock::Clock;
use crate::events::EventLog;
use crate::guard::ReentrancyFlag;

/// Registry-scoped position identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a position realizes top-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionKind {
    /// Withdraw principal from the vault directly.
    Redemption,
    /// Borrow against vault shares pledged to a lending pool.
    Leveraged,
}

impl PositionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redemption => "redemption",
            Self::Leveraged => "leveraged",
        }
    }
}

/// Lending-pool half of a leveraged position's setup.
#[derive(Clone)]
pub struct LendingSetup {
    pub pool: Arc<dyn LendingPool>,
    /// Annual borrow rate ceiling, WAD. Rebalancing stands down while the
    /// pool rate is at or above it.
    pub max_borrowing_rate: U256,
}

/// Full configuration tuple accepted by the one-time `initialize` call.
#[derive(Clone)]
pub struct PositionSetup {
    pub manager: Address,
    pub recipient: Address,
    pub threshold: U256,
    pub vault: Arc<dyn Vault>,
    /// Required for [`PositionKind::Leveraged`], rejected otherwise.
    pub lending: Option<LendingSetup>,
}

/// Stored configuration. `manager` is written exactly once, at
/// initialization; `recipient`, `threshold` and the borrowing-rate ceiling
/// are replaceable by the manager thereafter.
#[derive(Clone)]
pub(crate) struct ConfigCell {
    pub manager: Address,
    pub recipient: Address,
    pub threshold: U256,
    pub vault: Arc<dyn Vault>,
    pub target_asset: Address,
    pub lending: Option<LendingCell>,
}

#[derive(Clone)]
pub(crate) struct LendingCell {
    pub pool: Arc<dyn LendingPool>,
    pub max_borrowing_rate: U256,
}

pub(crate) struct PositionRecord {
    pub id: PositionId,
    pub address: Address,
    pub kind: PositionKind,
    pub config: RwLock<Option<ConfigCell>>,
    pub entered: ReentrancyFlag,
}

/// Handle to one position. Cheap to clone; all operations go through it.
#[derive(Clone)]
pub struct Position {
    pub(crate) record: Arc<PositionRecord>,
    pub(crate) tokens: Arc<dyn Tokens>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) events: Arc<EventLog>,
}

/// Factory and lookup for position records.
pub struct PositionRegistry {
    tokens: Arc<dyn Tokens>,
    clock: Arc<dyn Clock>,
    events: Arc<EventLog>,
    next_id: AtomicU64,
    records: RwLock<HashMap<PositionId, Arc<PositionRecord>>>,
}

impl PositionRegistry {
    pub fn new(tokens: Arc<dyn Tokens>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens,
            clock,
            events: Arc::new(EventLog::default()),
            next_id: AtomicU64::new(1),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a new, uninitialized position of the given kind.
    pub fn create(&self, kind: PositionKind) -> Position {
        let id = PositionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = Arc::new(PositionRecord {
            id,
            address: derive_address(id),
            kind,
            config: RwLock::new(None),
            entered: ReentrancyFlag::default(),
        });
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&record));
        self.handle(record)
    }

    /// Re-resolve a handle for an existing position.
    pub fn get(&self, id: PositionId) -> Option<Position> {
        let record = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()?;
        Some(self.handle(record))
    }

    /// The journal of events recorded across all positions.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn handle(&self, record: Arc<PositionRecord>) -> Position {
        Position {
            record,
            tokens: Arc::clone(&self.tokens),
            clock: Arc::clone(&self.clock),
            events: Arc::clone(&self.events),
        }
    }
}

/// Custody address for a position: last 20 bytes of a domain-tagged hash of
/// the id. Collision-free across the registry's id space.
fn derive_address(id: PositionId) -> Address {
    let mut preimage = Vec::with_capacity(16);
    preimage.extend_from_slice(b"position");
    preimage.extend_from_slice(&id.0.to_be_bytes());
    let hash = keccak256(&preimage);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::sim::InMemoryLedger;

    #[test]
    fn test_registry_allocates_distinct_ids_and_addresses() {
        let registry = PositionRegistry::new(
            Arc::new(InMemoryLedger::default()),
            Arc::new(SystemClock),
        );
        let a = registry.create(PositionKind::Redemption);
        let b = registry.create(PositionKind::Leveraged);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.address(), b.address());
        assert_eq!(a.kind(), PositionKind::Redemption);
        assert_eq!(b.kind(), PositionKind::Leveraged);
    }

    #[test]
    fn test_registry_get_resolves_existing_only() {
        let registry = PositionRegistry::new(
            Arc::new(InMemoryLedger::default()),
            Arc::new(SystemClock),
        );
        let created = registry.create(PositionKind::Redemption);
        assert!(registry.get(created.id()).is_some());
        assert!(registry.get(PositionId(999)).is_none());
    }
}
