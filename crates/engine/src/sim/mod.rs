//! In-memory reference implementations of the collaborator traits.
//!
//! Used by the integration tests and the keeper's rehearsal mode. Each
//! adapter call validates before it mutates, so a failed call leaves the
//! environment untouched.

mod pool;
mod tokens;
mod vault;

pub use pool::SimPool;
pub use tokens::InMemoryLedger;
pub use vault::SimVault;

use alloy_primitives::Address;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::clock::Clock;

/// Controllable clock for deterministic accrual in tests and rehearsals.
#[derive(Debug)]
pub struct SimClock {
    now: AtomicU64,
}

impl SimClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A wired-up environment: one ledger, one clock, one vault and one lending
/// pool over the same underlying asset, at fixed well-known addresses.
pub struct SimEnv {
    pub ledger: Arc<InMemoryLedger>,
    pub clock: Arc<SimClock>,
    pub vault: Arc<SimVault>,
    pub pool: Arc<SimPool>,
    /// The vault's underlying asset, which is also the pool's quote token.
    pub asset: Address,
}

impl SimEnv {
    /// Genesis unix time for sim scenarios.
    pub const GENESIS: u64 = 1_700_000_000;

    pub fn new() -> Self {
        let asset = Address::with_last_byte(0x0a);
        let vault_address = Address::with_last_byte(0x0b);
        let pool_address = Address::with_last_byte(0x0c);

        let ledger = Arc::new(InMemoryLedger::default());
        let clock = Arc::new(SimClock::new(Self::GENESIS));
        let vault = Arc::new(SimVault::new(vault_address, asset, Arc::clone(&ledger)));
        let pool = Arc::new(SimPool::new(
            pool_address,
            vault_address,
            asset,
            Arc::clone(&ledger),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));

        Self {
            ledger,
            clock,
            vault,
            pool,
            asset,
        }
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}
