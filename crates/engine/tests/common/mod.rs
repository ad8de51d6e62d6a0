//! Shared scenario scaffolding over the sim environment.
#![allow(dead_code)] // each test binary uses its own subset

use alloy_primitives::{Address, U256};
use std::sync::Arc;

use topup_engine::adapters::{LendingPool, Tokens, Vault};
use topup_engine::clock::Clock;
use topup_engine::sim::SimEnv;
use topup_engine::{LendingSetup, Position, PositionKind, PositionRegistry, PositionSetup};

pub const WAD: u128 = 1_000_000_000_000_000_000;

pub fn wad(value: u64) -> U256 {
    U256::from(value) * U256::from(WAD)
}

/// Annual rate as a WAD fraction, e.g. `rate_pct(5)` = 5%.
pub fn rate_pct(percent: u64) -> U256 {
    U256::from(percent) * U256::from(WAD) / U256::from(100)
}

pub fn manager() -> Address {
    Address::with_last_byte(0xa1)
}

pub fn recipient() -> Address {
    Address::with_last_byte(0xa2)
}

pub fn keeper() -> Address {
    Address::with_last_byte(0xa3)
}

pub struct TestBed {
    pub env: SimEnv,
    pub registry: PositionRegistry,
    pub position: Position,
}

impl TestBed {
    /// Fund `caller` with the target asset, approve the position to pull it,
    /// and deposit.
    pub fn fund_and_deposit(&self, caller: Address, amount: U256) {
        self.env.ledger.mint(self.env.asset, caller, amount);
        self.env
            .ledger
            .approve(self.env.asset, caller, self.position.address(), U256::MAX)
            .expect("approve");
        self.position.deposit(caller, amount).expect("deposit");
    }

    pub fn asset_balance(&self, holder: Address) -> U256 {
        self.env
            .ledger
            .balance_of(self.env.asset, holder)
            .expect("balance_of")
    }
}

/// Registry plus an uninitialized position of the given kind.
pub fn bare_bed(kind: PositionKind) -> TestBed {
    let env = SimEnv::new();
    let registry = PositionRegistry::new(
        Arc::clone(&env.ledger) as Arc<dyn Tokens>,
        Arc::clone(&env.clock) as Arc<dyn Clock>,
    );
    let position = registry.create(kind);
    TestBed {
        env,
        registry,
        position,
    }
}

pub fn redemption_setup(bed: &TestBed, threshold: U256) -> PositionSetup {
    PositionSetup {
        manager: manager(),
        recipient: recipient(),
        threshold,
        vault: Arc::clone(&bed.env.vault) as Arc<dyn Vault>,
        lending: None,
    }
}

pub fn leveraged_setup(bed: &TestBed, threshold: U256, max_borrowing_rate: U256) -> PositionSetup {
    PositionSetup {
        manager: manager(),
        recipient: recipient(),
        threshold,
        vault: Arc::clone(&bed.env.vault) as Arc<dyn Vault>,
        lending: Some(LendingSetup {
            pool: Arc::clone(&bed.env.pool) as Arc<dyn LendingPool>,
            max_borrowing_rate,
        }),
    }
}

/// Initialized redemption-kind bed.
pub fn redemption_bed(threshold: U256) -> TestBed {
    let bed = bare_bed(PositionKind::Redemption);
    let setup = redemption_setup(&bed, threshold);
    bed.position.initialize(setup).expect("initialize");
    bed
}

/// Initialized leveraged-kind bed with funded pool liquidity.
pub fn leveraged_bed(threshold: U256, max_borrowing_rate: U256, pool_liquidity: U256) -> TestBed {
    let bed = bare_bed(PositionKind::Leveraged);
    let setup = leveraged_setup(&bed, threshold, max_borrowing_rate);
    bed.position.initialize(setup).expect("initialize");
    bed.env.pool.fund(pool_liquidity);
    bed
}
