//! Rehearsal scenario: the configured position wired onto the engine's sim
//! environment, so the full trigger → rebalance decision loop runs without a
//! live chain.

use alloy_primitives::{Address, U256};
use anyhow::{Context, Result};
use std::sync::Arc;

use topup_engine::adapters::{LendingPool, Tokens, Vault};
use topup_engine::clock::Clock;
use topup_engine::sim::SimEnv;
use topup_engine::{
    LendingSetup, Position, PositionKind, PositionRegistry, PositionSetup,
};

use crate::config::{ResolvedPosition, ResolvedScenario};

/// Destination for the recipient's simulated spending.
fn spend_sink() -> Address {
    Address::with_last_byte(0xfd)
}

pub struct Rehearsal {
    pub env: SimEnv,
    pub registry: PositionRegistry,
    pub position: Position,
    recipient: Address,
    recipient_spend_per_poll: U256,
}

impl Rehearsal {
    /// Build the environment, create and initialize the position, and seed
    /// it with the configured deposit.
    pub fn build(position_cfg: &ResolvedPosition, scenario: &ResolvedScenario) -> Result<Self> {
        let env = SimEnv::new();
        env.pool.fund(scenario.pool_liquidity);
        env.pool.set_borrow_rate(scenario.borrow_rate);
        env.pool
            .set_reserves(scenario.bond_escrow, scenario.unclaimed_reserves);

        let registry = PositionRegistry::new(
            Arc::clone(&env.ledger) as Arc<dyn Tokens>,
            Arc::clone(&env.clock) as Arc<dyn Clock>,
        );
        let position = registry.create(position_cfg.kind);

        let lending = match position_cfg.kind {
            PositionKind::Redemption => None,
            PositionKind::Leveraged => Some(LendingSetup {
                pool: Arc::clone(&env.pool) as Arc<dyn LendingPool>,
                max_borrowing_rate: position_cfg.max_borrowing_rate,
            }),
        };
        position
            .initialize(PositionSetup {
                manager: position_cfg.manager,
                recipient: position_cfg.recipient,
                threshold: position_cfg.threshold,
                vault: Arc::clone(&env.vault) as Arc<dyn Vault>,
                lending,
            })
            .context("initializing position")?;

        env.ledger
            .mint(env.asset, position_cfg.manager, position_cfg.initial_deposit);
        env.ledger
            .approve(
                env.asset,
                position_cfg.manager,
                position.address(),
                U256::MAX,
            )
            .context("approving seed deposit")?;
        position
            .deposit(position_cfg.manager, position_cfg.initial_deposit)
            .context("seeding deposit")?;

        Ok(Self {
            env,
            registry,
            position,
            recipient: position_cfg.recipient,
            recipient_spend_per_poll: scenario.recipient_spend_per_poll,
        })
    }

    /// One poll tick of world time: advance the sim clock (interest accrues)
    /// and let the recipient spend, re-opening the threshold gap over time.
    pub fn tick(&self, sim_seconds: u64) -> Result<()> {
        self.env.clock.advance(sim_seconds);

        if !self.recipient_spend_per_poll.is_zero() {
            let balance = self
                .env
                .ledger
                .balance_of(self.env.asset, self.recipient)
                .context("reading recipient balance")?;
            let spend = self.recipient_spend_per_poll.min(balance);
            if !spend.is_zero() {
                self.env
                    .ledger
                    .transfer(self.env.asset, self.recipient, spend_sink(), spend)
                    .context("applying recipient spend")?;
            }
        }
        Ok(())
    }
}
