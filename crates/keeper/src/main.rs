//! Top-up keeper: the permissionless automation around a position.
//!
//! Polls `rebalance_trigger()` on an interval and submits `rebalance()` when
//! it holds, against a rehearsal scenario built on the engine's sim
//! environment. The trigger is always evaluated before submitting; the race
//! where it flips in between is logged and tolerated, never fatal.

mod config;
mod logging;
mod scenario;

use alloy_primitives::Address;
use anyhow::Result;
use std::path::PathBuf;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use topup_engine::EngineError;

use scenario::Rehearsal;

/// The keeper's own identity. Rebalance is permissionless, so any address
/// works; a fixed one keeps the logs readable.
fn keeper_address() -> Address {
    Address::with_last_byte(0xfe)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignore if missing).
    let _ = dotenvy::dotenv();

    let config_dir = std::env::var("KEEPER_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let config = config::load_config(&config_dir)?;

    // Initialize tracing — hold the guard for the process lifetime.
    let _guard = logging::init_tracing(&config.logging)?;

    info!(
        kind = %config.position.kind,
        poll_interval_secs = config.timing.poll_interval_secs,
        sim_seconds_per_poll = config.timing.sim_seconds_per_poll,
        "top-up keeper starting (rehearsal mode)"
    );

    let (position_cfg, scenario_cfg) = config.resolve()?;
    let rehearsal = Rehearsal::build(&position_cfg, &scenario_cfg)?;

    info!(
        position = %rehearsal.position.id(),
        address = %rehearsal.position.address(),
        manager = %position_cfg.manager,
        recipient = %position_cfg.recipient,
        "position seeded"
    );

    let keeper = keeper_address();
    let mut ticker = interval(Duration::from_secs(config.timing.poll_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = poll_once(&rehearsal, keeper, config.timing.sim_seconds_per_poll) {
                    warn!(error = %e, "poll failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

fn poll_once(rehearsal: &Rehearsal, keeper: Address, sim_seconds: u64) -> Result<()> {
    rehearsal.tick(sim_seconds)?;

    if !rehearsal.position.rebalance_trigger()? {
        debug!("trigger not met");
        return Ok(());
    }

    match rehearsal.position.rebalance(keeper) {
        Ok(transferred) => info!(transferred = %transferred, "rebalance submitted"),
        Err(EngineError::TriggerNotMet) => warn!("trigger flipped before submission"),
        Err(e) => return Err(e.into()),
    }

    for event in rehearsal.registry.events().drain() {
        info!(?event, "position event");
    }
    Ok(())
}
