//! Automated top-up positions over a yield vault.
//!
//! A position parks capital in a yield-bearing vault and keeps a spending
//! account replenished: whenever the recipient's balance of the vault's
//! underlying asset falls below a configured threshold, a permissionless
//! `rebalance` closes the gap. Two kinds exist:
//!
//! - **Redemption**: withdraws principal from the vault directly.
//! - **Leveraged**: pledges vault shares as collateral to a lending pool and
//!   borrows the top-up amount instead, leaving the principal invested.
//!
//! Position economics are never cached — debt, collateral and capacity are
//! re-derived from live adapter queries on every call. The external
//! collaborators (vault, lending pool, asset transfer primitive, clock) are
//! consumed through the traits in [`adapters`] and [`clock`]; in-memory
//! reference implementations for tests and rehearsal runs live in [`sim`].

pub mod adapters;
pub mod clock;
pub mod constants;
pub mod errors;
pub mod events;
mod guard;
pub mod position;
pub mod sim;
pub mod wad;

pub use errors::EngineError;
pub use events::{Event, EventLog};
pub use position::{
    DebtPosition, LendingSetup, Position, PositionId, PositionKind, PositionRegistry,
    PositionSetup,
};
