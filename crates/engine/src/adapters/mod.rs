//! Traits for the external collaborators a position operates against.
//!
//! The engine consumes the vault, the lending pool and the asset transfer
//! primitive exclusively through these interfaces; their internal accounting
//! is out of scope. Reference in-memory implementations live in
//! [`crate::sim`].

pub mod pool;
pub mod tokens;
pub mod vault;

pub use pool::{
    BorrowerInfo, DebtInfo, InflatorSnapshot, LendingPool, RatesInfo, ReservesInfo,
};
pub use tokens::Tokens;
pub use vault::Vault;

use thiserror::Error;

/// Failure surfaced by a collaborator call. Propagated verbatim through
/// [`crate::EngineError::External`] — never masked or retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("vault call failed: {reason}")]
    Vault { reason: String },

    #[error("lending pool call failed: {reason}")]
    Pool { reason: String },

    #[error("asset transfer failed: {reason}")]
    Transfer { reason: String },
}
