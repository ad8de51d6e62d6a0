use alloy_primitives::Address;
use thiserror::Error;

use crate::adapters::AdapterError;

/// Typed error hierarchy for position operations.
///
/// Collaborator failures are forwarded transparently — the engine never
/// catches, masks or retries a vault/pool/transfer error; the whole
/// operation aborts and the original failure reaches the caller.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("caller {caller} is not the position manager")]
    Unauthorized { caller: Address },

    #[error("position is already initialized")]
    AlreadyInitialized,

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("reentrant call rejected")]
    Reentrancy,

    #[error("rebalance trigger not met")]
    TriggerNotMet,

    #[error(transparent)]
    External(#[from] AdapterError),
}
