use alloy_primitives::{Address, U256};

use super::AdapterError;

/// Asset transfer primitive.
///
/// One fungible path and one native-currency path, each answering success or
/// failure; compatibility with legacy no-return transfers is the
/// implementation's concern, never the engine's. `transfer_from` moves funds
/// a third party approved via `approve` — the engine grants its standing
/// approvals once at initialization.
pub trait Tokens: Send + Sync {
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256, AdapterError>;

    fn transfer(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AdapterError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming
    /// `from`'s allowance toward `spender`.
    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AdapterError>;

    fn approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), AdapterError>;

    fn native_balance_of(&self, holder: Address) -> Result<U256, AdapterError>;

    fn native_transfer(&self, from: Address, to: Address, amount: U256)
        -> Result<(), AdapterError>;
}
