use alloy_primitives::{Address, U256};

use super::AdapterError;

/// Yield-bearing vault: accepts the underlying asset, issues shares against
/// the growing pooled balance. The vault's own address doubles as its share
/// token identifier on the ledger.
pub trait Vault: Send + Sync {
    fn address(&self) -> Address;

    /// The underlying asset the vault accepts and pays out.
    fn asset(&self) -> Address;

    /// Supply `assets` pulled from `owner`; mints shares to `owner`.
    /// Returns the shares minted.
    fn deposit(&self, assets: U256, owner: Address) -> Result<U256, AdapterError>;

    /// Withdraw exactly `assets` to `to`, burning shares from `owner`.
    /// Returns the shares burned.
    fn withdraw(&self, assets: U256, to: Address, owner: Address) -> Result<U256, AdapterError>;

    /// Redeem exactly `shares` from `owner`, paying assets to `to`.
    /// Returns the assets paid out.
    fn redeem(&self, shares: U256, to: Address, owner: Address) -> Result<U256, AdapterError>;

    fn convert_to_assets(&self, shares: U256) -> Result<U256, AdapterError>;

    /// Maximum amount of assets `owner` could withdraw right now, bounded by
    /// both the owner's shares and the vault's liquid balance.
    fn max_withdraw(&self, owner: Address) -> Result<U256, AdapterError>;

    fn share_balance(&self, owner: Address) -> Result<U256, AdapterError>;
}
