use alloy_primitives::{Address, U256};
use std::sync::{Arc, Mutex, PoisonError};

use crate::adapters::{AdapterError, Vault};
use crate::constants::WAD_U256;
use crate::sim::InMemoryLedger;
use crate::wad;

/// Reference vault over the in-memory ledger.
///
/// Shares live on the ledger under the vault's own address as token id. The
/// assets-per-share exchange rate is settable so scenarios can simulate
/// accrued yield; back a raised rate with [`InMemoryLedger::mint`] to the
/// vault so redemptions stay funded.
pub struct SimVault {
    address: Address,
    asset: Address,
    ledger: Arc<InMemoryLedger>,
    /// Assets per share, WAD.
    exchange_rate: Mutex<U256>,
}

impl SimVault {
    pub fn new(address: Address, asset: Address, ledger: Arc<InMemoryLedger>) -> Self {
        Self {
            address,
            asset,
            ledger,
            exchange_rate: Mutex::new(WAD_U256),
        }
    }

    pub fn set_exchange_rate(&self, assets_per_share: U256) {
        *self
            .exchange_rate
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = assets_per_share;
    }

    fn rate(&self) -> U256 {
        *self
            .exchange_rate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn liquid_assets(&self) -> Result<U256, AdapterError> {
        self.ledger.balance_of(self.asset, self.address)
    }
}

impl Vault for SimVault {
    fn address(&self) -> Address {
        self.address
    }

    fn asset(&self) -> Address {
        self.asset
    }

    fn deposit(&self, assets: U256, owner: Address) -> Result<U256, AdapterError> {
        if assets.is_zero() {
            return Err(AdapterError::Vault {
                reason: "zero deposit".into(),
            });
        }
        let shares = wad::wdiv(assets, self.rate());
        self.ledger
            .transfer_from(self.asset, self.address, owner, self.address, assets)?;
        self.ledger.mint(self.address, owner, shares);
        Ok(shares)
    }

    fn withdraw(&self, assets: U256, to: Address, owner: Address) -> Result<U256, AdapterError> {
        let shares = wad::ceil_wdiv(assets, self.rate());
        let held = self.share_balance(owner)?;
        if shares > held {
            return Err(AdapterError::Vault {
                reason: format!("withdraw needs {shares} shares but {owner} holds {held}"),
            });
        }
        let liquid = self.liquid_assets()?;
        if assets > liquid {
            return Err(AdapterError::Vault {
                reason: format!("withdraw of {assets} exceeds vault liquidity {liquid}"),
            });
        }
        self.ledger.burn(self.address, owner, shares)?;
        self.ledger.transfer(self.asset, self.address, to, assets)?;
        Ok(shares)
    }

    fn redeem(&self, shares: U256, to: Address, owner: Address) -> Result<U256, AdapterError> {
        let held = self.share_balance(owner)?;
        if shares > held {
            return Err(AdapterError::Vault {
                reason: format!("redeem of {shares} shares exceeds balance {held} of {owner}"),
            });
        }
        let assets = wad::wmul(shares, self.rate());
        let liquid = self.liquid_assets()?;
        if assets > liquid {
            return Err(AdapterError::Vault {
                reason: format!("redeem pays {assets} but vault liquidity is {liquid}"),
            });
        }
        self.ledger.burn(self.address, owner, shares)?;
        self.ledger.transfer(self.asset, self.address, to, assets)?;
        Ok(assets)
    }

    fn convert_to_assets(&self, shares: U256) -> Result<U256, AdapterError> {
        Ok(wad::wmul(shares, self.rate()))
    }

    fn max_withdraw(&self, owner: Address) -> Result<U256, AdapterError> {
        let redeemable = self.convert_to_assets(self.share_balance(owner)?)?;
        Ok(redeemable.min(self.liquid_assets()?))
    }

    fn share_balance(&self, owner: Address) -> Result<U256, AdapterError> {
        self.ledger.balance_of(self.address, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wad_amount(value: u64) -> U256 {
        U256::from(value) * WAD_U256
    }

    fn setup() -> (Arc<InMemoryLedger>, SimVault, Address) {
        let ledger = Arc::new(InMemoryLedger::default());
        let vault = SimVault::new(
            Address::with_last_byte(0x0b),
            Address::with_last_byte(0x0a),
            Arc::clone(&ledger),
        );
        let owner = Address::with_last_byte(0x01);
        ledger.mint(vault.asset(), owner, wad_amount(100));
        ledger
            .approve(vault.asset(), owner, vault.address(), U256::MAX)
            .unwrap();
        (ledger, vault, owner)
    }

    #[test]
    fn test_deposit_mints_shares_at_rate() {
        let (_ledger, vault, owner) = setup();
        let shares = vault.deposit(wad_amount(100), owner).expect("deposit");
        assert_eq!(shares, wad_amount(100));
        assert_eq!(vault.share_balance(owner).unwrap(), wad_amount(100));

        // at rate 2.0 the same assets mint half the shares
        vault.set_exchange_rate(wad_amount(2));
        assert_eq!(
            vault.convert_to_assets(wad_amount(100)).unwrap(),
            wad_amount(200)
        );
    }

    #[test]
    fn test_withdraw_bounded_by_shares_and_liquidity() {
        let (ledger, vault, owner) = setup();
        vault.deposit(wad_amount(100), owner).unwrap();

        let outsider = Address::with_last_byte(0x02);
        assert!(vault.withdraw(wad_amount(1), outsider, outsider).is_err());

        // drain vault liquidity below the owner's claim
        ledger
            .transfer(vault.asset(), vault.address(), outsider, wad_amount(60))
            .unwrap();
        assert_eq!(vault.max_withdraw(owner).unwrap(), wad_amount(40));
        assert!(vault.withdraw(wad_amount(50), owner, owner).is_err());
        assert!(vault.withdraw(wad_amount(40), owner, owner).is_ok());
    }

    #[test]
    fn test_redeem_pays_assets_at_rate() {
        let (_ledger, vault, owner) = setup();
        vault.deposit(wad_amount(100), owner).unwrap();
        let to = Address::with_last_byte(0x03);
        let assets = vault.redeem(wad_amount(25), to, owner).expect("redeem");
        assert_eq!(assets, wad_amount(25));
        assert_eq!(vault.share_balance(owner).unwrap(), wad_amount(75));
    }
}
