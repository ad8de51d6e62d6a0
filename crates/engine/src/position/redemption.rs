//! Redemption-kind internals: top-ups and withdrawals come straight out of
//! the vault's principal. No debt accounting.

use alloy_primitives::U256;

use crate::errors::EngineError;
use crate::position::{ConfigCell, Position};

impl Position {
    /// Withdraw `amount` from the vault to the manager. An empty position is
    /// rejected before the vault is asked anything.
    pub(crate) fn redeem_withdraw(
        &self,
        cfg: &ConfigCell,
        amount: U256,
    ) -> Result<(), EngineError> {
        let shares = cfg.vault.share_balance(self.record.address)?;
        if shares.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "position holds no vault balance".into(),
            });
        }
        cfg.vault.withdraw(amount, cfg.manager, self.record.address)?;
        Ok(())
    }

    /// Execute a triggered top-up by withdrawing directly to the recipient.
    pub(crate) fn redeem_rebalance(
        &self,
        cfg: &ConfigCell,
        amount: U256,
    ) -> Result<(), EngineError> {
        cfg.vault
            .withdraw(amount, cfg.recipient, self.record.address)?;
        Ok(())
    }

    /// Vault-share balance converted to asset terms.
    pub(crate) fn redemption_underlying(&self, cfg: &ConfigCell) -> Result<U256, EngineError> {
        let shares = cfg.vault.share_balance(self.record.address)?;
        Ok(cfg.vault.convert_to_assets(shares)?)
    }
}
