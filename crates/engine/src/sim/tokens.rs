use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::adapters::{AdapterError, Tokens};

/// In-memory fungible + native ledger implementing the transfer primitive.
///
/// Balances and allowances are validated before any mutation; a failing call
/// moves nothing.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<(Address, Address), U256>>,
    allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    native: Mutex<HashMap<Address, U256>>,
}

impl InMemoryLedger {
    pub fn mint(&self, token: Address, to: Address, amount: U256) {
        *self.lock_balances().entry((token, to)).or_default() += amount;
    }

    pub fn mint_native(&self, to: Address, amount: U256) {
        *self
            .native
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(to)
            .or_default() += amount;
    }

    pub(crate) fn burn(
        &self,
        token: Address,
        from: Address,
        amount: U256,
    ) -> Result<(), AdapterError> {
        let mut balances = self.lock_balances();
        let held = balances.entry((token, from)).or_default();
        if *held < amount {
            return Err(AdapterError::Transfer {
                reason: format!("burn of {amount} exceeds balance {held} of {from}"),
            });
        }
        *held -= amount;
        Ok(())
    }

    fn lock_balances(&self) -> MutexGuard<'_, HashMap<(Address, Address), U256>> {
        self.balances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn move_balance(
        balances: &mut HashMap<(Address, Address), U256>,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AdapterError> {
        let held = balances.get(&(token, from)).copied().unwrap_or_default();
        if held < amount {
            return Err(AdapterError::Transfer {
                reason: format!("transfer of {amount} exceeds balance {held} of {from}"),
            });
        }
        *balances.entry((token, from)).or_default() -= amount;
        *balances.entry((token, to)).or_default() += amount;
        Ok(())
    }
}

impl Tokens for InMemoryLedger {
    fn balance_of(&self, token: Address, holder: Address) -> Result<U256, AdapterError> {
        Ok(self
            .lock_balances()
            .get(&(token, holder))
            .copied()
            .unwrap_or_default())
    }

    fn transfer(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AdapterError> {
        Self::move_balance(&mut self.lock_balances(), token, from, to, amount)
    }

    fn transfer_from(
        &self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AdapterError> {
        let mut allowances = self
            .allowances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let allowed = allowances
            .get(&(token, from, spender))
            .copied()
            .unwrap_or_default();
        if allowed < amount {
            return Err(AdapterError::Transfer {
                reason: format!(
                    "allowance {allowed} of {from} toward {spender} below transfer of {amount}"
                ),
            });
        }

        // Validate the balance before consuming the allowance.
        let mut balances = self.lock_balances();
        Self::move_balance(&mut balances, token, from, to, amount)?;
        if allowed != U256::MAX {
            allowances.insert((token, from, spender), allowed - amount);
        }
        Ok(())
    }

    fn approve(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), AdapterError> {
        self.allowances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((token, owner, spender), amount);
        Ok(())
    }

    fn native_balance_of(&self, holder: Address) -> Result<U256, AdapterError> {
        Ok(self
            .native
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&holder)
            .copied()
            .unwrap_or_default())
    }

    fn native_transfer(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), AdapterError> {
        let mut native = self.native.lock().unwrap_or_else(PoisonError::into_inner);
        let held = native.get(&from).copied().unwrap_or_default();
        if held < amount {
            return Err(AdapterError::Transfer {
                reason: format!("native transfer of {amount} exceeds balance {held} of {from}"),
            });
        }
        *native.entry(from).or_default() -= amount;
        *native.entry(to).or_default() += amount;
        Ok(())
    }
}
