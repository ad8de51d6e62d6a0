//! Shared base operations for both position kinds.
//!
//! Every mutating entry point takes the caller's identity explicitly, holds
//! the position's reentrancy flag for its full duration (adapter calls
//! included), orders all validation and read-only queries before the first
//! mutation, and records one event on success. `rebalance` is deliberately
//! permissionless so unattended keepers can drive it; everything else that
//! mutates requires the stored manager.

use alloy_primitives::{Address, U256};
use tracing::info;

use crate::errors::EngineError;
use crate::events::Event;
use crate::position::{ConfigCell, LendingCell, Position, PositionId, PositionKind, PositionSetup};

use std::sync::PoisonError;

/// Outcome of evaluating the rebalance predicate, with the quantities the
/// rebalance itself needs so they are computed exactly once.
pub(crate) struct TriggerState {
    pub met: bool,
    pub needed: U256,
    pub capacity: U256,
}

impl TriggerState {
    fn not_met() -> Self {
        Self {
            met: false,
            needed: U256::ZERO,
            capacity: U256::ZERO,
        }
    }
}

impl Position {
    // -----------------------------------------------------------------------
    // Identity views
    // -----------------------------------------------------------------------

    pub fn id(&self) -> PositionId {
        self.record.id
    }

    /// The position's custody address on the ledger.
    pub fn address(&self) -> Address {
        self.record.address
    }

    pub fn kind(&self) -> PositionKind {
        self.record.kind
    }

    pub fn is_initialized(&self) -> bool {
        self.record
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn manager(&self) -> Result<Address, EngineError> {
        Ok(self.config()?.manager)
    }

    pub fn recipient(&self) -> Result<Address, EngineError> {
        Ok(self.config()?.recipient)
    }

    pub fn threshold(&self) -> Result<U256, EngineError> {
        Ok(self.config()?.threshold)
    }

    pub fn target_asset(&self) -> Result<Address, EngineError> {
        Ok(self.config()?.target_asset)
    }

    // -----------------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------------

    /// One-time setup. Validates the full configuration tuple, derives the
    /// target asset from the vault, and grants the standing ledger approvals
    /// so no later operation needs a per-call approval step.
    pub fn initialize(&self, setup: PositionSetup) -> Result<(), EngineError> {
        let _entered = self.record.entered.enter()?;
        let mut slot = self
            .record
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(EngineError::AlreadyInitialized);
        }

        if setup.manager == Address::ZERO {
            return Err(EngineError::InvalidArgument {
                reason: "manager address is zero".into(),
            });
        }
        if setup.recipient == Address::ZERO {
            return Err(EngineError::InvalidArgument {
                reason: "recipient address is zero".into(),
            });
        }
        if setup.threshold.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "threshold is zero".into(),
            });
        }

        let target_asset = setup.vault.asset();
        let lending = match (self.record.kind, setup.lending) {
            (PositionKind::Leveraged, None) => {
                return Err(EngineError::InvalidArgument {
                    reason: "leveraged position requires a lending pool".into(),
                });
            }
            (PositionKind::Redemption, Some(_)) => {
                return Err(EngineError::InvalidArgument {
                    reason: "redemption position takes no lending pool".into(),
                });
            }
            (PositionKind::Redemption, None) => None,
            (PositionKind::Leveraged, Some(lending)) => {
                if lending.max_borrowing_rate.is_zero() {
                    return Err(EngineError::InvalidArgument {
                        reason: "max borrowing rate is zero".into(),
                    });
                }
                if lending.pool.collateral_token() != setup.vault.address() {
                    return Err(EngineError::InvalidArgument {
                        reason: "pool collateral token does not match vault shares".into(),
                    });
                }
                if lending.pool.quote_token() != target_asset {
                    return Err(EngineError::InvalidArgument {
                        reason: "pool quote token does not match vault asset".into(),
                    });
                }
                Some(LendingCell {
                    pool: lending.pool,
                    max_borrowing_rate: lending.max_borrowing_rate,
                })
            }
        };

        // Standing approvals: target asset to the vault; for the leveraged
        // kind, shares and quote repayments to the pool as well.
        self.tokens.approve(
            target_asset,
            self.record.address,
            setup.vault.address(),
            U256::MAX,
        )?;
        if let Some(cell) = &lending {
            self.tokens.approve(
                setup.vault.address(),
                self.record.address,
                cell.pool.address(),
                U256::MAX,
            )?;
            self.tokens
                .approve(target_asset, self.record.address, cell.pool.address(), U256::MAX)?;
        }

        info!(
            position = %self.record.id,
            kind = self.record.kind.as_str(),
            manager = %setup.manager,
            recipient = %setup.recipient,
            threshold = %setup.threshold,
            "position initialized"
        );

        *slot = Some(ConfigCell {
            manager: setup.manager,
            recipient: setup.recipient,
            threshold: setup.threshold,
            vault: setup.vault,
            target_asset,
            lending,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deposit
    // -----------------------------------------------------------------------

    /// Pull `amount` of the target asset from the caller and supply it to the
    /// vault; the leveraged kind pledges the minted shares to the pool in the
    /// same call. Leaves no loose target-asset balance behind.
    pub fn deposit(&self, caller: Address, amount: U256) -> Result<(), EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        if amount.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "deposit amount is zero".into(),
            });
        }

        self.tokens.transfer_from(
            cfg.target_asset,
            self.record.address,
            caller,
            self.record.address,
            amount,
        )?;
        let shares = cfg.vault.deposit(amount, self.record.address)?;
        if let Some(lending) = &cfg.lending {
            let index = self.draw_index(lending)?;
            lending
                .pool
                .draw_debt(self.record.address, U256::ZERO, index, shares)?;
        }

        self.events.record(Event::Deposit {
            position: self.record.id,
            caller,
            amount,
        });
        info!(
            position = %self.record.id,
            caller = %caller,
            amount = %amount,
            shares = %shares,
            "deposit supplied to vault"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    /// Remove `amount` of underlying value to the manager. The leveraged
    /// kind pulls pledged collateral back from the pool proportionally
    /// before redeeming from the vault.
    pub fn withdraw(&self, caller: Address, amount: U256) -> Result<(), EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        if amount.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "withdraw amount is zero".into(),
            });
        }

        match &cfg.lending {
            None => self.redeem_withdraw(&cfg, amount)?,
            Some(lending) => self.unpledge_withdraw(&cfg, lending, amount)?,
        }

        self.events.record(Event::Withdrawal {
            position: self.record.id,
            amount,
        });
        info!(position = %self.record.id, amount = %amount, "withdrawal to manager");
        Ok(())
    }

    /// Fully unwind: repay and unpledge everything (leveraged), redeem all
    /// vault shares, and send the resulting balance to the manager. A no-op
    /// transfer of zero on an already-empty position.
    pub fn withdraw_all(&self, caller: Address) -> Result<U256, EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;

        if let Some(lending) = &cfg.lending {
            let borrower = lending.pool.borrower_info(self.record.address)?;
            if !borrower.t0_debt.is_zero() || !borrower.collateral.is_zero() {
                let debt = self.current_debt(lending)?;
                lending.pool.repay_debt(
                    self.record.address,
                    debt,
                    borrower.collateral,
                    self.record.address,
                    0,
                )?;
            }
        }

        let shares = cfg.vault.share_balance(self.record.address)?;
        if !shares.is_zero() {
            cfg.vault
                .redeem(shares, self.record.address, self.record.address)?;
        }

        let balance = self
            .tokens
            .balance_of(cfg.target_asset, self.record.address)?;
        if !balance.is_zero() {
            self.tokens
                .transfer(cfg.target_asset, self.record.address, cfg.manager, balance)?;
        }

        self.events.record(Event::FullWithdrawal {
            position: self.record.id,
            amount: balance,
        });
        info!(position = %self.record.id, amount = %balance, "position fully withdrawn");
        Ok(balance)
    }

    // -----------------------------------------------------------------------
    // Configuration updates
    // -----------------------------------------------------------------------

    pub fn set_threshold(&self, caller: Address, value: U256) -> Result<(), EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        if value.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "threshold is zero".into(),
            });
        }
        self.update_config(|cell| cell.threshold = value);

        self.events.record(Event::ThresholdUpdated {
            position: self.record.id,
            threshold: value,
        });
        info!(position = %self.record.id, threshold = %value, "threshold updated");
        Ok(())
    }

    pub fn set_recipient(&self, caller: Address, recipient: Address) -> Result<(), EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        if recipient == Address::ZERO {
            return Err(EngineError::InvalidArgument {
                reason: "recipient address is zero".into(),
            });
        }
        self.update_config(|cell| cell.recipient = recipient);

        self.events.record(Event::RecipientUpdated {
            position: self.record.id,
            recipient,
        });
        info!(position = %self.record.id, recipient = %recipient, "recipient updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Token rescue
    // -----------------------------------------------------------------------

    /// Rescue arbitrary tokens (or native currency, signaled by a zero token
    /// identifier) accidentally sent to the position. Amounts are
    /// caller-driven and taken verbatim; every entry is validated against
    /// the live balance before anything moves, so one over-specified amount
    /// aborts the whole batch with no transfer executed.
    pub fn sweep(
        &self,
        caller: Address,
        tokens: &[Address],
        amounts: &[U256],
    ) -> Result<(), EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        if tokens.len() != amounts.len() {
            return Err(EngineError::InvalidArgument {
                reason: "tokens/amounts length mismatch".into(),
            });
        }

        for (token, amount) in tokens.iter().zip(amounts) {
            let available = if *token == Address::ZERO {
                self.tokens.native_balance_of(self.record.address)?
            } else {
                self.tokens.balance_of(*token, self.record.address)?
            };
            if *amount > available {
                return Err(crate::adapters::AdapterError::Transfer {
                    reason: format!(
                        "sweep of {token} requests {amount} but only {available} is held"
                    ),
                }
                .into());
            }
        }

        for (token, amount) in tokens.iter().zip(amounts) {
            if *token == Address::ZERO {
                self.tokens
                    .native_transfer(self.record.address, cfg.manager, *amount)?;
            } else {
                self.tokens
                    .transfer(*token, self.record.address, cfg.manager, *amount)?;
            }
        }

        info!(position = %self.record.id, entries = tokens.len(), "sweep to manager");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rebalancing
    // -----------------------------------------------------------------------

    /// Read-only predicate: the recipient is below the threshold, the
    /// position has realizable capacity, and (leveraged) the pool rate is
    /// strictly under the configured ceiling.
    pub fn rebalance_trigger(&self) -> Result<bool, EngineError> {
        let cfg = self.config()?;
        Ok(self.evaluate_trigger(&cfg)?.met)
    }

    /// Permissionless top-up: transfer `min(threshold − recipient balance,
    /// capacity)` of the target asset to the recipient, via the
    /// kind-specific path. Returns the amount transferred.
    pub fn rebalance(&self, caller: Address) -> Result<U256, EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        let trigger = self.evaluate_trigger(&cfg)?;
        if !trigger.met {
            return Err(EngineError::TriggerNotMet);
        }
        let amount = trigger.needed.min(trigger.capacity);

        match &cfg.lending {
            None => self.redeem_rebalance(&cfg, amount)?,
            Some(lending) => self.borrow_rebalance(&cfg, lending, amount)?,
        }

        self.events.record(Event::Rebalance {
            position: self.record.id,
            needed: trigger.needed,
            transferred: amount,
        });
        info!(
            position = %self.record.id,
            caller = %caller,
            needed = %trigger.needed,
            transferred = %amount,
            "rebalance executed"
        );
        Ok(amount)
    }

    /// Current value of the position in target-asset terms.
    pub fn balance_of_underlying(&self) -> Result<U256, EngineError> {
        let cfg = self.config()?;
        match &cfg.lending {
            None => self.redemption_underlying(&cfg),
            Some(lending) => self.leveraged_underlying(&cfg, lending),
        }
    }

    // -----------------------------------------------------------------------
    // Shared internals
    // -----------------------------------------------------------------------

    pub(crate) fn evaluate_trigger(&self, cfg: &ConfigCell) -> Result<TriggerState, EngineError> {
        let balance = self.tokens.balance_of(cfg.target_asset, cfg.recipient)?;
        if balance >= cfg.threshold {
            return Ok(TriggerState::not_met());
        }
        let needed = cfg.threshold - balance;

        let capacity = match &cfg.lending {
            None => cfg.vault.max_withdraw(self.record.address)?,
            Some(lending) => self.borrow_capacity(lending)?,
        };
        if capacity.is_zero() {
            return Ok(TriggerState::not_met());
        }

        if let Some(lending) = &cfg.lending {
            let rates = lending.pool.interest_rate_info()?;
            if rates.borrow_rate >= lending.max_borrowing_rate {
                return Ok(TriggerState::not_met());
            }
        }

        Ok(TriggerState {
            met: true,
            needed,
            capacity,
        })
    }

    pub(crate) fn config(&self) -> Result<ConfigCell, EngineError> {
        self.record
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| EngineError::InvalidArgument {
                reason: "position is not initialized".into(),
            })
    }

    pub(crate) fn require_manager(
        &self,
        cfg: &ConfigCell,
        caller: Address,
    ) -> Result<(), EngineError> {
        if caller != cfg.manager {
            return Err(EngineError::Unauthorized { caller });
        }
        Ok(())
    }

    pub(crate) fn lending<'a>(
        &self,
        cfg: &'a ConfigCell,
    ) -> Result<&'a LendingCell, EngineError> {
        cfg.lending.as_ref().ok_or_else(|| EngineError::InvalidArgument {
            reason: "position has no lending pool".into(),
        })
    }

    fn update_config(&self, apply: impl FnOnce(&mut ConfigCell)) {
        let mut slot = self
            .record
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = slot.as_mut() {
            apply(cell);
        }
    }

    pub(crate) fn update_lending_config(&self, apply: impl FnOnce(&mut LendingCell)) {
        self.update_config(|cell| {
            if let Some(lending) = cell.lending.as_mut() {
                apply(lending);
            }
        });
    }
}
