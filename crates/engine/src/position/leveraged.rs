//! Leveraged-kind internals and entry points: top-ups are borrowed against
//! pledged vault shares, principal stays invested. Includes the
//! permissionless debt-repayment path and the manager-only escape hatches
//! for abnormal pool states.

use alloy_primitives::{Address, U256};
use tracing::info;

use crate::constants::BASELINE_PRICE_INDEX;
use crate::errors::EngineError;
use crate::events::Event;
use crate::position::debt::{self, DebtPosition};
use crate::position::{ConfigCell, LendingCell, Position};
use crate::wad;

impl Position {
    // -----------------------------------------------------------------------
    // Permissionless entry points
    // -----------------------------------------------------------------------

    /// Apply up to `amount` of the caller's funds against the position's
    /// outstanding debt, pulling no collateral. Open to any third party so a
    /// guarantor can clear the obligation. Returns the amount repaid.
    pub fn repay_debt(&self, caller: Address, amount: U256) -> Result<U256, EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        let lending = self.lending(&cfg)?;
        if amount.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "repay amount is zero".into(),
            });
        }

        let debt = self.current_debt(lending)?;
        let pay = amount.min(debt);
        if pay.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "position has no outstanding debt".into(),
            });
        }

        self.tokens.transfer_from(
            cfg.target_asset,
            self.record.address,
            caller,
            self.record.address,
            pay,
        )?;
        let repaid = lending.pool.repay_debt(
            self.record.address,
            pay,
            U256::ZERO,
            self.record.address,
            0,
        )?;

        self.events.record(Event::DebtRepaid {
            position: self.record.id,
            caller,
            amount: repaid,
        });
        info!(position = %self.record.id, caller = %caller, amount = %repaid, "debt repaid");
        Ok(repaid)
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Live debt view: outstanding obligation, pledged collateral and the
    /// pool's risk prices, re-derived from pool queries on every call.
    pub fn debt_position(&self) -> Result<DebtPosition, EngineError> {
        let cfg = self.config()?;
        let lending = self.lending(&cfg)?;
        let borrower = lending.pool.borrower_info(self.record.address)?;
        Ok(debt::derive(&borrower, self.pending_inflator(lending)?))
    }

    // -----------------------------------------------------------------------
    // Manager configuration
    // -----------------------------------------------------------------------

    /// Replace the annual borrow-rate ceiling above which rebalancing stands
    /// down.
    pub fn set_max_borrowing_rate(&self, caller: Address, rate: U256) -> Result<(), EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        self.lending(&cfg)?;
        if rate.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "max borrowing rate is zero".into(),
            });
        }
        self.update_lending_config(|lending| lending.max_borrowing_rate = rate);

        self.events.record(Event::MaxBorrowingRateUpdated {
            position: self.record.id,
            rate,
        });
        info!(position = %self.record.id, rate = %rate, "max borrowing rate updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Escape hatches — manager-only pass-throughs for operator intervention
    // when the automated path cannot resolve an abnormal pool state.
    // -----------------------------------------------------------------------

    /// Direct debt repayment from the position's own balance with an explicit
    /// collateral pull and price-limit index. Returns the amount repaid.
    pub fn repay_with_collateral(
        &self,
        caller: Address,
        repay_amount: U256,
        collateral_to_pull: U256,
        price_limit_index: u32,
    ) -> Result<U256, EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        let lending = self.lending(&cfg)?;
        let repaid = lending.pool.repay_debt(
            self.record.address,
            repay_amount,
            collateral_to_pull,
            self.record.address,
            price_limit_index,
        )?;
        info!(
            position = %self.record.id,
            repaid = %repaid,
            collateral_pulled = %collateral_to_pull,
            "manual repay with collateral pull"
        );
        Ok(repaid)
    }

    /// Direct collateral removal at an explicit bucket index.
    pub fn remove_collateral(
        &self,
        caller: Address,
        amount: U256,
        index: u32,
    ) -> Result<U256, EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        let lending = self.lending(&cfg)?;
        let removed = lending
            .pool
            .remove_collateral(self.record.address, amount, index)?;
        info!(position = %self.record.id, removed = %removed, index, "manual collateral removal");
        Ok(removed)
    }

    /// Direct quote-token removal at an explicit bucket index.
    pub fn remove_quote(
        &self,
        caller: Address,
        amount: U256,
        index: u32,
    ) -> Result<U256, EngineError> {
        let _entered = self.record.entered.enter()?;
        let cfg = self.config()?;
        self.require_manager(&cfg, caller)?;
        let lending = self.lending(&cfg)?;
        let removed = lending
            .pool
            .remove_quote(self.record.address, amount, index)?;
        info!(position = %self.record.id, removed = %removed, index, "manual quote removal");
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Kind internals
    // -----------------------------------------------------------------------

    /// Pool liquidity currently free to borrow: the pool's quote balance net
    /// of bond escrow and unclaimed reserves, clamped at zero.
    pub(crate) fn borrow_capacity(&self, lending: &LendingCell) -> Result<U256, EngineError> {
        let pool_balance = self
            .tokens
            .balance_of(lending.pool.quote_token(), lending.pool.address())?;
        let reserves = lending.pool.reserves_info()?;
        Ok(pool_balance.saturating_sub(reserves.bond_escrow + reserves.unclaimed_reserves))
    }

    /// Execute a triggered top-up by drawing new debt against the existing
    /// pledge, then forwarding the position's loose balance to the recipient.
    pub(crate) fn borrow_rebalance(
        &self,
        cfg: &ConfigCell,
        lending: &LendingCell,
        amount: U256,
    ) -> Result<(), EngineError> {
        let index = self.draw_index(lending)?;
        lending
            .pool
            .draw_debt(self.record.address, amount, index, U256::ZERO)?;
        let loose = self
            .tokens
            .balance_of(cfg.target_asset, self.record.address)?;
        if !loose.is_zero() {
            self.tokens
                .transfer(cfg.target_asset, self.record.address, cfg.recipient, loose)?;
        }
        Ok(())
    }

    /// Pull pledged collateral back from the pool in proportion to the value
    /// withdrawn, then withdraw from the vault to the manager.
    pub(crate) fn unpledge_withdraw(
        &self,
        cfg: &ConfigCell,
        lending: &LendingCell,
        amount: U256,
    ) -> Result<(), EngineError> {
        let borrower = lending.pool.borrower_info(self.record.address)?;
        if borrower.collateral.is_zero() {
            return Err(EngineError::InvalidArgument {
                reason: "position holds no vault balance".into(),
            });
        }
        let value = cfg.vault.convert_to_assets(borrower.collateral)?;
        let to_pull = wad::ceil_mul_div(borrower.collateral, amount, value).min(borrower.collateral);
        lending.pool.repay_debt(
            self.record.address,
            U256::ZERO,
            to_pull,
            self.record.address,
            0,
        )?;
        cfg.vault.withdraw(amount, cfg.manager, self.record.address)?;
        Ok(())
    }

    /// Collateral value in asset terms net of the live debt, floored at zero.
    pub(crate) fn leveraged_underlying(
        &self,
        cfg: &ConfigCell,
        lending: &LendingCell,
    ) -> Result<U256, EngineError> {
        let borrower = lending.pool.borrower_info(self.record.address)?;
        let value = cfg.vault.convert_to_assets(borrower.collateral)?;
        let debt = self.current_debt(lending)?;
        Ok(value.saturating_sub(debt))
    }

    /// Bucket index for the next draw: the fixed baseline while the position
    /// carries no debt, the pool's own index for its current debt level
    /// afterwards.
    pub(crate) fn draw_index(&self, lending: &LendingCell) -> Result<u32, EngineError> {
        if self.current_debt(lending)?.is_zero() {
            return Ok(BASELINE_PRICE_INDEX);
        }
        let totals = lending.pool.debt_info()?;
        Ok(lending.pool.price_index_for_debt(totals.total_debt)?)
    }

    /// The position's live obligation: `ceil(t0_debt × pending inflator)`.
    pub(crate) fn current_debt(&self, lending: &LendingCell) -> Result<U256, EngineError> {
        let borrower = lending.pool.borrower_info(self.record.address)?;
        if borrower.t0_debt.is_zero() {
            return Ok(U256::ZERO);
        }
        Ok(debt::scaled_debt(
            borrower.t0_debt,
            self.pending_inflator(lending)?,
        ))
    }

    fn pending_inflator(&self, lending: &LendingCell) -> Result<U256, EngineError> {
        let rates = lending.pool.interest_rate_info()?;
        let snapshot = lending.pool.inflator_info()?;
        Ok(debt::pending_inflator(
            &snapshot,
            rates.borrow_rate,
            self.clock.now(),
        ))
    }
}
