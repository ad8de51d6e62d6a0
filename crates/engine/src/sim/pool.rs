use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::adapters::{
    AdapterError, BorrowerInfo, DebtInfo, InflatorSnapshot, LendingPool, RatesInfo, ReservesInfo,
};
use crate::clock::Clock;
use crate::constants::WAD_U256;
use crate::position::debt;
use crate::sim::InMemoryLedger;
use crate::wad;

/// Default neutral-price to threshold-price ratio for new borrowers: 1.04.
const DEFAULT_NP_TP_RATIO: U256 = U256::from_limbs([1_040_000_000_000_000_000, 0, 0, 0]);

#[derive(Debug, Clone, Copy)]
struct BorrowerState {
    t0_debt: U256,
    collateral: U256,
    np_tp_ratio: U256,
}

impl BorrowerState {
    fn new() -> Self {
        Self {
            t0_debt: U256::ZERO,
            collateral: U256::ZERO,
            np_tp_ratio: DEFAULT_NP_TP_RATIO,
        }
    }
}

#[derive(Debug)]
struct PoolState {
    inflator: U256,
    inflator_update: u64,
    borrow_rate: U256,
    rate_update: u64,
    bond_escrow: U256,
    unclaimed_reserves: U256,
    deposit_index: u32,
    last_draw_index: Option<u32>,
    borrowers: HashMap<Address, BorrowerState>,
    quote_claims: HashMap<Address, U256>,
    total_t0_debt: U256,
}

/// Reference lending pool over the in-memory ledger.
///
/// Single-bucket money market: collateral pledged against quote-token debt,
/// interest accrued through the shared pending-inflator function on every
/// mutation. Rate, escrowed reserves and the deposit index are settable so
/// scenarios can steer capacity and the trigger's rate gate. Every call
/// validates its whole effect before mutating anything.
pub struct SimPool {
    address: Address,
    collateral_token: Address,
    quote_token: Address,
    ledger: Arc<InMemoryLedger>,
    clock: Arc<dyn Clock>,
    state: Mutex<PoolState>,
}

impl SimPool {
    pub fn new(
        address: Address,
        collateral_token: Address,
        quote_token: Address,
        ledger: Arc<InMemoryLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        Self {
            address,
            collateral_token,
            quote_token,
            ledger,
            clock,
            state: Mutex::new(PoolState {
                inflator: WAD_U256,
                inflator_update: now,
                borrow_rate: U256::ZERO,
                rate_update: now,
                bond_escrow: U256::ZERO,
                unclaimed_reserves: U256::ZERO,
                deposit_index: 3_232,
                last_draw_index: None,
                borrowers: HashMap::new(),
                quote_claims: HashMap::new(),
                total_t0_debt: U256::ZERO,
            }),
        }
    }

    /// Mint quote-token liquidity into the pool.
    pub fn fund(&self, amount: U256) {
        self.ledger.mint(self.quote_token, self.address, amount);
    }

    /// Replace the annual borrow rate, settling accrual under the old rate
    /// first.
    pub fn set_borrow_rate(&self, rate: U256) {
        let mut st = self.lock();
        self.accrue(&mut st);
        st.borrow_rate = rate;
        st.rate_update = self.clock.now();
    }

    pub fn set_reserves(&self, bond_escrow: U256, unclaimed_reserves: U256) {
        let mut st = self.lock();
        st.bond_escrow = bond_escrow;
        st.unclaimed_reserves = unclaimed_reserves;
    }

    pub fn set_deposit_index(&self, index: u32) {
        self.lock().deposit_index = index;
    }

    pub fn set_np_tp_ratio(&self, borrower: Address, ratio: U256) {
        self.lock()
            .borrowers
            .entry(borrower)
            .or_insert_with(BorrowerState::new)
            .np_tp_ratio = ratio;
    }

    /// Grant `owner` a removable quote-token claim (lender-side escape-hatch
    /// scenarios).
    pub fn set_quote_claim(&self, owner: Address, amount: U256) {
        self.lock().quote_claims.insert(owner, amount);
    }

    /// Price index of the most recent nonzero draw.
    pub fn last_draw_index(&self) -> Option<u32> {
        self.lock().last_draw_index
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accrue(&self, st: &mut PoolState) {
        let snapshot = InflatorSnapshot {
            inflator: st.inflator,
            last_update: st.inflator_update,
        };
        st.inflator = debt::pending_inflator(&snapshot, st.borrow_rate, self.clock.now());
        st.inflator_update = self.clock.now();
    }

    fn free_liquidity(&self, st: &PoolState) -> Result<U256, AdapterError> {
        let balance = self.ledger.balance_of(self.quote_token, self.address)?;
        Ok(balance.saturating_sub(st.bond_escrow + st.unclaimed_reserves))
    }
}

impl LendingPool for SimPool {
    fn address(&self) -> Address {
        self.address
    }

    fn collateral_token(&self) -> Address {
        self.collateral_token
    }

    fn quote_token(&self) -> Address {
        self.quote_token
    }

    fn draw_debt(
        &self,
        borrower: Address,
        amount: U256,
        price_index: u32,
        collateral_to_pledge: U256,
    ) -> Result<(), AdapterError> {
        let mut st = self.lock();
        self.accrue(&mut st);

        let prior = st
            .borrowers
            .get(&borrower)
            .copied()
            .unwrap_or_else(BorrowerState::new);
        let new_collateral = prior.collateral + collateral_to_pledge;

        let mut t0_delta = U256::ZERO;
        if !amount.is_zero() {
            if price_index == 0 {
                return Err(AdapterError::Pool {
                    reason: "draw requires a price index".into(),
                });
            }
            if new_collateral.is_zero() {
                return Err(AdapterError::Pool {
                    reason: "draw without pledged collateral".into(),
                });
            }
            let free = self.free_liquidity(&st)?;
            if amount > free {
                return Err(AdapterError::Pool {
                    reason: format!("draw of {amount} exceeds free liquidity {free}"),
                });
            }
            t0_delta = wad::ceil_wdiv(amount, st.inflator);
        }

        if !collateral_to_pledge.is_zero() {
            self.ledger.transfer_from(
                self.collateral_token,
                self.address,
                borrower,
                self.address,
                collateral_to_pledge,
            )?;
        }
        if !amount.is_zero() {
            self.ledger
                .transfer(self.quote_token, self.address, borrower, amount)?;
        }

        let entry = st
            .borrowers
            .entry(borrower)
            .or_insert_with(BorrowerState::new);
        entry.collateral = new_collateral;
        entry.t0_debt += t0_delta;
        st.total_t0_debt += t0_delta;
        if !amount.is_zero() {
            st.last_draw_index = Some(price_index);
        }
        Ok(())
    }

    fn repay_debt(
        &self,
        borrower: Address,
        max_amount: U256,
        collateral_to_pull: U256,
        recipient: Address,
        price_limit_index: u32,
    ) -> Result<U256, AdapterError> {
        let mut st = self.lock();
        self.accrue(&mut st);

        if price_limit_index != 0 && st.deposit_index > price_limit_index {
            return Err(AdapterError::Pool {
                reason: format!(
                    "deposit index {} above price limit {price_limit_index}",
                    st.deposit_index
                ),
            });
        }

        let prior = st
            .borrowers
            .get(&borrower)
            .copied()
            .ok_or_else(|| AdapterError::Pool {
                reason: "no borrower position".into(),
            })?;

        let debt = debt::scaled_debt(prior.t0_debt, st.inflator);
        let repaid = max_amount.min(debt);
        let t0_remaining = if repaid == debt {
            U256::ZERO
        } else {
            wad::ceil_wdiv(debt - repaid, st.inflator).min(prior.t0_debt)
        };

        let collateral_remaining = prior
            .collateral
            .checked_sub(collateral_to_pull)
            .ok_or_else(|| AdapterError::Pool {
                reason: format!(
                    "collateral pull {collateral_to_pull} exceeds pledged {}",
                    prior.collateral
                ),
            })?;
        if !t0_remaining.is_zero() && collateral_remaining.is_zero() {
            return Err(AdapterError::Pool {
                reason: "pull would leave remaining debt uncollateralized".into(),
            });
        }

        if !repaid.is_zero() {
            self.ledger.transfer_from(
                self.quote_token,
                self.address,
                borrower,
                self.address,
                repaid,
            )?;
        }
        if !collateral_to_pull.is_zero() {
            self.ledger.transfer(
                self.collateral_token,
                self.address,
                recipient,
                collateral_to_pull,
            )?;
        }

        st.total_t0_debt = st.total_t0_debt.saturating_sub(prior.t0_debt - t0_remaining);
        if t0_remaining.is_zero() && collateral_remaining.is_zero() {
            st.borrowers.remove(&borrower);
        } else {
            let entry = st
                .borrowers
                .entry(borrower)
                .or_insert_with(BorrowerState::new);
            entry.t0_debt = t0_remaining;
            entry.collateral = collateral_remaining;
        }
        Ok(repaid)
    }

    fn remove_collateral(
        &self,
        owner: Address,
        amount: U256,
        _index: u32,
    ) -> Result<U256, AdapterError> {
        let mut st = self.lock();
        self.accrue(&mut st);

        let prior = st
            .borrowers
            .get(&owner)
            .copied()
            .ok_or_else(|| AdapterError::Pool {
                reason: "no borrower position".into(),
            })?;
        let remaining = prior
            .collateral
            .checked_sub(amount)
            .ok_or_else(|| AdapterError::Pool {
                reason: format!("removal of {amount} exceeds pledged {}", prior.collateral),
            })?;
        let debt = debt::scaled_debt(prior.t0_debt, st.inflator);
        if !debt.is_zero() && remaining.is_zero() {
            return Err(AdapterError::Pool {
                reason: "removal would leave debt uncollateralized".into(),
            });
        }

        self.ledger
            .transfer(self.collateral_token, self.address, owner, amount)?;
        if let Some(entry) = st.borrowers.get_mut(&owner) {
            entry.collateral = remaining;
        }
        Ok(amount)
    }

    fn remove_quote(
        &self,
        owner: Address,
        amount: U256,
        _index: u32,
    ) -> Result<U256, AdapterError> {
        let mut st = self.lock();
        let claim = st.quote_claims.get(&owner).copied().unwrap_or_default();
        if amount > claim {
            return Err(AdapterError::Pool {
                reason: format!("removal of {amount} exceeds quote claim {claim}"),
            });
        }
        self.ledger
            .transfer(self.quote_token, self.address, owner, amount)?;
        st.quote_claims.insert(owner, claim - amount);
        Ok(amount)
    }

    fn borrower_info(&self, borrower: Address) -> Result<BorrowerInfo, AdapterError> {
        let st = self.lock();
        let state = st
            .borrowers
            .get(&borrower)
            .copied()
            .unwrap_or_else(BorrowerState::new);
        Ok(BorrowerInfo {
            t0_debt: state.t0_debt,
            collateral: state.collateral,
            np_tp_ratio: state.np_tp_ratio,
        })
    }

    fn debt_info(&self) -> Result<DebtInfo, AdapterError> {
        let st = self.lock();
        let snapshot = InflatorSnapshot {
            inflator: st.inflator,
            last_update: st.inflator_update,
        };
        let inflator = debt::pending_inflator(&snapshot, st.borrow_rate, self.clock.now());
        Ok(DebtInfo {
            total_debt: debt::scaled_debt(st.total_t0_debt, inflator),
        })
    }

    fn interest_rate_info(&self) -> Result<RatesInfo, AdapterError> {
        let st = self.lock();
        Ok(RatesInfo {
            borrow_rate: st.borrow_rate,
            last_update: st.rate_update,
        })
    }

    fn reserves_info(&self) -> Result<ReservesInfo, AdapterError> {
        let st = self.lock();
        Ok(ReservesInfo {
            bond_escrow: st.bond_escrow,
            unclaimed_reserves: st.unclaimed_reserves,
        })
    }

    fn inflator_info(&self) -> Result<InflatorSnapshot, AdapterError> {
        let st = self.lock();
        Ok(InflatorSnapshot {
            inflator: st.inflator,
            last_update: st.inflator_update,
        })
    }

    fn price_index_for_debt(&self, _debt: U256) -> Result<u32, AdapterError> {
        Ok(self.lock().deposit_index)
    }
}
