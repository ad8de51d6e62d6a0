use alloy_primitives::{Address, U256};

use super::AdapterError;

/// A borrower's raw pool position. `t0_debt` is the normalized debt unit the
/// pool records; the live obligation is `ceil(t0_debt × pending inflator)`.
/// `collateral` includes amounts encumbered by open pool auctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowerInfo {
    pub t0_debt: U256,
    pub collateral: U256,
    /// Neutral-price to threshold-price ratio published by the pool, WAD.
    pub np_tp_ratio: U256,
}

/// Pool-wide debt totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebtInfo {
    pub total_debt: U256,
}

/// Current borrow rate, WAD-scaled annual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatesInfo {
    pub borrow_rate: U256,
    pub last_update: u64,
}

/// Quote-token amounts escrowed inside the pool and therefore not free to
/// borrow: liquidation bond escrow plus unclaimed reserve auctions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservesInfo {
    pub bond_escrow: U256,
    pub unclaimed_reserves: U256,
}

/// The pool's last-recorded compounding factor and when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflatorSnapshot {
    pub inflator: U256,
    pub last_update: u64,
}

/// Money-market pool: collateral pledged against quote-token debt, interest
/// accrued through a monotonically non-decreasing inflator.
///
/// A `price_limit_index` (or price index) of `0` means "no limit".
pub trait LendingPool: Send + Sync {
    fn address(&self) -> Address;

    /// Token accepted as collateral — must equal the vault's share token.
    fn collateral_token(&self) -> Address;

    /// Token lent out — must equal the vault's underlying asset.
    fn quote_token(&self) -> Address;

    /// Pledge `collateral_to_pledge` from `borrower` and/or draw `amount` of
    /// quote token to `borrower`, priced at bucket `price_index`.
    fn draw_debt(
        &self,
        borrower: Address,
        amount: U256,
        price_index: u32,
        collateral_to_pledge: U256,
    ) -> Result<(), AdapterError>;

    /// Repay up to `max_amount` of `borrower`'s debt (quote pulled from the
    /// borrower) and/or pull `collateral_to_pull` pledged collateral to
    /// `recipient`. Returns the quote amount actually repaid.
    fn repay_debt(
        &self,
        borrower: Address,
        max_amount: U256,
        collateral_to_pull: U256,
        recipient: Address,
        price_limit_index: u32,
    ) -> Result<U256, AdapterError>;

    /// Remove `amount` of `owner`'s claimable collateral at bucket `index`.
    /// Returns the amount removed.
    fn remove_collateral(
        &self,
        owner: Address,
        amount: U256,
        index: u32,
    ) -> Result<U256, AdapterError>;

    /// Remove `amount` of `owner`'s claimable quote token at bucket `index`.
    /// Returns the amount removed.
    fn remove_quote(&self, owner: Address, amount: U256, index: u32)
        -> Result<U256, AdapterError>;

    fn borrower_info(&self, borrower: Address) -> Result<BorrowerInfo, AdapterError>;

    fn debt_info(&self) -> Result<DebtInfo, AdapterError>;

    fn interest_rate_info(&self) -> Result<RatesInfo, AdapterError>;

    fn reserves_info(&self) -> Result<ReservesInfo, AdapterError>;

    fn inflator_info(&self) -> Result<InflatorSnapshot, AdapterError>;

    /// Bucket index at which deposits cover the given debt level.
    fn price_index_for_debt(&self, debt: U256) -> Result<u32, AdapterError>;
}
