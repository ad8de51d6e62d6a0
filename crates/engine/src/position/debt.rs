//! Debt accrual math for leveraged positions.
//!
//! The pool records a normalized `t0_debt` and a compounding inflator; the
//! live obligation is derived, never stored. The sim pool accrues with the
//! same functions, so engine views and pool settlement always agree.

use alloy_primitives::U256;

use crate::adapters::{BorrowerInfo, InflatorSnapshot};
use crate::wad;

/// Live view of a leveraged position's debt, recomputed on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebtPosition {
    /// Outstanding borrowed amount, interest included.
    pub debt: U256,
    /// Pledged vault shares, auction-encumbered amounts included.
    pub collateral: U256,
    /// Debt per unit of collateral — the price below which the position is
    /// undercollateralized.
    pub threshold_price: U256,
    /// Break-even liquidation price published by the pool's np/tp ratio.
    pub neutral_price: U256,
}

/// Roll the pool's last-recorded inflator forward to `now` under the current
/// rate. Monotonically non-decreasing: zero elapsed time (or a clock reading
/// behind the snapshot) returns the snapshot unchanged.
pub fn pending_inflator(snapshot: &InflatorSnapshot, rate: U256, now: u64) -> U256 {
    let elapsed = now.saturating_sub(snapshot.last_update);
    if elapsed == 0 {
        return snapshot.inflator;
    }
    wad::from_decimal_floor(wad::to_decimal(snapshot.inflator) * wad::compound_factor(rate, elapsed))
}

/// Scale normalized debt to the live obligation, rounding against the
/// borrower: `ceil(t0_debt × inflator)`.
pub fn scaled_debt(t0_debt: U256, inflator: U256) -> U256 {
    if t0_debt.is_zero() {
        return U256::ZERO;
    }
    wad::ceil_wmul(t0_debt, inflator)
}

/// Derive the full debt view from a borrower snapshot and the current
/// (pending) inflator.
pub fn derive(borrower: &BorrowerInfo, inflator: U256) -> DebtPosition {
    let debt = scaled_debt(borrower.t0_debt, inflator);
    let threshold_price = if borrower.collateral.is_zero() {
        U256::ZERO
    } else {
        wad::ceil_wdiv(debt, borrower.collateral)
    };
    let neutral_price = wad::wmul(borrower.np_tp_ratio, threshold_price);
    DebtPosition {
        debt,
        collateral: borrower.collateral,
        threshold_price,
        neutral_price,
    }
}
