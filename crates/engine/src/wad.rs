//! WAD (1e18) fixed-point helpers over `U256` amounts.
//!
//! Additive amount math stays in exact `U256`; multiplicative math (inflator
//! compounding, share/asset ratios, price ratios) routes through `Decimal`
//! with the final result floored or ceiled back to a raw WAD integer.

use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use std::str::FromStr;

use crate::constants::{SECONDS_PER_YEAR, WAD};

/// Convert a raw WAD-scaled `U256` to its `Decimal` value.
pub fn to_decimal(raw: U256) -> Decimal {
    Decimal::from_str(&raw.to_string()).unwrap_or_default() / WAD
}

/// Convert a `Decimal` value to a raw WAD-scaled `U256`, rounding down.
/// Negative inputs clamp to zero.
pub fn from_decimal_floor(value: Decimal) -> U256 {
    decimal_to_u256((value * WAD).floor())
}

/// Convert a `Decimal` value to a raw WAD-scaled `U256`, rounding up.
pub fn from_decimal_ceil(value: Decimal) -> U256 {
    decimal_to_u256((value * WAD).ceil())
}

/// `floor(a * b / WAD)`.
pub fn wmul(a: U256, b: U256) -> U256 {
    from_decimal_floor(to_decimal(a) * to_decimal(b))
}

/// `ceil(a * b / WAD)` — debt scaling rounds against the borrower.
pub fn ceil_wmul(a: U256, b: U256) -> U256 {
    from_decimal_ceil(to_decimal(a) * to_decimal(b))
}

/// `floor(a * WAD / b)`; zero when `b` is zero.
pub fn wdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::ZERO;
    }
    from_decimal_floor(to_decimal(a) / to_decimal(b))
}

/// `ceil(a * WAD / b)`; zero when `b` is zero.
pub fn ceil_wdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::ZERO;
    }
    from_decimal_ceil(to_decimal(a) / to_decimal(b))
}

/// `ceil(a * b / c)`; zero when `c` is zero. Proportional share sizing.
pub fn ceil_mul_div(a: U256, b: U256, c: U256) -> U256 {
    if c.is_zero() {
        return U256::ZERO;
    }
    from_decimal_ceil(to_decimal(a) * to_decimal(b) / to_decimal(c))
}

/// Continuous-compounding growth factor `e^(rate * elapsed / year)` for a
/// WAD-scaled annual `rate`. Always ≥ 1 for a non-negative rate, so an
/// inflator multiplied by it never decreases.
pub fn compound_factor(rate: U256, elapsed: u64) -> Decimal {
    let exponent = to_decimal(rate) * Decimal::from(elapsed) / Decimal::from(SECONDS_PER_YEAR);
    exponent.exp()
}

fn decimal_to_u256(value: Decimal) -> U256 {
    U256::from(value.trunc().to_u128().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn wad(value: u64) -> U256 {
        U256::from(value) * U256::from(1_000_000_000_000_000_000u128)
    }

    #[test]
    fn test_to_decimal_scales() {
        assert_eq!(to_decimal(wad(3)), dec!(3));
        assert_eq!(to_decimal(U256::from(500_000_000_000_000_000u128)), dec!(0.5));
    }

    #[test]
    fn test_round_trip_floor() {
        assert_eq!(from_decimal_floor(dec!(2.5)), U256::from(2_500_000_000_000_000_000u128));
        assert_eq!(from_decimal_floor(dec!(-1)), U256::ZERO);
    }

    #[test]
    fn test_wmul_exact() {
        // 2.0 * 1.5 = 3.0
        let a = wad(2);
        let b = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(wmul(a, b), wad(3));
        assert_eq!(ceil_wmul(a, b), wad(3));
    }

    #[test]
    fn test_ceil_wmul_rounds_up() {
        // 1 wei * 0.5 → floor 0, ceil 1
        let half = U256::from(500_000_000_000_000_000u128);
        assert_eq!(wmul(U256::from(1), half), U256::ZERO);
        assert_eq!(ceil_wmul(U256::from(1), half), U256::from(1));
    }

    #[test]
    fn test_wdiv_by_zero_is_zero() {
        assert_eq!(wdiv(wad(1), U256::ZERO), U256::ZERO);
        assert_eq!(ceil_wdiv(wad(1), U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_ceil_wdiv_rounds_up() {
        // 1.0 / 3.0 = 0.333… → ceil at the last WAD digit
        let third_floor = wdiv(wad(1), wad(3));
        let third_ceil = ceil_wdiv(wad(1), wad(3));
        assert_eq!(third_ceil, third_floor + U256::from(1));
    }

    #[test]
    fn test_ceil_mul_div_proportional() {
        // 10 shares backing 40 assets, withdrawing 10 assets → pull 3 (ceil of 2.5)
        let shares = wad(10);
        let amount = wad(10);
        let value = wad(40);
        assert_eq!(ceil_mul_div(shares, amount, value), U256::from(2_500_000_000_000_000_000u128));
    }

    #[test]
    fn test_compound_factor_identity_at_zero_elapsed() {
        assert_eq!(compound_factor(wad(1) / U256::from(20), 0), dec!(1));
    }

    #[test]
    fn test_compound_factor_grows_with_time() {
        // 5% annual rate over one year ≈ e^0.05 ≈ 1.0513
        let rate = U256::from(50_000_000_000_000_000u128);
        let factor = compound_factor(rate, SECONDS_PER_YEAR);
        assert!(factor > dec!(1.0512) && factor < dec!(1.0514), "factor = {factor}");
    }

    #[test]
    fn test_compound_factor_monotonic() {
        let rate = U256::from(50_000_000_000_000_000u128);
        let day = compound_factor(rate, 86_400);
        let week = compound_factor(rate, 7 * 86_400);
        assert!(dec!(1) < day);
        assert!(day < week);
    }
}
