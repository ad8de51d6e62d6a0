use alloy_primitives::U256;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// Numeric scales
// ---------------------------------------------------------------------------

/// WAD: 1e18 — fixed-point scale for rates, inflators and price ratios.
pub const WAD: Decimal = dec!(1_000_000_000_000_000_000);

/// WAD as a raw `U256`.
pub const WAD_U256: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Seconds in a non-leap year; denominator of the interest accrual exponent.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

// ---------------------------------------------------------------------------
// Protocol parameters
// ---------------------------------------------------------------------------

/// Price bucket index at which one unit of collateral prices at exactly one
/// quote token. A position drawing its first debt has no pool-derived index
/// to borrow against, so draws default to this bucket.
pub const BASELINE_PRICE_INDEX: u32 = 4_156;
