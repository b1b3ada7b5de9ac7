//! Unit helpers shared by the pricing and sizing code.
//!
//! Pool math runs in `f64` (the same precision the solvers are specified in);
//! everything that touches the chain is `U256` wei.

use alloy_primitives::{I256, U256};

/// One whole token with 18 decimals.
pub const WAD: f64 = 1e18;

/// Lossy conversion of a 256-bit integer to `f64`.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

/// Truncating conversion of a non-negative float to wei.
///
/// Negative, NaN and infinite values map to zero; values above `u128::MAX`
/// saturate.
pub fn f64_to_u256(value: f64) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    if value >= u128::MAX as f64 {
        return U256::from(u128::MAX);
    }
    U256::from(value as u128)
}

/// Wei to whole units, for logging.
pub fn to_ether(value: U256) -> f64 {
    u256_to_f64(value) / WAD
}

/// Signed wei to whole units, for logging.
pub fn signed_to_ether(value: I256) -> f64 {
    let magnitude = to_ether(value.unsigned_abs());
    if value.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// Whole units to wei (e.g. a profit threshold of `0.02` ETH).
pub fn from_ether(value: f64) -> U256 {
    f64_to_u256(value * WAD)
}

/// Signed difference `after - before` of two balances.
pub fn balance_delta(before: U256, after: U256) -> I256 {
    if after >= before {
        I256::from_raw(after - before)
    } else {
        -I256::from_raw(before - after)
    }
}
