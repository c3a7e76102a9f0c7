//! 1e18 fixed-point helpers.
//!
//! Revenue-per-token values are stored scaled by [`SCALE`]. All arithmetic
//! is checked: an overflow surfaces as [`TypesError::Overflow`] instead of
//! wrapping or panicking.

use crate::error::TypesError;

/// Fixed-point scale of the revenue-per-token accumulator.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Compute `a * b / denominator`, rounding down.
///
/// Falls back to a 256-bit intermediate product when `a * b` does not fit in
/// a `u128`, so large balances times large accumulator deltas still divide
/// exactly as long as the final quotient fits.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, TypesError> {
    if denominator == 0 {
        return Err(TypesError::DivisionByZero);
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denominator);
    }
    let (hi, lo) = widening_mul(a, b);
    if hi >= denominator {
        return Err(TypesError::Overflow);
    }
    Ok(div_wide(hi, lo, denominator))
}

/// Full 256-bit product of two u128 values as `(high, low)` halves.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = u64::MAX as u128;
    let (a_hi, a_lo) = (a >> 64, a & MASK);
    let (b_hi, b_lo) = (b >> 64, b & MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (ll & MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divide the 256-bit value `hi:lo` by `d`, given `hi < d`.
///
/// Restoring binary long division; the quotient fits in a u128 because
/// `hi < d`.
fn div_wide(hi: u128, lo: u128, d: u128) -> u128 {
    let mut rem = hi;
    let mut quotient = 0u128;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quotient <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quotient |= 1;
        }
    }
    quotient
}
