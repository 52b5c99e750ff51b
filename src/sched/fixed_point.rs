//! 17.14 Fixed-Point Arithmetic
//!
//! Signed 32-bit values with 14 fractional bits, the representation the
//! scheduler uses for `load_avg` and `recent_cpu`.
//!
//! # Overflow
//! Every operation uses the native `i32` operators. A result that does not fit
//! in 32 bits is outside the representable range: it panics in debug builds
//! and wraps in release builds, exactly like the plain integer operators.
//! Callers keep values in range; nothing here saturates or re-wraps.
//!
//! `fp_mult` and `fp_div` widen to `i64` for the intermediate product so that
//! only the final, rescaled result has to fit. Narrowing that result back to
//! 32 bits follows the same rule: a debug assertion fires if it does not fit,
//! and release builds keep the low 32 bits.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};

/// Number of fractional bits.
pub const FRACTION_BITS: u32 = 14;

/// Scale factor `F = 2^14`.
pub const F: i32 = 1 << FRACTION_BITS;

/// Convert an integer to fixed point.
#[inline]
pub const fn int_to_fp(n: i32) -> i32 {
    n * F
}

/// Convert fixed point to an integer, truncating toward zero.
#[inline]
pub const fn fp_to_int(x: i32) -> i32 {
    x / F
}

/// Convert fixed point to an integer, rounding to nearest.
///
/// Half the scale is added for non-negative values and subtracted for
/// negative ones before the truncating division, so ties round away from
/// zero.
#[inline]
pub const fn round_fp_to_int(x: i32) -> i32 {
    if x >= 0 {
        (x + F / 2) / F
    } else {
        (x - F / 2) / F
    }
}

/// Add two fixed-point values.
#[inline]
pub const fn fp_add(x: i32, y: i32) -> i32 {
    x + y
}

/// Subtract fixed-point `y` from fixed-point `x`.
#[inline]
pub const fn fp_sub(x: i32, y: i32) -> i32 {
    x - y
}

/// Add integer `n` to fixed-point `x`.
#[inline]
pub const fn m_add(x: i32, n: i32) -> i32 {
    x + n * F
}

/// Subtract integer `n` from fixed-point `x`.
#[inline]
pub const fn m_sub(x: i32, n: i32) -> i32 {
    x - n * F
}

/// Narrow a rescaled `i64` result back to 32 bits.
#[inline]
const fn narrow(wide: i64) -> i32 {
    debug_assert!(
        wide >= i32::MIN as i64 && wide <= i32::MAX as i64,
        "fixed-point overflow"
    );
    wide as i32
}

/// Multiply two fixed-point values.
#[inline]
pub const fn fp_mult(x: i32, y: i32) -> i32 {
    narrow((x as i64) * (y as i64) / F as i64)
}

/// Multiply fixed-point `x` by integer `n`.
#[inline]
pub const fn m_mult(x: i32, n: i32) -> i32 {
    x * n
}

/// Divide fixed-point `x` by fixed-point `y`.
///
/// # Panics
/// Panics if `y` is zero.
#[inline]
pub const fn fp_div(x: i32, y: i32) -> i32 {
    narrow((x as i64) * F as i64 / y as i64)
}

/// Divide fixed-point `x` by integer `n`.
///
/// # Panics
/// Panics if `n` is zero.
#[inline]
pub const fn m_div(x: i32, n: i32) -> i32 {
    x / n
}

/// A 17.14 fixed-point number.
///
/// Operators between two `Fixed` values use the fixed-point rules; operators
/// with an `i32` right-hand side treat it as a plain integer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// One.
    pub const ONE: Self = Self(F);

    /// Create from an integer.
    #[inline]
    pub const fn from_int(n: i32) -> Self {
        Self(int_to_fp(n))
    }

    /// Create from the raw 17.14 bit pattern.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Exact ratio `num / den` as a fixed-point value (e.g. `59/60`).
    #[inline]
    pub const fn ratio(num: i32, den: i32) -> Self {
        Self(fp_div(int_to_fp(num), int_to_fp(den)))
    }

    /// The raw 17.14 bit pattern.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub const fn trunc(self) -> i32 {
        fp_to_int(self.0)
    }

    /// Nearest integer.
    #[inline]
    pub const fn round(self) -> i32 {
        round_fp_to_int(self.0)
    }
}

impl Add for Fixed {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(fp_add(self.0, rhs.0))
    }
}

impl Sub for Fixed {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(fp_sub(self.0, rhs.0))
    }
}

impl Mul for Fixed {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(fp_mult(self.0, rhs.0))
    }
}

impl Div for Fixed {
    type Output = Self;

    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self(fp_div(self.0, rhs.0))
    }
}

impl Add<i32> for Fixed {
    type Output = Self;

    #[inline]
    fn add(self, n: i32) -> Self {
        Self(m_add(self.0, n))
    }
}

impl Sub<i32> for Fixed {
    type Output = Self;

    #[inline]
    fn sub(self, n: i32) -> Self {
        Self(m_sub(self.0, n))
    }
}

impl Mul<i32> for Fixed {
    type Output = Self;

    #[inline]
    fn mul(self, n: i32) -> Self {
        Self(m_mult(self.0, n))
    }
}

impl Div<i32> for Fixed {
    type Output = Self;

    #[inline]
    fn div(self, n: i32) -> Self {
        Self(m_div(self.0, n))
    }
}

impl Neg for Fixed {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({}, raw={:#x})", self.round(), self.0)
    }
}

impl fmt::Display for Fixed {
    /// Two decimal places, the way `load_avg` is reported (value * 100).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hundredths = (*self * 100).round();
        let sign = if hundredths < 0 { "-" } else { "" };
        let abs = hundredths.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Largest integer whose fixed-point form still fits in 32 bits.
    const INT_LIMIT: i32 = i32::MAX / F;

    #[test]
    fn test_rounding_is_sign_aware() {
        let half = F / 2;
        assert_eq!(round_fp_to_int(int_to_fp(2) + half), 3);
        assert_eq!(round_fp_to_int(int_to_fp(2) + half - 1), 2);
        assert_eq!(round_fp_to_int(-(int_to_fp(2) + half)), -3);
        assert_eq!(round_fp_to_int(-(int_to_fp(2) + half - 1)), -2);
    }

    #[test]
    fn test_truncation_toward_zero() {
        assert_eq!(fp_to_int(int_to_fp(7) + F - 1), 7);
        assert_eq!(fp_to_int(-(int_to_fp(7) + F - 1)), -7);
    }

    #[test]
    fn test_mixed_operands_scale_integer() {
        let x = int_to_fp(3);
        assert_eq!(m_add(x, 2), int_to_fp(5));
        assert_eq!(m_sub(x, 5), int_to_fp(-2));
        assert_eq!(m_mult(x, 4), int_to_fp(12));
        assert_eq!(m_div(x, 3), int_to_fp(1));
    }

    #[test]
    fn test_wide_intermediate() {
        // 30000 * 30000 overflows i32 before rescaling, not after.
        let big = int_to_fp(30_000);
        assert_eq!(fp_to_int(fp_div(big, int_to_fp(1000))), 30);
        let x = int_to_fp(100);
        assert_eq!(fp_to_int(fp_mult(x, x)), 10_000);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "fixed-point overflow")]
    fn test_mult_overflow_panics_in_debug() {
        fp_mult(int_to_fp(20_000), int_to_fp(20_000));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "fixed-point overflow")]
    fn test_div_overflow_panics_in_debug() {
        fp_div(int_to_fp(100_000), 1);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_mult_overflow_keeps_low_bits_in_release() {
        assert_eq!(fp_to_int(fp_mult(int_to_fp(20_000), int_to_fp(20_000))), -31_744);
    }

    #[test]
    fn test_load_avg_step() {
        // load_avg = 59/60 * load_avg + 1/60 * ready_threads, from zero with one
        // ready thread, reported as 100 * load_avg rounded.
        let load_avg = Fixed::ratio(59, 60) * Fixed::ZERO + Fixed::ratio(1, 60) * 1;
        assert_eq!((load_avg * 100).round(), 2);
        assert_eq!(format!("{}", load_avg), "0.02");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(format!("{}", -Fixed::ratio(3, 2)), "-1.50");
    }

    proptest! {
        #[test]
        fn prop_int_round_trip(n in -INT_LIMIT..=INT_LIMIT) {
            prop_assert_eq!(fp_to_int(int_to_fp(n)), n);
            prop_assert_eq!(round_fp_to_int(int_to_fp(n)), n);
            prop_assert_eq!(Fixed::from_int(n).trunc(), n);
        }

        #[test]
        fn prop_add_sub_inverse(a in -10_000i32..10_000, b in -10_000i32..10_000) {
            let x = Fixed::from_int(a);
            let y = Fixed::from_int(b);
            prop_assert_eq!((x + y) - y, x);
            prop_assert_eq!((x + b).trunc(), a + b);
        }

        #[test]
        fn prop_mult_div_integers(a in -180i32..180, b in 1i32..180) {
            let x = Fixed::from_int(a);
            let y = Fixed::from_int(b);
            prop_assert_eq!((x * y).trunc(), a * b);
            prop_assert_eq!(((x * y) / y), x);
        }
    }
}
