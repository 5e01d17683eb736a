// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 16.16 fixed-point scalars.
//!
//! All geometry handed to the compositor (transform matrices, trapezoid edges, gradient
//! offsets) is expressed in this representation, so that results are identical on every
//! platform regardless of its floating point behavior.

use core::fmt;
use core::ops::{Add, Neg, Sub};

/// A signed 16.16 fixed-point number.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fixed(pub i32);

impl Fixed {
    /// The number of fractional bits.
    pub const FRAC_BITS: u32 = 16;
    /// Zero.
    pub const ZERO: Self = Self(0);
    /// One.
    pub const ONE: Self = Self(1 << 16);
    /// One half.
    pub const HALF: Self = Self(1 << 15);
    /// Minus one.
    pub const MINUS_ONE: Self = Self(-(1 << 16));
    /// The smallest positive increment.
    pub const E: Self = Self(1);
    /// The largest representable value.
    pub const MAX: Self = Self(i32::MAX);
    /// The smallest representable value.
    pub const MIN: Self = Self(i32::MIN);

    /// Create a fixed-point number from an integer, saturating at the representable range.
    #[inline]
    pub const fn from_int(v: i32) -> Self {
        if v > i16::MAX as i32 {
            Self::MAX
        } else if v < i16::MIN as i32 {
            Self::MIN
        } else {
            Self(v << 16)
        }
    }

    /// Create a fixed-point number from a float, rounding to the nearest representable value.
    ///
    /// Values outside of the representable range saturate, NaN maps to zero.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        let scaled = v * 65536.0;
        let rounded = if scaled >= 0.0 {
            scaled + 0.5
        } else {
            scaled - 0.5
        };
        Self(rounded as i32)
    }

    /// Convert to a float.
    #[inline]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 65536.0
    }

    /// The raw 16.16 bits.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Round towards negative infinity and return the integer part.
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 >> 16
    }

    /// Round towards negative infinity.
    #[inline]
    pub const fn floor(self) -> Self {
        Self(self.0 & !0xffff)
    }

    /// Round towards positive infinity, saturating at the largest integer.
    #[inline]
    pub const fn ceil(self) -> Self {
        Self(self.0.saturating_add(0xffff) & !0xffff)
    }

    /// The fractional part, always in `[0, 1)`.
    #[inline]
    pub const fn frac(self) -> Self {
        Self(self.0 & 0xffff)
    }

    /// Multiply two fixed-point numbers through a 48.16 intermediate, truncating towards
    /// negative infinity and saturating on overflow.
    #[inline]
    pub fn mul(self, other: Self) -> Self {
        let wide = (i64::from(self.0) * i64::from(other.0)) >> 16;
        Self(saturate_i64(wide))
    }

    /// Divide two fixed-point numbers. Division by zero yields zero.
    #[inline]
    pub fn div(self, other: Self) -> Self {
        if other.0 == 0 {
            return Self::ZERO;
        }

        let wide = (i64::from(self.0) << 16) / i64::from(other.0);
        Self(saturate_i64(wide))
    }

    /// Saturating addition.
    #[inline]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

/// Narrow a 48.16 value to 16.16, saturating at the representable range.
#[inline]
pub(crate) fn saturate_i64(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl Add for Fixed {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl Sub for Fixed {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.saturating_sub(rhs)
    }
}

impl Neg for Fixed {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl From<i16> for Fixed {
    fn from(v: i16) -> Self {
        Self(i32::from(v) << 16)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({})", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::Fixed;

    #[test]
    fn fixed_int_round_trip() {
        for v in [-32768, -7, -1, 0, 1, 5, 32767] {
            assert_eq!(Fixed::from_int(v).to_int(), v);
        }
    }

    #[test]
    fn fixed_floor_of_negative_fraction() {
        let v = Fixed::from_f64(-0.25);
        assert_eq!(v.to_int(), -1);
        assert_eq!(v.floor(), Fixed::MINUS_ONE);
        assert_eq!(v.frac(), Fixed::from_f64(0.75));
    }

    #[test]
    fn fixed_ceil() {
        assert_eq!(Fixed::from_f64(1.25).ceil(), Fixed::from_int(2));
        assert_eq!(Fixed::from_int(3).ceil(), Fixed::from_int(3));
        assert_eq!(Fixed::MAX.ceil().to_int(), 32767);
    }

    #[test]
    fn fixed_mul_div() {
        let a = Fixed::from_f64(1.5);
        let b = Fixed::from_f64(-2.0);
        assert_eq!(a.mul(b), Fixed::from_f64(-3.0));
        assert_eq!(a.mul(b).div(b), a);
        assert_eq!(a.div(Fixed::ZERO), Fixed::ZERO);
    }

    #[test]
    fn fixed_saturates() {
        assert_eq!(Fixed::MAX + Fixed::ONE, Fixed::MAX);
        assert_eq!(Fixed::from_int(40000), Fixed::MAX);
        assert_eq!(Fixed::from_f64(1e12), Fixed::MAX);
        assert_eq!(Fixed::from_f64(f64::NAN), Fixed::ZERO);
    }
}
