// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Working colors and unorm arithmetic.
//!
//! All compositing happens on 16-bit-per-channel premultiplied colors, independent of the
//! storage format, so that low-depth formats don't band when they go through the operators.

use bytemuck::{Pod, Zeroable};

/// A premultiplied color with 16 bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Rgba16 {
    /// Red.
    pub r: u16,
    /// Green.
    pub g: u16,
    /// Blue.
    pub b: u16,
    /// Alpha.
    pub a: u16,
}

impl Rgba16 {
    /// Transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 0xffff);
    /// Opaque white.
    pub const WHITE: Self = Self::new(0xffff, 0xffff, 0xffff, 0xffff);

    /// Create a new color.
    #[inline]
    pub const fn new(r: u16, g: u16, b: u16, a: u16) -> Self {
        Self { r, g, b, a }
    }

    /// The channels in `[r, g, b, a]` order.
    #[inline]
    pub const fn to_array(self) -> [u16; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Create a color from channels in `[r, g, b, a]` order.
    #[inline]
    pub const fn from_array(c: [u16; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Expand a packed `0xAARRGGBB` value.
    #[inline]
    pub const fn from_a8r8g8b8(v: u32) -> Self {
        Self::new(
            ((v >> 16) & 0xff) as u16 * 257,
            ((v >> 8) & 0xff) as u16 * 257,
            (v & 0xff) as u16 * 257,
            (v >> 24) as u16 * 257,
        )
    }

    /// Pack into a `0xAARRGGBB` value, rounding to nearest.
    #[inline]
    pub fn to_a8r8g8b8(self) -> u32 {
        let c = |v: u16, shift: u32| unorm_reduce(v, 8) << shift;
        c(self.a, 24) | c(self.r, 16) | c(self.g, 8) | c(self.b, 0)
    }

    /// Whether the color is fully opaque.
    #[inline]
    pub const fn is_opaque(&self) -> bool {
        self.a == 0xffff
    }
}

/// A caller-facing color with 16 bits per channel.
///
/// Solid fills interpret it as premultiplied, gradient stops as unpremultiplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub red: u16,
    /// Green.
    pub green: u16,
    /// Blue.
    pub blue: u16,
    /// Alpha.
    pub alpha: u16,
}

impl Color {
    /// Create a new color.
    #[inline]
    pub const fn new(red: u16, green: u16, blue: u16, alpha: u16) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Expand a packed `0xAARRGGBB` value.
    #[inline]
    pub const fn from_a8r8g8b8(v: u32) -> Self {
        let c = Rgba16::from_a8r8g8b8(v);
        Self::new(c.r, c.g, c.b, c.a)
    }

    /// Reinterpret as a premultiplied working color, clamping color channels to alpha.
    #[inline]
    pub fn to_premultiplied(self) -> Rgba16 {
        let a = self.alpha;
        Rgba16::new(self.red.min(a), self.green.min(a), self.blue.min(a), a)
    }

    /// Premultiply an unpremultiplied color.
    #[inline]
    pub fn premultiply(self) -> Rgba16 {
        let a = self.alpha;
        Rgba16::new(
            mul_65535(self.red, a),
            mul_65535(self.green, a),
            mul_65535(self.blue, a),
            a,
        )
    }
}

/// Multiply two unorm16 values, rounding to nearest.
#[inline]
pub const fn mul_65535(a: u16, b: u16) -> u16 {
    let t = a as u32 * b as u32 + 0x8000;
    ((t + (t >> 16)) >> 16) as u16
}

/// Compute `a / b` as unorm16, rounding to nearest and clamping to one.
///
/// Division by zero yields zero.
#[inline]
pub const fn div_65535(a: u16, b: u16) -> u16 {
    if b == 0 {
        return 0;
    }

    let v = (a as u32 * 65535 + (b as u32 >> 1)) / b as u32;
    if v > 65535 {
        65535
    } else {
        v as u16
    }
}

/// Expand an `bits`-bit unorm value to 16 bits by bit replication.
///
/// Zero-width channels expand to zero.
#[inline]
pub const fn unorm_expand(v: u32, bits: u32) -> u16 {
    if bits == 0 {
        return 0;
    }
    if bits >= 16 {
        return (v >> (bits - 16)) as u16;
    }

    let mut out = (v & ((1 << bits) - 1)) << (16 - bits);
    let mut filled = bits;
    while filled < 16 {
        out |= out >> filled;
        filled *= 2;
    }

    out as u16
}

/// Reduce a 16-bit unorm value to `bits` bits, rounding to nearest.
#[inline]
pub const fn unorm_reduce(v: u16, bits: u32) -> u32 {
    if bits == 0 {
        return 0;
    }
    if bits >= 16 {
        return (v as u32) << (bits - 16);
    }

    let max = (1_u32 << bits) - 1;
    (v as u32 * max + 32767) / 65535
}

/// Reduce a 16-bit unorm value to `bits` bits with an ordered dither threshold.
///
/// `rank` in `0..64` selects the threshold `(2 * rank + 1) / 128`. Values that are exactly
/// representable in `bits` bits are never changed. Channels wider than 8 bits are rounded
/// like [`unorm_reduce`].
#[inline]
pub const fn unorm_reduce_dithered(v: u16, bits: u32, rank: u32) -> u32 {
    if bits == 0 || bits > 8 {
        return unorm_reduce(v, bits);
    }

    let max = (1_u64 << bits) - 1;
    let threshold = (2 * (rank as u64 & 63) + 1) * 65535;
    let u = (v as u64 * max * 128 + threshold) / (65535 * 128);
    (u - (u >> bits)) as u32
}
