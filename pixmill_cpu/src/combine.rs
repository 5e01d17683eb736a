// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing operators.
//!
//! The Porter-Duff family (including the disjoint and conjoint variants) is driven by a table
//! of source and destination factors. The PDF blend modes mix unpremultiplied colors and then
//! compose the result over the destination.

use pixmill_common::color::{div_65535, mul_65535, Rgba16};

/// A compositing operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Clear the destination.
    Clear,
    /// Replace the destination with the source.
    Src,
    /// Keep the destination.
    Dst,
    /// Source over destination.
    Over,
    /// Destination over source.
    OverReverse,
    /// Source inside destination.
    In,
    /// Destination inside source.
    InReverse,
    /// Source outside destination.
    Out,
    /// Destination outside source.
    OutReverse,
    /// Source atop destination.
    Atop,
    /// Destination atop source.
    AtopReverse,
    /// Source xor destination.
    Xor,
    /// Saturating sum.
    Add,
    /// Add as much of the source as still fits under the destination's alpha.
    Saturate,

    /// [`Operator::Clear`], assuming disjoint coverage.
    DisjointClear,
    /// [`Operator::Src`], assuming disjoint coverage.
    DisjointSrc,
    /// [`Operator::Dst`], assuming disjoint coverage.
    DisjointDst,
    /// [`Operator::Over`], assuming disjoint coverage.
    DisjointOver,
    /// [`Operator::OverReverse`], assuming disjoint coverage.
    DisjointOverReverse,
    /// [`Operator::In`], assuming disjoint coverage.
    DisjointIn,
    /// [`Operator::InReverse`], assuming disjoint coverage.
    DisjointInReverse,
    /// [`Operator::Out`], assuming disjoint coverage.
    DisjointOut,
    /// [`Operator::OutReverse`], assuming disjoint coverage.
    DisjointOutReverse,
    /// [`Operator::Atop`], assuming disjoint coverage.
    DisjointAtop,
    /// [`Operator::AtopReverse`], assuming disjoint coverage.
    DisjointAtopReverse,
    /// [`Operator::Xor`], assuming disjoint coverage.
    DisjointXor,

    /// [`Operator::Clear`], assuming overlapping coverage.
    ConjointClear,
    /// [`Operator::Src`], assuming overlapping coverage.
    ConjointSrc,
    /// [`Operator::Dst`], assuming overlapping coverage.
    ConjointDst,
    /// [`Operator::Over`], assuming overlapping coverage.
    ConjointOver,
    /// [`Operator::OverReverse`], assuming overlapping coverage.
    ConjointOverReverse,
    /// [`Operator::In`], assuming overlapping coverage.
    ConjointIn,
    /// [`Operator::InReverse`], assuming overlapping coverage.
    ConjointInReverse,
    /// [`Operator::Out`], assuming overlapping coverage.
    ConjointOut,
    /// [`Operator::OutReverse`], assuming overlapping coverage.
    ConjointOutReverse,
    /// [`Operator::Atop`], assuming overlapping coverage.
    ConjointAtop,
    /// [`Operator::AtopReverse`], assuming overlapping coverage.
    ConjointAtopReverse,
    /// [`Operator::Xor`], assuming overlapping coverage.
    ConjointXor,

    /// Multiply blend mode.
    Multiply,
    /// Screen blend mode.
    Screen,
    /// Overlay blend mode.
    Overlay,
    /// Darken blend mode.
    Darken,
    /// Lighten blend mode.
    Lighten,
    /// Color dodge blend mode.
    ColorDodge,
    /// Color burn blend mode.
    ColorBurn,
    /// Hard light blend mode.
    HardLight,
    /// Soft light blend mode.
    SoftLight,
    /// Difference blend mode.
    Difference,
    /// Exclusion blend mode.
    Exclusion,
    /// Hue blend mode.
    HslHue,
    /// Saturation blend mode.
    HslSaturation,
    /// Color blend mode.
    HslColor,
    /// Luminosity blend mode.
    HslLuminosity,
}

/// A Porter-Duff weight, evaluated from the (masked) source alpha and destination alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Factor {
    Zero,
    One,
    SrcAlpha,
    DestAlpha,
    InvSrcAlpha,
    InvDestAlpha,
    SrcOverDest,
    DestOverSrc,
    InvSrcOverDest,
    InvDestOverSrc,
    OneMinusSrcOverDest,
    OneMinusDestOverSrc,
    OneMinusInvDestOverSrc,
    OneMinusInvSrcOverDest,
}

impl Factor {
    #[inline]
    fn eval(self, sa: u16, da: u16) -> u16 {
        // Ratios with a zero denominator saturate the way the unclamped quotient would.
        let ratio = |n: u16, d: u16| if d == 0 { 0xffff } else { div_65535(n, d) };
        match self {
            Self::Zero => 0,
            Self::One => 0xffff,
            Self::SrcAlpha => sa,
            Self::DestAlpha => da,
            Self::InvSrcAlpha => 0xffff - sa,
            Self::InvDestAlpha => 0xffff - da,
            Self::SrcOverDest => ratio(sa, da),
            Self::DestOverSrc => ratio(da, sa),
            Self::InvSrcOverDest => ratio(0xffff - sa, da),
            Self::InvDestOverSrc => ratio(0xffff - da, sa),
            Self::OneMinusSrcOverDest => 0xffff - ratio(sa, da),
            Self::OneMinusDestOverSrc => 0xffff - ratio(da, sa),
            Self::OneMinusInvDestOverSrc => 0xffff - ratio(0xffff - da, sa),
            Self::OneMinusInvSrcOverDest => 0xffff - ratio(0xffff - sa, da),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mix {
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    PorterDuff(Factor, Factor),
    Blend(Mix),
}

impl Operator {
    /// All operators.
    pub const ALL: &'static [Self] = &[
        Self::Clear,
        Self::Src,
        Self::Dst,
        Self::Over,
        Self::OverReverse,
        Self::In,
        Self::InReverse,
        Self::Out,
        Self::OutReverse,
        Self::Atop,
        Self::AtopReverse,
        Self::Xor,
        Self::Add,
        Self::Saturate,
        Self::DisjointClear,
        Self::DisjointSrc,
        Self::DisjointDst,
        Self::DisjointOver,
        Self::DisjointOverReverse,
        Self::DisjointIn,
        Self::DisjointInReverse,
        Self::DisjointOut,
        Self::DisjointOutReverse,
        Self::DisjointAtop,
        Self::DisjointAtopReverse,
        Self::DisjointXor,
        Self::ConjointClear,
        Self::ConjointSrc,
        Self::ConjointDst,
        Self::ConjointOver,
        Self::ConjointOverReverse,
        Self::ConjointIn,
        Self::ConjointInReverse,
        Self::ConjointOut,
        Self::ConjointOutReverse,
        Self::ConjointAtop,
        Self::ConjointAtopReverse,
        Self::ConjointXor,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::HardLight,
        Self::SoftLight,
        Self::Difference,
        Self::Exclusion,
        Self::HslHue,
        Self::HslSaturation,
        Self::HslColor,
        Self::HslLuminosity,
    ];

    const fn kind(self) -> Kind {
        use Factor::*;
        use Kind::{Blend, PorterDuff};

        match self {
            Self::Clear | Self::DisjointClear | Self::ConjointClear => PorterDuff(Zero, Zero),
            Self::Src | Self::DisjointSrc | Self::ConjointSrc => PorterDuff(One, Zero),
            Self::Dst | Self::DisjointDst | Self::ConjointDst => PorterDuff(Zero, One),
            Self::Over => PorterDuff(One, InvSrcAlpha),
            Self::OverReverse => PorterDuff(InvDestAlpha, One),
            Self::In => PorterDuff(DestAlpha, Zero),
            Self::InReverse => PorterDuff(Zero, SrcAlpha),
            Self::Out => PorterDuff(InvDestAlpha, Zero),
            Self::OutReverse => PorterDuff(Zero, InvSrcAlpha),
            Self::Atop => PorterDuff(DestAlpha, InvSrcAlpha),
            Self::AtopReverse => PorterDuff(InvDestAlpha, SrcAlpha),
            Self::Xor => PorterDuff(InvDestAlpha, InvSrcAlpha),
            Self::Add => PorterDuff(One, One),
            Self::Saturate => PorterDuff(InvDestOverSrc, One),

            Self::DisjointOver => PorterDuff(One, InvSrcOverDest),
            Self::DisjointOverReverse => PorterDuff(InvDestOverSrc, One),
            Self::DisjointIn => PorterDuff(OneMinusInvDestOverSrc, Zero),
            Self::DisjointInReverse => PorterDuff(Zero, OneMinusInvSrcOverDest),
            Self::DisjointOut => PorterDuff(InvDestOverSrc, Zero),
            Self::DisjointOutReverse => PorterDuff(Zero, InvSrcOverDest),
            Self::DisjointAtop => PorterDuff(OneMinusInvDestOverSrc, InvSrcOverDest),
            Self::DisjointAtopReverse => PorterDuff(InvDestOverSrc, OneMinusInvSrcOverDest),
            Self::DisjointXor => PorterDuff(InvDestOverSrc, InvSrcOverDest),

            Self::ConjointOver => PorterDuff(One, OneMinusSrcOverDest),
            Self::ConjointOverReverse => PorterDuff(OneMinusDestOverSrc, One),
            Self::ConjointIn => PorterDuff(DestOverSrc, Zero),
            Self::ConjointInReverse => PorterDuff(Zero, SrcOverDest),
            Self::ConjointOut => PorterDuff(OneMinusDestOverSrc, Zero),
            Self::ConjointOutReverse => PorterDuff(Zero, OneMinusSrcOverDest),
            Self::ConjointAtop => PorterDuff(DestOverSrc, OneMinusSrcOverDest),
            Self::ConjointAtopReverse => PorterDuff(OneMinusDestOverSrc, SrcOverDest),
            Self::ConjointXor => PorterDuff(OneMinusDestOverSrc, OneMinusSrcOverDest),

            Self::Multiply => Blend(Mix::Multiply),
            Self::Screen => Blend(Mix::Screen),
            Self::Overlay => Blend(Mix::Overlay),
            Self::Darken => Blend(Mix::Darken),
            Self::Lighten => Blend(Mix::Lighten),
            Self::ColorDodge => Blend(Mix::ColorDodge),
            Self::ColorBurn => Blend(Mix::ColorBurn),
            Self::HardLight => Blend(Mix::HardLight),
            Self::SoftLight => Blend(Mix::SoftLight),
            Self::Difference => Blend(Mix::Difference),
            Self::Exclusion => Blend(Mix::Exclusion),
            Self::HslHue => Blend(Mix::Hue),
            Self::HslSaturation => Blend(Mix::Saturation),
            Self::HslColor => Blend(Mix::Color),
            Self::HslLuminosity => Blend(Mix::Luminosity),
        }
    }

    /// Whether the operator is one of the PDF separable or non-separable blend modes.
    pub const fn is_blend_mode(self) -> bool {
        matches!(self.kind(), Kind::Blend(_))
    }

    /// Whether a fully transparent source leaves the destination unchanged.
    ///
    /// Unbounded operators modify the destination everywhere in the composited area, even where
    /// the source or mask is transparent.
    pub const fn is_bounded(self) -> bool {
        match self.kind() {
            Kind::PorterDuff(_, fb) => {
                // With `sa == 0` these all evaluate to one, or to zero where `da == 0`.
                matches!(
                    fb,
                    Factor::One
                        | Factor::InvSrcAlpha
                        | Factor::InvSrcOverDest
                        | Factor::OneMinusSrcOverDest
                )
            }
            Kind::Blend(_) => true,
        }
    }

    /// Combine one source pixel into one destination pixel.
    ///
    /// `mask` holds per-channel coverage in `[r, g, b, a]` order. For a regular mask all four
    /// entries are the mask's alpha; for a component alpha mask they are its channels.
    pub(crate) fn combine(self, src: Rgba16, mask: [u16; 4], dest: Rgba16) -> Rgba16 {
        match self.kind() {
            Kind::PorterDuff(fa, fb) => porter_duff(fa, fb, src, mask, dest),
            Kind::Blend(mix) => blend(mix, src, mask, dest),
        }
    }
}

/// Combine a row of pixels in place.
///
/// When `component_alpha` is set, each channel of the mask weighs the corresponding channel of
/// the source. Otherwise only the mask's alpha is used.
pub(crate) fn combine_row(
    op: Operator,
    dest: &mut [Rgba16],
    src: &[Rgba16],
    mask: Option<&[Rgba16]>,
    component_alpha: bool,
) {
    match mask {
        None => {
            for (d, &s) in dest.iter_mut().zip(src) {
                *d = op.combine(s, [0xffff; 4], *d);
            }
        }
        Some(mask) => {
            for ((d, &s), &m) in dest.iter_mut().zip(src).zip(mask) {
                let m = if component_alpha {
                    bytemuck::cast::<Rgba16, [u16; 4]>(m)
                } else {
                    [m.a; 4]
                };
                *d = op.combine(s, m, *d);
            }
        }
    }
}

fn porter_duff(fa: Factor, fb: Factor, src: Rgba16, mask: [u16; 4], dest: Rgba16) -> Rgba16 {
    let s: [u16; 4] = bytemuck::cast(src);
    let d: [u16; 4] = bytemuck::cast(dest);
    let da = dest.a;

    let mut out = [0_u16; 4];
    for i in 0..4 {
        let sc = mul_65535(s[i], mask[i]);
        let sa = mul_65535(src.a, mask[i]);
        let v = u32::from(mul_65535(sc, fa.eval(sa, da)))
            + u32::from(mul_65535(d[i], fb.eval(sa, da)));
        out[i] = v.min(0xffff) as u16;
    }

    bytemuck::cast(out)
}

// The blend modes work on normalized floats, the way they are specified.

fn to_unit(v: u16) -> f32 {
    f32::from(v) / 65535.0
}

fn from_unit(v: f32) -> u16 {
    // NaN fails both comparisons and maps to zero.
    if v >= 1.0 {
        0xffff
    } else if v > 0.0 {
        (v * 65535.0 + 0.5) as u16
    } else {
        0
    }
}

fn unpremultiply(c: Rgba16) -> [f32; 3] {
    if c.a == 0 {
        return [0.0; 3];
    }
    let a = to_unit(c.a);
    [
        (to_unit(c.r) / a).min(1.0),
        (to_unit(c.g) / a).min(1.0),
        (to_unit(c.b) / a).min(1.0),
    ]
}

macro_rules! separable_mix {
    ($src:expr, $dest:expr, $f:expr) => {{
        let f = $f;
        [f($src[0], $dest[0]), f($src[1], $dest[1]), f($src[2], $dest[2])]
    }};
}

fn hard_light(cs: f32, cb: f32) -> f32 {
    if cs <= 0.5 {
        cb * 2.0 * cs
    } else {
        let cs = 2.0 * cs - 1.0;
        cb + cs - cb * cs
    }
}

fn color_dodge(cs: f32, cb: f32) -> f32 {
    if cb == 0.0 {
        0.0
    } else if cs == 1.0 {
        1.0
    } else {
        (cb / (1.0 - cs)).min(1.0)
    }
}

fn color_burn(cs: f32, cb: f32) -> f32 {
    if cb == 1.0 {
        1.0
    } else if cs == 0.0 {
        0.0
    } else {
        1.0 - ((1.0 - cb) / cs).min(1.0)
    }
}

fn soft_light(cs: f32, cb: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let d = if cb <= 0.25 {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        } else {
            cb.sqrt()
        };
        cb + (2.0 * cs - 1.0) * (d - cb)
    }
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut c = c;
    if n < 0.0 && l - n > 0.0 {
        c = c.map(|v| l + (v - l) * l / (l - n));
    }
    if x > 1.0 && x - l > 0.0 {
        c = c.map(|v| l + (v - l) * (1.0 - l) / (x - l));
    }
    c
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color(c.map(|v| v + d))
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    if max > min {
        c.map(|v| (v - min) * s / (max - min))
    } else {
        [0.0; 3]
    }
}

impl Mix {
    fn apply(self, cs: [f32; 3], cb: [f32; 3]) -> [f32; 3] {
        match self {
            Self::Multiply => separable_mix!(cs, cb, |s: f32, b: f32| s * b),
            Self::Screen => separable_mix!(cs, cb, |s: f32, b: f32| s + b - s * b),
            Self::Overlay => separable_mix!(cs, cb, |s: f32, b: f32| hard_light(b, s)),
            Self::Darken => separable_mix!(cs, cb, |s: f32, b: f32| s.min(b)),
            Self::Lighten => separable_mix!(cs, cb, |s: f32, b: f32| s.max(b)),
            Self::ColorDodge => separable_mix!(cs, cb, color_dodge),
            Self::ColorBurn => separable_mix!(cs, cb, color_burn),
            Self::HardLight => separable_mix!(cs, cb, hard_light),
            Self::SoftLight => separable_mix!(cs, cb, soft_light),
            Self::Difference => separable_mix!(cs, cb, |s: f32, b: f32| (s - b).abs()),
            Self::Exclusion => separable_mix!(cs, cb, |s: f32, b: f32| s + b - 2.0 * s * b),
            Self::Hue => set_lum(set_sat(cs, sat(cb)), lum(cb)),
            Self::Saturation => set_lum(set_sat(cb, sat(cs)), lum(cb)),
            Self::Color => set_lum(cs, lum(cb)),
            Self::Luminosity => set_lum(cb, lum(cs)),
        }
    }
}

fn blend(mix: Mix, src: Rgba16, mask: [u16; 4], dest: Rgba16) -> Rgba16 {
    let cs = unpremultiply(src);
    let cb = unpremultiply(dest);
    let mixed = mix.apply(cs, cb);

    // Where the backdrop is transparent, the source shows through unmixed.
    let ab = to_unit(dest.a);
    let mixed = [0, 1, 2].map(|i| (1.0 - ab) * cs[i] + ab * mixed[i]);

    let sa = src.a;
    let s = [
        mul_65535(from_unit(mixed[0]), sa),
        mul_65535(from_unit(mixed[1]), sa),
        mul_65535(from_unit(mixed[2]), sa),
        sa,
    ];

    // Compose the mixed source over the destination.
    let d: [u16; 4] = bytemuck::cast(dest);
    let mut out = [0_u16; 4];
    for i in 0..4 {
        let al_s = mul_65535(sa, mask[i]);
        let v = u32::from(mul_65535(s[i], mask[i])) + u32::from(mul_65535(d[i], 0xffff - al_s));
        out[i] = v.min(0xffff) as u16;
    }

    bytemuck::cast(out)
}
