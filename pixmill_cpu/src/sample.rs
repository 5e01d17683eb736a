// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fetching rows of working colors from images.
//!
//! The sample point of destination pixel `(x, y)` is its center `(x + 0.5, y + 0.5)`. It is
//! mapped into image space through the inverse of the image transform and then resolved by the
//! image's filter and repeat mode.

use std::cell::Ref;

use pixmill_common::bits::Bits;
use pixmill_common::color::Rgba16;
use pixmill_common::fixed::Fixed;
use pixmill_common::geometry::PointFixed;
use static_assertions::const_assert;

use crate::dither::{bayer_8, Dither};
use crate::image::{Filter, ImageRepr, Kernel, Kind, Mapping, Repeat, SeparableKernel};

/// The number of bits of subpixel precision used for bilinear weights.
pub const BILINEAR_INTERPOLATION_BITS: u32 = 7;

const_assert!(BILINEAR_INTERPOLATION_BITS > 0 && BILINEAR_INTERPOLATION_BITS <= 8);

/// Resolve a texel coordinate against an axis of `size` pixels.
pub(crate) fn repeat_coord(repeat: Repeat, c: i32, size: u32) -> Option<i32> {
    let size = i64::from(size);
    if size == 0 {
        return None;
    }

    let c = i64::from(c);
    let c = match repeat {
        Repeat::None => {
            if c < 0 || c >= size {
                return None;
            }
            c
        }
        Repeat::Normal => c.rem_euclid(size),
        Repeat::Pad => c.clamp(0, size - 1),
        Repeat::Reflect => {
            let c = c.rem_euclid(2 * size);
            if c >= size {
                2 * size - c - 1
            } else {
                c
            }
        }
    };

    Some(c as i32)
}

/// Texel access for a pixel buffer, with the repeat mode and alpha map applied.
struct Texels<'a> {
    bits: &'a Bits,
    repeat: Repeat,
    alpha: Option<(&'a Bits, i32, i32)>,
}

impl Texels<'_> {
    fn get(&self, x: i32, y: i32) -> Rgba16 {
        let (Some(x), Some(y)) = (
            repeat_coord(self.repeat, x, self.bits.width()),
            repeat_coord(self.repeat, y, self.bits.height()),
        ) else {
            return Rgba16::TRANSPARENT;
        };

        let mut c = self.bits.fetch(x, y);
        if let Some((map, ox, oy)) = self.alpha {
            // Pixels outside of the alpha map are transparent.
            c.a = map
                .fetch(x.saturating_sub(ox), y.saturating_sub(oy))
                .a;
        }
        c
    }

    fn nearest(&self, p: PointFixed) -> Rgba16 {
        let x = p.x.saturating_sub(Fixed::E).to_int();
        let y = p.y.saturating_sub(Fixed::E).to_int();
        self.get(x, y)
    }

    fn bilinear(&self, p: PointFixed) -> Rgba16 {
        const SHIFT: u32 = 16 - BILINEAR_INTERPOLATION_BITS;
        const MASK: i32 = (1 << BILINEAR_INTERPOLATION_BITS) - 1;

        let x1 = p.x.saturating_sub(Fixed::HALF);
        let y1 = p.y.saturating_sub(Fixed::HALF);
        // Weights are reduced to the interpolation precision, then scaled back to 8 bits.
        let dx = u64::from(((x1.raw() >> SHIFT) & MASK) as u32) << (8 - BILINEAR_INTERPOLATION_BITS);
        let dy = u64::from(((y1.raw() >> SHIFT) & MASK) as u32) << (8 - BILINEAR_INTERPOLATION_BITS);

        let (x1, y1) = (x1.to_int(), y1.to_int());
        let (x2, y2) = (x1.saturating_add(1), y1.saturating_add(1));
        let tl = self.get(x1, y1).to_array();
        let tr = self.get(x2, y1).to_array();
        let bl = self.get(x1, y2).to_array();
        let br = self.get(x2, y2).to_array();

        let distxy = dx * dy;
        let distxiy = (dx << 8) - distxy;
        let distixy = (dy << 8) - distxy;
        let distixiy = 65536 + distxy - (dy << 8) - (dx << 8);

        let c = [0, 1, 2, 3].map(|i| {
            let v = u64::from(tl[i]) * distixiy
                + u64::from(tr[i]) * distxiy
                + u64::from(bl[i]) * distixy
                + u64::from(br[i]) * distxy;
            (v >> 16).min(0xffff) as u16
        });
        Rgba16::from_array(c)
    }

    fn convolution(&self, p: PointFixed, k: &Kernel) -> Rgba16 {
        let (cw, ch) = (k.width() as i64, k.height() as i64);
        let x_off = ((cw << 16) - 0x10000) >> 1;
        let y_off = ((ch << 16) - 0x10000) >> 1;
        let x1 = ((i64::from(p.x.raw()) - 1 - x_off) >> 16) as i32;
        let y1 = ((i64::from(p.y.raw()) - 1 - y_off) >> 16) as i32;

        let mut sum = [0_i64; 4];
        let mut weights = k.params().iter();
        for j in 0..k.height() as i32 {
            for i in 0..k.width() as i32 {
                let Some(&f) = weights.next() else {
                    break;
                };
                if f == Fixed::ZERO {
                    continue;
                }
                let c = self.get(x1.saturating_add(i), y1.saturating_add(j)).to_array();
                for (s, &c) in sum.iter_mut().zip(&c) {
                    *s += i64::from(c) * i64::from(f.raw());
                }
            }
        }

        Rgba16::from_array(sum.map(|s| ((s + 0x8000) >> 16).clamp(0, 0xffff) as u16))
    }

    fn separable_convolution(&self, p: PointFixed, k: &SeparableKernel) -> Rgba16 {
        let (cw, ch) = (i64::from(k.width()), i64::from(k.height()));
        let x_shift = 16 - k.x_phase_bits();
        let y_shift = 16 - k.y_phase_bits();

        // Round to the middle of the closest phase.
        let round = |v: i32, shift: u32| {
            let v = i64::from(v);
            ((v >> shift) << shift) + ((1_i64 << shift) >> 1)
        };
        let x = round(p.x.raw(), x_shift);
        let y = round(p.y.raw(), y_shift);

        let px = ((x & 0xffff) >> x_shift) as usize;
        let py = ((y & 0xffff) >> y_shift) as usize;

        let x_off = ((cw << 16) - 0x10000) >> 1;
        let y_off = ((ch << 16) - 0x10000) >> 1;
        let x1 = ((x - 1 - x_off) >> 16) as i32;
        let y1 = ((y - 1 - y_off) >> 16) as i32;

        let x_params = k
            .x_params()
            .get(px * cw as usize..(px + 1) * cw as usize)
            .unwrap_or_default();
        let y_params = k
            .y_params()
            .get(py * ch as usize..(py + 1) * ch as usize)
            .unwrap_or_default();

        let mut sum = [0_i128; 4];
        for (j, fy) in y_params.iter().enumerate() {
            if *fy == Fixed::ZERO {
                continue;
            }
            for (i, fx) in x_params.iter().enumerate() {
                if *fx == Fixed::ZERO {
                    continue;
                }
                let f = (i64::from(fy.raw()) * i64::from(fx.raw()) + 0x8000) >> 16;
                let c = self
                    .get(x1.saturating_add(i as i32), y1.saturating_add(j as i32))
                    .to_array();
                for (s, &c) in sum.iter_mut().zip(&c) {
                    *s += i128::from(c) * i128::from(f);
                }
            }
        }

        Rgba16::from_array(sum.map(|s| ((s + 0x8000) >> 16).clamp(0, 0xffff) as u16))
    }

    fn filtered(&self, p: PointFixed, filter: &Filter) -> Rgba16 {
        match filter {
            Filter::Fast | Filter::Nearest => self.nearest(p),
            Filter::Good | Filter::Best | Filter::Bilinear => self.bilinear(p),
            Filter::Convolution(k) => self.convolution(p, k),
            Filter::SeparableConvolution(k) => self.separable_convolution(p, k),
        }
    }
}

/// The alpha map of `image`, borrowed for the duration of a row.
fn borrow_alpha_map(image: &ImageRepr) -> Option<(Ref<'_, ImageRepr>, i32, i32)> {
    image
        .alpha_map
        .as_ref()
        .map(|m| (m.image.0.borrow(), m.x, m.y))
}

fn alpha_bits<'a>(map: &'a Option<(Ref<'_, ImageRepr>, i32, i32)>) -> Option<(&'a Bits, i32, i32)> {
    match map {
        Some((repr, x, y)) => match &repr.kind {
            Kind::Bits(bits) => Some((bits, *x, *y)),
            _ => None,
        },
        None => None,
    }
}

fn pixel_center(x: i32, y: i32) -> PointFixed {
    PointFixed::new(
        Fixed::from_int(x).saturating_add(Fixed::HALF),
        Fixed::from_int(y).saturating_add(Fixed::HALF),
    )
}

/// Fetch `out.len()` samples of `image` for the destination pixels starting at `(x, y)`.
pub(crate) fn fetch_row(image: &ImageRepr, x: i32, y: i32, out: &mut [Rgba16]) {
    if image.mapping == Mapping::Singular {
        out.fill(Rgba16::TRANSPARENT);
        return;
    }

    match &image.kind {
        Kind::Solid(c) => out.fill(*c),
        Kind::Gradient(g) => {
            for (i, px) in out.iter_mut().enumerate() {
                let xi = x.saturating_add(i as i32);
                let p = match image.mapping {
                    Mapping::Inverse(t) => t
                        .transform_point(pixel_center(xi, y))
                        .map(|p| (p.x.to_f64(), p.y.to_f64())),
                    _ => Some((f64::from(xi) + 0.5, f64::from(y) + 0.5)),
                };
                *px = match p {
                    Some((px, py)) => g.color_at(px, py, image.repeat),
                    None => Rgba16::TRANSPARENT,
                };
            }
        }
        Kind::Bits(bits) => {
            let map = borrow_alpha_map(image);
            let texels = Texels {
                bits,
                repeat: image.repeat,
                alpha: alpha_bits(&map),
            };

            match image.mapping {
                Mapping::Identity if image.filter.is_point_sampling() => {
                    for (i, px) in out.iter_mut().enumerate() {
                        *px = texels.get(x.saturating_add(i as i32), y);
                    }
                }
                mapping => {
                    for (i, px) in out.iter_mut().enumerate() {
                        let center = pixel_center(x.saturating_add(i as i32), y);
                        let p = match mapping {
                            Mapping::Inverse(t) => t.transform_point(center),
                            _ => Some(center),
                        };
                        *px = match p {
                            Some(p) => texels.filtered(p, &image.filter),
                            None => Rgba16::TRANSPARENT,
                        };
                    }
                }
            }
        }
    }
}

/// Fetch destination pixels, untransformed and without repeat.
pub(crate) fn fetch_dest_row(image: &ImageRepr, x: i32, y: i32, out: &mut [Rgba16]) {
    let Kind::Bits(bits) = &image.kind else {
        out.fill(Rgba16::TRANSPARENT);
        return;
    };

    let map = borrow_alpha_map(image);
    let texels = Texels {
        bits,
        repeat: Repeat::None,
        alpha: alpha_bits(&map),
    };
    for (i, px) in out.iter_mut().enumerate() {
        *px = texels.get(x.saturating_add(i as i32), y);
    }
}

/// Store a row into a destination and, if it has one, its alpha map.
pub(crate) fn store_dest_row(image: &mut ImageRepr, x: i32, y: i32, colors: &[Rgba16]) {
    let ImageRepr {
        kind,
        alpha_map,
        dither,
        dither_offset: (ox, oy),
        ..
    } = image;
    let Kind::Bits(bits) = kind else {
        return;
    };

    if *dither == Dither::None || bits.format().is_yuv() {
        bits.store_scanline(x, y, colors);
    } else {
        let ty = y.wrapping_add(*oy);
        for (px, &c) in (x..).zip(colors) {
            bits.store_dithered(px, y, c, bayer_8(px.wrapping_add(*ox), ty));
        }
    }
    if let Some(map) = alpha_map {
        if let Kind::Bits(alpha) = &mut map.image.0.borrow_mut().kind {
            alpha.store_scanline(x.saturating_sub(map.x), y.saturating_sub(map.y), colors);
        }
    }
}
