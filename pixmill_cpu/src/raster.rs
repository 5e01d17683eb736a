// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterization of trapezoids into alpha masks.
//!
//! Coverage is estimated by point sampling on a regular grid inside each pixel. The grid size
//! depends on the depth of the mask so that a fully covered pixel reaches exactly the largest
//! representable value:
//!
//! | Mask | Grid    | Samples |
//! |------|---------|---------|
//! | `a1` | 1 × 1   | 1       |
//! | `a4` | 5 × 3   | 15      |
//! | `a8` | 17 × 15 | 255     |
//!
//! Coverage is added to what the mask already holds, saturating at full coverage.

use pixmill_common::bits::Bits;
use pixmill_common::fixed::Fixed;
use pixmill_common::format::PixelFormat;
use pixmill_common::geometry::{Box32, LineFixed, Trap, Trapezoid, Triangle};
use static_assertions::const_assert_eq;

use crate::combine::Operator;
use crate::composite::composite;
use crate::image::{Image, Kind};

/// Samples per pixel along x and y for a mask depth.
const fn grid(bpp: u32) -> (i64, i64) {
    match bpp {
        1 => (1, 1),
        4 => (5, 3),
        _ => (17, 15),
    }
}

const_assert_eq!(grid(1).0 * grid(1).1, 1);
const_assert_eq!(grid(4).0 * grid(4).1, 15);
const_assert_eq!(grid(8).0 * grid(8).1, 255);

const ONE: i64 = 1 << 16;

fn ceil_div(a: i64, b: i64) -> i64 {
    -((-a).div_euclid(b))
}

/// The alpha-only buffer of `image`, if it can hold coverage.
fn coverage_target(kind: &mut Kind) -> Option<&mut Bits> {
    match kind {
        Kind::Bits(bits)
            if matches!(
                bits.format(),
                PixelFormat::A1 | PixelFormat::A4 | PixelFormat::A8
            ) =>
        {
            Some(bits)
        }
        _ => None,
    }
}

/// Add the coverage of one trapezoid, moved by `(x_off, y_off)`, to `bits`.
fn rasterize(bits: &mut Bits, trap: &Trapezoid, x_off: i32, y_off: i32) {
    let bpp = bits.format().bpp();
    let max = (1_u32 << bpp) - 1;
    let (nx, ny) = grid(bpp);
    let (step_x, step_y) = (ONE / nx, ONE / ny);
    let (first_x, first_y) = (step_x / 2, step_y / 2);

    let dx = i64::from(x_off) << 16;
    let dy = i64::from(y_off) << 16;

    // Work in mask space; the edges are evaluated in trapezoid space.
    let height = i64::from(bits.height()) << 16;
    let top = (i64::from(trap.top.raw()) + dy).max(0);
    let bottom = (i64::from(trap.bottom.raw()) + dy).min(height);
    if top >= bottom {
        return;
    }

    let width = i64::from(bits.width());
    // Edges beyond the mask only matter through which side they lie on.
    let limit = (width + 1) << 16;
    let mut row = vec![0_u32; bits.width() as usize];
    for py in (top >> 16)..=((bottom - 1) >> 16) {
        row.fill(0);
        let (mut lo, mut hi) = (width, 0);

        for k in 0..ny {
            let ys = (py << 16) + first_y + k * step_y;
            if ys < top || ys >= bottom {
                continue;
            }
            let lx = trap.left.x_at_raw(ys - dy).saturating_add(dx).clamp(-ONE, limit);
            let rx = trap.right.x_at_raw(ys - dy).saturating_add(dx).clamp(-ONE, limit);
            if lx >= rx {
                continue;
            }

            let first_px = (lx >> 16).max(0);
            let last_px = (rx >> 16).min(width - 1);
            for px in first_px..=last_px {
                let base = (px << 16) + first_x;
                // Samples j with lx <= base + j * step < rx.
                let j0 = ceil_div(lx - base, step_x).clamp(0, nx);
                let j1 = ceil_div(rx - base, step_x).clamp(0, nx);
                if j1 > j0 {
                    row[px as usize] += (j1 - j0) as u32;
                    lo = lo.min(px);
                    hi = hi.max(px + 1);
                }
            }
        }

        let y = py as i32;
        for px in lo..hi {
            let covered = row[px as usize];
            if covered == 0 {
                continue;
            }
            let x = px as i32;
            let value = (bits.fetch_raw(x, y) + covered).min(max);
            bits.store_raw(x, y, value);
        }
    }
}

/// Add the coverage of `trap`, moved by `(x_off, y_off)`, to an `a1`, `a4` or `a8` mask.
///
/// Other images are left untouched.
pub fn rasterize_trapezoid(image: &Image, trap: &Trapezoid, x_off: i32, y_off: i32) {
    if !trap.is_valid() {
        log::debug!("skipping degenerate trapezoid {trap:?}");
        return;
    }

    let mut repr = image.0.borrow_mut();
    let Some(bits) = coverage_target(&mut repr.kind) else {
        log::warn!("trapezoids can only be rasterized into a1, a4 or a8 masks");
        return;
    };
    rasterize(bits, trap, x_off, y_off);
}

/// Add the coverage of each of `traps`, moved by `(x_off, y_off)`, to a mask.
pub fn add_trapezoids(image: &Image, x_off: i32, y_off: i32, traps: &[Trapezoid]) {
    for trap in traps {
        rasterize_trapezoid(image, trap, x_off, y_off);
    }
}

/// Add the coverage of each of `traps`, moved by `(x_off, y_off)`, to a mask.
pub fn add_traps(image: &Image, x_off: i32, y_off: i32, traps: &[Trap]) {
    for trap in traps {
        rasterize_trapezoid(image, &trap.to_trapezoid(), x_off, y_off);
    }
}

/// Add the coverage of each of `triangles`, moved by `(x_off, y_off)`, to a mask.
pub fn add_triangles(image: &Image, x_off: i32, y_off: i32, triangles: &[Triangle]) {
    for t in triangles {
        add_trapezoids(image, x_off, y_off, &t.to_trapezoids());
    }
}

/// The integer bounds of the valid trapezoids among `traps`.
fn trapezoid_extents(traps: &[Trapezoid]) -> Option<Box32> {
    let mut out: Option<Box32> = None;
    for t in traps.iter().filter(|t| t.is_valid()) {
        let xs = [
            t.left.x_at(t.top),
            t.left.x_at(t.bottom),
            t.right.x_at(t.top),
            t.right.x_at(t.bottom),
        ];
        let x1 = xs.iter().copied().min().unwrap_or(Fixed::ZERO);
        let x2 = xs.iter().copied().max().unwrap_or(Fixed::ZERO);
        let b = Box32::new(
            x1.to_int(),
            t.top.to_int(),
            x2.ceil().to_int(),
            t.bottom.ceil().to_int(),
        );
        out = Some(match out {
            Some(o) => o.union_extents(&b),
            None => b,
        });
    }
    out
}

/// Rasterize `traps` into a temporary mask of `mask_format` and composite `src` through it.
///
/// The trapezoids are positioned relative to `(dst_x, dst_y)`, and source pixel
/// `(src_x, src_y)` lines up with that point. For unbounded operators the whole destination is
/// affected, as if the mask were transparent outside of the trapezoids.
#[allow(clippy::too_many_arguments)]
pub fn composite_trapezoids(
    op: Operator,
    src: &Image,
    dst: &Image,
    mask_format: PixelFormat,
    src_x: i32,
    src_y: i32,
    dst_x: i32,
    dst_y: i32,
    traps: &[Trapezoid],
) {
    if traps.is_empty() {
        return;
    }
    let Some(bounds) = dst.bounds() else {
        return;
    };

    let area = if op.is_bounded() {
        let Some(extents) = trapezoid_extents(traps) else {
            return;
        };
        let moved = Box32::new(
            extents.x1.saturating_add(dst_x),
            extents.y1.saturating_add(dst_y),
            extents.x2.saturating_add(dst_x),
            extents.y2.saturating_add(dst_y),
        );
        match moved.intersect(&bounds) {
            Some(b) => b,
            None => return,
        }
    } else {
        bounds
    };

    let Ok(mask) = Image::new_bits(mask_format, area.width(), area.height()) else {
        log::warn!("can't create a {mask_format:?} mask of {area:?}");
        return;
    };
    add_trapezoids(
        &mask,
        dst_x.saturating_sub(area.x1),
        dst_y.saturating_sub(area.y1),
        traps,
    );

    composite(
        op,
        src,
        Some(&mask),
        dst,
        src_x.saturating_add(area.x1).saturating_sub(dst_x),
        src_y.saturating_add(area.y1).saturating_sub(dst_y),
        0,
        0,
        area.x1,
        area.y1,
        area.width() as i32,
        area.height() as i32,
    );
}
