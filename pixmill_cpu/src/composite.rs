// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositing pipeline.
//!
//! A composite first reduces the destination rectangle to the region that can actually change,
//! then either hands the region to a specialized fast path or runs the general pipeline: fetch
//! a row of the source, the mask and the destination, combine, store.

use pixmill_common::color::{Color, Rgba16};
use pixmill_common::geometry::{Box32, Rectangle32};
use pixmill_common::region::Region;

use crate::combine::{combine_row, Operator};
use crate::dither::Dither;
use crate::image::{Image, Kind, Mapping};
use crate::sample::{fetch_dest_row, fetch_row, store_dest_row};

/// Shift a destination coordinate into another image's space.
fn offset(v: i32, d: i64) -> i32 {
    (i64::from(v) + d).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

struct Composite<'a> {
    op: Operator,
    src: &'a Image,
    mask: Option<&'a Image>,
    dest: &'a Image,
    /// Source position minus destination position.
    src_delta: (i64, i64),
    mask_delta: (i64, i64),
}

/// Composite the `width × height` rectangle at `(src_x, src_y)` of `src`, weighted by the same
/// sized rectangle at `(mask_x, mask_y)` of `mask`, onto `dest` at `(dest_x, dest_y)`.
///
/// Only pixels inside the destination's bounds, clip region and alpha map are written. Sources
/// and masks that have source clipping enabled further restrict the area to their clip
/// regions. Degenerate rectangles and procedural destinations are ignored.
///
/// `src`, `mask` and `dest` may all be the same image.
#[allow(clippy::too_many_arguments)]
pub fn composite(
    op: Operator,
    src: &Image,
    mask: Option<&Image>,
    dest: &Image,
    src_x: i32,
    src_y: i32,
    mask_x: i32,
    mask_y: i32,
    dest_x: i32,
    dest_y: i32,
    width: i32,
    height: i32,
) {
    if width <= 0 || height <= 0 {
        return;
    }

    let dest_box = Box32::new(
        dest_x,
        dest_y,
        offset(dest_x, i64::from(width)),
        offset(dest_y, i64::from(height)),
    );
    let Some(region) = composite_region(dest_box, dest) else {
        log::debug!("ignoring composite onto a procedural destination");
        return;
    };
    let region = clip_source(region, src, dest_x, dest_y, src_x, src_y);
    let region = match mask {
        Some(mask) => clip_source(region, mask, dest_x, dest_y, mask_x, mask_y),
        None => region,
    };
    let keeps_dest = matches!(
        op,
        Operator::Dst | Operator::DisjointDst | Operator::ConjointDst
    );
    if region.is_empty() || keeps_dest {
        return;
    }

    let job = Composite {
        op,
        src,
        mask,
        dest,
        src_delta: (
            i64::from(src_x) - i64::from(dest_x),
            i64::from(src_y) - i64::from(dest_y),
        ),
        mask_delta: (
            i64::from(mask_x) - i64::from(dest_x),
            i64::from(mask_y) - i64::from(dest_y),
        ),
    };

    if let Some(path) = FAST_PATHS.iter().find(|p| p.matches(&job, &region)) {
        log::trace!("composite {op:?} using the {} fast path", path.name);
        (path.run)(&job, &region);
    } else {
        general(&job, &region);
    }
}

/// The part of `dest_box` inside the destination's bounds, clip and alpha map.
fn composite_region(dest_box: Box32, dest: &Image) -> Option<Region> {
    let repr = dest.0.borrow();
    let Kind::Bits(bits) = &repr.kind else {
        return None;
    };

    let bounds = dest_box.intersect(&bits.bounds()).unwrap_or_default();
    let mut region = Region::from_box(bounds);
    if let Some(clip) = &repr.clip {
        region = region.intersect(clip);
    }
    if let Some(map) = &repr.alpha_map {
        if let Some(b) = map.image.bounds() {
            let mut map_region = Region::from_box(b);
            map_region.translate(map.x, map.y);
            region = region.intersect(&map_region);
        }
    }

    Some(region)
}

/// Restrict `region` to the clip of a source or mask with source clipping enabled.
fn clip_source(
    region: Region,
    image: &Image,
    dest_x: i32,
    dest_y: i32,
    x: i32,
    y: i32,
) -> Region {
    let repr = image.0.borrow();
    match &repr.clip {
        Some(clip) if repr.source_clipping => {
            let mut clip = clip.clone();
            clip.translate(
                offset(dest_x, -i64::from(x)),
                offset(dest_y, -i64::from(y)),
            );
            region.intersect(&clip)
        }
        _ => region,
    }
}

fn general(job: &Composite<'_>, region: &Region) {
    let component_alpha = job.mask.is_some_and(Image::component_alpha);
    let width = region.extents().width() as usize;
    let mut src = vec![Rgba16::TRANSPARENT; width];
    let mut mask = vec![Rgba16::TRANSPARENT; if job.mask.is_some() { width } else { 0 }];
    let mut dest = vec![Rgba16::TRANSPARENT; width];

    for b in region.boxes() {
        let w = b.width() as usize;
        for y in b.y1..b.y2 {
            let (src, dest) = (&mut src[..w], &mut dest[..w]);
            fetch_row(
                &job.src.0.borrow(),
                offset(b.x1, job.src_delta.0),
                offset(y, job.src_delta.1),
                src,
            );
            let mask = match job.mask {
                Some(image) => {
                    let mask = &mut mask[..w];
                    fetch_row(
                        &image.0.borrow(),
                        offset(b.x1, job.mask_delta.0),
                        offset(y, job.mask_delta.1),
                        mask,
                    );
                    Some(&*mask)
                }
                None => None,
            };
            fetch_dest_row(&job.dest.0.borrow(), b.x1, y, dest);

            combine_row(job.op, dest, src, mask, component_alpha);
            store_dest_row(&mut job.dest.0.borrow_mut(), b.x1, y, dest);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceMatch {
    Any,
    Solid,
    OpaqueSolid,
    /// An untransformed pixel buffer in the destination's format, covering the whole region.
    SameFormat,
}

/// A specialization of [`general`] with bit-identical results.
struct FastPath {
    name: &'static str,
    op: Operator,
    src: SourceMatch,
    run: fn(&Composite<'_>, &Region),
}

impl FastPath {
    fn matches(&self, job: &Composite<'_>, region: &Region) -> bool {
        if job.op != self.op || job.mask.is_some() {
            return false;
        }
        let dest = job.dest.0.borrow();
        if dest.alpha_map.is_some() || dest.dither != Dither::None {
            return false;
        }
        drop(dest);

        match self.src {
            SourceMatch::Any => true,
            SourceMatch::Solid => solid_color(job.src).is_some(),
            SourceMatch::OpaqueSolid => solid_color(job.src).is_some_and(|c| c.is_opaque()),
            SourceMatch::SameFormat => copyable(job, region),
        }
    }
}

static FAST_PATHS: &[FastPath] = &[
    FastPath {
        name: "clear",
        op: Operator::Clear,
        src: SourceMatch::Any,
        run: fill_clear,
    },
    FastPath {
        name: "solid fill",
        op: Operator::Src,
        src: SourceMatch::Solid,
        run: fill_solid,
    },
    FastPath {
        name: "opaque solid fill",
        op: Operator::Over,
        src: SourceMatch::OpaqueSolid,
        run: fill_solid,
    },
    FastPath {
        name: "copy",
        op: Operator::Src,
        src: SourceMatch::SameFormat,
        run: copy,
    },
];

fn solid_color(image: &Image) -> Option<Rgba16> {
    let repr = image.0.borrow();
    match repr.kind {
        Kind::Solid(c) if repr.mapping != Mapping::Singular => Some(c),
        _ => None,
    }
}

/// Whether the source can be copied as raw pixel values.
fn copyable(job: &Composite<'_>, region: &Region) -> bool {
    let Some(dest_format) = job.dest.format() else {
        return false;
    };
    let src = job.src.0.borrow();
    let Kind::Bits(bits) = &src.kind else {
        return false;
    };

    let format = bits.format();
    if format != dest_format
        || format.has_padding()
        || format.is_indexed()
        || format.is_yuv()
        || src.mapping != Mapping::Identity
        || !src.filter.is_point_sampling()
        || src.alpha_map.is_some()
    {
        return false;
    }

    let e = region.extents();
    let moved = Box32::new(
        offset(e.x1, job.src_delta.0),
        offset(e.y1, job.src_delta.1),
        offset(e.x2, job.src_delta.0),
        offset(e.y2, job.src_delta.1),
    );
    bits.bounds().subsumes(&moved)
}

fn fill(job: &Composite<'_>, region: &Region, color: Rgba16) {
    let mut dest = job.dest.0.borrow_mut();
    let Kind::Bits(bits) = &mut dest.kind else {
        return;
    };
    let Some(raw) = bits.pack(color) else {
        return;
    };

    for b in region.boxes() {
        for y in b.y1..b.y2 {
            for x in b.x1..b.x2 {
                bits.store_raw(x, y, raw);
            }
        }
    }
}

fn fill_clear(job: &Composite<'_>, region: &Region) {
    fill(job, region, Rgba16::TRANSPARENT);
}

fn fill_solid(job: &Composite<'_>, region: &Region) {
    if let Some(color) = solid_color(job.src) {
        fill(job, region, color);
    }
}

fn copy(job: &Composite<'_>, region: &Region) {
    let mut row = Vec::new();
    for b in region.boxes() {
        for y in b.y1..b.y2 {
            // Read the whole row first, so overlapping self-copies behave like the general path.
            row.clear();
            {
                let src = job.src.0.borrow();
                let Kind::Bits(bits) = &src.kind else {
                    return;
                };
                let sy = offset(y, job.src_delta.1);
                row.extend((b.x1..b.x2).map(|x| bits.fetch_raw(offset(x, job.src_delta.0), sy)));
            }

            let mut dest = job.dest.0.borrow_mut();
            let Kind::Bits(bits) = &mut dest.kind else {
                return;
            };
            for (x, &raw) in (b.x1..b.x2).zip(&row) {
                bits.store_raw(x, y, raw);
            }
        }
    }
}

/// Composite a solid color onto each box of `dest`.
pub fn fill_boxes(op: Operator, dest: &Image, color: Color, boxes: &[Box32]) {
    let src = Image::solid_fill(color);
    for b in boxes.iter().filter(|b| !b.is_empty()) {
        let width = i64::from(b.x2) - i64::from(b.x1);
        let height = i64::from(b.y2) - i64::from(b.y1);
        composite(
            op,
            &src,
            None,
            dest,
            0,
            0,
            0,
            0,
            b.x1,
            b.y1,
            width.min(i64::from(i32::MAX)) as i32,
            height.min(i64::from(i32::MAX)) as i32,
        );
    }
}

/// Composite a solid color onto each rectangle of `dest`.
pub fn fill_rectangles(op: Operator, dest: &Image, color: Color, rects: &[Rectangle32]) {
    let boxes: Vec<Box32> = rects.iter().map(|&r| Box32::from(r)).collect();
    fill_boxes(op, dest, color, &boxes);
}

/// The region of pixels with non-zero alpha.
///
/// Procedural images produce an empty region.
pub fn region_from_image(image: &Image) -> Region {
    let repr = image.0.borrow();
    let Kind::Bits(bits) = &repr.kind else {
        return Region::new();
    };

    let mut boxes: Vec<Box32> = Vec::new();
    // The spans of the previous row and where its boxes start in `boxes`.
    let mut prev: Vec<(i32, i32)> = Vec::new();
    let mut prev_start = 0;
    let mut spans = Vec::new();

    for y in 0..bits.height() as i32 {
        spans.clear();
        let mut start = None;
        for x in 0..=bits.width() as i32 {
            let covered = x < bits.width() as i32 && bits.fetch(x, y).a != 0;
            match (covered, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    spans.push((s, x));
                    start = None;
                }
                _ => {}
            }
        }

        if !spans.is_empty() && spans == prev && boxes.len() - prev_start == prev.len() {
            // Identical spans: grow the previous row's boxes.
            for b in &mut boxes[prev_start..] {
                b.y2 = y + 1;
            }
        } else {
            prev_start = boxes.len();
            boxes.extend(spans.iter().map(|&(x1, x2)| Box32::new(x1, y, x2, y + 1)));
        }
        std::mem::swap(&mut prev, &mut spans);
    }

    Region::from_boxes(&boxes)
}
