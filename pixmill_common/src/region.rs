// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sets of pixels described by canonical lists of rectangles.
//!
//! A [`Region`] stores its boxes in y-x banded order: boxes are grouped into horizontal bands
//! that share `y1` and `y2`, bands are sorted top to bottom, and boxes within a band are sorted
//! left to right. Every region is kept in canonical form:
//!
//! - no stored box is empty,
//! - boxes within a band never touch or overlap,
//! - vertically adjacent bands never have identical x-extents (they would be merged).
//!
//! Because the form is unique for a given point set, two regions are equal exactly if their
//! box lists are equal.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::geometry::{Box32, Rectangle32};

/// How a rectangle relates to a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Overlap {
    /// The rectangle shares no area with the region.
    Out,
    /// The rectangle lies entirely inside the region.
    In,
    /// The rectangle is partially covered by the region.
    Part,
}

/// A canonical set of non-overlapping rectangles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Region {
    extents: Box32,
    boxes: SmallVec<[Box32; 1]>,
}

impl Region {
    /// Create an empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a region covering a single box. Empty boxes result in an empty region.
    pub fn from_box(b: Box32) -> Self {
        if b.is_empty() {
            return Self::new();
        }

        let mut boxes = SmallVec::new();
        boxes.push(b);
        Self { extents: b, boxes }
    }

    /// Create a region covering the rectangle at `(x, y)` of the given size.
    pub fn from_rect(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::from_box(Box32::from_rect(x, y, width, height))
    }

    /// Create a region from an arbitrary list of boxes.
    ///
    /// The boxes may overlap, touch or be empty and may come in any order. Empty boxes are
    /// dropped and the remainder is brought into canonical form.
    pub fn from_boxes(boxes: &[Box32]) -> Self {
        let mut input: Vec<Box32> = boxes.iter().copied().filter(|b| !b.is_empty()).collect();
        match input.len() {
            0 => return Self::new(),
            1 => return Self::from_box(input[0]),
            _ => {}
        }

        input.sort_unstable_by_key(|b| (b.y1, b.x1));
        let mut ys: Vec<i32> = input.iter().flat_map(|b| [b.y1, b.y2]).collect();
        ys.sort_unstable();
        ys.dedup();

        let mut builder = Builder::default();
        let mut spans: Vec<(i32, i32)> = Vec::new();
        for w in ys.windows(2) {
            let (y1, y2) = (w[0], w[1]);
            spans.clear();
            // Boxes are sorted by `y1`, so everything that can cover this band comes first.
            for b in input.iter().take_while(|b| b.y1 <= y1) {
                if b.y2 > y1 {
                    spans.push((b.x1, b.x2));
                }
            }
            spans.sort_unstable();

            let mut merged: SmallVec<[(i32, i32); 8]> = SmallVec::new();
            for &(x1, x2) in &spans {
                match merged.last_mut() {
                    Some(last) if x1 <= last.1 => last.1 = last.1.max(x2),
                    _ => merged.push((x1, x2)),
                }
            }
            builder.push_band(y1, y2, &merged);
        }

        builder.finish()
    }

    /// Create a region from a list of rectangles, see [`Region::from_boxes`].
    pub fn from_rectangles(rects: &[Rectangle32]) -> Self {
        let boxes: Vec<Box32> = rects.iter().map(|r| Box32::from(*r)).collect();
        Self::from_boxes(&boxes)
    }

    /// The bounding box of the region. Empty regions have an all-zero extents box.
    pub fn extents(&self) -> Box32 {
        self.extents
    }

    /// The boxes of the region in y-x banded order.
    pub fn boxes(&self) -> &[Box32] {
        &self.boxes
    }

    /// The number of boxes.
    pub fn n_rects(&self) -> usize {
        self.boxes.len()
    }

    /// Whether the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Whether the region covers at least one pixel.
    pub fn not_empty(&self) -> bool {
        !self.is_empty()
    }

    /// Make the region empty.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Replace the contents of the region with a single box.
    pub fn reset(&mut self, b: Box32) {
        *self = Self::from_box(b);
    }

    /// The union of two regions.
    pub fn union(&self, other: &Self) -> Self {
        if other.is_empty() || other.subsumed_by_single(self) {
            return self.clone();
        }
        if self.is_empty() || self.subsumed_by_single(other) {
            return other.clone();
        }

        combine(&self.boxes, &other.boxes, |a, b| a || b)
    }

    /// The intersection of two regions.
    pub fn intersect(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() || !self.extents.overlaps(&other.extents) {
            return Self::new();
        }
        if self.boxes.len() == 1 && other.boxes.len() == 1 {
            return self
                .extents
                .intersect(&other.extents)
                .map(Self::from_box)
                .unwrap_or_default();
        }

        combine(&self.boxes, &other.boxes, |a, b| a && b)
    }

    /// The part of this region that isn't covered by `other`.
    pub fn subtract(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() || !self.extents.overlaps(&other.extents) {
            return self.clone();
        }

        combine(&self.boxes, &other.boxes, |a, b| a && !b)
    }

    /// The union of this region with the rectangle at `(x, y)`.
    pub fn union_rect(&self, x: i32, y: i32, width: u32, height: u32) -> Self {
        self.union(&Self::from_rect(x, y, width, height))
    }

    /// The intersection of this region with the rectangle at `(x, y)`.
    pub fn intersect_rect(&self, x: i32, y: i32, width: u32, height: u32) -> Self {
        self.intersect(&Self::from_rect(x, y, width, height))
    }

    /// The part of `inv_box` that isn't covered by this region.
    pub fn inverse(&self, inv_box: &Box32) -> Self {
        Self::from_box(*inv_box).subtract(self)
    }

    /// Whether `other` is a single box that covers all of this region.
    fn subsumed_by_single(&self, other: &Self) -> bool {
        other.boxes.len() == 1 && other.extents.subsumes(&self.extents)
    }

    /// Return the box containing the pixel `(x, y)`, if any.
    pub fn contains_point(&self, x: i32, y: i32) -> Option<Box32> {
        if !self.extents.contains_point(x, y) {
            return None;
        }

        let start = self.boxes.partition_point(|b| b.y2 <= y);
        self.boxes[start..]
            .iter()
            .take_while(|b| b.y1 <= y)
            .find(|b| b.contains_point(x, y))
            .copied()
    }

    /// Determine whether `rect` lies inside, outside or partially inside the region.
    pub fn contains_rectangle(&self, rect: &Box32) -> Overlap {
        if self.is_empty() || rect.is_empty() || !self.extents.overlaps(rect) {
            return Overlap::Out;
        }

        if self.boxes.len() == 1 {
            return if self.extents.subsumes(rect) {
                Overlap::In
            } else {
                Overlap::Part
            };
        }

        let mut part_out = false;
        let mut part_in = false;
        let (mut x, mut y) = (rect.x1, rect.y1);

        let mut i = 0;
        while i < self.boxes.len() {
            if self.boxes[i].y2 <= y {
                // Skip to the first band that can still touch the rectangle.
                i += self.boxes[i..].partition_point(|b| b.y2 <= y);
                if i == self.boxes.len() {
                    break;
                }
            }
            let b = self.boxes[i];
            i += 1;

            if b.y1 > y {
                // Part of the rectangle above this band is uncovered.
                part_out = true;
                if part_in || b.y1 >= rect.y2 {
                    break;
                }
                y = b.y1;
            }

            if b.x2 <= x {
                continue;
            }

            if b.x1 > x {
                part_out = true;
                if part_in {
                    break;
                }
            }

            if b.x1 < rect.x2 {
                part_in = true;
                if part_out {
                    break;
                }
            }

            if b.x2 >= rect.x2 {
                y = b.y2;
                if y >= rect.y2 {
                    break;
                }
                x = rect.x1;
            } else {
                // Boxes in a band are maximal, so the rest of this band is uncovered.
                part_out = true;
                break;
            }
        }

        if part_in {
            if y < rect.y2 {
                Overlap::Part
            } else {
                Overlap::In
            }
        } else {
            Overlap::Out
        }
    }

    /// Move the region by `(dx, dy)`.
    ///
    /// Coordinates are computed at full width. Boxes that end up entirely outside of the
    /// `i32` range are dropped and boxes partially outside are clamped to it.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        if self.is_empty() || (dx == 0 && dy == 0) {
            return;
        }

        let (dx, dy) = (i64::from(dx), i64::from(dy));
        let fits = |v: i64| v >= i64::from(i32::MIN) && v <= i64::from(i32::MAX);
        let e = self.extents;
        if fits(i64::from(e.x1) + dx)
            && fits(i64::from(e.x2) + dx)
            && fits(i64::from(e.y1) + dy)
            && fits(i64::from(e.y2) + dy)
        {
            let shift = |b: &mut Box32| {
                b.x1 = (i64::from(b.x1) + dx) as i32;
                b.x2 = (i64::from(b.x2) + dx) as i32;
                b.y1 = (i64::from(b.y1) + dy) as i32;
                b.y2 = (i64::from(b.y2) + dy) as i32;
            };
            shift(&mut self.extents);
            self.boxes.iter_mut().for_each(shift);
            return;
        }

        log::debug!("region translated out of the 32-bit range, clamping");
        let clamp = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        let moved: Vec<Box32> = self
            .boxes
            .iter()
            .map(|b| Box32 {
                x1: clamp(i64::from(b.x1) + dx),
                x2: clamp(i64::from(b.x2) + dx),
                y1: clamp(i64::from(b.y1) + dy),
                y2: clamp(i64::from(b.y2) + dy),
            })
            .collect();
        *self = Self::from_boxes(&moved);
    }

    /// Check that the region is in canonical form and that its extents are accurate.
    pub fn selfcheck(&self) -> bool {
        let Some(first) = self.boxes.first() else {
            return self.extents == Box32::default();
        };

        let mut extents = *first;
        let mut prev_band: &[Box32] = &[];
        let mut i = 0;
        while i < self.boxes.len() {
            let head = self.boxes[i];
            let len = self.boxes[i..]
                .iter()
                .take_while(|b| b.y1 == head.y1)
                .count();
            let band = &self.boxes[i..i + len];

            for pair in band.windows(2) {
                if pair[0].x2 >= pair[1].x1 {
                    return false;
                }
            }
            for b in band {
                if b.is_empty() || b.y2 != head.y2 {
                    return false;
                }
                extents = extents.union_extents(b);
            }

            if let Some(p) = prev_band.first() {
                if p.y2 > head.y1 {
                    return false;
                }
                if p.y2 == head.y1 && same_spans(prev_band, band) {
                    return false;
                }
            }

            prev_band = band;
            i += len;
        }

        extents == self.extents
    }
}

fn same_spans(a: &[Box32], b: &[Box32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.x1 == b.x1 && a.x2 == b.x2)
}

/// The boxes of the band of `boxes` that covers the scanline `y`, advancing `idx` past bands
/// that end above it.
fn band_at<'a>(boxes: &'a [Box32], idx: &mut usize, y: i32) -> &'a [Box32] {
    while *idx < boxes.len() && boxes[*idx].y2 <= y {
        *idx += 1;
    }

    let rest = &boxes[*idx..];
    match rest.first() {
        Some(head) if head.y1 <= y => {
            let len = rest.iter().take_while(|b| b.y1 == head.y1).count();
            &rest[..len]
        }
        _ => &[],
    }
}

/// Run the band sweep over two canonical box lists, keeping the pixels for which `keep`
/// returns true given their membership in `a` and `b`.
fn combine(a: &[Box32], b: &[Box32], keep: impl Fn(bool, bool) -> bool) -> Region {
    let mut ys: Vec<i32> = a.iter().chain(b).flat_map(|b| [b.y1, b.y2]).collect();
    ys.sort_unstable();
    ys.dedup();

    let mut builder = Builder::default();
    let (mut ia, mut ib) = (0, 0);
    let mut xs: Vec<i32> = Vec::new();
    let mut spans: SmallVec<[(i32, i32); 8]> = SmallVec::new();

    for w in ys.windows(2) {
        let (y1, y2) = (w[0], w[1]);
        let band_a = band_at(a, &mut ia, y1);
        let band_b = band_at(b, &mut ib, y1);

        xs.clear();
        xs.extend(band_a.iter().chain(band_b).flat_map(|b| [b.x1, b.x2]));
        xs.sort_unstable();
        xs.dedup();

        spans.clear();
        let (mut ja, mut jb) = (0, 0);
        for xw in xs.windows(2) {
            let (x1, x2) = (xw[0], xw[1]);
            while ja < band_a.len() && band_a[ja].x2 <= x1 {
                ja += 1;
            }
            while jb < band_b.len() && band_b[jb].x2 <= x1 {
                jb += 1;
            }
            let in_a = band_a.get(ja).is_some_and(|b| b.x1 <= x1);
            let in_b = band_b.get(jb).is_some_and(|b| b.x1 <= x1);

            if keep(in_a, in_b) {
                match spans.last_mut() {
                    Some(last) if last.1 == x1 => last.1 = x2,
                    _ => spans.push((x1, x2)),
                }
            }
        }

        builder.push_band(y1, y2, &spans);
    }

    builder.finish()
}

/// Accumulates bands top to bottom, coalescing each with the previous one when possible.
#[derive(Default)]
struct Builder {
    boxes: SmallVec<[Box32; 1]>,
    cur_band: usize,
}

impl Builder {
    fn push_band(&mut self, y1: i32, y2: i32, spans: &[(i32, i32)]) {
        if spans.is_empty() {
            return;
        }

        let prev = &mut self.boxes[self.cur_band..];
        let can_coalesce = prev.first().is_some_and(|p| p.y2 == y1)
            && prev.len() == spans.len()
            && prev
                .iter()
                .zip(spans)
                .all(|(b, &(x1, x2))| b.x1 == x1 && b.x2 == x2);

        if can_coalesce {
            prev.iter_mut().for_each(|b| b.y2 = y2);
            return;
        }

        self.cur_band = self.boxes.len();
        self.boxes
            .extend(spans.iter().map(|&(x1, x2)| Box32::new(x1, y1, x2, y2)));
    }

    fn finish(self) -> Region {
        let Some(first) = self.boxes.first() else {
            return Region::new();
        };

        let mut extents = *first;
        for b in &self.boxes {
            extents = extents.union_extents(b);
        }

        Region {
            extents,
            boxes: self.boxes,
        }
    }
}
