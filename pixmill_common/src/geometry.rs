// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer boxes and fixed-point primitives.

use crate::fixed::Fixed;

/// A half-open integer box spanning `[x1, x2) × [y1, y2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Box32 {
    /// The left edge.
    pub x1: i32,
    /// The top edge.
    pub y1: i32,
    /// The right edge (exclusive).
    pub x2: i32,
    /// The bottom edge (exclusive).
    pub y2: i32,
}

impl Box32 {
    /// Create a new box from its edges.
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Create a box from an origin and a size, saturating at the `i32` range.
    #[inline]
    pub fn from_rect(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: clamp_i64(i64::from(x) + i64::from(width)),
            y2: clamp_i64(i64::from(y) + i64::from(height)),
        }
    }

    /// Whether the box covers no area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    /// The width of the box, zero if it is empty.
    #[inline]
    pub fn width(&self) -> u32 {
        (i64::from(self.x2) - i64::from(self.x1)).max(0) as u32
    }

    /// The height of the box, zero if it is empty.
    #[inline]
    pub fn height(&self) -> u32 {
        (i64::from(self.y2) - i64::from(self.y1)).max(0) as u32
    }

    /// The intersection of two boxes, or `None` if they don't overlap.
    #[inline]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let b = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };

        (!b.is_empty()).then_some(b)
    }

    /// Whether the point `(x, y)` lies inside the box.
    #[inline]
    pub const fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Whether `other` lies entirely inside this box.
    #[inline]
    pub const fn subsumes(&self, other: &Self) -> bool {
        self.x1 <= other.x1 && self.x2 >= other.x2 && self.y1 <= other.y1 && self.y2 >= other.y2
    }

    /// Whether the two boxes share any area.
    #[inline]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.x1 < other.x2 && self.x2 > other.x1 && self.y1 < other.y2 && self.y2 > other.y1
    }

    /// The smallest box containing both boxes.
    #[inline]
    pub fn union_extents(&self, other: &Self) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

impl From<Rectangle32> for Box32 {
    fn from(r: Rectangle32) -> Self {
        Self::from_rect(r.x, r.y, r.width, r.height)
    }
}

#[inline]
pub(crate) fn clamp_i64(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// An integer rectangle given by its origin and size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rectangle32 {
    /// The left edge.
    pub x: i32,
    /// The top edge.
    pub y: i32,
    /// The width.
    pub width: u32,
    /// The height.
    pub height: u32,
}

impl Rectangle32 {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A point in 16.16 fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PointFixed {
    /// The x coordinate.
    pub x: Fixed,
    /// The y coordinate.
    pub y: Fixed,
}

impl PointFixed {
    /// Create a new point.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a point from float coordinates.
    #[inline]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(Fixed::from_f64(x), Fixed::from_f64(y))
    }
}

/// A line segment between two fixed-point points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LineFixed {
    /// The first point.
    pub p1: PointFixed,
    /// The second point.
    pub p2: PointFixed,
}

impl LineFixed {
    /// Create a new line.
    #[inline]
    pub const fn new(p1: PointFixed, p2: PointFixed) -> Self {
        Self { p1, p2 }
    }

    /// The x coordinate where the (infinitely extended) line crosses `y`.
    ///
    /// Horizontal lines return the x coordinate of their first point.
    pub fn x_at(&self, y: Fixed) -> Fixed {
        let x = self.x_at_raw(y.raw().into());
        Fixed(x.clamp(i32::MIN.into(), i32::MAX.into()) as i32)
    }

    /// Like [`LineFixed::x_at`], on raw 16.16 values that may lie outside the `Fixed` range.
    pub fn x_at_raw(&self, y: i64) -> i64 {
        let (x1, y1) = (i64::from(self.p1.x.raw()), i64::from(self.p1.y.raw()));
        let (x2, y2) = (i64::from(self.p2.x.raw()), i64::from(self.p2.y.raw()));
        if y1 == y2 {
            return x1;
        }

        let t = (i128::from(x2 - x1) * i128::from(y - y1)).div_euclid(i128::from(y2 - y1));
        (i128::from(x1) + t).clamp(i64::MIN.into(), i64::MAX.into()) as i64
    }
}

/// A trapezoid with horizontal top and bottom edges, bounded left and right by two lines.
///
/// The lines don't need to end at `top` and `bottom`: they are extended or cut as needed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Trapezoid {
    /// The top edge.
    pub top: Fixed,
    /// The bottom edge.
    pub bottom: Fixed,
    /// The left boundary.
    pub left: LineFixed,
    /// The right boundary.
    pub right: LineFixed,
}

impl Trapezoid {
    /// Whether the trapezoid has a positive height.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.top < self.bottom
            && self.left.p1.y != self.left.p2.y
            && self.right.p1.y != self.right.p2.y
    }
}

/// A horizontal span at height `y`, from `l` to `r`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpanFixed {
    /// The left end.
    pub l: Fixed,
    /// The right end.
    pub r: Fixed,
    /// The height of the span.
    pub y: Fixed,
}

/// A trapezoid given by its top and bottom spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Trap {
    /// The top span.
    pub top: SpanFixed,
    /// The bottom span.
    pub bot: SpanFixed,
}

impl Trap {
    /// Convert into an equivalent [`Trapezoid`].
    pub fn to_trapezoid(&self) -> Trapezoid {
        Trapezoid {
            top: self.top.y,
            bottom: self.bot.y,
            left: LineFixed::new(
                PointFixed::new(self.top.l, self.top.y),
                PointFixed::new(self.bot.l, self.bot.y),
            ),
            right: LineFixed::new(
                PointFixed::new(self.top.r, self.top.y),
                PointFixed::new(self.bot.r, self.bot.y),
            ),
        }
    }
}

/// A triangle in fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Triangle {
    /// The first vertex.
    pub p1: PointFixed,
    /// The second vertex.
    pub p2: PointFixed,
    /// The third vertex.
    pub p3: PointFixed,
}

impl Triangle {
    /// Split the triangle into at most two trapezoids covering the same area.
    pub fn to_trapezoids(&self) -> [Trapezoid; 2] {
        let mut pts = [self.p1, self.p2, self.p3];
        pts.sort_by(|a, b| a.y.cmp(&b.y).then(a.x.cmp(&b.x)));
        let [top, mid, bot] = pts;

        let long = LineFixed::new(top, bot);
        let upper = LineFixed::new(top, mid);
        let lower = LineFixed::new(mid, bot);

        // Decide which side the long edge is on by the sign of the cross product.
        let d = |a: Fixed, b: Fixed| i128::from(a.raw()) - i128::from(b.raw());
        let cross = d(mid.x, top.x) * d(bot.y, top.y) - d(mid.y, top.y) * d(bot.x, top.x);
        let long_is_left = cross > 0;

        let make = |short: LineFixed, t: Fixed, b: Fixed| {
            let (left, right) = if long_is_left {
                (long, short)
            } else {
                (short, long)
            };
            Trapezoid {
                top: t,
                bottom: b,
                left,
                right,
            }
        };

        [make(upper, top.y, mid.y), make(lower, mid.y, bot.y)]
    }
}
