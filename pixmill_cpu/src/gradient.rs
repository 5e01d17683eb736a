// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear, radial and conical gradients.

use core::f64::consts::PI;

use pixmill_common::color::{Color, Rgba16};
use pixmill_common::fixed::Fixed;
use pixmill_common::geometry::PointFixed;
use smallvec::SmallVec;

use crate::image::Repeat;
use crate::{Error, Result};

/// A color at an offset along a gradient.
///
/// The color is unpremultiplied. Offsets are nominally in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GradientStop {
    /// The position of the stop.
    pub offset: Fixed,
    /// The color at the stop.
    pub color: Color,
}

impl GradientStop {
    /// Create a new stop.
    pub const fn new(offset: Fixed, color: Color) -> Self {
        Self { offset, color }
    }
}

#[derive(Debug, Clone, Copy)]
struct Stop {
    offset: f64,
    color: [f64; 4],
}

/// Stops ordered by offset. Stops with equal offsets keep their given order, which makes a
/// hard edge.
#[derive(Debug, Clone)]
struct Stops(SmallVec<[Stop; 4]>);

impl Stops {
    fn new(stops: &[GradientStop]) -> Result<Self> {
        if stops.is_empty() {
            return Err(Error::NoGradientStops);
        }

        let mut sorted: SmallVec<[Stop; 4]> = stops
            .iter()
            .map(|s| Stop {
                offset: s.offset.to_f64(),
                color: [s.color.red, s.color.green, s.color.blue, s.color.alpha]
                    .map(|c| f64::from(c) / 65535.0),
            })
            .collect();
        // `sort_by` is stable.
        sorted.sort_by(|a, b| a.offset.total_cmp(&b.offset));

        Ok(Self(sorted))
    }

    /// The premultiplied color at `t`, which must already have the repeat mode applied.
    fn color_at(&self, t: f64) -> Rgba16 {
        // The float to integer casts below saturate NaN to zero.
        debug_assert!(t.is_finite(), "unresolved gradient position {t}");
        let stops = &self.0;
        let i = stops.partition_point(|s| s.offset <= t);
        let color = if i == 0 {
            stops[0].color
        } else if i == stops.len() {
            stops[i - 1].color
        } else {
            let (l, r) = (&stops[i - 1], &stops[i]);
            let span = r.offset - l.offset;
            let f = if span > 0.0 { (t - l.offset) / span } else { 0.0 };
            [0, 1, 2, 3].map(|c| l.color[c] + (r.color[c] - l.color[c]) * f)
        };

        let unit = |v: f64| (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16;
        Color::new(unit(color[0]), unit(color[1]), unit(color[2]), unit(color[3])).premultiply()
    }

    fn sample(&self, t: Option<f64>, repeat: Repeat) -> Rgba16 {
        match t.and_then(|t| apply_repeat(t, repeat)) {
            Some(t) => self.color_at(t),
            None => Rgba16::TRANSPARENT,
        }
    }
}

/// Map a gradient parameter into `[0, 1]`, or `None` where the gradient is transparent.
fn apply_repeat(t: f64, repeat: Repeat) -> Option<f64> {
    if !t.is_finite() {
        return None;
    }

    match repeat {
        Repeat::None => (0.0..=1.0).contains(&t).then_some(t),
        Repeat::Pad => Some(t.clamp(0.0, 1.0)),
        Repeat::Normal => Some(t - t.floor()),
        Repeat::Reflect => {
            let t = t.rem_euclid(2.0);
            Some(if t > 1.0 { 2.0 - t } else { t })
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LinearGradient {
    p1: (f64, f64),
    p2: (f64, f64),
    stops: Stops,
}

impl LinearGradient {
    pub(crate) fn new(p1: PointFixed, p2: PointFixed, stops: &[GradientStop]) -> Result<Self> {
        Ok(Self {
            p1: (p1.x.to_f64(), p1.y.to_f64()),
            p2: (p2.x.to_f64(), p2.y.to_f64()),
            stops: Stops::new(stops)?,
        })
    }

    fn t(&self, x: f64, y: f64) -> Option<f64> {
        let (dx, dy) = (self.p2.0 - self.p1.0, self.p2.1 - self.p1.1);
        let len2 = dx * dx + dy * dy;
        if len2 == 0.0 {
            return None;
        }
        Some(((x - self.p1.0) * dx + (y - self.p1.1) * dy) / len2)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RadialGradient {
    c1: (f64, f64),
    r1: f64,
    c2: (f64, f64),
    r2: f64,
    stops: Stops,
}

impl RadialGradient {
    pub(crate) fn new(
        inner: PointFixed,
        outer: PointFixed,
        inner_radius: Fixed,
        outer_radius: Fixed,
        stops: &[GradientStop],
    ) -> Result<Self> {
        Ok(Self {
            c1: (inner.x.to_f64(), inner.y.to_f64()),
            r1: inner_radius.to_f64(),
            c2: (outer.x.to_f64(), outer.y.to_f64()),
            r2: outer_radius.to_f64(),
            stops: Stops::new(stops)?,
        })
    }

    /// Solve for the largest `t` whose circle passes through the point and has a non-negative
    /// radius. With [`Repeat::None`], `t` must also lie in `[0, 1]`.
    fn t(&self, x: f64, y: f64, repeat: Repeat) -> Option<f64> {
        let (cdx, cdy) = (self.c2.0 - self.c1.0, self.c2.1 - self.c1.1);
        let dr = self.r2 - self.r1;
        let (pdx, pdy) = (x - self.c1.0, y - self.c1.1);

        let a = cdx * cdx + cdy * cdy - dr * dr;
        let b = pdx * cdx + pdy * cdy + self.r1 * dr;
        let c = pdx * pdx + pdy * pdy - self.r1 * self.r1;

        let valid = |t: f64| {
            if repeat == Repeat::None {
                (0.0..=1.0).contains(&t)
            } else {
                self.r1 + t * dr >= 0.0
            }
        };

        if a == 0.0 {
            if b == 0.0 {
                return None;
            }
            let t = c / (2.0 * b);
            return valid(t).then_some(t);
        }

        let discr = b * b - a * c;
        if discr < 0.0 {
            return None;
        }
        let sqrt = discr.sqrt();
        let t0 = (b + sqrt) / a;
        let t1 = (b - sqrt) / a;
        let (hi, lo) = if t0 >= t1 { (t0, t1) } else { (t1, t0) };
        if valid(hi) {
            Some(hi)
        } else if valid(lo) {
            Some(lo)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ConicalGradient {
    center: (f64, f64),
    /// In radians.
    angle: f64,
    stops: Stops,
}

impl ConicalGradient {
    pub(crate) fn new(center: PointFixed, angle: Fixed, stops: &[GradientStop]) -> Result<Self> {
        Ok(Self {
            center: (center.x.to_f64(), center.y.to_f64()),
            angle: angle.to_f64().to_radians(),
            stops: Stops::new(stops)?,
        })
    }

    fn t(&self, x: f64, y: f64) -> f64 {
        let (dx, dy) = (x - self.center.0, y - self.center.1);
        let a = (dy.atan2(dx) + self.angle).rem_euclid(2.0 * PI);
        1.0 - a / (2.0 * PI)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Gradient {
    Linear(LinearGradient),
    Radial(RadialGradient),
    Conical(ConicalGradient),
}

impl Gradient {
    /// The color at a point in gradient space.
    pub(crate) fn color_at(&self, x: f64, y: f64, repeat: Repeat) -> Rgba16 {
        match self {
            Self::Linear(g) => g.stops.sample(g.t(x, y), repeat),
            Self::Radial(g) => g.stops.sample(g.t(x, y, repeat), repeat),
            Self::Conical(g) => g.stops.sample(Some(g.t(x, y)), repeat),
        }
    }
}
