// Copyright 2025 the Pixmill Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projective transforms in fixed and floating point.
//!
//! A [`Transform`] is a 3×3 matrix of 16.16 values. Points are mapped with 48.16
//! intermediates and the projective division is only performed if the bottom row is not
//! `(0, 0, 1)`, so that affine transforms produce exactly the same results on every platform.

use crate::fixed::{saturate_i64, Fixed};
use crate::geometry::{Box32, PointFixed};

/// A 3×3 fixed-point projective transform, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transform {
    /// The matrix rows.
    pub matrix: [[Fixed; 3]; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

const FIXED_RANGE: f64 = 32767.0;

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        matrix: [
            [Fixed::ONE, Fixed::ZERO, Fixed::ZERO],
            [Fixed::ZERO, Fixed::ONE, Fixed::ZERO],
            [Fixed::ZERO, Fixed::ZERO, Fixed::ONE],
        ],
    };

    /// Create a transform from its rows.
    pub const fn new(matrix: [[Fixed; 3]; 3]) -> Self {
        Self { matrix }
    }

    /// Create a scaling transform.
    pub const fn from_scale(sx: Fixed, sy: Fixed) -> Self {
        Self::new([
            [sx, Fixed::ZERO, Fixed::ZERO],
            [Fixed::ZERO, sy, Fixed::ZERO],
            [Fixed::ZERO, Fixed::ZERO, Fixed::ONE],
        ])
    }

    /// Create a translation.
    pub const fn from_translate(tx: Fixed, ty: Fixed) -> Self {
        Self::new([
            [Fixed::ONE, Fixed::ZERO, tx],
            [Fixed::ZERO, Fixed::ONE, ty],
            [Fixed::ZERO, Fixed::ZERO, Fixed::ONE],
        ])
    }

    /// Create a rotation from the cosine and sine of the angle.
    pub fn from_rotate(cos: Fixed, sin: Fixed) -> Self {
        Self::new([
            [cos, -sin, Fixed::ZERO],
            [sin, cos, Fixed::ZERO],
            [Fixed::ZERO, Fixed::ZERO, Fixed::ONE],
        ])
    }

    /// Convert a floating point matrix, returning `None` if any entry doesn't fit in 16.16.
    pub fn from_f64_matrix(m: &[[f64; 3]; 3]) -> Option<Self> {
        let mut out = Self::IDENTITY;
        for (row_out, row) in out.matrix.iter_mut().zip(m) {
            for (v_out, v) in row_out.iter_mut().zip(row) {
                if !v.is_finite() || *v < -FIXED_RANGE || *v > FIXED_RANGE {
                    return None;
                }
                *v_out = Fixed::from_f64(*v);
            }
        }

        Some(out)
    }

    /// Whether this is the identity transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Whether the bottom row is `(0, 0, 1)`.
    pub fn is_affine(&self) -> bool {
        let m = &self.matrix;
        m[2][0] == Fixed::ZERO && m[2][1] == Fixed::ZERO && m[2][2] == Fixed::ONE
    }

    /// Whether the transform only scales and translates.
    pub fn is_scale(&self) -> bool {
        let m = &self.matrix;
        m[0][1] == Fixed::ZERO && m[1][0] == Fixed::ZERO && self.is_affine()
    }

    /// Whether the transform is a translation by whole pixels.
    pub fn is_int_translate(&self) -> bool {
        let m = &self.matrix;
        m[0][0] == Fixed::ONE
            && m[1][1] == Fixed::ONE
            && self.is_scale()
            && m[0][2].frac() == Fixed::ZERO
            && m[1][2].frac() == Fixed::ZERO
    }

    /// Compute `self × other`, returning `None` on overflow.
    ///
    /// Applying the result to a point is the same as applying `other` and then `self`.
    pub fn multiply(&self, other: &Self) -> Option<Self> {
        let mut out = Self::IDENTITY;
        for dy in 0..3 {
            for dx in 0..3 {
                let mut v = 0_i64;
                for o in 0..3 {
                    let partial = i64::from(self.matrix[dy][o].raw())
                        * i64::from(other.matrix[o][dx].raw());
                    v += (partial + 0x8000) >> 16;
                }
                if v > i64::from(i32::MAX) || v < i64::from(i32::MIN) {
                    return None;
                }
                out.matrix[dy][dx] = Fixed(v as i32);
            }
        }

        Some(out)
    }

    /// The inverse transform, or `None` if the matrix is singular or the inverse doesn't
    /// fit in 16.16.
    pub fn invert(&self) -> Option<Self> {
        let inv = FTransform::from(*self).invert()?;
        Self::from_f64_matrix(&inv.m)
    }

    /// Map a homogeneous point, returning the 48.16 result before projective division.
    pub fn transform_point_3d(&self, x: Fixed, y: Fixed, w: Fixed) -> [i64; 3] {
        let v = [i64::from(x.raw()), i64::from(y.raw()), i64::from(w.raw())];
        let mut out = [0_i64; 3];
        for (o, row) in out.iter_mut().zip(&self.matrix) {
            let mut acc = 0_i128;
            for (m, c) in row.iter().zip(&v) {
                acc += i128::from(m.raw()) * i128::from(*c);
            }
            *o = ((acc + 0x8000) >> 16) as i64;
        }

        out
    }

    /// Map a point, returning `None` if it maps to infinity or outside of the 16.16 range.
    pub fn transform_point(&self, p: PointFixed) -> Option<PointFixed> {
        let [x, y, w] = self.transform_point_3d(p.x, p.y, Fixed::ONE);

        if self.is_affine() {
            return in_range(x, y);
        }

        if w == 0 {
            return None;
        }

        let div = |v: i64| {
            let q = (i128::from(v) << 16) / i128::from(w);
            q.clamp(i64::MIN.into(), i64::MAX.into()) as i64
        };
        in_range(div(x), div(y))
    }

    /// The integer bounds of `b` after transformation.
    ///
    /// Returns `None` if any corner can't be mapped.
    pub fn bounds(&self, b: &Box32) -> Option<Box32> {
        let corners = [(b.x1, b.y1), (b.x2, b.y1), (b.x1, b.y2), (b.x2, b.y2)];
        let mut out: Option<Box32> = None;

        for (x, y) in corners {
            let p = self.transform_point(PointFixed::new(Fixed::from_int(x), Fixed::from_int(y)))?;
            let (x1, y1) = (p.x.to_int(), p.y.to_int());
            let (x2, y2) = (p.x.ceil().to_int(), p.y.ceil().to_int());
            let corner = Box32::new(x1, y1, x2, y2);
            out = Some(match out {
                Some(o) => o.union_extents(&corner),
                None => corner,
            });
        }

        out
    }
}

fn in_range(x: i64, y: i64) -> Option<PointFixed> {
    let fits = |v: i64| v >= i64::from(i32::MIN) && v <= i64::from(i32::MAX);
    (fits(x) && fits(y)).then(|| PointFixed::new(Fixed(saturate_i64(x)), Fixed(saturate_i64(y))))
}

/// A 3×3 floating point projective transform, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FTransform {
    /// The matrix rows.
    pub m: [[f64; 3]; 3],
}

impl Default for FTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FTransform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Compute `self × other`.
    pub fn multiply(&self, other: &Self) -> Self {
        let mut out = Self::IDENTITY;
        for dy in 0..3 {
            for dx in 0..3 {
                out.m[dy][dx] = (0..3).map(|o| self.m[dy][o] * other.m[o][dx]).sum();
            }
        }

        out
    }

    /// The inverse transform, or `None` if the matrix is singular.
    pub fn invert(&self) -> Option<Self> {
        let m = &self.m;
        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };

        let det = m[0][0] * cofactor(1, 2, 1, 2) - m[0][1] * cofactor(1, 2, 0, 2)
            + m[0][2] * cofactor(1, 2, 0, 1);
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let adj = [
            [
                cofactor(1, 2, 1, 2),
                -cofactor(0, 2, 1, 2),
                cofactor(0, 1, 1, 2),
            ],
            [
                -cofactor(1, 2, 0, 2),
                cofactor(0, 2, 0, 2),
                -cofactor(0, 1, 0, 2),
            ],
            [
                cofactor(1, 2, 0, 1),
                -cofactor(0, 2, 0, 1),
                cofactor(0, 1, 0, 1),
            ],
        ];

        let mut out = Self::IDENTITY;
        for (row_out, row) in out.m.iter_mut().zip(adj) {
            for (v_out, v) in row_out.iter_mut().zip(row) {
                *v_out = v / det;
            }
        }

        Some(out)
    }

    /// Map a point, returning `None` if it maps to infinity.
    pub fn point(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.m;
        let tx = m[0][0] * x + m[0][1] * y + m[0][2];
        let ty = m[1][0] * x + m[1][1] * y + m[1][2];
        let w = m[2][0] * x + m[2][1] * y + m[2][2];

        (w != 0.0).then(|| (tx / w, ty / w))
    }
}

impl From<Transform> for FTransform {
    fn from(t: Transform) -> Self {
        let mut out = Self::IDENTITY;
        for (row_out, row) in out.m.iter_mut().zip(t.matrix) {
            for (v_out, v) in row_out.iter_mut().zip(row) {
                *v_out = v.to_f64();
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::{FTransform, Transform};
    use crate::fixed::Fixed;
    use crate::geometry::{Box32, PointFixed};

    #[test]
    fn identity_maps_points_unchanged() {
        let p = PointFixed::from_f64(3.5, -7.25);
        assert_eq!(Transform::IDENTITY.transform_point(p), Some(p));
        assert!(Transform::IDENTITY.is_int_translate());
    }

    #[test]
    fn scale_inverse() {
        let t = Transform::from_scale(Fixed::from_int(2), Fixed::from_int(4));
        let inv = t.invert().unwrap();
        assert_eq!(
            inv,
            Transform::from_scale(Fixed::from_f64(0.5), Fixed::from_f64(0.25))
        );
        assert_eq!(t.multiply(&inv), Some(Transform::IDENTITY));
    }

    #[test]
    fn singular_has_no_inverse() {
        let t = Transform::from_scale(Fixed::ZERO, Fixed::ONE);
        assert_eq!(t.invert(), None);
    }

    #[test]
    fn projective_point_at_infinity() {
        let mut t = Transform::IDENTITY;
        t.matrix[2][0] = Fixed::ONE;
        t.matrix[2][2] = Fixed::ZERO;
        assert!(!t.is_affine());
        assert_eq!(t.transform_point(PointFixed::from_f64(0.0, 5.0)), None);
        assert_eq!(
            t.transform_point(PointFixed::from_f64(2.0, 4.0)),
            Some(PointFixed::from_f64(1.0, 2.0))
        );
    }

    #[test]
    fn translate_bounds() {
        let t = Transform::from_translate(Fixed::from_f64(0.5), Fixed::from_int(-3));
        assert_eq!(
            t.bounds(&Box32::new(0, 0, 10, 10)),
            Some(Box32::new(0, -3, 11, 7))
        );
    }

    #[test]
    fn ftransform_round_trip() {
        let t = FTransform {
            m: [[2.0, 1.0, 3.0], [0.0, 1.0, -2.0], [0.0, 0.0, 1.0]],
        };
        let inv = t.invert().unwrap();
        let (x, y) = t.point(1.0, 1.0).unwrap();
        let (bx, by) = inv.point(x, y).unwrap();
        let close = |a: f64| a > 1.0 - 1e-12 && a < 1.0 + 1e-12;
        assert!(close(bx) && close(by));
    }
}
