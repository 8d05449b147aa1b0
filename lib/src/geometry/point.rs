//! Planar point type.
//!
//! Layer geometry (rims projected to XY, traced outlines, toolpath vertices)
//! is carried as [`PointF`] in millimetres. Raster code works in pixel space
//! with the same type and converts through [`crate::raster::RasterGrid`].

use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A 2D point with floating-point coordinates.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: CoordF,
    pub y: CoordF,
}

/// A vector of points.
pub type PointsF = Vec<PointF>;

impl PointF {
    /// Create a new point.
    #[inline]
    pub const fn new(x: CoordF, y: CoordF) -> Self {
        Self { x, y }
    }

    /// The origin.
    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Dot product treating both points as vectors.
    #[inline]
    pub fn dot(self, other: PointF) -> CoordF {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product treating both points as vectors.
    #[inline]
    pub fn cross(self, other: PointF) -> CoordF {
        self.x * other.y - self.y * other.x
    }

    /// Squared length of the vector.
    #[inline]
    pub fn length_squared(self) -> CoordF {
        self.dot(self)
    }

    /// Length of the vector.
    #[inline]
    pub fn length(self) -> CoordF {
        self.length_squared().sqrt()
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: PointF) -> CoordF {
        (self - other).length_squared()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: PointF) -> CoordF {
        self.distance_squared(other).sqrt()
    }

    /// Scale both coordinates.
    #[inline]
    pub fn scale(self, factor: CoordF) -> PointF {
        PointF::new(self.x * factor, self.y * factor)
    }

    /// Unit-length copy, or zero for the zero vector.
    pub fn normalize(self) -> PointF {
        let len = self.length();
        if len > 0.0 {
            self.scale(1.0 / len)
        } else {
            PointF::zero()
        }
    }

    /// Linear interpolation towards `other`.
    #[inline]
    pub fn lerp(self, other: PointF, t: CoordF) -> PointF {
        PointF::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Squared distance from this point to the segment `a`-`b`.
    pub fn distance_to_segment_squared(self, a: PointF, b: PointF) -> CoordF {
        let ab = b - a;
        let len_sq = ab.length_squared();
        if len_sq == 0.0 {
            return self.distance_squared(a);
        }
        let t = ((self - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        self.distance_squared(a + ab.scale(t))
    }

    /// Distance from this point to the segment `a`-`b`.
    #[inline]
    pub fn distance_to_segment(self, a: PointF, b: PointF) -> CoordF {
        self.distance_to_segment_squared(a, b).sqrt()
    }

    /// True if both coordinates are within `epsilon` of `other`.
    #[inline]
    pub fn approx_eq(self, other: PointF, epsilon: CoordF) -> bool {
        (self.x - other.x).abs() < epsilon && (self.y - other.y).abs() < epsilon
    }
}

impl Add for PointF {
    type Output = PointF;

    #[inline]
    fn add(self, rhs: PointF) -> PointF {
        PointF::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for PointF {
    #[inline]
    fn add_assign(&mut self, rhs: PointF) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for PointF {
    type Output = PointF;

    #[inline]
    fn sub(self, rhs: PointF) -> PointF {
        PointF::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for PointF {
    #[inline]
    fn sub_assign(&mut self, rhs: PointF) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<CoordF> for PointF {
    type Output = PointF;

    #[inline]
    fn mul(self, rhs: CoordF) -> PointF {
        self.scale(rhs)
    }
}

impl Neg for PointF {
    type Output = PointF;

    #[inline]
    fn neg(self) -> PointF {
        PointF::new(-self.x, -self.y)
    }
}

impl From<(CoordF, CoordF)> for PointF {
    #[inline]
    fn from((x, y): (CoordF, CoordF)) -> Self {
        PointF::new(x, y)
    }
}

impl fmt::Debug for PointF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointF({:.4}, {:.4})", self.x, self.y)
    }
}

impl fmt::Display for PointF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_segment() {
        let a = PointF::new(0.0, 0.0);
        let b = PointF::new(10.0, 0.0);

        assert!((PointF::new(5.0, 3.0).distance_to_segment(a, b) - 3.0).abs() < 1e-12);
        // Beyond the endpoint the distance is to the endpoint itself.
        assert!((PointF::new(13.0, 4.0).distance_to_segment(a, b) - 5.0).abs() < 1e-12);
        // Degenerate segment.
        assert!((PointF::new(3.0, 4.0).distance_to_segment(a, a) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_sign() {
        let x = PointF::new(1.0, 0.0);
        let y = PointF::new(0.0, 1.0);
        assert!(x.cross(y) > 0.0);
        assert!(y.cross(x) < 0.0);
    }

    #[test]
    fn test_normalize_and_lerp() {
        let p = PointF::new(0.0, 5.0).normalize();
        assert!(p.approx_eq(PointF::new(0.0, 1.0), 1e-12));
        assert_eq!(PointF::zero().normalize(), PointF::zero());

        let m = PointF::new(0.0, 0.0).lerp(PointF::new(2.0, 4.0), 0.25);
        assert!(m.approx_eq(PointF::new(0.5, 1.0), 1e-12));
    }
}
