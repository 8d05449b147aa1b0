//! Three-dimensional vector arithmetic.
//!
//! [`Vec3`] is used for mesh vertex positions, face normals and the
//! synthesized plane intersection points produced by the slicer. All values
//! are unscaled millimetres in mesh-local space.

use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Index, Mul, Neg, Sub, SubAssign};

/// A 3D point or direction with `f64` components.
#[derive(Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: CoordF,
    pub y: CoordF,
    pub z: CoordF,
}

impl Vec3 {
    /// The origin / zero vector.
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Unit vector along +Z.
    pub const UNIT_Z: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: CoordF, y: CoordF, z: CoordF) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from an `[x, y, z]` array.
    #[inline]
    pub fn from_array(a: [CoordF; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    /// Return the components as an array.
    #[inline]
    pub fn to_array(self) -> [CoordF; 3] {
        [self.x, self.y, self.z]
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Vec3) -> CoordF {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[inline]
    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Squared length.
    #[inline]
    pub fn length_squared(self) -> CoordF {
        self.dot(self)
    }

    /// Euclidean length (distance from the origin).
    #[inline]
    pub fn length(self) -> CoordF {
        self.length_squared().sqrt()
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(self, other: Vec3) -> CoordF {
        (self - other).length()
    }

    /// Scale by a scalar.
    #[inline]
    pub fn scale(self, factor: CoordF) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Return a unit-length copy, or the zero vector if the length is zero.
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len > 0.0 {
            self.scale(1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    /// Rotate about an arbitrary axis through the origin (Rodrigues' formula).
    ///
    /// `angle` is in radians; the axis does not need to be normalized.
    pub fn rotate(self, axis: Vec3, angle: CoordF) -> Vec3 {
        let k = axis.normalize();
        if k == Vec3::ZERO {
            return self;
        }
        let (sin, cos) = angle.sin_cos();
        self.scale(cos) + k.cross(self).scale(sin) + k.scale(k.dot(self) * (1.0 - cos))
    }

    /// Rotate about the Z axis.
    #[inline]
    pub fn rotate_z(self, angle: CoordF) -> Vec3 {
        let (sin, cos) = angle.sin_cos();
        Vec3::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }

    /// Linear interpolation towards `other`.
    #[inline]
    pub fn lerp(self, other: Vec3, t: CoordF) -> Vec3 {
        self + (other - self).scale(t)
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    /// True if all components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec3) {
        *self = *self - rhs;
    }
}

impl Mul<CoordF> for Vec3 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: CoordF) -> Vec3 {
        self.scale(rhs)
    }
}

impl Div<CoordF> for Vec3 {
    type Output = Vec3;

    #[inline]
    fn div(self, rhs: CoordF) -> Vec3 {
        self.scale(1.0 / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Index<usize> for Vec3 {
    type Output = CoordF;

    fn index(&self, index: usize) -> &CoordF {
        match index {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }
}

impl From<[CoordF; 3]> for Vec3 {
    fn from(a: [CoordF; 3]) -> Self {
        Self::from_array(a)
    }
}

impl fmt::Debug for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec3({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}
