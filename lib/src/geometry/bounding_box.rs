//! Axis-aligned bounding boxes in 2D and 3D.

use super::{PointF, Vec3};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box. An empty box has `defined == false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBoxF {
    pub min: PointF,
    pub max: PointF,
    pub defined: bool,
}

impl BoundingBoxF {
    /// Create an empty (undefined) bounding box.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bounding box from its corners.
    pub fn from_corners(min: PointF, max: PointF) -> Self {
        Self {
            min,
            max,
            defined: true,
        }
    }

    /// Bounding box of a set of points.
    pub fn from_points(points: &[PointF]) -> Self {
        let mut bb = Self::new();
        for &p in points {
            bb.merge_point(p);
        }
        bb
    }

    /// Grow the box to include `p`.
    pub fn merge_point(&mut self, p: PointF) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    /// Grow the box to include another box.
    pub fn merge(&mut self, other: &BoundingBoxF) {
        if other.defined {
            self.merge_point(other.min);
            self.merge_point(other.max);
        }
    }

    /// Width (x extent).
    pub fn width(&self) -> CoordF {
        if self.defined {
            self.max.x - self.min.x
        } else {
            0.0
        }
    }

    /// Height (y extent).
    pub fn height(&self) -> CoordF {
        if self.defined {
            self.max.y - self.min.y
        } else {
            0.0
        }
    }

    /// Center point.
    pub fn center(&self) -> PointF {
        self.min.lerp(self.max, 0.5)
    }

    /// True if `p` lies inside or on the boundary.
    pub fn contains(&self, p: PointF) -> bool {
        self.defined && p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// A 3D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3F {
    pub min: Vec3,
    pub max: Vec3,
    pub defined: bool,
}

impl BoundingBox3F {
    /// Create an empty (undefined) bounding box.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the box to include `p`.
    pub fn merge_point(&mut self, p: Vec3) {
        if self.defined {
            self.min = self.min.min(p);
            self.max = self.max.max(p);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    /// Size along each axis (zero for an empty box).
    pub fn size(&self) -> Vec3 {
        if self.defined {
            self.max - self.min
        } else {
            Vec3::ZERO
        }
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        self.min.lerp(self.max, 0.5)
    }

    /// Shift the box by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        if self.defined {
            self.min += offset;
            self.max += offset;
        }
    }

    /// Project onto the XY plane.
    pub fn to_2d(&self) -> BoundingBoxF {
        if !self.defined {
            return BoundingBoxF::new();
        }
        BoundingBoxF::from_corners(
            PointF::new(self.min.x, self.min.y),
            PointF::new(self.max.x, self.max.y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_merge() {
        let mut bb = BoundingBoxF::new();
        assert!(!bb.defined);
        assert_eq!(bb.width(), 0.0);

        bb.merge_point(PointF::new(1.0, 2.0));
        bb.merge_point(PointF::new(-1.0, 5.0));
        assert!(bb.defined);
        assert!((bb.width() - 2.0).abs() < 1e-12);
        assert!((bb.height() - 3.0).abs() < 1e-12);
        assert!(bb.contains(PointF::new(0.0, 3.0)));
        assert!(!bb.contains(PointF::new(2.0, 3.0)));
    }

    #[test]
    fn test_bounding_box_3d() {
        let mut bb = BoundingBox3F::new();
        bb.merge_point(Vec3::new(0.0, 0.0, 0.0));
        bb.merge_point(Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(bb.size(), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(bb.center(), Vec3::new(1.0, 2.0, 3.0));

        bb.translate(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(bb.min, Vec3::new(1.0, 1.0, 1.0));

        let flat = bb.to_2d();
        assert!((flat.width() - 2.0).abs() < 1e-12);
    }
}
