//! Geometry primitives for the slicer.
//!
//! This module provides the fundamental geometric types used throughout the slicing pipeline:
//! - [`Vec3`] - 3D point/vector arithmetic for mesh space
//! - [`PointF`] - 2D points for layer space (millimetres or pixels)
//! - [`Polyline`] - Ordered point runs; closed loops repeat their first point
//! - [`BoundingBoxF`] and [`BoundingBox3F`] - Axis-aligned bounding boxes
//!
//! ## Coordinate System
//!
//! Mesh and layer geometry are unscaled `f64` millimetres. There is no
//! integer scaling: all boolean work on layers happens in the raster, so
//! vector geometry only needs to be accurate, not exact.

mod bounding_box;
mod point;
pub mod polyline;
pub mod simplify;
mod vec3;

pub use bounding_box::{BoundingBox3F, BoundingBoxF};
pub use point::{PointF, PointsF};
pub use polyline::{signed_area, Polyline, Polylines};
pub use simplify::{
    douglas_peucker, douglas_peucker_ring, remove_collinear_points, remove_duplicate_points,
    simplify_polyline, COLLINEARITY_THRESHOLD,
};
pub use vec3::Vec3;

use crate::CoordF;

/// Orientation of three points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Counter-clockwise (left turn)
    CounterClockwise,
    /// Clockwise (right turn)
    Clockwise,
    /// Collinear (no turn)
    Collinear,
}

/// Determine the orientation of three points.
pub fn orientation(p1: PointF, p2: PointF, p3: PointF) -> Orientation {
    let cross = (p2 - p1).cross(p3 - p2);
    if cross > 0.0 {
        Orientation::CounterClockwise
    } else if cross < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Check if a value is approximately equal to another within epsilon.
#[inline]
pub fn approx_eq(a: CoordF, b: CoordF, epsilon: CoordF) -> bool {
    (a - b).abs() < epsilon
}
