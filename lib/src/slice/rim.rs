//! Rims: the polygons where a cutting plane meets the mesh surface.

use crate::geometry::{signed_area, BoundingBoxF, PointF, Polyline, Vec3};
use crate::CoordF;

/// One synthesized intersection point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RimVertex {
    pub position: Vec3,
    pub uv: PointF,
}

impl RimVertex {
    /// Position projected onto the XY plane.
    #[inline]
    pub fn xy(&self) -> PointF {
        PointF::new(self.position.x, self.position.y)
    }
}

/// An ordered loop of intersection points at one z.
///
/// A closed rim does not repeat its first vertex. An open rim is what is left
/// when the walk hit a hole in the mesh; consumers close it implicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rim {
    pub vertices: Vec<RimVertex>,
    pub closed: bool,
}

impl Rim {
    /// Whether the walk returned to its start triangle.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True if the rim has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// XY ring of the rim (no repeated closing point).
    pub fn to_polygon(&self) -> Vec<PointF> {
        self.vertices.iter().map(RimVertex::xy).collect()
    }

    /// Closed polyline of the rim in XY.
    pub fn to_polyline(&self) -> Polyline {
        Polyline::closed_from_ring(self.to_polygon())
    }

    /// Signed XY area; positive for counter-clockwise rims.
    pub fn area(&self) -> CoordF {
        signed_area(&self.to_polygon())
    }

    /// XY bounding box.
    pub fn bounding_box(&self) -> BoundingBoxF {
        BoundingBoxF::from_points(&self.to_polygon())
    }

    /// Reverse the traversal direction.
    pub fn reverse(&mut self) {
        self.vertices.reverse();
    }
}
