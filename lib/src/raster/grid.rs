//! Mapping between world millimetres and raster pixels.

use crate::geometry::PointF;
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// Placement and resolution of a layer raster over the build plate.
///
/// Pixel `(i, j)` covers the world square
/// `origin + [i, i+1) × [j, j+1) × pixel_size`; row 0 is at the lowest y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    pub origin: PointF,
    pub pixel_size: CoordF,
    pub width: usize,
    pub height: usize,
}

impl RasterGrid {
    /// Create a grid.
    pub fn new(origin: PointF, pixel_size: CoordF, width: usize, height: usize) -> Self {
        Self {
            origin,
            pixel_size,
            width,
            height,
        }
    }

    /// Grid covering a build plate, with `resolution` pixels along its longer side.
    pub fn for_bed(origin: PointF, size_x: CoordF, size_y: CoordF, resolution: u32) -> Self {
        let pixel_size = size_x.max(size_y) / resolution.max(1) as CoordF;
        let width = (size_x / pixel_size - 1e-9).ceil().max(1.0) as usize;
        let height = (size_y / pixel_size - 1e-9).ceil().max(1.0) as usize;
        Self::new(origin, pixel_size, width, height)
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Convert a physical distance to pixels.
    #[inline]
    pub fn mm_to_px(&self, distance: CoordF) -> CoordF {
        distance / self.pixel_size
    }

    /// Convert a pixel distance to millimetres.
    #[inline]
    pub fn px_to_mm(&self, distance: CoordF) -> CoordF {
        distance * self.pixel_size
    }

    /// World point to continuous pixel coordinates.
    #[inline]
    pub fn world_to_pixel(&self, p: PointF) -> PointF {
        (p - self.origin).scale(1.0 / self.pixel_size)
    }

    /// Continuous pixel coordinates to world point.
    #[inline]
    pub fn pixel_to_world(&self, p: PointF) -> PointF {
        self.origin + p.scale(self.pixel_size)
    }

    /// World position of the center of pixel `(i, j)`.
    #[inline]
    pub fn pixel_center(&self, i: usize, j: usize) -> PointF {
        self.pixel_to_world(PointF::new(i as CoordF + 0.5, j as CoordF + 0.5))
    }

    /// Pixel containing a world point, if it lies on the grid.
    pub fn pixel_at(&self, p: PointF) -> Option<(usize, usize)> {
        let q = self.world_to_pixel(p);
        if q.x < 0.0 || q.y < 0.0 {
            return None;
        }
        let (i, j) = (q.x.floor() as usize, q.y.floor() as usize);
        (i < self.width && j < self.height).then_some((i, j))
    }

    /// Area of one pixel (mm²).
    #[inline]
    pub fn pixel_area(&self) -> CoordF {
        self.pixel_size * self.pixel_size
    }
}
