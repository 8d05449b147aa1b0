//! Depth-buffered projection of overhanging faces for support.
//!
//! For a layer at height `z`, every downward-facing triangle above the layer
//! is clipped to the half-space above `z + gap` and scan-converted into a
//! depth buffer that keeps the lowest surface per pixel. A pixel needs support
//! when that lowest surface is an overhang.

use super::{LayerRaster, RasterGrid};
use crate::geometry::{PointF, Vec3};
use crate::mesh::HalfEdgeMesh;
use crate::CoordF;
use log::debug;

/// Normals with a smaller downward component are treated as vertical walls.
const MIN_DOWNWARD: f64 = 1e-9;

#[derive(Debug, Clone)]
struct DownFace {
    corners: [Vec3; 3],
    normal: Vec3,
    z_max: CoordF,
    overhang: bool,
}

/// Support footprint generator for one mesh.
#[derive(Debug, Clone)]
pub struct SupportProjector {
    grid: RasterGrid,
    /// Downward-facing triangles sorted by their highest corner.
    faces: Vec<DownFace>,
}

impl SupportProjector {
    /// Collect the downward faces of `mesh`.
    ///
    /// A face is an overhang when its plane deviates from vertical by more
    /// than `angle` degrees.
    pub fn new(mesh: &HalfEdgeMesh, grid: RasterGrid, angle: CoordF) -> Self {
        let mut faces: Vec<DownFace> = mesh
            .triangle_ids()
            .filter_map(|t| {
                let corners = mesh.vertex_positions(t);
                let normal = (corners[1] - corners[0])
                    .cross(corners[2] - corners[0])
                    .normalize();
                if normal.z >= -MIN_DOWNWARD {
                    return None;
                }
                let deviation = (-normal.z).min(1.0).asin().to_degrees();
                Some(DownFace {
                    corners,
                    normal,
                    z_max: corners.iter().map(|c| c.z).fold(f64::MIN, f64::max),
                    overhang: deviation > angle,
                })
            })
            .collect();
        faces.sort_by(|a, b| a.z_max.total_cmp(&b.z_max));
        debug!(
            "Support projector: {} downward faces, {} overhangs",
            faces.len(),
            faces.iter().filter(|f| f.overhang).count()
        );
        Self { grid, faces }
    }

    /// Number of overhanging faces.
    pub fn overhang_count(&self) -> usize {
        self.faces.iter().filter(|f| f.overhang).count()
    }

    /// Pixels at height `z` whose nearest downward surface strictly above
    /// `z + gap` is an overhang.
    pub fn support_at(&self, z: CoordF, gap: CoordF) -> LayerRaster {
        let z_top = z + gap;
        let (w, h) = (self.grid.width, self.grid.height);
        let mut depth = vec![f64::INFINITY; w * h];
        let mut overhang = vec![false; w * h];

        let first = self.faces.partition_point(|f| f.z_max <= z_top);
        for face in &self.faces[first..] {
            let clipped = clip_above(&face.corners, z_top);
            if clipped.len() < 3 {
                continue;
            }
            let poly: Vec<PointF> = clipped
                .iter()
                .map(|p| self.grid.world_to_pixel(PointF::new(p.x, p.y)))
                .collect();
            let origin = face.corners[0];
            let n = face.normal;

            scan_convex(&poly, w, h, |x, y| {
                let c = self.grid.pixel_center(x, y);
                let pz = origin.z - (n.x * (c.x - origin.x) + n.y * (c.y - origin.y)) / n.z;
                let i = y * w + x;
                if pz > z_top && pz < depth[i] {
                    depth[i] = pz;
                    overhang[i] = face.overhang;
                }
            });
        }

        let mut out = LayerRaster::new(self.grid);
        for y in 0..h {
            for x in 0..w {
                if overhang[y * w + x] {
                    out.set(x, y, true);
                }
            }
        }
        out
    }
}

/// Sutherland-Hodgman clip of a triangle to `z > z_top`.
fn clip_above(tri: &[Vec3; 3], z_top: CoordF) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let a_in = a.z > z_top;
        let b_in = b.z > z_top;
        if a_in {
            out.push(a);
        }
        if a_in != b_in {
            let t = (z_top - a.z) / (b.z - a.z);
            out.push(a.lerp(b, t));
        }
    }
    out
}

/// Visit the pixels whose centers fall inside a convex polygon given in
/// pixel coordinates.
fn scan_convex(poly: &[PointF], w: usize, h: usize, mut visit: impl FnMut(usize, usize)) {
    let y_min = poly.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let y_max = poly.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let first = (y_min - 0.5).ceil().max(0.0) as usize;
    let last = ((y_max - 0.5).ceil() - 1.0).min(h as f64 - 1.0);
    if last < first as f64 {
        return;
    }
    for y in first..=last as usize {
        let yc = y as f64 + 0.5;
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for (i, &a) in poly.iter().enumerate() {
            let b = poly[(i + 1) % poly.len()];
            if (a.y <= yc) != (b.y <= yc) {
                let x = a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y);
                lo = lo.min(x);
                hi = hi.max(x);
            }
        }
        if lo >= hi {
            continue;
        }
        let x0 = (lo - 0.5).ceil().max(0.0) as usize;
        let x1 = (hi - 0.5).ceil().min(w as f64).max(0.0) as usize;
        for x in x0..x1 {
            visit(x, y);
        }
    }
}
