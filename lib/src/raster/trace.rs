//! Outline tracing.
//!
//! Boundaries are followed along the pixel lattice, simplified to a polygon,
//! smoothed into a mix of corners and cubic Bézier segments, and finally
//! flattened back to polylines. Only polylines leave this module.
//!
//! Path following and the corner/curve decision follow potrace. The polygon
//! step uses Douglas-Peucker instead of potrace's optimal polygon.

use super::LayerRaster;
use crate::geometry::{douglas_peucker_ring, remove_collinear_points, PointF, Polyline, Polylines};
use crate::{CoordF, Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// How to resolve a lattice vertex where two set pixels touch diagonally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnPolicy {
    /// Prefer the colour that is locally less common.
    #[default]
    Minority,
    /// Prefer the colour that is locally more common.
    Majority,
    /// Always turn left (diagonal pixels stay separate).
    Left,
    /// Always turn right (diagonal pixels are joined).
    Right,
}

/// Tracing parameters. Lengths are in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceParams {
    pub turn_policy: TurnPolicy,
    /// Paths enclosing this many pixels or fewer are dropped.
    pub turd_size: u32,
    /// Corner threshold; larger values give smoother output, 4/3 gives no corners.
    pub alpha_max: f64,
    /// Maximum deviation of the simplified polygon from the pixel outline.
    pub curve_tolerance: f64,
    /// Maximum deviation of a flattened curve from the Bézier.
    pub flatten_tolerance: f64,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            turn_policy: TurnPolicy::Minority,
            turd_size: 2,
            alpha_max: 1.0,
            curve_tolerance: 0.5,
            flatten_tolerance: 0.01,
        }
    }
}

impl TraceParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha_max >= 0.0 && self.alpha_max.is_finite()) {
            return Err(Error::Config("Trace alpha_max must be non-negative".into()));
        }
        if !(self.curve_tolerance >= 0.0 && self.curve_tolerance.is_finite()) {
            return Err(Error::Config(
                "Trace curve tolerance must be non-negative".into(),
            ));
        }
        if !(self.flatten_tolerance > 0.0 && self.flatten_tolerance.is_finite()) {
            return Err(Error::Config(
                "Trace flatten tolerance must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Maximum subdivision depth when flattening a cubic.
const MAX_FLATTEN_DEPTH: u32 = 16;

/// A closed lattice path.
struct LatticePath {
    points: Vec<(i64, i64)>,
    area: i64,
    /// True when the path encloses set pixels of the source raster.
    positive: bool,
}

impl LayerRaster {
    /// Trace the outlines of the set regions into closed world polylines.
    ///
    /// Outer boundaries come out counter-clockwise and holes clockwise.
    pub fn trace_to_polylines(&self, params: &TraceParams) -> Polylines {
        let grid = *self.grid();
        let mut out = Polylines::new();
        for path in decompose(self, params) {
            let ring: Vec<PointF> = path
                .points
                .iter()
                .map(|&(x, y)| PointF::new(x as f64, y as f64))
                .collect();
            let mut ring = douglas_peucker_ring(&ring, params.curve_tolerance);
            if ring.len() < 3 {
                continue;
            }
            if !path.positive {
                ring.reverse();
            }
            let smooth = smooth_ring(&ring, params.alpha_max, params.flatten_tolerance);
            let smooth = remove_collinear_points(&smooth, 1e-9);
            if smooth.len() < 3 {
                continue;
            }
            let world = smooth.into_iter().map(|p| grid.pixel_to_world(p)).collect();
            out.push(Polyline::closed_from_ring(world));
        }
        debug!("Traced {} outlines", out.len());
        out
    }
}

/// Split the raster into boundary paths, outer boundaries before the holes
/// they contain.
fn decompose(raster: &LayerRaster, params: &TraceParams) -> Vec<LatticePath> {
    let mut work = raster.clone();
    let mut paths = Vec::new();
    let mut y = raster.height();
    while y > 0 {
        let row = y - 1;
        let Some(x) = work.next_set_in_row(row, 0) else {
            y -= 1;
            continue;
        };
        let positive = raster.get(x as i64, row as i64);
        let path = follow(&work, x as i64, row as i64 + 1, positive, params.turn_policy);
        xor_path(&mut work, &path.points);
        if path.area.unsigned_abs() > params.turd_size as u64 {
            paths.push(path);
        }
    }
    paths
}

/// Walk the boundary starting at the top-left corner of pixel `(x0, y0 - 1)`,
/// keeping set pixels on the left.
fn follow(
    bm: &LayerRaster,
    x0: i64,
    y0: i64,
    positive: bool,
    policy: TurnPolicy,
) -> LatticePath {
    let (mut x, mut y) = (x0, y0);
    let (mut dx, mut dy) = (0i64, -1i64);
    let mut points = Vec::new();
    let mut area = 0i64;

    loop {
        points.push((x, y));
        x += dx;
        y += dy;
        area += x * dy;
        if x == x0 && y == y0 {
            break;
        }

        let right_ahead = bm.get(x + (dx + dy - 1) / 2, y + (dy - dx - 1) / 2);
        let left_ahead = bm.get(x + (dx - dy - 1) / 2, y + (dy + dx - 1) / 2);

        if right_ahead && !left_ahead {
            let turn_right = match policy {
                TurnPolicy::Right => true,
                TurnPolicy::Left => false,
                TurnPolicy::Majority => majority(bm, x, y),
                TurnPolicy::Minority => !majority(bm, x, y),
            };
            (dx, dy) = if turn_right { (dy, -dx) } else { (-dy, dx) };
        } else if right_ahead {
            (dx, dy) = (dy, -dx);
        } else if !left_ahead {
            (dx, dy) = (-dy, dx);
        }
    }

    LatticePath {
        points,
        area,
        positive,
    }
}

/// Whether set pixels dominate around lattice point `(x, y)`.
fn majority(bm: &LayerRaster, x: i64, y: i64) -> bool {
    let vote = |x, y| if bm.get(x, y) { 1 } else { -1 };
    for i in 2..5 {
        let mut ct = 0;
        for a in (-i + 1)..=(i - 1) {
            ct += vote(x + a, y + i - 1);
            ct += vote(x + i - 1, y + a - 1);
            ct += vote(x + a - 1, y - i);
            ct += vote(x - i, y + a);
        }
        if ct != 0 {
            return ct > 0;
        }
    }
    false
}

/// Invert the interior of a closed path, using its first column as reference.
fn xor_path(bm: &mut LayerRaster, points: &[(i64, i64)]) {
    let Some(&(xa, _)) = points.first() else {
        return;
    };
    let Some(&(_, mut y1)) = points.last() else {
        return;
    };
    for &(x, y) in points {
        if y != y1 {
            let row = y.min(y1);
            if row >= 0 {
                let (lo, hi) = if x < xa { (x, xa) } else { (xa, x) };
                bm.xor_span(row as usize, lo.max(0) as usize, hi.max(0) as usize);
            }
            y1 = y;
        }
    }
}

/// Point at `lambda` along `a -> b`.
#[inline]
fn interval(lambda: f64, a: PointF, b: PointF) -> PointF {
    a + (b - a) * lambda
}

/// Unit vector in the L-infinity sense, rotated 90° from `p0 -> p2`.
#[inline]
fn dorth_infty(p0: PointF, p2: PointF) -> (f64, f64) {
    (-sign(p2.y - p0.y), sign(p2.x - p0.x))
}

#[inline]
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Cross product of `p1 - p0` and `p2 - p0`.
#[inline]
fn dpara(p0: PointF, p1: PointF, p2: PointF) -> f64 {
    (p1 - p0).cross(p2 - p0)
}

#[inline]
fn ddenom(p0: PointF, p2: PointF) -> f64 {
    let r = dorth_infty(p0, p2);
    r.1 * (p2.x - p0.x) - r.0 * (p2.y - p0.y)
}

/// Replace each polygon vertex with a corner or a cubic Bézier between the
/// adjacent edge midpoints, then flatten the curves.
fn smooth_ring(ring: &[PointF], alpha_max: f64, tolerance: f64) -> Vec<PointF> {
    let m = ring.len();
    let mut out = Vec::with_capacity(m * 4);
    for j in 0..m {
        let vi = ring[(j + m - 1) % m];
        let vj = ring[j];
        let vk = ring[(j + 1) % m];
        let start = interval(0.5, vi, vj);
        let end = interval(0.5, vk, vj);

        let denom = ddenom(vi, vk);
        let alpha = if denom != 0.0 {
            let dd = (dpara(vi, vj, vk) / denom).abs();
            let a = if dd > 1.0 { 1.0 - 1.0 / dd } else { 0.0 };
            a / 0.75
        } else {
            4.0 / 3.0
        };

        out.push(start);
        if alpha >= alpha_max {
            out.push(vj);
        } else {
            let alpha = alpha.clamp(0.55, 1.0);
            let c1 = interval(0.5 + 0.5 * alpha, vi, vj);
            let c2 = interval(0.5 + 0.5 * alpha, vk, vj);
            flatten_cubic([start, c1, c2, end], tolerance, 0, &mut out);
        }
    }
    out.dedup_by(|b, a| a.approx_eq(*b, 1e-12));
    out
}

/// Adaptive de Casteljau subdivision. Pushes every point after the first.
fn flatten_cubic(c: [PointF; 4], tolerance: CoordF, depth: u32, out: &mut Vec<PointF>) {
    let flat = c[1].distance_to_segment(c[0], c[3]) <= tolerance
        && c[2].distance_to_segment(c[0], c[3]) <= tolerance;
    if flat || depth >= MAX_FLATTEN_DEPTH {
        out.push(c[3]);
        return;
    }
    let p01 = interval(0.5, c[0], c[1]);
    let p12 = interval(0.5, c[1], c[2]);
    let p23 = interval(0.5, c[2], c[3]);
    let p012 = interval(0.5, p01, p12);
    let p123 = interval(0.5, p12, p23);
    let mid = interval(0.5, p012, p123);
    flatten_cubic([c[0], p01, p012, mid], tolerance, depth + 1, out);
    flatten_cubic([mid, p123, p23, c[3]], tolerance, depth + 1, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{FillRule, RasterGrid};

    fn raster(w: usize, h: usize) -> LayerRaster {
        LayerRaster::new(RasterGrid::new(PointF::zero(), 1.0, w, h))
    }

    #[test]
    fn test_rectangle_traces_exactly() {
        let mut r = raster(30, 30);
        for y in 4..14 {
            r.set_span(y, 3, 23);
        }
        let outlines = r.trace_to_polylines(&TraceParams::default());
        assert_eq!(outlines.len(), 1);
        let pl = &outlines[0];
        assert!(pl.is_closed());
        assert_eq!(pl.len(), 5);
        assert!((pl.signed_area() - 200.0).abs() < 1e-9);
        let bb = pl.bounding_box();
        assert!(bb.min.approx_eq(PointF::new(3.0, 4.0), 1e-12));
        assert!(bb.max.approx_eq(PointF::new(23.0, 14.0), 1e-12));
    }

    #[test]
    fn test_hole_is_clockwise() {
        let mut r = raster(40, 40);
        for y in 2..38 {
            r.set_span(y, 2, 38);
        }
        for y in 12..28 {
            r.xor_span(y, 12, 28);
        }
        let outlines = r.trace_to_polylines(&TraceParams::default());
        assert_eq!(outlines.len(), 2);
        assert!((outlines[0].signed_area() - 36.0 * 36.0).abs() < 1e-9);
        assert!((outlines[1].signed_area() + 256.0).abs() < 1e-9);

        // The traced outlines render back to the same pixels.
        let mut back = raster(40, 40);
        back.render_polygon(&outlines, FillRule::NonZero);
        assert_eq!(back, r);
    }

    #[test]
    fn test_turd_size_drops_speckles() {
        let mut r = raster(10, 10);
        r.set(1, 1, true);
        r.set(5, 5, true);
        r.set(6, 5, true);
        r.set(5, 6, true);
        let params = TraceParams::default();
        let outlines = r.trace_to_polylines(&params);
        assert_eq!(outlines.len(), 1);

        let keep_all = TraceParams {
            turd_size: 0,
            ..params
        };
        assert_eq!(r.trace_to_polylines(&keep_all).len(), 2);
    }

    #[test]
    fn test_turn_policy_on_diagonal_pixels() {
        let mut r = raster(6, 6);
        for y in 1..3 {
            r.set_span(y, 1, 3);
        }
        for y in 3..5 {
            r.set_span(y, 3, 5);
        }
        let base = TraceParams {
            turd_size: 0,
            ..TraceParams::default()
        };
        let joined = r.trace_to_polylines(&TraceParams {
            turn_policy: TurnPolicy::Right,
            ..base
        });
        assert_eq!(joined.len(), 1);
        let split = r.trace_to_polylines(&TraceParams {
            turn_policy: TurnPolicy::Left,
            ..base
        });
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn test_disk_is_smoothed() {
        let mut r = LayerRaster::new(RasterGrid::new(PointF::zero(), 0.1, 100, 100));
        let center = PointF::new(5.0, 5.0);
        for y in 0..100 {
            for x in 0..100 {
                if r.grid().pixel_center(x, y).distance(center) <= 3.0 {
                    r.set(x, y, true);
                }
            }
        }
        let outlines = r.trace_to_polylines(&TraceParams::default());
        assert_eq!(outlines.len(), 1);
        let area = outlines[0].signed_area();
        let expected = std::f64::consts::PI * 9.0;
        assert!((area - expected).abs() / expected < 0.02);
        for p in outlines[0].points() {
            assert!((p.distance(center) - 3.0).abs() < 0.15);
        }
    }

    #[test]
    fn test_flatten_cubic_endpoints() {
        let c = [
            PointF::new(0.0, 0.0),
            PointF::new(0.0, 10.0),
            PointF::new(10.0, 10.0),
            PointF::new(10.0, 0.0),
        ];
        let mut out = vec![c[0]];
        flatten_cubic(c, 0.01, 0, &mut out);
        assert!(out.len() > 8);
        assert_eq!(*out.last().unwrap(), c[3]);
        // The curve peaks at y = 7.5.
        let top = out.iter().map(|p| p.y).fold(0.0, f64::max);
        assert!((top - 7.5).abs() < 0.05);
    }

    #[test]
    fn test_validate() {
        assert!(TraceParams::default().validate().is_ok());
        let bad = TraceParams {
            flatten_tolerance: 0.0,
            ..TraceParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
