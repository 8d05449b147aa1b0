//! Scanline polygon fill.
//!
//! Each row is sampled at its pixel centers. Edges are half-open in y so a
//! vertex shared by two edges is counted once, and a pixel is covered when its
//! center lies in `[x_a, x_b)` of a span whose winding satisfies the fill rule.

use super::LayerRaster;
use crate::geometry::PointF;
use crate::slice::Rim;
use log::warn;
use std::ops::Deref;

/// Rule deciding which winding numbers are inside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillRule {
    /// Any non-zero winding.
    #[default]
    NonZero,
    /// Strictly positive winding (counter-clockwise material only).
    Positive,
    /// Odd winding.
    EvenOdd,
}

impl FillRule {
    #[inline]
    fn is_inside(self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::Positive => winding > 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }
}

#[derive(Clone, Copy)]
struct Edge {
    x0: f64,
    y0: f64,
    dxdy: f64,
    /// +1 for downward edges, -1 for upward ones.
    winding: i32,
    last_row: usize,
}

impl LayerRaster {
    /// Fill a set of loops in world coordinates into the raster.
    ///
    /// Loops are closed implicitly; a repeated closing point is harmless.
    /// Pixels already set stay set. Counter-clockwise loops wind +1.
    pub fn render_polygon<L>(&mut self, loops: &[L], rule: FillRule)
    where
        L: Deref<Target = [PointF]>,
    {
        let grid = *self.grid();
        let (w, h) = (grid.width as f64, grid.height as f64);
        let mut buckets: Vec<Vec<Edge>> = vec![Vec::new(); grid.height];
        let mut clipped = false;

        for ring in loops {
            let ring: &[PointF] = ring;
            if ring.len() < 2 {
                continue;
            }
            for (i, &a) in ring.iter().enumerate() {
                let b = ring[(i + 1) % ring.len()];
                let (a, b) = (grid.world_to_pixel(a), grid.world_to_pixel(b));
                if a.x < 0.0 || a.y < 0.0 || a.x > w || a.y > h {
                    clipped = true;
                }
                if a.y == b.y {
                    continue;
                }
                let (lo, hi, winding) = if a.y > b.y { (b, a, 1) } else { (a, b, -1) };
                // Rows whose center lies in [lo.y, hi.y).
                let first = (lo.y - 0.5).ceil().max(0.0);
                let last = (hi.y - 0.5).ceil() - 1.0;
                if last < first || first >= h {
                    continue;
                }
                let last = last.min(h - 1.0) as usize;
                buckets[first as usize].push(Edge {
                    x0: lo.x,
                    y0: lo.y,
                    dxdy: (hi.x - lo.x) / (hi.y - lo.y),
                    winding,
                    last_row: last,
                });
            }
        }

        if clipped {
            warn!("Geometry extends past the build plate and was clipped");
        }

        let mut active: Vec<Edge> = Vec::new();
        let mut crossings: Vec<(f64, i32)> = Vec::new();
        for (y, bucket) in buckets.into_iter().enumerate() {
            active.retain(|e| e.last_row >= y);
            active.extend(bucket);
            if active.is_empty() {
                continue;
            }

            let yc = y as f64 + 0.5;
            crossings.clear();
            crossings.extend(
                active
                    .iter()
                    .map(|e| (e.x0 + (yc - e.y0) * e.dxdy, e.winding)),
            );
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if !rule.is_inside(winding) {
                    continue;
                }
                let x0 = (pair[0].0 - 0.5).ceil().max(0.0);
                let x1 = (pair[1].0 - 0.5).ceil().min(w);
                if x1 > x0 {
                    self.set_span(y, x0 as usize, x1 as usize);
                }
            }
        }
    }

    /// Fill slice rims; open rims are closed implicitly.
    pub fn render_rims(&mut self, rims: &[Rim], rule: FillRule) {
        let loops: Vec<Vec<PointF>> = rims
            .iter()
            .filter(|r| r.len() >= 3)
            .map(Rim::to_polygon)
            .collect();
        self.render_polygon(&loops, rule);
    }
}
