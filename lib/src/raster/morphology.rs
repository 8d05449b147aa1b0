//! Erosion and dilation by a physical distance.
//!
//! Both are thresholds of an exact Euclidean distance transform computed with
//! the lower-envelope algorithm of Felzenszwalb and Huttenlocher: one 1-D pass
//! down every column, then one along every row. Rows are independent, so the
//! second pass runs in parallel.

use super::{LayerRaster, RasterGrid};
use crate::CoordF;
use rayon::prelude::*;

/// Stand-in for an infinite squared distance. Finite so the envelope
/// arithmetic never produces NaN.
const FAR: f64 = 1e20;

/// Threshold slack so distances that are whole pixels in exact arithmetic
/// land on the same side regardless of rounding.
const EPS: f64 = 1e-9;

/// Per-pixel Euclidean distance, in pixels, between pixel centers.
#[derive(Debug, Clone)]
pub struct DistanceField {
    grid: RasterGrid,
    dist: Vec<f64>,
}

impl DistanceField {
    /// Distance from each set pixel to the nearest unset pixel.
    ///
    /// Everything outside the raster counts as unset. Unset pixels read 0.
    pub fn inner_distance(raster: &LayerRaster) -> Self {
        let (w, h) = (raster.width(), raster.height());
        let mut field = Self::transform(raster, false);
        for y in 0..h {
            let border_y = (y + 1).min(h - y) as f64;
            for x in 0..w {
                let border = ((x + 1).min(w - x) as f64).min(border_y);
                let d = &mut field.dist[y * w + x];
                *d = d.min(border);
            }
        }
        field
    }

    /// Distance from each pixel to the nearest set pixel. Set pixels read 0.
    pub fn outer_distance(raster: &LayerRaster) -> Self {
        Self::transform(raster, true)
    }

    fn transform(raster: &LayerRaster, feature: bool) -> Self {
        let grid = *raster.grid();
        let (w, h) = (grid.width, grid.height);
        let mut sq = vec![0.0; w * h];

        // Columns.
        let n = w.max(h);
        let mut f = vec![0.0; n];
        let mut d = vec![0.0; n];
        let mut v = vec![0usize; n];
        let mut z = vec![0.0; n + 1];
        for x in 0..w {
            for y in 0..h {
                f[y] = if raster.get(x as i64, y as i64) == feature {
                    0.0
                } else {
                    FAR
                };
            }
            lower_envelope(&f[..h], &mut d[..h], &mut v, &mut z);
            for y in 0..h {
                sq[y * w + x] = d[y];
            }
        }

        // Rows.
        sq.par_chunks_mut(w).for_each_init(
            || (vec![0.0; w], vec![0usize; w], vec![0.0; w + 1]),
            |(f, v, z), row| {
                f.copy_from_slice(row);
                lower_envelope(f, row, v, z);
            },
        );

        let dist = sq
            .into_iter()
            .map(|s| if s >= FAR { FAR } else { s.sqrt() })
            .collect();
        Self { grid, dist }
    }

    /// Distance at pixel `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.dist[y * self.grid.width + x]
    }

    /// Largest finite distance in the field.
    pub fn max(&self) -> f64 {
        self.dist
            .iter()
            .copied()
            .filter(|&d| d < FAR)
            .fold(0.0, f64::max)
    }

    /// Pixels strictly farther than `r` pixels.
    pub fn above(&self, r: f64) -> LayerRaster {
        self.select(|d| d > r + EPS)
    }

    /// Pixels within `r` pixels.
    pub fn at_most(&self, r: f64) -> LayerRaster {
        self.select(|d| d <= r + EPS)
    }

    /// Pixels whose distance satisfies `keep`.
    pub fn select(&self, keep: impl Fn(f64) -> bool) -> LayerRaster {
        let mut out = LayerRaster::new(self.grid);
        let w = self.grid.width;
        for (y, row) in self.dist.chunks(w.max(1)).enumerate() {
            let mut run = None;
            for (x, &d) in row.iter().enumerate() {
                match (keep(d), run) {
                    (true, None) => run = Some(x),
                    (false, Some(s)) => {
                        out.set_span(y, s, x);
                        run = None;
                    }
                    _ => {}
                }
            }
            if let Some(s) = run {
                out.set_span(y, s, w);
            }
        }
        out
    }
}

/// 1-D squared distance transform of the sampled function `f`.
fn lower_envelope(f: &[f64], d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    let mut k = 0;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;
    for q in 1..n {
        let qf = q as f64;
        let s = loop {
            let p = v[k] as f64;
            let s = ((f[q] + qf * qf) - (f[v[k]] + p * p)) / (2.0 * qf - 2.0 * p);
            if s <= z[k] {
                k -= 1;
            } else {
                break s;
            }
        };
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }
    k = 0;
    for (q, out) in d.iter_mut().enumerate().take(n) {
        let qf = q as f64;
        while z[k + 1] < qf {
            k += 1;
        }
        let p = v[k] as f64;
        *out = (qf - p) * (qf - p) + f[v[k]];
    }
}

impl LayerRaster {
    /// Erode by `distance` millimetres. A negative distance dilates.
    pub fn contract(&mut self, distance: CoordF) {
        if distance < 0.0 {
            return self.expand(-distance);
        }
        if distance == 0.0 || self.is_empty() {
            return;
        }
        let r = self.grid().mm_to_px(distance);
        *self = DistanceField::inner_distance(self).above(r);
    }

    /// Dilate by `distance` millimetres. A negative distance erodes.
    pub fn expand(&mut self, distance: CoordF) {
        if distance < 0.0 {
            return self.contract(-distance);
        }
        if distance == 0.0 || self.is_empty() {
            return;
        }
        let r = self.grid().mm_to_px(distance);
        *self = DistanceField::outer_distance(self).at_most(r);
    }

    /// Eroded copy.
    pub fn contracted(&self, distance: CoordF) -> LayerRaster {
        let mut out = self.clone();
        out.contract(distance);
        out
    }

    /// Dilated copy.
    pub fn expanded(&self, distance: CoordF) -> LayerRaster {
        let mut out = self.clone();
        out.expand(distance);
        out
    }
}
