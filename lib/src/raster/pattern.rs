//! Fill patterns overlaid on a region raster.
//!
//! A zigzag overlay keeps every n-th row (or column) of the region and turns
//! the surviving runs into strokes, linking runs on neighbouring lines when the
//! link stays inside the region. A concentric overlay keeps nested level sets
//! of the region's distance field and traces each one.

use super::morphology::DistanceField;
use super::{LayerRaster, TraceParams};
use crate::config::InfillPattern;
use crate::geometry::{PointF, Polyline, Polylines};
use crate::CoordF;

/// Step between samples when checking that a link stays inside the region (px).
const LINK_SAMPLE_STEP: f64 = 0.5;

/// A fill pattern masked to a region, ready for vectorization.
#[derive(Debug, Clone)]
pub struct InfillOverlay {
    pub pattern: InfillPattern,
    /// Region the pattern fills.
    pub interior: LayerRaster,
    /// Pixels covered by the pattern.
    pub strokes: LayerRaster,
    /// Line spacing in pixels.
    pub spacing_px: usize,
    /// Zigzag lines run along y instead of x.
    pub vertical: bool,
    /// Concentric level sets, outermost first.
    pub levels: Vec<LayerRaster>,
}

impl LayerRaster {
    /// Overlay `pattern` on the set region with lines `spacing` mm apart.
    ///
    /// `seed` picks the zigzag direction: even seeds run along x, odd seeds
    /// along y, so consecutive layers cross.
    pub fn overlay_infill_pattern(
        &self,
        pattern: InfillPattern,
        seed: usize,
        spacing: CoordF,
    ) -> InfillOverlay {
        let spacing_px = (self.grid().mm_to_px(spacing).round() as usize).max(1);
        let mut overlay = InfillOverlay {
            pattern,
            interior: self.clone(),
            strokes: LayerRaster::new(*self.grid()),
            spacing_px,
            vertical: pattern == InfillPattern::Zigzag && seed % 2 == 1,
            levels: Vec::new(),
        };
        if self.is_empty() {
            return overlay;
        }

        match pattern {
            InfillPattern::Zigzag => {
                let offset = spacing_px / 2;
                if overlay.vertical {
                    for x in (offset..self.width()).step_by(spacing_px) {
                        for y in 0..self.height() {
                            if self.get(x as i64, y as i64) {
                                overlay.strokes.set(x, y, true);
                            }
                        }
                    }
                } else {
                    for y in (offset..self.height()).step_by(spacing_px) {
                        for (x0, x1) in self.row_runs(y) {
                            overlay.strokes.set_span(y, x0, x1);
                        }
                    }
                }
            }
            InfillPattern::Concentric => {
                let field = DistanceField::inner_distance(self);
                let s = spacing_px as f64;
                let mut k = 0;
                loop {
                    let level = field.above((k as f64 + 0.5) * s);
                    if level.is_empty() {
                        break;
                    }
                    overlay.levels.push(level);
                    k += 1;
                }
                // One-pixel ring just inside each level boundary.
                overlay.strokes = field.select(|d| {
                    let t = d - 0.5 * s;
                    t > 0.0 && t.rem_euclid(s) <= 1.0
                });
            }
        }
        overlay
    }
}

impl InfillOverlay {
    /// Pixels covered by the pattern.
    pub fn strokes(&self) -> &LayerRaster {
        &self.strokes
    }

    /// True if the pattern covers nothing.
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Convert the pattern to world polylines.
    ///
    /// Zigzag strokes are open; concentric loops are closed.
    pub fn vectorize(&self, params: &TraceParams) -> Polylines {
        match self.pattern {
            InfillPattern::Zigzag => self.link_runs(),
            InfillPattern::Concentric => self
                .levels
                .iter()
                .flat_map(|level| level.trace_to_polylines(params))
                .collect(),
        }
    }

    /// Chain the runs of consecutive lines into boustrophedon strokes.
    fn link_runs(&self) -> Polylines {
        let (mask, lines) = if self.vertical {
            let t = self.strokes.transposed();
            (self.interior.transposed(), collect_runs(&t))
        } else {
            (self.interior.clone(), collect_runs(&self.strokes))
        };
        let grid = *self.interior.grid();
        let to_world = |p: PointF| {
            let p = if self.vertical { PointF::new(p.y, p.x) } else { p };
            grid.pixel_to_world(p)
        };

        let mut used: Vec<Vec<bool>> = lines.iter().map(|(_, r)| vec![false; r.len()]).collect();
        let mut strokes = Polylines::new();

        for start_line in 0..lines.len() {
            while let Some(first) = used[start_line].iter().position(|u| !u) {
                let mut points = Vec::new();
                let mut forward = true;
                let mut line = start_line;
                let mut run = first;
                loop {
                    used[line][run] = true;
                    let (y, runs) = &lines[line];
                    let (a, b) = run_ends(runs[run], *y);
                    let (a, b) = if forward { (a, b) } else { (b, a) };
                    points.push(a);
                    points.push(b);

                    let next_line = line + 1;
                    if next_line >= lines.len() || lines[next_line].0 != y + self.spacing_px {
                        break;
                    }
                    let (ny, next_runs) = &lines[next_line];
                    let candidate = next_runs
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| !used[next_line][*i])
                        .map(|(i, &r)| {
                            let (na, nb) = run_ends(r, *ny);
                            // The next run is walked the other way.
                            let entry = if forward { nb } else { na };
                            (i, entry, entry.distance_squared(b))
                        })
                        .min_by(|l, r| l.2.total_cmp(&r.2));
                    match candidate {
                        Some((i, entry, _)) if segment_inside(&mask, b, entry) => {
                            line = next_line;
                            run = i;
                            forward = !forward;
                        }
                        _ => break,
                    }
                }
                points.dedup();
                if points.len() >= 2 {
                    strokes.push(Polyline::from_points(
                        points.into_iter().map(&to_world).collect(),
                    ));
                }
            }
        }
        strokes
    }
}

/// Non-empty lines of a raster as `(row, runs)`.
fn collect_runs(raster: &LayerRaster) -> Vec<(usize, Vec<(usize, usize)>)> {
    (0..raster.height())
        .map(|y| (y, raster.row_runs(y)))
        .filter(|(_, runs)| !runs.is_empty())
        .collect()
}

/// Pixel-center endpoints of the run `[x0, x1)` on row `y`.
fn run_ends((x0, x1): (usize, usize), y: usize) -> (PointF, PointF) {
    let yc = y as f64 + 0.5;
    (
        PointF::new(x0 as f64 + 0.5, yc),
        PointF::new(x1 as f64 - 0.5, yc),
    )
}

/// Whether the segment `a -> b` (pixel coordinates) stays on set pixels.
fn segment_inside(mask: &LayerRaster, a: PointF, b: PointF) -> bool {
    let steps = (a.distance(b) / LINK_SAMPLE_STEP).ceil().max(1.0) as usize;
    (0..=steps).all(|i| {
        let p = a.lerp(b, i as f64 / steps as f64);
        mask.get(p.x.floor() as i64, p.y.floor() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterGrid;

    fn square(n: usize, lo: usize, hi: usize) -> LayerRaster {
        let mut r = LayerRaster::new(RasterGrid::new(PointF::zero(), 0.1, n, n));
        for y in lo..hi {
            r.set_span(y, lo, hi);
        }
        r
    }

    #[test]
    fn test_zigzag_square_is_one_stroke() {
        let r = square(40, 10, 30);
        let overlay = r.overlay_infill_pattern(InfillPattern::Zigzag, 0, 0.4);
        assert_eq!(overlay.spacing_px, 4);
        assert!(!overlay.vertical);
        // Rows 10, 14, .., 26 cross the square.
        assert_eq!(overlay.strokes().count(), 5 * 20);

        let strokes = overlay.vectorize(&TraceParams::default());
        assert_eq!(strokes.len(), 1);
        let pts = strokes[0].points();
        assert_eq!(pts.len(), 10);
        assert!(pts[0].approx_eq(PointF::new(1.05, 1.05), 1e-9));
        assert!(pts[1].approx_eq(PointF::new(2.95, 1.05), 1e-9));
        assert!(pts[2].approx_eq(PointF::new(2.95, 1.45), 1e-9));
        for p in pts {
            assert!(r.get((p.x / 0.1) as i64, (p.y / 0.1) as i64));
        }
    }

    #[test]
    fn test_zigzag_odd_seed_is_vertical() {
        let r = square(40, 10, 30);
        let overlay = r.overlay_infill_pattern(InfillPattern::Zigzag, 1, 0.4);
        assert!(overlay.vertical);
        let strokes = overlay.vectorize(&TraceParams::default());
        assert_eq!(strokes.len(), 1);
        let pts = strokes[0].points();
        assert!((pts[0].x - pts[1].x).abs() < 1e-9);
        assert!((pts[1].y - pts[0].y - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_zigzag_does_not_link_across_gap() {
        // Two bars: no link between them stays inside the region.
        let mut r = LayerRaster::new(RasterGrid::new(PointF::zero(), 0.1, 40, 40));
        for y in 0..40 {
            r.set_span(y, 0, 8);
            r.set_span(y, 30, 38);
        }
        let overlay = r.overlay_infill_pattern(InfillPattern::Zigzag, 0, 0.4);
        let strokes = overlay.vectorize(&TraceParams::default());
        assert_eq!(strokes.len(), 2);
        for s in &strokes {
            let bb = s.bounding_box();
            assert!(bb.width() < 1.0);
        }
    }

    #[test]
    fn test_concentric_levels() {
        let r = square(60, 10, 50);
        let overlay = r.overlay_infill_pattern(InfillPattern::Concentric, 0, 0.4);
        // Inner distances reach 20 px; levels start above 2, 6, 10, 14, 18.
        assert_eq!(overlay.levels.len(), 5);
        let loops = overlay.vectorize(&TraceParams::default());
        assert_eq!(loops.len(), 5);
        assert!(loops.iter().all(|l| l.is_closed()));
        let widths: Vec<f64> = loops.iter().map(|l| l.bounding_box().width()).collect();
        assert!((widths[0] - 3.6).abs() < 1e-9);
        assert!(widths.windows(2).all(|w| w[0] > w[1]));
        assert!(!overlay.strokes().is_empty());
    }

    #[test]
    fn test_empty_region() {
        let r = LayerRaster::new(RasterGrid::new(PointF::zero(), 0.1, 10, 10));
        let overlay = r.overlay_infill_pattern(InfillPattern::Zigzag, 0, 0.4);
        assert!(overlay.is_empty());
        assert!(overlay.vectorize(&TraceParams::default()).is_empty());
    }
}
