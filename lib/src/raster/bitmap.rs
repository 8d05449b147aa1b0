//! Bit-packed occupancy buffer for one layer.

use super::RasterGrid;
use crate::geometry::{BoundingBoxF, PointF};
use crate::CoordF;
use std::fmt;

const WORD_BITS: usize = 64;

/// A fixed-size binary raster over the build plate.
///
/// Rows are packed into `u64` words. Bits past `width` in the last word of a
/// row are always zero.
#[derive(Clone, PartialEq)]
pub struct LayerRaster {
    grid: RasterGrid,
    words_per_row: usize,
    words: Vec<u64>,
}

impl LayerRaster {
    /// Create an empty raster.
    pub fn new(grid: RasterGrid) -> Self {
        let words_per_row = grid.width.div_ceil(WORD_BITS);
        Self {
            grid,
            words_per_row,
            words: vec![0; words_per_row * grid.height],
        }
    }

    /// Grid this raster is defined on.
    #[inline]
    pub fn grid(&self) -> &RasterGrid {
        &self.grid
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.grid.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.grid.height
    }

    /// Pixel value; coordinates outside the raster read as unset.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x as usize >= self.grid.width || y as usize >= self.grid.height {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        let word = self.words[y * self.words_per_row + x / WORD_BITS];
        word >> (x % WORD_BITS) & 1 == 1
    }

    /// Set or clear one pixel. Out-of-range coordinates are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.grid.width || y >= self.grid.height {
            return;
        }
        let idx = y * self.words_per_row + x / WORD_BITS;
        let bit = 1u64 << (x % WORD_BITS);
        if value {
            self.words[idx] |= bit;
        } else {
            self.words[idx] &= !bit;
        }
    }

    /// Set pixels `[x0, x1)` of row `y`.
    pub fn set_span(&mut self, y: usize, x0: usize, x1: usize) {
        self.apply_span(y, x0, x1, |w, m| *w |= m);
    }

    /// Toggle pixels `[x0, x1)` of row `y`.
    pub fn xor_span(&mut self, y: usize, x0: usize, x1: usize) {
        self.apply_span(y, x0, x1, |w, m| *w ^= m);
    }

    fn apply_span(&mut self, y: usize, x0: usize, x1: usize, op: impl Fn(&mut u64, u64)) {
        let x1 = x1.min(self.grid.width);
        if y >= self.grid.height || x0 >= x1 {
            return;
        }
        let row = y * self.words_per_row;
        let (w0, w1) = (x0 / WORD_BITS, (x1 - 1) / WORD_BITS);
        for w in w0..=w1 {
            let lo = if w == w0 { x0 % WORD_BITS } else { 0 };
            let hi = if w == w1 { (x1 - 1) % WORD_BITS } else { WORD_BITS - 1 };
            let mask = (u64::MAX >> (WORD_BITS - 1 - hi)) & (u64::MAX << lo);
            op(&mut self.words[row + w], mask);
        }
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True if no pixel is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Clear every pixel.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Set every pixel.
    pub fn fill(&mut self) {
        for y in 0..self.grid.height {
            self.set_span(y, 0, self.grid.width);
        }
    }

    /// Set area in mm².
    pub fn area_mm2(&self) -> CoordF {
        self.count() as CoordF * self.grid.pixel_area()
    }

    /// Keep only pixels also set in `other`.
    pub fn logic_and(&mut self, other: &LayerRaster) {
        self.combine(other, |a, b| a & b);
    }

    /// Clear pixels that are set in `other`.
    pub fn logic_and_not(&mut self, other: &LayerRaster) {
        self.combine(other, |a, b| a & !b);
    }

    /// Add pixels set in `other`.
    pub fn logic_or(&mut self, other: &LayerRaster) {
        self.combine(other, |a, b| a | b);
    }

    fn combine(&mut self, other: &LayerRaster, op: impl Fn(u64, u64) -> u64) {
        debug_assert_eq!(self.grid, other.grid, "raster grids differ");
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            *a = op(*a, b);
        }
    }

    /// World-space bounding box of the set pixels.
    pub fn bounding_box(&self) -> BoundingBoxF {
        let mut bb = BoundingBoxF::new();
        let mut rows = None;
        let (mut min_x, mut max_x) = (usize::MAX, 0);
        for y in 0..self.grid.height {
            if let Some((first, last)) = self.row_extent(y) {
                rows = Some(match rows {
                    None => (y, y),
                    Some((lo, _)) => (lo, y),
                });
                min_x = min_x.min(first);
                max_x = max_x.max(last);
            }
        }
        if let Some((y0, y1)) = rows {
            bb.merge_point(self.grid.pixel_to_world(PointF::new(min_x as f64, y0 as f64)));
            bb.merge_point(
                self.grid
                    .pixel_to_world(PointF::new((max_x + 1) as f64, (y1 + 1) as f64)),
            );
        }
        bb
    }

    /// First and last set pixel of row `y`.
    pub fn row_extent(&self, y: usize) -> Option<(usize, usize)> {
        let row = &self.words[y * self.words_per_row..(y + 1) * self.words_per_row];
        let first = row
            .iter()
            .position(|&w| w != 0)
            .map(|i| i * WORD_BITS + row[i].trailing_zeros() as usize)?;
        let last = row
            .iter()
            .rposition(|&w| w != 0)
            .map(|i| i * WORD_BITS + (WORD_BITS - 1 - row[i].leading_zeros() as usize))?;
        Some((first, last))
    }

    /// First set pixel of row `y` at or after column `from`.
    pub(crate) fn next_set_in_row(&self, y: usize, from: usize) -> Option<usize> {
        if y >= self.grid.height || from >= self.grid.width {
            return None;
        }
        let row = y * self.words_per_row;
        let mut w = from / WORD_BITS;
        let mut word = self.words[row + w] & (u64::MAX << (from % WORD_BITS));
        loop {
            if word != 0 {
                return Some(w * WORD_BITS + word.trailing_zeros() as usize);
            }
            w += 1;
            if w == self.words_per_row {
                return None;
            }
            word = self.words[row + w];
        }
    }

    /// Maximal runs `[start, end)` of set pixels in row `y`.
    pub fn row_runs(&self, y: usize) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = None;
        for x in 0..self.grid.width {
            let on = self.get(x as i64, y as i64);
            match (on, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    runs.push((s, x));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push((s, self.grid.width));
        }
        runs
    }

    /// Transposed copy of the raster (rows become columns).
    pub(crate) fn transposed(&self) -> LayerRaster {
        let g = self.grid;
        let mut out = LayerRaster::new(RasterGrid::new(
            PointF::new(g.origin.y, g.origin.x),
            g.pixel_size,
            g.height,
            g.width,
        ));
        for y in 0..g.height {
            for x in 0..g.width {
                if self.get(x as i64, y as i64) {
                    out.set(y, x, true);
                }
            }
        }
        out
    }
}

impl fmt::Debug for LayerRaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LayerRaster[{}x{} @ {:.3}mm, {} set]",
            self.grid.width,
            self.grid.height,
            self.grid.pixel_size,
            self.count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(w: usize, h: usize) -> RasterGrid {
        RasterGrid::new(PointF::zero(), 1.0, w, h)
    }

    #[test]
    fn test_set_get_count() {
        let mut r = LayerRaster::new(grid(130, 3));
        assert!(r.is_empty());
        r.set(0, 0, true);
        r.set(64, 1, true);
        r.set(129, 2, true);
        r.set(500, 2, true); // ignored
        assert_eq!(r.count(), 3);
        assert!(r.get(64, 1));
        assert!(!r.get(-1, 0));
        assert!(!r.get(130, 2));
        r.set(64, 1, false);
        assert_eq!(r.count(), 2);
    }

    #[test]
    fn test_spans_across_words() {
        let mut r = LayerRaster::new(grid(200, 1));
        r.set_span(0, 10, 150);
        assert_eq!(r.count(), 140);
        assert_eq!(r.row_runs(0), vec![(10, 150)]);
        r.xor_span(0, 100, 200);
        assert_eq!(r.row_runs(0), vec![(10, 100), (150, 200)]);
        assert_eq!(r.row_extent(0), Some((10, 199)));
        assert_eq!(r.next_set_in_row(0, 0), Some(10));
        assert_eq!(r.next_set_in_row(0, 100), Some(150));
        assert_eq!(r.next_set_in_row(0, 199), Some(199));
    }

    #[test]
    fn test_fill_keeps_tail_bits_clear() {
        let mut r = LayerRaster::new(grid(70, 2));
        r.fill();
        assert_eq!(r.count(), 140);
        r.clear();
        assert!(r.is_empty());
    }

    #[test]
    fn test_logic_ops() {
        let mut a = LayerRaster::new(grid(10, 1));
        let mut b = LayerRaster::new(grid(10, 1));
        a.set_span(0, 0, 6);
        b.set_span(0, 4, 10);

        let mut and = a.clone();
        and.logic_and(&b);
        assert_eq!(and.row_runs(0), vec![(4, 6)]);

        let mut and_not = a.clone();
        and_not.logic_and_not(&b);
        assert_eq!(and_not.row_runs(0), vec![(0, 4)]);

        let mut or = a.clone();
        or.logic_or(&b);
        assert_eq!(or.count(), 10);
    }

    #[test]
    fn test_bounding_box_and_area() {
        let mut r = LayerRaster::new(RasterGrid::new(PointF::new(-5.0, -5.0), 0.5, 20, 20));
        assert!(!r.bounding_box().defined);
        r.set_span(4, 2, 6);
        r.set_span(7, 3, 4);
        let bb = r.bounding_box();
        assert!(bb.min.approx_eq(PointF::new(-4.0, -3.0), 1e-12));
        assert!(bb.max.approx_eq(PointF::new(-2.0, -1.0), 1e-12));
        assert!((r.area_mm2() - 5.0 * 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_transposed() {
        let mut r = LayerRaster::new(grid(3, 2));
        r.set(2, 1, true);
        let t = r.transposed();
        assert_eq!(t.width(), 2);
        assert_eq!(t.height(), 3);
        assert!(t.get(1, 2));
        assert_eq!(t.count(), 1);
    }
}
