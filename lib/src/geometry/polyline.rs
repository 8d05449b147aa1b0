//! Polyline type for traced outlines and toolpath strokes.
//!
//! A polyline is an ordered run of [`PointF`]. A closed polyline repeats its
//! first point at the end; everything that leaves the tracer or the infill
//! vectorizer follows that convention so downstream code can tell loops from
//! open strokes without a separate flag.

use super::{BoundingBoxF, PointF};
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut, Index};

/// An ordered sequence of points.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<PointF>,
}

/// A collection of polylines.
pub type Polylines = Vec<Polyline>;

impl Polyline {
    /// Create a new empty polyline.
    #[inline]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polyline from a vector of points.
    #[inline]
    pub fn from_points(points: Vec<PointF>) -> Self {
        Self { points }
    }

    /// Create a closed polyline from a ring of points, repeating the first
    /// point at the end if it isn't already.
    pub fn closed_from_ring(mut points: Vec<PointF>) -> Self {
        if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
            if points.len() > 1 && first != last {
                points.push(first);
            }
        }
        Self { points }
    }

    /// Create a polyline with the given capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Get the points of this polyline.
    #[inline]
    pub fn points(&self) -> &[PointF] {
        &self.points
    }

    /// Get a mutable reference to the points.
    #[inline]
    pub fn points_mut(&mut self) -> &mut Vec<PointF> {
        &mut self.points
    }

    /// Consume the polyline and return its points.
    #[inline]
    pub fn into_points(self) -> Vec<PointF> {
        self.points
    }

    /// Add a point to the end.
    #[inline]
    pub fn push(&mut self, point: PointF) {
        self.points.push(point);
    }

    /// Number of segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Check if this polyline is closed (first point equals last point).
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.points.len() >= 3 && self.points.first() == self.points.last()
    }

    /// Close the polyline by repeating the first point.
    pub fn close(&mut self) {
        if self.points.len() >= 2 && !self.is_closed() {
            let first = self.points[0];
            self.points.push(first);
        }
    }

    /// Total length along the path.
    pub fn length(&self) -> CoordF {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Signed area by the shoelace formula, treating the points as a ring.
    ///
    /// Positive for counter-clockwise rings.
    pub fn signed_area(&self) -> CoordF {
        signed_area(&self.points)
    }

    /// Reverse the order of points.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Return a reversed copy.
    pub fn reversed(&self) -> Self {
        let mut result = self.clone();
        result.reverse();
        result
    }

    /// Bounding box of the points.
    pub fn bounding_box(&self) -> BoundingBoxF {
        BoundingBoxF::from_points(&self.points)
    }

    /// Translate every point by `v`.
    pub fn translate(&mut self, v: PointF) {
        for p in &mut self.points {
            *p += v;
        }
    }

    /// Scale every point about the origin.
    pub fn scale(&mut self, factor: CoordF) {
        for p in &mut self.points {
            *p = p.scale(factor);
        }
    }

    /// Index of the vertex nearest to `p`.
    ///
    /// The duplicated closing point of a closed polyline is never returned.
    pub fn nearest_vertex(&self, p: PointF) -> Option<usize> {
        let n = if self.is_closed() {
            self.points.len() - 1
        } else {
            self.points.len()
        };
        (0..n).min_by(|&a, &b| {
            self.points[a]
                .distance_squared(p)
                .total_cmp(&self.points[b].distance_squared(p))
        })
    }

    /// Rotate a closed polyline so that it starts (and ends) at vertex `index`.
    ///
    /// Open polylines are left untouched.
    pub fn rotate_start(&mut self, index: usize) {
        if !self.is_closed() || index == 0 {
            return;
        }
        let ring_len = self.points.len() - 1;
        if index >= ring_len {
            return;
        }
        self.points.pop();
        self.points.rotate_left(index);
        let first = self.points[0];
        self.points.push(first);
    }

    /// Remove consecutive points closer than `epsilon`.
    pub fn remove_duplicates(&mut self, epsilon: CoordF) {
        let eps_sq = epsilon * epsilon;
        self.points.dedup_by(|b, a| a.distance_squared(*b) < eps_sq);
    }

    /// Check if the polyline has at least one segment.
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 2
    }
}

/// Signed area of a ring of points (shoelace). A repeated closing point
/// contributes nothing.
pub fn signed_area(points: &[PointF]) -> CoordF {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        sum += a.cross(b);
    }
    sum * 0.5
}

impl Deref for Polyline {
    type Target = [PointF];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

impl DerefMut for Polyline {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.points
    }
}

impl Index<usize> for Polyline {
    type Output = PointF;

    fn index(&self, index: usize) -> &PointF {
        &self.points[index]
    }
}

impl From<Vec<PointF>> for Polyline {
    fn from(points: Vec<PointF>) -> Self {
        Self::from_points(points)
    }
}

impl FromIterator<PointF> for Polyline {
    fn from_iter<I: IntoIterator<Item = PointF>>(iter: I) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl fmt::Debug for Polyline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Polyline[{} pts", self.points.len())?;
        if self.is_closed() {
            write!(f, ", closed")?;
        }
        write!(f, "]")
    }
}
