//! Path simplification.
//!
//! Traced outlines come out of the raster at pixel resolution, with one vertex
//! per lattice step. These routines reduce them before curve fitting and
//! before they become toolpaths:
//!
//! - **Douglas-Peucker** on open paths and on closed rings
//! - **Collinear removal** for rings whose vertices sit on straight runs
//! - **Duplicate removal** for consecutive coincident points

use super::{PointF, Polyline};
use crate::CoordF;

/// Default tolerance for dropping nearly collinear vertices (mm).
pub const COLLINEARITY_THRESHOLD: CoordF = 1e-6;

/// Douglas-Peucker simplification of an open path.
///
/// The first and last points are always kept.
pub fn douglas_peucker(points: &[PointF], tolerance: CoordF) -> Vec<PointF> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let tolerance_sq = tolerance * tolerance;

    // Explicit stack rather than recursion: traced paths can be long.
    let mut stack = vec![(0, points.len() - 1)];
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    while let Some((anchor_idx, floater_idx)) = stack.pop() {
        if anchor_idx + 1 >= floater_idx {
            continue;
        }

        let anchor = points[anchor_idx];
        let floater = points[floater_idx];

        let mut max_dist_sq = 0.0;
        let mut furthest_idx = anchor_idx;
        for (i, p) in points
            .iter()
            .enumerate()
            .take(floater_idx)
            .skip(anchor_idx + 1)
        {
            let dist_sq = p.distance_to_segment_squared(anchor, floater);
            if dist_sq > max_dist_sq {
                max_dist_sq = dist_sq;
                furthest_idx = i;
            }
        }

        if max_dist_sq > tolerance_sq {
            keep[furthest_idx] = true;
            stack.push((anchor_idx, furthest_idx));
            stack.push((furthest_idx, floater_idx));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Douglas-Peucker simplification of a closed ring.
///
/// `ring` must not repeat its first point. The ring is split at vertex 0 and
/// at the vertex farthest from it so that both halves are open paths with
/// well-defined endpoints. The result never repeats its first point either.
pub fn douglas_peucker_ring(ring: &[PointF], tolerance: CoordF) -> Vec<PointF> {
    if ring.len() <= 3 {
        return ring.to_vec();
    }

    let start = ring[0];
    let far = (1..ring.len())
        .max_by(|&a, &b| {
            ring[a]
                .distance_squared(start)
                .total_cmp(&ring[b].distance_squared(start))
        })
        .unwrap_or(ring.len() / 2);

    let first_half = douglas_peucker(&ring[..=far], tolerance);
    let mut second: Vec<PointF> = ring[far..].to_vec();
    second.push(start);
    let second_half = douglas_peucker(&second, tolerance);

    let mut result = first_half;
    // Skip the shared split vertex and the repeated start.
    result.extend_from_slice(&second_half[1..second_half.len() - 1]);

    if result.len() < 3 {
        return ring.to_vec();
    }
    result
}

/// Simplify a polyline, treating it as a ring when it is closed.
pub fn simplify_polyline(polyline: &Polyline, tolerance: CoordF) -> Polyline {
    if polyline.is_closed() {
        let ring = &polyline.points()[..polyline.len() - 1];
        Polyline::closed_from_ring(douglas_peucker_ring(ring, tolerance))
    } else {
        Polyline::from_points(douglas_peucker(polyline.points(), tolerance))
    }
}

/// Remove duplicate consecutive points.
///
/// Points are considered duplicates if they're within `tolerance` of each other.
pub fn remove_duplicate_points(points: &[PointF], tolerance: CoordF) -> Vec<PointF> {
    let tolerance_sq = tolerance * tolerance;
    let mut result: Vec<PointF> = Vec::with_capacity(points.len());
    for &point in points {
        match result.last() {
            Some(last) if last.distance_squared(point) <= tolerance_sq => {}
            _ => result.push(point),
        }
    }
    result
}

/// Remove collinear vertices from a closed ring (no repeated first point).
///
/// A vertex is dropped when it lies within `tolerance` of the infinite line
/// through its neighbours and between them. Runs until nothing changes, so
/// a straight edge sampled at many points collapses to its two corners.
pub fn remove_collinear_points(ring: &[PointF], tolerance: CoordF) -> Vec<PointF> {
    let mut points = ring.to_vec();
    loop {
        let n = points.len();
        if n <= 3 {
            return points;
        }
        let mut removed = None;
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let curr = points[i];
            let next = points[(i + 1) % n];
            let base = next - prev;
            let len = base.length();
            let off_line = if len == 0.0 {
                curr.distance(prev)
            } else {
                (curr - prev).cross(base).abs() / len
            };
            let between = (curr - prev).dot(next - curr) >= 0.0;
            if off_line <= tolerance && between {
                removed = Some(i);
                break;
            }
        }
        match removed {
            Some(i) => {
                points.remove(i);
            }
            None => return points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_douglas_peucker_straight_line() {
        let pts: Vec<PointF> = (0..=10).map(|i| PointF::new(i as f64, 0.0)).collect();
        let simplified = douglas_peucker(&pts, 0.01);
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified[0], pts[0]);
        assert_eq!(simplified[1], pts[10]);
    }

    #[test]
    fn test_douglas_peucker_keeps_corner() {
        let pts = vec![
            PointF::new(0.0, 0.0),
            PointF::new(5.0, 0.1),
            PointF::new(10.0, 0.0),
            PointF::new(10.0, 10.0),
        ];
        let simplified = douglas_peucker(&pts, 0.5);
        assert_eq!(simplified.len(), 3);
        assert_eq!(simplified[1], PointF::new(10.0, 0.0));
    }

    #[test]
    fn test_douglas_peucker_ring() {
        // A square sampled every unit along its edges.
        let mut ring = Vec::new();
        for i in 0..10 {
            ring.push(PointF::new(i as f64, 0.0));
        }
        for i in 0..10 {
            ring.push(PointF::new(10.0, i as f64));
        }
        for i in 0..10 {
            ring.push(PointF::new(10.0 - i as f64, 10.0));
        }
        for i in 0..10 {
            ring.push(PointF::new(0.0, 10.0 - i as f64));
        }
        let simplified = douglas_peucker_ring(&ring, 0.1);
        assert_eq!(simplified.len(), 4);
        assert!((super::super::polyline::signed_area(&simplified) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_remove_collinear_points() {
        let ring = vec![
            PointF::new(0.0, 0.0),
            PointF::new(0.5, 0.0),
            PointF::new(1.0, 0.0),
            PointF::new(1.0, 1.0),
            PointF::new(0.0, 1.0),
            PointF::new(0.0, 0.5),
        ];
        let result = remove_collinear_points(&ring, 1e-9);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_remove_duplicate_points() {
        let pts = vec![
            PointF::new(0.0, 0.0),
            PointF::new(0.0, 0.0),
            PointF::new(1.0, 0.0),
        ];
        assert_eq!(remove_duplicate_points(&pts, 1e-9).len(), 2);
        assert!(remove_duplicate_points(&[], 1.0).is_empty());
    }

    #[test]
    fn test_simplify_closed_polyline() {
        let pl = Polyline::closed_from_ring(vec![
            PointF::new(0.0, 0.0),
            PointF::new(2.0, 0.0),
            PointF::new(4.0, 0.0),
            PointF::new(4.0, 4.0),
            PointF::new(0.0, 4.0),
        ]);
        let s = simplify_polyline(&pl, 0.01);
        assert!(s.is_closed());
        assert_eq!(s.len(), 5);
    }
}
