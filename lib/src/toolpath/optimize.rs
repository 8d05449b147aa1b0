//! Toolpath ordering and motion cleanup.
//!
//! Within a layer, strokes are grouped by role (in print order) and
//! extruder, then chained greedily: the next stroke is the one whose entry
//! point is nearest to where the previous one ended. Closed strokes may be
//! entered at any vertex (the seam), open strokes from either end.

use super::{MachineToolpath, Toolpath, ToolpathElement, ToolpathRole};
use crate::geometry::simplify::{remove_collinear_points, remove_duplicate_points};
use crate::geometry::PointF;
use crate::CoordF;
use log::trace;
use std::collections::BTreeMap;

/// Motions shorter than this are dropped.
const MIN_MOTION: CoordF = 1e-9;

/// Relative cross-product bound for merging collinear motions.
const COLLINEAR_TOLERANCE: CoordF = 1e-9;

#[derive(Debug, Clone)]
struct Stroke {
    points: Vec<PointF>,
    closed: bool,
}

impl Stroke {
    fn new(points: Vec<PointF>) -> Option<Self> {
        let mut points = remove_duplicate_points(&points, MIN_MOTION);
        if points.len() < 2 {
            return None;
        }
        let n = points.len();
        let closed = n >= 4 && points[0].approx_eq(points[n - 1], MIN_MOTION);
        if closed {
            points.pop();
            let mut ring = remove_collinear_points(&points, MIN_MOTION);
            ring.push(ring[0]);
            points = ring;
        } else {
            points = remove_collinear_open(&points);
        }
        Some(Self { points, closed })
    }

    fn first(&self) -> PointF {
        self.points[0]
    }

    fn last(&self) -> PointF {
        self.points[self.points.len() - 1]
    }

    /// Cheapest entry from `pos`: distance, vertex index, reversed.
    fn entry(&self, pos: PointF) -> (CoordF, usize, bool) {
        if self.closed {
            let ring = &self.points[..self.points.len() - 1];
            let mut best = (f64::INFINITY, 0, false);
            for (i, p) in ring.iter().enumerate() {
                let d = pos.distance_squared(*p);
                if d < best.0 {
                    best = (d, i, false);
                }
            }
            best
        } else {
            let to_start = pos.distance_squared(self.first());
            let to_end = pos.distance_squared(self.last());
            if to_end < to_start {
                (to_end, 0, true)
            } else {
                (to_start, 0, false)
            }
        }
    }

    /// Re-enter at vertex `seam` (closed) or flip direction (open).
    fn enter(&mut self, seam: usize, reverse: bool) {
        if self.closed {
            if seam > 0 {
                self.points.pop();
                self.points.rotate_left(seam);
                self.points.push(self.points[0]);
            }
        } else if reverse {
            self.points.reverse();
        }
    }
}

/// Drop interior points of an open path that lie on the segment between
/// their neighbours.
fn remove_collinear_open(points: &[PointF]) -> Vec<PointF> {
    let mut out: Vec<PointF> = Vec::with_capacity(points.len());
    for &p in points {
        while out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            if continues_straight(a, b, p) {
                out.pop();
            } else {
                break;
            }
        }
        out.push(p);
    }
    out
}

/// True if `a -> b -> c` keeps the same direction.
fn continues_straight(a: PointF, b: PointF, c: PointF) -> bool {
    let d1 = b - a;
    let d2 = c - b;
    d1.cross(d2).abs() <= COLLINEAR_TOLERANCE * d1.length() * d2.length() && d1.dot(d2) > 0.0
}

/// Chain strokes nearest-first, starting from `pos` and updating it.
fn order_strokes(mut remaining: Vec<Stroke>, pos: &mut Option<PointF>) -> Vec<Stroke> {
    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let (index, seam, reverse) = match *pos {
            Some(p) => {
                let mut best = (f64::INFINITY, 0, 0, false);
                for (i, stroke) in remaining.iter().enumerate() {
                    let (d, seam, reverse) = stroke.entry(p);
                    if d < best.0 {
                        best = (d, i, seam, reverse);
                    }
                }
                (best.1, best.2, best.3)
            }
            None => (0, 0, false),
        };
        let mut stroke = remaining.swap_remove(index);
        stroke.enter(seam, reverse);
        *pos = Some(stroke.last());
        ordered.push(stroke);
    }
    ordered
}

/// Drop zero-length motions and merge chained rapids and collinear print
/// motions. Markers pass through unchanged.
pub fn coalesce_motions(elements: &[ToolpathElement]) -> Vec<ToolpathElement> {
    let mut out: Vec<ToolpathElement> = Vec::with_capacity(elements.len());
    for &e in elements {
        let ToolpathElement::Motion { start, end, rapid } = e else {
            out.push(e);
            continue;
        };
        if start.distance(end) <= MIN_MOTION {
            continue;
        }
        if let Some(ToolpathElement::Motion {
            start: prev_start,
            end: prev_end,
            rapid: prev_rapid,
        }) = out.last_mut()
        {
            let chained = *prev_rapid == rapid && prev_end.approx_eq(start, MIN_MOTION);
            if chained && (rapid || continues_straight(*prev_start, *prev_end, end)) {
                *prev_end = end;
                continue;
            }
        }
        out.push(e);
    }
    out
}

/// Reorder and coalesce every layer of `toolpath` in place.
pub(crate) fn optimize(toolpath: &mut MachineToolpath) {
    let mut pos: Option<PointF> = None;
    for layer in toolpath.layers_mut() {
        let mut groups: BTreeMap<(ToolpathRole, u32), (CoordF, Vec<Stroke>)> = BTreeMap::new();
        for tp in std::mem::take(&mut layer.toolpaths) {
            let entry = groups
                .entry((tp.role, tp.extruder))
                .or_insert_with(|| (tp.z, Vec::new()));
            entry
                .1
                .extend(tp.strokes().into_iter().filter_map(Stroke::new));
        }

        for ((role, extruder), (z, strokes)) in groups {
            let count = strokes.len();
            let mut tp = Toolpath::new(z, role, extruder);
            let mut end: Option<PointF> = None;
            for stroke in order_strokes(strokes, &mut pos) {
                if let Some(e) = end {
                    tp.elements.push(ToolpathElement::rapid(e, stroke.first()));
                }
                for w in stroke.points.windows(2) {
                    tp.elements.push(ToolpathElement::print(w[0], w[1]));
                }
                end = Some(stroke.last());
            }
            tp.elements = coalesce_motions(&tp.elements);
            if !tp.is_empty() {
                trace!(
                    "Layer {}: {} {} strokes on extruder {}",
                    layer.index,
                    count,
                    role,
                    extruder
                );
                layer.toolpaths.push(tp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtruderAssignment;
    use crate::geometry::Polyline;
    use crate::toolpath::ToolpathAssembler;

    fn p(x: f64, y: f64) -> PointF {
        PointF::new(x, y)
    }

    fn line(a: PointF, b: PointF) -> Polyline {
        Polyline::from_points(vec![a, b])
    }

    #[test]
    fn test_coalesce_motions() {
        let elements = vec![
            ToolpathElement::print(p(0.0, 0.0), p(1.0, 0.0)),
            ToolpathElement::print(p(1.0, 0.0), p(1.0, 0.0)),
            ToolpathElement::print(p(1.0, 0.0), p(3.0, 0.0)),
            ToolpathElement::print(p(3.0, 0.0), p(3.0, 2.0)),
            ToolpathElement::rapid(p(3.0, 2.0), p(5.0, 2.0)),
            ToolpathElement::rapid(p(5.0, 2.0), p(5.0, 7.0)),
            ToolpathElement::SelectExtruder(1),
            ToolpathElement::print(p(5.0, 7.0), p(4.0, 7.0)),
        ];
        let out = coalesce_motions(&elements);
        assert_eq!(
            out,
            vec![
                ToolpathElement::print(p(0.0, 0.0), p(3.0, 0.0)),
                ToolpathElement::print(p(3.0, 0.0), p(3.0, 2.0)),
                ToolpathElement::rapid(p(3.0, 2.0), p(5.0, 7.0)),
                ToolpathElement::SelectExtruder(1),
                ToolpathElement::print(p(5.0, 7.0), p(4.0, 7.0)),
            ]
        );
    }

    #[test]
    fn test_reversal_not_merged() {
        let elements = vec![
            ToolpathElement::print(p(0.0, 0.0), p(2.0, 0.0)),
            ToolpathElement::print(p(2.0, 0.0), p(1.0, 0.0)),
        ];
        assert_eq!(coalesce_motions(&elements).len(), 2);
    }

    #[test]
    fn test_nearest_neighbour_with_reversal() {
        let mut asm = ToolpathAssembler::new(ExtruderAssignment::default());
        asm.append(
            0,
            0.1,
            ToolpathRole::Infill,
            &[
                line(p(0.0, 0.0), p(1.0, 0.0)),
                line(p(10.0, 0.0), p(11.0, 0.0)),
                line(p(3.0, 0.0), p(2.0, 0.0)),
            ],
        );
        asm.optimize();
        let layer = asm.toolpath().layer(0).unwrap();
        assert_eq!(layer.toolpaths.len(), 1);
        assert_eq!(
            layer.toolpaths[0].elements,
            vec![
                ToolpathElement::print(p(0.0, 0.0), p(1.0, 0.0)),
                ToolpathElement::rapid(p(1.0, 0.0), p(2.0, 0.0)),
                ToolpathElement::print(p(2.0, 0.0), p(3.0, 0.0)),
                ToolpathElement::rapid(p(3.0, 0.0), p(10.0, 0.0)),
                ToolpathElement::print(p(10.0, 0.0), p(11.0, 0.0)),
            ]
        );
    }

    #[test]
    fn test_role_order_and_seam() {
        let mut asm = ToolpathAssembler::new(ExtruderAssignment::default());
        asm.append(0, 0.1, ToolpathRole::Infill, &[line(p(1.0, 1.0), p(2.0, 1.0))]);
        // Square with a midpoint on its bottom edge.
        let first = Polyline::closed_from_ring(vec![
            p(0.0, 0.0),
            p(5.0, 0.0),
            p(10.0, 0.0),
            p(10.0, 10.0),
            p(0.0, 10.0),
        ]);
        let second = Polyline::closed_from_ring(vec![
            p(30.0, 10.0),
            p(20.0, 10.0),
            p(20.0, 0.0),
            p(30.0, 0.0),
        ]);
        asm.append(0, 0.1, ToolpathRole::Shell, &[first, second]);
        asm.optimize();
        assert!(asm.is_optimized());

        let layer = asm.toolpath().layer(0).unwrap();
        let roles: Vec<ToolpathRole> = layer.toolpaths.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![ToolpathRole::Shell, ToolpathRole::Infill]);

        let shell = &layer.toolpaths[0];
        let strokes = shell.strokes();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].len(), 5);
        assert_eq!(strokes[0][0], p(0.0, 0.0));
        // Entered at the vertex nearest to where the first square ended.
        assert_eq!(strokes[1][0], p(20.0, 0.0));
        assert_eq!(strokes[1].last(), Some(&p(20.0, 0.0)));
        assert!((shell.print_length() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_carries_across_layers() {
        let mut asm = ToolpathAssembler::new(ExtruderAssignment::default());
        asm.append(0, 0.1, ToolpathRole::Infill, &[line(p(0.0, 0.0), p(5.0, 0.0))]);
        asm.append(1, 0.3, ToolpathRole::Infill, &[line(p(0.0, 1.0), p(5.0, 1.0))]);
        asm.optimize();
        let next = &asm.toolpath().layer(1).unwrap().toolpaths[0];
        assert_eq!(next.start(), Some(p(5.0, 1.0)));
    }

    #[test]
    fn test_groups_by_extruder() {
        let mut extruders = ExtruderAssignment::default();
        extruders.support = 2;
        let mut asm = ToolpathAssembler::new(extruders);
        asm.append(0, 0.1, ToolpathRole::Support, &[line(p(0.0, 0.0), p(1.0, 0.0))]);
        asm.append(0, 0.1, ToolpathRole::Lid, &[line(p(0.0, 1.0), p(1.0, 1.0))]);
        asm.append(0, 0.1, ToolpathRole::Support, &[line(p(0.0, 2.0), p(1.0, 2.0))]);
        asm.optimize();
        let layer = asm.toolpath().layer(0).unwrap();
        assert_eq!(layer.toolpaths.len(), 2);
        assert_eq!(layer.toolpaths[0].extruder, 0);
        assert_eq!(layer.toolpaths[1].extruder, 2);
        assert_eq!(layer.toolpaths[1].strokes().len(), 2);
    }
}
