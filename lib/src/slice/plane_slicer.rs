//! Mesh-plane intersection by walking triangle adjacency.
//!
//! A triangle straddles the plane when one or two of its corners lie below
//! it. Inside a straddling triangle exactly one edge runs from below to
//! at-or-above (the entry) and exactly one runs back down (the exit). The walk
//! records the exit crossing, steps through its twin into the neighbour, where
//! the twin is the neighbour's entry, and repeats until it is back at the
//! start triangle.
//!
//! Vertices exactly on the plane count as above, so every corner is
//! classified the same way from every triangle that shares it.

use super::{Rim, RimVertex};
use crate::geometry::Vec3;
use crate::mesh::{HalfEdgeId, HalfEdgeMesh, TriangleId};
use crate::CoordF;
use log::{debug, warn};

/// Intersect `mesh` with the plane at height `z`.
///
/// Returns one rim per connected intersection loop. Loops of an
/// outward-oriented mesh come out counter-clockwise around material and
/// clockwise around holes.
pub fn slice_at(mesh: &HalfEdgeMesh, z: CoordF) -> Vec<Rim> {
    let walker = RimWalker { mesh, z };
    let mut visited = vec![false; mesh.triangle_count()];
    let mut rims = Vec::new();

    for tri in mesh.triangle_ids() {
        if visited[tri.index()] {
            continue;
        }
        let below = mesh
            .triangle_vertices(tri)
            .iter()
            .filter(|&&v| mesh.vertex(v).position.z < z)
            .count();
        if below == 0 || below == 3 {
            visited[tri.index()] = true;
            continue;
        }
        let Some(entry) = walker.entry_edge(tri) else {
            visited[tri.index()] = true;
            continue;
        };

        let mut rim = walker.walk(tri, entry, &mut visited);
        if rim.len() >= 2 {
            rim.reverse();
            rims.push(rim);
        }
    }

    debug!(
        "Sliced z={:.4}: {} rims ({} open)",
        z,
        rims.len(),
        rims.iter().filter(|r| !r.closed).count()
    );
    rims
}

struct RimWalker<'a> {
    mesh: &'a HalfEdgeMesh,
    z: CoordF,
}

impl RimWalker<'_> {
    #[inline]
    fn is_below(&self, e: HalfEdgeId) -> bool {
        self.mesh.vertex(self.mesh.half_edge(e).vertex).position.z < self.z
    }

    #[inline]
    fn end_is_below(&self, e: HalfEdgeId) -> bool {
        self.mesh.vertex(self.mesh.edge_end(e)).position.z < self.z
    }

    /// The below-to-above edge of a straddling triangle.
    fn entry_edge(&self, tri: TriangleId) -> Option<HalfEdgeId> {
        self.mesh
            .triangle_edges(tri)
            .into_iter()
            .find(|&e| self.is_below(e) && !self.end_is_below(e))
    }

    /// The above-to-below edge, chosen by the corner opposite the entry.
    fn exit_edge(&self, entry: HalfEdgeId) -> HalfEdgeId {
        let he = self.mesh.half_edge(entry);
        if self.is_below(he.prev) {
            he.next
        } else {
            he.prev
        }
    }

    /// Plane crossing on edge `e`.
    ///
    /// Endpoints are ordered below-then-above regardless of the edge direction,
    /// so both half-edges of a pair yield bit-identical points.
    fn crossing(&self, e: HalfEdgeId) -> RimVertex {
        let a = self.mesh.vertex(self.mesh.half_edge(e).vertex);
        let b = self.mesh.vertex(self.mesh.edge_end(e));
        let (lo, hi) = if a.position.z < self.z { (a, b) } else { (b, a) };

        let dz = lo.position.z - hi.position.z;
        let m = if dz == 0.0 {
            0.0
        } else {
            (self.z - hi.position.z) / dz
        };
        let p = hi.position + (lo.position - hi.position) * m;
        RimVertex {
            position: Vec3::new(p.x, p.y, self.z),
            uv: hi.uv + (lo.uv - hi.uv) * m,
        }
    }

    fn walk(&self, start: TriangleId, start_entry: HalfEdgeId, visited: &mut [bool]) -> Rim {
        visited[start.index()] = true;
        let mut points = vec![self.crossing(start_entry)];
        let mut entry = start_entry;

        let closed = loop {
            let exit = self.exit_edge(entry);
            points.push(self.crossing(exit));

            let Some(twin) = self.mesh.half_edge(exit).twin else {
                warn!(
                    "Open rim at z={:.4}: {} has no neighbour across {}",
                    self.z,
                    self.mesh.half_edge(exit).triangle,
                    exit
                );
                break false;
            };
            let next = self.mesh.half_edge(twin).triangle;
            if next == start {
                break true;
            }
            if visited[next.index()] {
                warn!("Open rim at z={:.4}: {} was already walked", self.z, next);
                break false;
            }
            if !(self.is_below(twin) && !self.end_is_below(twin)) {
                warn!(
                    "Open rim at z={:.4}: unexpected winding in {}",
                    self.z, next
                );
                break false;
            }
            visited[next.index()] = true;
            entry = twin;
        };

        if closed {
            // The final exit is the start triangle's entry.
            points.pop();
        } else {
            let mut prefix = self.walk_back(start_entry, visited);
            prefix.reverse();
            prefix.extend(points);
            points = prefix;
        }

        // Corners lying exactly on the plane are reached from both sides.
        points.dedup_by(|b, a| a.position == b.position);
        if closed && points.len() > 1 && points[0].position == points[points.len() - 1].position {
            points.pop();
        }

        Rim {
            vertices: points,
            closed,
        }
    }

    /// Follow an open rim backwards from the start triangle's entry edge.
    fn walk_back(&self, start_entry: HalfEdgeId, visited: &mut [bool]) -> Vec<RimVertex> {
        let mut points = Vec::new();
        let mut entry = start_entry;
        while let Some(twin) = self.mesh.half_edge(entry).twin {
            let prev_tri = self.mesh.half_edge(twin).triangle;
            if visited[prev_tri.index()] {
                break;
            }
            let Some(prev_entry) = self.entry_edge(prev_tri) else {
                break;
            };
            if self.exit_edge(prev_entry) != twin {
                break;
            }
            visited[prev_tri.index()] = true;
            points.push(self.crossing(prev_entry));
            entry = prev_entry;
        }
        points
    }
}
