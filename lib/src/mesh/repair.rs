//! Hole repair.
//!
//! Each open half-edge is followed around its hole: from the end vertex of a
//! boundary edge, the fan of triangles around that vertex is walked until the
//! next half-edge without a twin turns up. The collected loop is closed with a
//! triangle fan whose edges run opposite to the boundary, so insertion twins
//! them automatically.
//!
//! The local shapes this covers:
//! - only `e` open: the loop continues in some other triangle
//! - `e` and `next` open: the loop continues inside the same triangle
//! - `e` and `prev` open: the loop reaches `e` from the same triangle
//! - all three open: an isolated triangle, closed by its flipped duplicate

use super::{HalfEdgeId, HalfEdgeMesh, VertexId};
use log::{debug, warn};
use std::collections::HashSet;

/// Outcome of repairing one hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleFix {
    /// The hole was closed with this many new triangles.
    Filled(usize),
    /// The boundary could not be followed; nothing was added.
    Skipped,
}

impl HalfEdgeMesh {
    /// Close every hole that can be followed. Returns the number of holes closed.
    ///
    /// Never increases the number of boundary edges. Run
    /// [`HalfEdgeMesh::validate`] afterwards to see whether the result is
    /// watertight.
    pub fn fix_holes(&mut self) -> usize {
        let mut skipped: HashSet<HalfEdgeId> = HashSet::new();
        let mut filled = 0;
        let mut cursor = 0;

        while cursor < self.half_edges.len() {
            let id = HalfEdgeId(cursor as u32);
            if self.half_edges[cursor].twin.is_some() || skipped.contains(&id) {
                cursor += 1;
                continue;
            }
            match self.fix_hole(id) {
                HoleFix::Filled(n) => {
                    debug!("Closed hole at {} with {} triangles", id, n);
                    filled += 1;
                }
                HoleFix::Skipped => {
                    skipped.insert(id);
                    cursor += 1;
                }
            }
        }

        if !skipped.is_empty() {
            warn!(
                "{} boundary edges could not be repaired",
                self.boundary_edge_count()
            );
        }
        filled
    }

    /// Close the hole bordered by the open half-edge `e`.
    pub fn fix_hole(&mut self, e: HalfEdgeId) -> HoleFix {
        let he = self.half_edges[e.index()];
        if he.twin.is_some() {
            return HoleFix::Skipped;
        }

        let next = self.half_edges[he.next.index()];
        let prev = self.half_edges[he.prev.index()];
        if next.twin.is_none() && prev.twin.is_none() {
            // Isolated triangle: add its mirror image.
            let [a, b, c] = self.triangle_vertices(he.triangle);
            return match self.insert_triangle_ids(a, c, b) {
                Some(_) => HoleFix::Filled(1),
                None => HoleFix::Skipped,
            };
        }

        let Some(ring) = self.boundary_loop(e) else {
            return HoleFix::Skipped;
        };
        if ring.len() < 3 {
            debug!("Boundary loop at {} has only {} vertices", e, ring.len());
            return HoleFix::Skipped;
        }

        let mut added = 0;
        for i in 1..ring.len() - 1 {
            if self
                .insert_triangle_ids(ring[0], ring[i + 1], ring[i])
                .is_some()
            {
                added += 1;
            }
        }
        if added == 0 {
            HoleFix::Skipped
        } else {
            HoleFix::Filled(added)
        }
    }

    /// The next open half-edge leaving the end vertex of open half-edge `e`.
    fn next_boundary_edge(&self, e: HalfEdgeId) -> Option<HalfEdgeId> {
        let mut h = self.half_edges[e.index()].next;
        // Bounded fan walk; a non-manifold vertex could otherwise cycle.
        for _ in 0..self.half_edges.len() {
            match self.half_edges[h.index()].twin {
                None => return Some(h),
                Some(t) => {
                    h = self.half_edges[t.index()].next;
                    if h == self.half_edges[e.index()].next {
                        return None;
                    }
                }
            }
        }
        None
    }

    /// Vertices of the hole loop through `e`, starting at the origin of `e`.
    ///
    /// If the walk revisits a vertex before returning to `e` (two holes
    /// touching at a vertex), the loop is cut to the simple part that closed.
    fn boundary_loop(&self, e: HalfEdgeId) -> Option<Vec<VertexId>> {
        let mut vertices = vec![self.half_edges[e.index()].vertex];
        let mut current = e;

        for _ in 0..self.half_edges.len() {
            let next = self.next_boundary_edge(current)?;
            if next == e {
                return Some(vertices);
            }
            let origin = self.half_edges[next.index()].vertex;
            if let Some(pos) = vertices.iter().position(|&v| v == origin) {
                return Some(vertices.split_off(pos));
            }
            vertices.push(origin);
            current = next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::half_edge::tests::{box_triangles, unit_cube};
    use super::*;
    use crate::geometry::Vec3;

    #[test]
    fn test_closed_mesh_untouched() {
        let mut mesh = unit_cube();
        assert_eq!(mesh.fix_holes(), 0);
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_fix_missing_face() {
        // Drop the top quad: a four-edge hole.
        let mut mesh = HalfEdgeMesh::new();
        let tris = box_triangles(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        for (i, [a, b, c]) in tris.into_iter().enumerate() {
            if i == 2 || i == 3 {
                continue;
            }
            mesh.insert_triangle(a, b, c);
        }
        assert_eq!(mesh.boundary_edge_count(), 4);
        assert!(!mesh.validate());

        assert_eq!(mesh.fix_holes(), 1);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.boundary_edge_count(), 0);
        assert!(mesh.validate());

        // The patch faces outward like the rest of the cube.
        mesh.compute_normals();
        let patched = mesh.triangle(crate::mesh::TriangleId(10)).normal;
        assert!((patched - Vec3::UNIT_Z).length() < 1e-9);
    }

    #[test]
    fn test_fix_missing_triangle() {
        let mut mesh = HalfEdgeMesh::new();
        let tris = box_triangles(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        for (i, [a, b, c]) in tris.into_iter().enumerate() {
            if i != 7 {
                mesh.insert_triangle(a, b, c);
            }
        }
        assert_eq!(mesh.boundary_edge_count(), 3);
        assert_eq!(mesh.fix_holes(), 1);
        assert!(mesh.validate());
    }

    #[test]
    fn test_isolated_triangle_gets_flipped_duplicate() {
        let mut mesh = HalfEdgeMesh::new();
        mesh.insert_triangle(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert_eq!(mesh.fix_holes(), 1);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.validate());

        mesh.compute_normals();
        let n0 = mesh.triangle(crate::mesh::TriangleId(0)).normal;
        let n1 = mesh.triangle(crate::mesh::TriangleId(1)).normal;
        assert!((n0 + n1).length() < 1e-12);
    }

    #[test]
    fn test_repair_never_increases_boundary() {
        // An open strip of two triangles plus a cube with a missing face.
        let mut mesh = HalfEdgeMesh::new();
        let tris = box_triangles(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        for (i, [a, b, c]) in tris.into_iter().enumerate() {
            if i != 4 && i != 5 && i != 9 {
                mesh.insert_triangle(a, b, c);
            }
        }
        let before = mesh.boundary_edge_count();
        assert!(before > 0);
        mesh.fix_holes();
        let after = mesh.boundary_edge_count();
        assert!(after <= before);
        assert!(mesh.validate() || after > 0);
    }
}
