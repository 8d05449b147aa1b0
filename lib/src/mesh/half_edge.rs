//! Half-edge mesh with arena storage.
//!
//! Every triangle owns three half-edges linked `next`/`prev` in a cycle. Each
//! half-edge stores its origin vertex; its end is the origin of `next`. Two
//! half-edges running between the same vertices in opposite directions are
//! twins. A half-edge without a twin borders a hole.
//!
//! Handles are plain indices into the arenas. Nothing is ever removed from
//! the arenas except by [`HalfEdgeMesh::clear`], so a handle stays valid for
//! the lifetime of the mesh contents.

use super::index::VertexIndex;
use crate::geometry::{BoundingBox3F, PointF, Vec3};
use crate::CoordF;
use log::{debug, error};
use std::collections::HashMap;
use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Arena index of this handle.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(
    /// Handle to a vertex.
    VertexId
);
handle!(
    /// Handle to a half-edge.
    HalfEdgeId
);
handle!(
    /// Handle to a triangle.
    TriangleId
);

/// A canonical mesh vertex.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: PointF,
    normal_sum: Vec3,
    normal_count: u32,
}

impl Vertex {
    fn new(position: Vec3, uv: PointF) -> Self {
        Self {
            position,
            uv,
            normal_sum: Vec3::ZERO,
            normal_count: 0,
        }
    }

    /// Average of the incident triangle normals, or zero if there are none.
    pub fn normal(&self) -> Vec3 {
        if self.normal_count == 0 {
            Vec3::ZERO
        } else {
            self.normal_sum / self.normal_count as CoordF
        }
    }
}

/// A directed edge of one triangle.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// Origin vertex.
    pub vertex: VertexId,
    /// Owning triangle.
    pub triangle: TriangleId,
    pub next: HalfEdgeId,
    pub prev: HalfEdgeId,
    /// Opposite half-edge in the neighbouring triangle, if any.
    pub twin: Option<HalfEdgeId>,
}

/// A triangle, referenced through its first half-edge.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub edge: HalfEdgeId,
    pub normal: Vec3,
}

/// Summary of a mesh validation and repair run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshReport {
    pub vertices: usize,
    pub triangles: usize,
    pub half_edges: usize,
    /// Half-edges without a twin.
    pub boundary_edges: usize,
    /// Topology faults found by validation.
    pub faults: Vec<String>,
    /// True when every half-edge has a twin.
    pub watertight: bool,
    /// Boundary edges before hole repair ran.
    pub boundary_edges_before_repair: usize,
    /// Holes closed by repair.
    pub holes_filled: usize,
    /// Triangles added by repair.
    pub triangles_added: usize,
    /// Input triangles dropped because two corners merged.
    pub degenerate_triangles: usize,
}

impl fmt::Display for MeshReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vertices:        {}", self.vertices)?;
        writeln!(f, "Triangles:       {}", self.triangles)?;
        writeln!(f, "Half-edges:      {}", self.half_edges)?;
        writeln!(
            f,
            "Boundary edges:  {} (before repair: {})",
            self.boundary_edges, self.boundary_edges_before_repair
        )?;
        writeln!(
            f,
            "Holes filled:    {} ({} triangles)",
            self.holes_filled, self.triangles_added
        )?;
        writeln!(f, "Degenerate:      {}", self.degenerate_triangles)?;
        writeln!(f, "Faults:          {}", self.faults.len())?;
        write!(f, "Watertight:      {}", if self.watertight { "yes" } else { "no" })
    }
}

/// Triangle mesh with half-edge adjacency.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) half_edges: Vec<HalfEdge>,
    pub(crate) triangles: Vec<Triangle>,
    vertex_index: VertexIndex,
    edge_index: HashMap<(VertexId, VertexId), Vec<HalfEdgeId>>,
    bbox: BoundingBox3F,
    pub(crate) degenerate: usize,
}

impl HalfEdgeMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of half-edges.
    pub fn half_edge_count(&self) -> usize {
        self.half_edges.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True if the mesh holds no triangles.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Number of half-edges without a twin.
    pub fn boundary_edge_count(&self) -> usize {
        self.half_edges.iter().filter(|h| h.twin.is_none()).count()
    }

    /// Axis-aligned bounding box of all vertices.
    pub fn bounding_box(&self) -> BoundingBox3F {
        self.bbox
    }

    /// Vertex by handle.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Half-edge by handle.
    #[inline]
    pub fn half_edge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.half_edges[id.index()]
    }

    /// Triangle by handle.
    #[inline]
    pub fn triangle(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id.index()]
    }

    /// Iterate over all triangle handles.
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> {
        (0..self.triangles.len() as u32).map(TriangleId)
    }

    /// Iterate over all half-edge handles.
    pub fn half_edge_ids(&self) -> impl Iterator<Item = HalfEdgeId> {
        (0..self.half_edges.len() as u32).map(HalfEdgeId)
    }

    /// Iterate over all vertices.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// End vertex of a half-edge.
    #[inline]
    pub fn edge_end(&self, id: HalfEdgeId) -> VertexId {
        self.half_edges[self.half_edges[id.index()].next.index()].vertex
    }

    /// The three half-edges of a triangle, in cycle order.
    pub fn triangle_edges(&self, id: TriangleId) -> [HalfEdgeId; 3] {
        let e0 = self.triangles[id.index()].edge;
        let e1 = self.half_edges[e0.index()].next;
        let e2 = self.half_edges[e1.index()].next;
        [e0, e1, e2]
    }

    /// The three vertices of a triangle, in winding order.
    pub fn triangle_vertices(&self, id: TriangleId) -> [VertexId; 3] {
        self.triangle_edges(id)
            .map(|e| self.half_edges[e.index()].vertex)
    }

    /// The three corner positions of a triangle, in winding order.
    pub fn vertex_positions(&self, id: TriangleId) -> [Vec3; 3] {
        self.triangle_vertices(id)
            .map(|v| self.vertices[v.index()].position)
    }

    /// Neighbouring triangle across each edge, `None` across a hole.
    pub fn neighbours(&self, id: TriangleId) -> [Option<TriangleId>; 3] {
        self.triangle_edges(id).map(|e| {
            self.half_edges[e.index()]
                .twin
                .map(|t| self.half_edges[t.index()].triangle)
        })
    }

    /// Find or create the canonical vertex at `position`.
    pub fn insert_vertex(&mut self, position: Vec3, uv: PointF) -> VertexId {
        let vertices = &self.vertices;
        if let Some(id) = self
            .vertex_index
            .find(position, |id| vertices[id.index()].position)
        {
            return id;
        }
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex::new(position, uv));
        self.vertex_index.insert(position, id);
        self.bbox.merge_point(position);
        id
    }

    /// Insert a triangle by corner positions.
    ///
    /// Corners are deduplicated against existing vertices. Returns `None`
    /// when two corners collapse onto the same vertex.
    pub fn insert_triangle(&mut self, p0: Vec3, p1: Vec3, p2: Vec3) -> Option<TriangleId> {
        self.insert_triangle_uv([p0, p1, p2], [PointF::zero(); 3])
    }

    /// Insert a triangle with texture coordinates.
    pub fn insert_triangle_uv(
        &mut self,
        positions: [Vec3; 3],
        uvs: [PointF; 3],
    ) -> Option<TriangleId> {
        let a = self.insert_vertex(positions[0], uvs[0]);
        let b = self.insert_vertex(positions[1], uvs[1]);
        let c = self.insert_vertex(positions[2], uvs[2]);
        let tri = self.insert_triangle_ids(a, b, c);
        if tri.is_none() {
            self.degenerate += 1;
            debug!("Dropped degenerate triangle {:?}", positions);
        }
        tri
    }

    /// Insert a triangle over existing vertices and link twins.
    pub(crate) fn insert_triangle_ids(
        &mut self,
        a: VertexId,
        b: VertexId,
        c: VertexId,
    ) -> Option<TriangleId> {
        if a == b || b == c || c == a {
            return None;
        }

        let tri = TriangleId(self.triangles.len() as u32);
        let base = self.half_edges.len() as u32;
        let corners = [a, b, c];

        for i in 0..3u32 {
            self.half_edges.push(HalfEdge {
                vertex: corners[i as usize],
                triangle: tri,
                next: HalfEdgeId(base + (i + 1) % 3),
                prev: HalfEdgeId(base + (i + 2) % 3),
                twin: None,
            });
        }

        for i in 0..3usize {
            let id = HalfEdgeId(base + i as u32);
            let from = corners[i];
            let to = corners[(i + 1) % 3];

            let twin = self.edge_index.get(&(to, from)).and_then(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .find(|&h| self.half_edges[h.index()].twin.is_none())
            });
            if let Some(twin) = twin {
                self.half_edges[id.index()].twin = Some(twin);
                self.half_edges[twin.index()].twin = Some(id);
            }
            self.edge_index.entry((from, to)).or_default().push(id);
        }

        let [p0, p1, p2] = corners.map(|v| self.vertices[v.index()].position);
        self.triangles.push(Triangle {
            edge: HalfEdgeId(base),
            normal: (p1 - p0).cross(p2 - p0).normalize(),
        });
        Some(tri)
    }

    /// Check topology consistency.
    ///
    /// Returns true when every half-edge has a twin. Consistency faults panic
    /// in debug builds and are logged in release builds.
    pub fn validate(&self) -> bool {
        self.check().watertight
    }

    /// Check topology consistency and return the full report.
    pub fn check(&self) -> MeshReport {
        let mut faults = Vec::new();
        let mut boundary = 0;
        let n_he = self.half_edges.len();

        for (i, he) in self.half_edges.iter().enumerate() {
            let id = HalfEdgeId(i as u32);

            if he.vertex.index() >= self.vertices.len() {
                fault(&mut faults, format!("{} references missing {}", id, he.vertex));
            }
            if he.next.index() >= n_he || he.prev.index() >= n_he {
                fault(&mut faults, format!("{} has a dangling next/prev link", id));
                continue;
            }
            if self.half_edges[he.next.index()].prev != id
                || self.half_edges[he.prev.index()].next != id
            {
                fault(&mut faults, format!("{} next/prev links are not mutual", id));
            }
            match self.triangles.get(he.triangle.index()) {
                None => fault(&mut faults, format!("{} references missing {}", id, he.triangle)),
                Some(_) => {
                    if !self.triangle_edges(he.triangle).contains(&id) {
                        fault(
                            &mut faults,
                            format!("{} is not in the cycle of {}", id, he.triangle),
                        );
                    }
                }
            }
            match he.twin {
                None => boundary += 1,
                Some(t) if t == id => fault(&mut faults, format!("{} is its own twin", id)),
                Some(t) if t.index() >= n_he => {
                    fault(&mut faults, format!("{} has a dangling twin", id))
                }
                Some(t) => {
                    let tw = &self.half_edges[t.index()];
                    if tw.twin != Some(id) {
                        fault(&mut faults, format!("{} twin {} is not mutual", id, t));
                    } else if tw.vertex != self.edge_end(id) || self.edge_end(t) != he.vertex {
                        fault(&mut faults, format!("{} twin {} endpoints differ", id, t));
                    }
                }
            }
        }

        MeshReport {
            vertices: self.vertices.len(),
            triangles: self.triangles.len(),
            half_edges: n_he,
            boundary_edges: boundary,
            watertight: boundary == 0 && faults.is_empty(),
            faults,
            degenerate_triangles: self.degenerate,
            ..Default::default()
        }
    }

    /// Recompute triangle normals and accumulate vertex normals.
    pub fn compute_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal_sum = Vec3::ZERO;
            v.normal_count = 0;
        }
        for t in 0..self.triangles.len() {
            let tri = TriangleId(t as u32);
            let ids = self.triangle_vertices(tri);
            let [p0, p1, p2] = ids.map(|v| self.vertices[v.index()].position);
            let normal = (p1 - p0).cross(p2 - p0).normalize();
            self.triangles[t].normal = normal;
            for v in ids {
                let vertex = &mut self.vertices[v.index()];
                vertex.normal_sum += normal;
                vertex.normal_count += 1;
            }
        }
    }

    /// Shift every vertex by `offset`.
    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position += offset;
        }
        self.rebuild_spatial();
    }

    /// Rotate every vertex about the Z axis through the origin.
    pub fn rotate_z(&mut self, angle: CoordF) {
        self.rotate(Vec3::UNIT_Z, angle);
    }

    /// Rotate every vertex about `axis` through the origin.
    pub fn rotate(&mut self, axis: Vec3, angle: CoordF) {
        for v in &mut self.vertices {
            v.position = v.position.rotate(axis, angle);
        }
        self.rebuild_spatial();
        self.compute_normals();
    }

    /// Remove all vertices, half-edges and triangles.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn rebuild_spatial(&mut self) {
        self.vertex_index.clear();
        self.bbox = BoundingBox3F::new();
        for (i, v) in self.vertices.iter().enumerate() {
            self.vertex_index.insert(v.position, VertexId(i as u32));
            self.bbox.merge_point(v.position);
        }
    }
}

fn fault(faults: &mut Vec<String>, message: String) {
    if cfg!(debug_assertions) {
        panic!("mesh topology fault: {}", message);
    }
    error!("Mesh topology fault: {}", message);
    faults.push(message);
}
