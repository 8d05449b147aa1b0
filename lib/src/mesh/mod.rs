//! Triangle mesh storage, repair and import.
//!
//! - [`HalfEdgeMesh`] - arena-backed half-edge mesh with vertex dedup
//! - [`HalfEdgeMesh::fix_holes`] - best-effort hole repair
//! - [`load_stl`], [`from_triangles`] and [`prepare`] - building a mesh ready for slicing

mod half_edge;
mod import;
mod index;
mod repair;

pub use half_edge::{
    HalfEdge, HalfEdgeId, HalfEdgeMesh, MeshReport, Triangle, TriangleId, Vertex, VertexId,
};
pub use import::{
    from_triangles, from_triangles_uv, load_stl, prepare, ImportError, ImportErrorCode,
};
pub use index::VERTEX_EPSILON;
pub use repair::HoleFix;

#[cfg(test)]
pub(crate) use half_edge::tests::{box_mesh, box_triangles, unit_cube};
