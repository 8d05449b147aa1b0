//! Position-keyed vertex index.
//!
//! Vertices are bucketed by the integer part of `|p| / VERTEX_EPSILON`. Two
//! positions closer than the epsilon have lengths closer than the epsilon too,
//! so a lookup only has to visit the key's bucket and its two neighbours.

use super::VertexId;
use crate::geometry::Vec3;
use crate::CoordF;
use std::collections::HashMap;

/// Distance under which two positions are the same vertex (mm).
pub const VERTEX_EPSILON: CoordF = 1e-4;

#[derive(Debug, Clone, Default)]
pub(crate) struct VertexIndex {
    buckets: HashMap<i64, Vec<VertexId>>,
}

impl VertexIndex {
    fn key(position: Vec3) -> i64 {
        (position.length() / VERTEX_EPSILON).floor() as i64
    }

    /// Find an indexed vertex within [`VERTEX_EPSILON`] of `position`.
    ///
    /// `position_of` resolves a handle to its stored position.
    pub fn find<F>(&self, position: Vec3, position_of: F) -> Option<VertexId>
    where
        F: Fn(VertexId) -> Vec3,
    {
        let key = Self::key(position);
        let eps_sq = VERTEX_EPSILON * VERTEX_EPSILON;
        (key - 1..=key + 1)
            .filter_map(|k| self.buckets.get(&k))
            .flatten()
            .copied()
            .find(|&id| (position_of(id) - position).length_squared() < eps_sq)
    }

    pub fn insert(&mut self, position: Vec3, id: VertexId) {
        self.buckets.entry(Self::key(position)).or_default().push(id);
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
