//! Slicing module - cuts meshes into per-layer rims.
//!
//! This module contains the core slicing functionality:
//! - [`slice_at`] - Mesh-plane intersection by adjacency walking
//! - [`Rim`] - One intersection loop at a given z
//! - [`layer_planes`] - Cutting plane heights for a z range
//! - [`surface`] - Lid/bottom/infill classification of layer rasters

mod plane_slicer;
mod rim;
pub mod surface;

pub use plane_slicer::slice_at;
pub use rim::{Rim, RimVertex};
pub use surface::{compose_lid_and_infill, LayerRegions, SurfaceType};

use crate::CoordF;

/// Cutting plane heights for the range `[z_min, z_max]`.
///
/// Planes sit at layer mid-height, `z_min + (i + 0.5) * layer_height`, and
/// there are `ceil((z_max - z_min) / layer_height)` of them.
pub fn layer_planes(z_min: CoordF, z_max: CoordF, layer_height: CoordF) -> Vec<CoordF> {
    if layer_height <= 0.0 || z_max <= z_min {
        return Vec::new();
    }
    let n = ((z_max - z_min) / layer_height - 1e-9).ceil().max(0.0) as usize;
    (0..n)
        .map(|i| z_min + (i as CoordF + 0.5) * layer_height)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_planes() {
        let planes = layer_planes(0.0, 20.0, 0.2);
        assert_eq!(planes.len(), 100);
        assert!((planes[0] - 0.1).abs() < 1e-12);
        assert!((planes[99] - 19.9).abs() < 1e-9);

        // A partial top layer still gets a plane.
        assert_eq!(layer_planes(1.0, 1.5, 0.2).len(), 3);
        assert!(layer_planes(0.0, 0.0, 0.2).is_empty());
        assert!(layer_planes(0.0, 1.0, 0.0).is_empty());
    }
}
