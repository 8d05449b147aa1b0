#![allow(dead_code)]

use raster_slicer::mesh::{from_triangles, prepare};
use raster_slicer::{HalfEdgeMesh, PrintConfig, Vec3};

/// Triangles of an axis-aligned box, outward facing.
pub fn box_triangles(min: Vec3, max: Vec3) -> Vec<[Vec3; 3]> {
    let v = |i: usize| {
        Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        )
    };
    let quads = [
        [0, 2, 3, 1],
        [4, 5, 7, 6],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 4, 6, 2],
        [1, 3, 7, 5],
    ];
    let mut tris = Vec::new();
    for q in quads {
        tris.push([v(q[0]), v(q[1]), v(q[2])]);
        tris.push([v(q[0]), v(q[2]), v(q[3])]);
    }
    tris
}

/// A prepared mesh made of the given boxes.
pub fn boxes(corners: &[(Vec3, Vec3)]) -> HalfEdgeMesh {
    let tris: Vec<[Vec3; 3]> = corners
        .iter()
        .flat_map(|&(min, max)| box_triangles(min, max))
        .collect();
    let mut mesh = from_triangles(tris, "boxes").unwrap();
    let report = prepare(&mut mesh);
    assert!(report.watertight);
    mesh
}

/// A prepared cube of side `size` with its corner at the origin.
pub fn cube(size: f64) -> HalfEdgeMesh {
    boxes(&[(Vec3::new(0.0, 0.0, 0.0), Vec3::new(size, size, size))])
}

/// A 40 mm bed at 0.1 mm per pixel with 0.2 mm layers.
pub fn fine_config() -> PrintConfig {
    PrintConfig::default()
        .bed_size(40.0, 40.0)
        .raster_resolution(400)
        .layer_height(0.2)
        .nozzle_diameter(0.4)
        .shells(2)
        .lids(3, 3)
        .support(false)
}

/// A 40 mm bed at 0.4 mm per pixel and 1 mm layers, for fast runs.
pub fn coarse_config() -> PrintConfig {
    PrintConfig::default()
        .bed_size(40.0, 40.0)
        .raster_resolution(100)
        .layer_height(1.0)
        .nozzle_diameter(0.8)
        .shells(1)
        .lids(1, 1)
        .skirt(false)
        .support(false)
}
