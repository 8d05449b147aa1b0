//! Mesh import.
//!
//! Any triangle stream can be folded into a [`HalfEdgeMesh`]; STL files are
//! read with `stl_io`, which handles both the ASCII and binary variants.
//! [`prepare`] runs the standard clean-up sequence on a freshly built mesh.

use super::{HalfEdgeMesh, MeshReport};
use crate::geometry::{PointF, Vec3};
use crate::Result;
use log::{info, warn};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;

/// Category of an import failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportErrorCode {
    /// The file could not be opened.
    FileOpen,
    /// The data is not in a recognized format.
    UnrecognizedFormat,
    /// Coordinates are missing or not finite.
    CorruptGeometry,
    /// The input contained no usable triangles.
    EmptyMesh,
}

impl ImportErrorCode {
    fn describe(&self) -> &'static str {
        match self {
            ImportErrorCode::FileOpen => "cannot open file",
            ImportErrorCode::UnrecognizedFormat => "unrecognized format",
            ImportErrorCode::CorruptGeometry => "corrupt geometry",
            ImportErrorCode::EmptyMesh => "no triangles",
        }
    }
}

/// An input error with its location and, if any, the OS error number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub code: ImportErrorCode,
    /// File path or stream name.
    pub location: String,
    pub detail: Option<String>,
    pub os_error: Option<i32>,
}

impl ImportError {
    pub fn new(code: ImportErrorCode, location: impl Into<String>) -> Self {
        Self {
            code,
            location: location.into(),
            detail: None,
            os_error: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_os_error(mut self, code: Option<i32>) -> Self {
        self.os_error = code;
        self
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.code.describe())?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        if let Some(errno) = self.os_error {
            write!(f, " [os error {}]", errno)?;
        }
        Ok(())
    }
}

impl std::error::Error for ImportError {}

/// Build a mesh from a stream of triangles.
///
/// Fails with [`ImportErrorCode::CorruptGeometry`] on non-finite coordinates
/// and [`ImportErrorCode::EmptyMesh`] if nothing survives insertion.
pub fn from_triangles<I>(triangles: I, location: &str) -> Result<HalfEdgeMesh>
where
    I: IntoIterator<Item = [Vec3; 3]>,
{
    from_triangles_uv(
        triangles.into_iter().map(|t| (t, [PointF::zero(); 3])),
        location,
    )
}

/// Build a mesh from a stream of triangles with texture coordinates.
pub fn from_triangles_uv<I>(triangles: I, location: &str) -> Result<HalfEdgeMesh>
where
    I: IntoIterator<Item = ([Vec3; 3], [PointF; 3])>,
{
    let mut mesh = HalfEdgeMesh::new();
    for (index, (positions, uvs)) in triangles.into_iter().enumerate() {
        if !positions.iter().all(|p| p.is_finite()) {
            return Err(ImportError::new(ImportErrorCode::CorruptGeometry, location)
                .with_detail(format!("triangle {} has non-finite coordinates", index))
                .into());
        }
        mesh.insert_triangle_uv(positions, uvs);
    }
    if mesh.is_empty() {
        return Err(ImportError::new(ImportErrorCode::EmptyMesh, location).into());
    }
    Ok(mesh)
}

/// Load an ASCII or binary STL file.
pub fn load_stl<P: AsRef<Path>>(path: P) -> Result<HalfEdgeMesh> {
    let path = path.as_ref();
    let location = path.display().to_string();

    let file = File::open(path).map_err(|e| {
        ImportError::new(ImportErrorCode::FileOpen, location.as_str())
            .with_detail(e.to_string())
            .with_os_error(e.raw_os_error())
    })?;
    let mut reader = BufReader::new(file);

    let stl = stl_io::create_stl_reader(&mut reader).map_err(|e| {
        ImportError::new(ImportErrorCode::UnrecognizedFormat, location.as_str())
            .with_detail(e.to_string())
            .with_os_error(e.raw_os_error())
    })?;

    let mut triangles = Vec::new();
    for tri in stl {
        let tri = tri.map_err(|e| {
            let code = match e.kind() {
                ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
                    ImportErrorCode::CorruptGeometry
                }
                _ => ImportErrorCode::UnrecognizedFormat,
            };
            ImportError::new(code, location.as_str())
                .with_detail(e.to_string())
                .with_os_error(e.raw_os_error())
        })?;
        let corner = |i: usize| {
            Vec3::new(
                tri.vertices[i][0] as f64,
                tri.vertices[i][1] as f64,
                tri.vertices[i][2] as f64,
            )
        };
        triangles.push([corner(0), corner(1), corner(2)]);
    }

    info!("Read {} triangles from {}", triangles.len(), location);
    from_triangles(triangles, &location)
}

/// Validate, repair holes, validate again and compute normals.
pub fn prepare(mesh: &mut HalfEdgeMesh) -> MeshReport {
    let before = mesh.check();
    let mut holes_filled = 0;
    let triangles_before = mesh.triangle_count();

    if !before.watertight {
        holes_filled = mesh.fix_holes();
    }

    let mut report = mesh.check();
    report.boundary_edges_before_repair = before.boundary_edges;
    report.holes_filled = holes_filled;
    report.triangles_added = mesh.triangle_count() - triangles_before;

    if report.boundary_edges > 0 {
        warn!(
            "Mesh still has {} boundary edges after repair",
            report.boundary_edges
        );
    }
    mesh.compute_normals();
    info!(
        "Prepared mesh: {} vertices, {} triangles, {} holes filled, watertight: {}",
        report.vertices, report.triangles, report.holes_filled, report.watertight
    );
    report
}

#[cfg(test)]
mod tests {
    use super::super::half_edge::tests::box_triangles;
    use super::*;
    use crate::Error;
    use std::io::Write;

    #[test]
    fn test_from_triangles() {
        let mesh = from_triangles(
            box_triangles(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0)),
            "box",
        )
        .unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.validate());
    }

    #[test]
    fn test_empty_input() {
        let err = from_triangles(Vec::new(), "empty").unwrap_err();
        match err {
            Error::Import(e) => {
                assert_eq!(e.code, ImportErrorCode::EmptyMesh);
                assert_eq!(e.location, "empty");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_input() {
        let bad = [[
            Vec3::new(f64::NAN, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]];
        match from_triangles(bad, "bad").unwrap_err() {
            Error::Import(e) => assert_eq!(e.code, ImportErrorCode::CorruptGeometry),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        match load_stl("/nonexistent/model.stl").unwrap_err() {
            Error::Import(e) => {
                assert_eq!(e.code, ImportErrorCode::FileOpen);
                assert!(e.os_error.is_some());
                assert!(e.to_string().contains("/nonexistent/model.stl"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_load_ascii_stl() {
        let path = std::env::temp_dir().join("raster_slicer_import_test.stl");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "solid t").unwrap();
            for [a, b, c] in box_triangles(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0)) {
                writeln!(f, "facet normal 0 0 0\nouter loop").unwrap();
                for p in [a, b, c] {
                    writeln!(f, "vertex {} {} {}", p.x, p.y, p.z).unwrap();
                }
                writeln!(f, "endloop\nendfacet").unwrap();
            }
            writeln!(f, "endsolid t").unwrap();
        }
        let mut mesh = load_stl(&path).unwrap();
        let report = prepare(&mut mesh);
        assert_eq!(report.triangles, 12);
        assert!(report.watertight);
        assert_eq!(report.holes_filled, 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_prepare_repairs() {
        let tris: Vec<[Vec3; 3]> = box_triangles(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0))
            .into_iter()
            .skip(2)
            .collect();
        let mut mesh = from_triangles(tris, "open box").unwrap();
        let report = prepare(&mut mesh);
        assert_eq!(report.boundary_edges_before_repair, 4);
        assert_eq!(report.boundary_edges, 0);
        assert_eq!(report.holes_filled, 1);
        assert_eq!(report.triangles_added, 2);
        assert!(report.watertight);
        assert!(mesh.vertices().all(|v| v.normal().length() > 0.0));
    }
}
