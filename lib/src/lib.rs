//! # Raster Slicer
//!
//! A layer-raster slicing core for 3D printers and related machines.
//!
//! This library turns a triangle mesh into per-layer machine toolpaths:
//! - Half-edge mesh construction with vertex dedup, validation and hole repair
//! - Plane slicing into closed polygon rims
//! - Rasterized layer compositing (shells, lids, infill, support) built from
//!   boolean and morphological bitmap operations
//! - Outline tracing back to polylines, toolpath ordering and G-code/DXF output
//!
//! ## Example
//!
//! ```rust,ignore
//! use raster_slicer::{mesh, CancellationToken, PrintConfig, SliceSession};
//!
//! let mut mesh = mesh::load_stl("model.stl")?;
//! let report = mesh::prepare(&mut mesh);
//! let mut session = SliceSession::new(PrintConfig::default())?;
//! session.load_mesh(mesh);
//! session.run(&CancellationToken::new(), |_| {})?;
//! session.write_gcode(&mut std::fs::File::create("out.gcode")?)?;
//! ```

pub mod config;
pub mod dxf;
pub mod gcode;
pub mod geometry;
pub mod mesh;
pub mod pipeline;
pub mod raster;
pub mod slice;
pub mod toolpath;

pub use config::{Capabilities, InfillPattern, OutputFormat, PrintConfig, PrinterKind};
pub use dxf::DxfWriter;
pub use gcode::{GCodeCommand, GCodeWriter};
pub use geometry::{BoundingBox3F, BoundingBoxF, PointF, Polyline, Polylines, Vec3};
pub use mesh::{
    HalfEdgeId, HalfEdgeMesh, ImportError, ImportErrorCode, MeshReport, TriangleId, VertexId,
};
pub use pipeline::{
    CancellationToken, LayerSummary, Pass, Progress, SliceOutcome, SliceSession, SliceState,
};
pub use raster::{FillRule, InfillOverlay, LayerRaster, RasterGrid, TraceParams, TurnPolicy};
pub use slice::{slice_at, Rim, RimVertex};
pub use toolpath::{
    LayerToolpath, MachineToolpath, Toolpath, ToolpathAssembler, ToolpathElement, ToolpathRole,
    ToolpathStats, ToolpathWriter,
};

/// Floating-point coordinate type (millimetres unless stated otherwise).
pub type CoordF = f64;

/// Result type used throughout the slicer.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for slicer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Slicing error: {0}")]
    Slicing(String),

    #[error("Raster error: {0}")]
    Raster(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("layer height must be positive".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: layer height must be positive"
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_import_error_conversion() {
        let err: Error = ImportError::new(ImportErrorCode::EmptyMesh, "cube.stl").into();
        assert!(matches!(err, Error::Import(_)));
        assert!(err.to_string().contains("cube.stl"));
    }
}
