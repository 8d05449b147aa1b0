//! Printer kinds and what each of them can do.
//!
//! The slicing session never branches on a concrete printer driver. It asks
//! the [`Capabilities`] table of the configured [`PrinterKind`] which layer
//! features to produce and which serializer to hand the result to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output file format produced for a printer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// G-code motion program.
    #[default]
    GCode,
    /// DXF drawing with one LINE per motion.
    Dxf,
}

impl OutputFormat {
    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::GCode => "gcode",
            OutputFormat::Dxf => "dxf",
        }
    }
}

/// Kind of machine the toolpaths are generated for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterKind {
    /// Fused-filament extrusion printer.
    #[default]
    Fdm,
    /// Powder-bed binder printer: every layer is printed solid.
    Inkjet,
    /// Laser cutter: only the outline of each layer is traced.
    LaserCutter,
}

/// Feature switches for one printer kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Maximum number of shells (0 disables shells).
    pub max_shells: u32,
    /// Whether lids and bottoms are detected and filled.
    pub lids: bool,
    /// Whether sparse infill is produced.
    pub infill: bool,
    /// Whether support can be generated.
    pub support: bool,
    /// Whether a skirt is drawn around the first layer.
    pub skirt: bool,
    /// Whether roles may be assigned to different extruders.
    pub multi_extruder: bool,
    /// Whether solid regions are filled completely regardless of infill density.
    pub solid_fill: bool,
    /// Native output format.
    pub output_format: OutputFormat,
}

impl PrinterKind {
    /// Capability table for this printer kind.
    pub fn capabilities(&self) -> Capabilities {
        match self {
            PrinterKind::Fdm => Capabilities {
                max_shells: u32::MAX,
                lids: true,
                infill: true,
                support: true,
                skirt: true,
                multi_extruder: true,
                solid_fill: false,
                output_format: OutputFormat::GCode,
            },
            PrinterKind::Inkjet => Capabilities {
                max_shells: u32::MAX,
                lids: true,
                infill: true,
                support: false,
                skirt: false,
                multi_extruder: true,
                solid_fill: true,
                output_format: OutputFormat::GCode,
            },
            PrinterKind::LaserCutter => Capabilities {
                max_shells: 1,
                lids: false,
                infill: false,
                support: false,
                skirt: false,
                multi_extruder: false,
                solid_fill: false,
                output_format: OutputFormat::Dxf,
            },
        }
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            PrinterKind::Fdm => "FDM",
            PrinterKind::Inkjet => "Inkjet",
            PrinterKind::LaserCutter => "Laser cutter",
        }
    }
}

impl fmt::Display for PrinterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities() {
        let fdm = PrinterKind::Fdm.capabilities();
        assert!(fdm.support && fdm.skirt && fdm.infill);
        assert_eq!(fdm.output_format, OutputFormat::GCode);

        let laser = PrinterKind::LaserCutter.capabilities();
        assert_eq!(laser.max_shells, 1);
        assert!(!laser.lids && !laser.infill && !laser.support);
        assert_eq!(laser.output_format, OutputFormat::Dxf);

        assert!(PrinterKind::Inkjet.capabilities().solid_fill);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PrinterKind::LaserCutter).unwrap();
        assert_eq!(json, "\"laser_cutter\"");
        let kind: PrinterKind = serde_json::from_str("\"inkjet\"").unwrap();
        assert_eq!(kind, PrinterKind::Inkjet);
        assert_eq!(OutputFormat::Dxf.extension(), "dxf");
    }
}
