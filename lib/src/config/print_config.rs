//! Print configuration.
//!
//! One plain struct holds every setting the slicing session reads. Profiles
//! are stored as JSON; fields missing from a profile keep their defaults so a
//! profile only needs to name what it changes.

use super::{OutputFormat, PrinterKind};
use crate::raster::TraceParams;
use crate::toolpath::ToolpathRole;
use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Fill pattern for lids and infill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfillPattern {
    /// Parallel lines joined at their ends, alternating direction per layer.
    #[default]
    Zigzag,
    /// Nested loops following the region outline.
    Concentric,
}

impl InfillPattern {
    /// Display name.
    pub fn name(&self) -> &'static str {
        match self {
            InfillPattern::Zigzag => "zigzag",
            InfillPattern::Concentric => "concentric",
        }
    }
}

impl std::str::FromStr for InfillPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zigzag" => Ok(InfillPattern::Zigzag),
            "concentric" => Ok(InfillPattern::Concentric),
            other => Err(Error::Config(format!("unknown fill pattern '{}'", other))),
        }
    }
}

/// Extruder index used for each toolpath role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtruderAssignment {
    pub skirt: u32,
    pub shell: u32,
    pub lid: u32,
    pub infill: u32,
    pub support: u32,
}

impl ExtruderAssignment {
    /// Extruder for a role.
    pub fn for_role(&self, role: ToolpathRole) -> u32 {
        match role {
            ToolpathRole::Skirt => self.skirt,
            ToolpathRole::Shell => self.shell,
            ToolpathRole::Lid => self.lid,
            ToolpathRole::Infill => self.infill,
            ToolpathRole::Support => self.support,
        }
    }
}

/// Main print configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    // === Machine ===
    /// Kind of machine the output is for.
    pub printer_kind: PrinterKind,
    /// Bed size X (mm).
    pub bed_size_x: CoordF,
    /// Bed size Y (mm).
    pub bed_size_y: CoordF,
    /// Bed origin X in machine coordinates (mm).
    pub bed_origin_x: CoordF,
    /// Bed origin Y in machine coordinates (mm).
    pub bed_origin_y: CoordF,
    /// Center the model on the bed and drop it to z = 0 before slicing.
    pub auto_center: bool,
    /// Raster resolution in pixels along the longer bed axis.
    pub raster_resolution: u32,

    // === Layers and extrusion ===
    /// Layer height (mm).
    pub layer_height: CoordF,
    /// Nozzle diameter (mm). Also the extrusion width.
    pub nozzle_diameter: CoordF,
    /// Filament diameter (mm).
    pub filament_diameter: CoordF,
    /// Extrusion multiplier (flow rate adjustment).
    pub extrusion_multiplier: CoordF,

    // === Shells, lids and infill ===
    /// Number of shells (perimeter rings).
    pub shell_count: u32,
    /// Number of solid layers under a top surface.
    pub lid_count: u32,
    /// Number of solid layers above a bottom surface.
    pub bottom_count: u32,
    /// Pattern used for lids and bottoms.
    pub lid_pattern: InfillPattern,
    /// Sparse infill density (0.0 - 1.0).
    pub infill_density: CoordF,
    /// Sparse infill pattern.
    pub infill_pattern: InfillPattern,

    // === Skirt ===
    /// Draw a double-walled prime loop around the first layer.
    pub skirt_enabled: bool,
    /// Clearance between the model outline and the skirt (mm).
    pub skirt_distance: CoordF,

    // === Support ===
    /// Enable support structures.
    pub support_enabled: bool,
    /// Overhang threshold: faces deviating from vertical by more than this get support (degrees).
    pub support_angle: CoordF,
    /// Support density (0.0 - 1.0).
    pub support_density: CoordF,
    /// Horizontal clearance between support and model (mm).
    pub support_xy_gap: CoordF,
    /// Vertical clearance between support and the overhang above it (layers).
    pub support_z_gap_layers: u32,

    // === Speeds and cooling ===
    /// Print speed (mm/s).
    pub print_speed: CoordF,
    /// Travel move speed (mm/s).
    pub travel_speed: CoordF,
    /// Minimum time per layer; shorter layers dwell (s).
    pub min_layer_time: CoordF,

    // === Roles ===
    /// Extruder per role.
    pub extruders: ExtruderAssignment,

    // === Tracing ===
    /// Outline tracing parameters.
    pub trace: TraceParams,
}

impl PrintConfig {
    /// Create a new PrintConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a profile from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid profile: {}", e)))
    }

    /// Load a profile from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Capabilities of the configured printer kind.
    pub fn capabilities(&self) -> super::Capabilities {
        self.printer_kind.capabilities()
    }

    /// Native output format of the configured printer kind.
    pub fn output_format(&self) -> OutputFormat {
        self.capabilities().output_format
    }

    /// Size of one raster pixel (mm).
    pub fn pixel_size(&self) -> CoordF {
        self.bed_size_x.max(self.bed_size_y) / self.raster_resolution.max(1) as CoordF
    }

    /// Cross-section area of the filament (mm²).
    pub fn filament_area(&self) -> CoordF {
        let r = self.filament_diameter * 0.5;
        std::f64::consts::PI * r * r
    }

    /// Builder method: set printer kind.
    pub fn printer_kind(mut self, kind: PrinterKind) -> Self {
        self.printer_kind = kind;
        self
    }

    /// Builder method: set bed size.
    pub fn bed_size(mut self, x: CoordF, y: CoordF) -> Self {
        self.bed_size_x = x;
        self.bed_size_y = y;
        self
    }

    /// Builder method: enable/disable auto-centering.
    pub fn auto_center(mut self, enabled: bool) -> Self {
        self.auto_center = enabled;
        self
    }

    /// Builder method: set raster resolution.
    pub fn raster_resolution(mut self, pixels: u32) -> Self {
        self.raster_resolution = pixels;
        self
    }

    /// Builder method: set layer height.
    pub fn layer_height(mut self, height: CoordF) -> Self {
        self.layer_height = height;
        self
    }

    /// Builder method: set nozzle diameter.
    pub fn nozzle_diameter(mut self, diameter: CoordF) -> Self {
        self.nozzle_diameter = diameter;
        self
    }

    /// Builder method: set shell count.
    pub fn shells(mut self, count: u32) -> Self {
        self.shell_count = count;
        self
    }

    /// Builder method: set lid and bottom counts.
    pub fn lids(mut self, lid_count: u32, bottom_count: u32) -> Self {
        self.lid_count = lid_count;
        self.bottom_count = bottom_count;
        self
    }

    /// Builder method: set infill density and pattern.
    pub fn infill(mut self, density: CoordF, pattern: InfillPattern) -> Self {
        self.infill_density = density;
        self.infill_pattern = pattern;
        self
    }

    /// Builder method: enable/disable skirt.
    pub fn skirt(mut self, enabled: bool) -> Self {
        self.skirt_enabled = enabled;
        self
    }

    /// Builder method: enable/disable support.
    pub fn support(mut self, enabled: bool) -> Self {
        self.support_enabled = enabled;
        self
    }

    /// Builder method: set support angle.
    pub fn support_angle(mut self, degrees: CoordF) -> Self {
        self.support_angle = degrees;
        self
    }

    /// Builder method: set minimum layer time.
    pub fn min_layer_time(mut self, seconds: CoordF) -> Self {
        self.min_layer_time = seconds;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: CoordF) -> Result<()> {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(Error::Config(format!("{} must be positive", name)))
            }
        }
        fn fraction(name: &str, v: CoordF) -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(Error::Config(format!("{} must be between 0 and 1", name)))
            }
        }

        positive("Bed size X", self.bed_size_x)?;
        positive("Bed size Y", self.bed_size_y)?;
        positive("Layer height", self.layer_height)?;
        positive("Nozzle diameter", self.nozzle_diameter)?;
        positive("Filament diameter", self.filament_diameter)?;
        positive("Extrusion multiplier", self.extrusion_multiplier)?;
        positive("Print speed", self.print_speed)?;
        positive("Travel speed", self.travel_speed)?;
        fraction("Infill density", self.infill_density)?;
        fraction("Support density", self.support_density)?;

        if self.raster_resolution < 16 {
            return Err(Error::Config("Raster resolution must be at least 16".into()));
        }
        if self.nozzle_diameter < self.pixel_size() {
            return Err(Error::Config(format!(
                "Nozzle diameter {:.3}mm is below the raster pixel size {:.3}mm",
                self.nozzle_diameter,
                self.pixel_size()
            )));
        }
        if !(0.0..90.0).contains(&self.support_angle) {
            return Err(Error::Config(
                "Support angle must be in [0, 90) degrees".into(),
            ));
        }
        if self.skirt_distance < 0.0 || self.support_xy_gap < 0.0 || self.min_layer_time < 0.0 {
            return Err(Error::Config("Distances and times must not be negative".into()));
        }
        if !self.capabilities().multi_extruder {
            let e = self.extruders;
            if [e.skirt, e.shell, e.lid, e.infill, e.support]
                .iter()
                .any(|&x| x != 0)
            {
                return Err(Error::Config(format!(
                    "{} supports a single extruder only",
                    self.printer_kind
                )));
            }
        }
        self.trace.validate()
    }
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            // Machine
            printer_kind: PrinterKind::Fdm,
            bed_size_x: 200.0,
            bed_size_y: 200.0,
            bed_origin_x: 0.0,
            bed_origin_y: 0.0,
            auto_center: true,
            raster_resolution: 2000,

            // Layers and extrusion
            layer_height: 0.2,
            nozzle_diameter: 0.4,
            filament_diameter: 1.75,
            extrusion_multiplier: 1.0,

            // Shells, lids, infill
            shell_count: 2,
            lid_count: 3,
            bottom_count: 3,
            lid_pattern: InfillPattern::Zigzag,
            infill_density: 0.2,
            infill_pattern: InfillPattern::Zigzag,

            // Skirt
            skirt_enabled: true,
            skirt_distance: 3.0,

            // Support
            support_enabled: false,
            support_angle: 45.0,
            support_density: 0.15,
            support_xy_gap: 0.6,
            support_z_gap_layers: 1,

            // Speeds and cooling
            print_speed: 50.0,
            travel_speed: 150.0,
            min_layer_time: 5.0,

            extruders: ExtruderAssignment::default(),
            trace: TraceParams::default(),
        }
    }
}

impl fmt::Display for PrintConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PrintConfig({}, layer={:.2}mm, nozzle={:.2}mm, shells={}, infill={:.0}%)",
            self.printer_kind,
            self.layer_height,
            self.nozzle_diameter,
            self.shell_count,
            self.infill_density * 100.0
        )
    }
}
