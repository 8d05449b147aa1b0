//! Pipeline module - orchestrates the complete slicing process.
//!
//! A [`SliceSession`] owns the configuration, the prepared mesh, the raster
//! grid of the build plate and everything produced while slicing:
//!
//! mesh → rims → model raster → shells → lids/infill/support → toolpaths
//!
//! Slicing runs in two passes over the layers. The shell pass slices and
//! rasterizes every layer, traces the shell rings and caches the model and
//! interior rasters. The lid pass compares each interior with its cached
//! neighbours to split lids from infill, adds support, and overlays fill
//! patterns. Both passes check a [`CancellationToken`] before each layer and
//! report [`Progress`] after it.
//!
//! # Example
//!
//! ```rust,ignore
//! use raster_slicer::{CancellationToken, PrintConfig, SliceSession};
//!
//! let mut session = SliceSession::new(PrintConfig::default())?;
//! session.load_mesh(mesh);
//! let outcome = session.run(&CancellationToken::new(), |p| println!("{:?}", p))?;
//! session.write_output(&mut std::io::stdout())?;
//! ```

mod cancel;

pub use cancel::CancellationToken;

use crate::config::{Capabilities, ExtruderAssignment, InfillPattern, OutputFormat, PrintConfig};
use crate::dxf::DxfWriter;
use crate::gcode::GCodeWriter;
use crate::geometry::{PointF, Polylines, Vec3};
use crate::mesh::HalfEdgeMesh;
use crate::raster::{FillRule, LayerRaster, RasterGrid, SupportProjector};
use crate::slice::{compose_lid_and_infill, layer_planes, slice_at};
use crate::toolpath::{MachineToolpath, ToolpathAssembler, ToolpathRole, ToolpathWriter};
use crate::{CoordF, Error, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

/// Lifecycle of a slice session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceState {
    Idle,
    SlicingShells,
    SlicingLidsAndInfill,
    Done,
    Canceled,
}

/// One of the two passes over the layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Shells,
    LidsAndInfill,
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::Shells => "shells",
            Pass::LidsAndInfill => "lids and infill",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Progress event, sent once per finished layer per pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub pass: Pass,
    /// Index of the layer just finished.
    pub layer: usize,
    /// Number of layers in the job.
    pub total: usize,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SliceOutcome {
    Completed,
    /// Stopped before finishing; `layers` layers of `pass` were done.
    Canceled { pass: Pass, layers: usize },
}

/// Per-layer statistics kept after a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerSummary {
    pub index: usize,
    /// Cutting plane height.
    pub z: CoordF,
    pub rims: usize,
    pub open_rims: usize,
    pub shells: usize,
    pub model_pixels: usize,
    pub interior_pixels: usize,
    pub lid_pixels: usize,
    pub infill_pixels: usize,
    pub support_pixels: usize,
}

/// Rasters kept from the shell pass for the lid pass.
#[derive(Debug, Clone)]
struct CachedLayer {
    model: LayerRaster,
    interior: LayerRaster,
}

/// Fill produced for one layer in the lid pass.
#[derive(Debug, Default)]
struct LayerFill {
    support: Polylines,
    lid: Polylines,
    infill: Polylines,
    support_pixels: usize,
    lid_pixels: usize,
    infill_pixels: usize,
}

/// Slicing session: configuration, mesh and everything derived from them.
pub struct SliceSession {
    config: PrintConfig,
    capabilities: Capabilities,
    grid: RasterGrid,
    mesh: Option<HalfEdgeMesh>,
    state: SliceState,
    planes: Vec<CoordF>,
    cache: Mutex<BTreeMap<usize, CachedLayer>>,
    summaries: Vec<LayerSummary>,
    assembler: ToolpathAssembler,
}

impl SliceSession {
    /// Create a session for a validated configuration.
    pub fn new(config: PrintConfig) -> Result<Self> {
        config.validate()?;
        let capabilities = config.capabilities();
        let grid = RasterGrid::for_bed(
            PointF::new(config.bed_origin_x, config.bed_origin_y),
            config.bed_size_x,
            config.bed_size_y,
            config.raster_resolution,
        );
        let extruders = if capabilities.multi_extruder {
            config.extruders
        } else {
            ExtruderAssignment::default()
        };
        debug!(
            "Raster grid {}x{} at {:.4}mm/pixel",
            grid.width, grid.height, grid.pixel_size
        );
        Ok(Self {
            config,
            capabilities,
            grid,
            mesh: None,
            state: SliceState::Idle,
            planes: Vec::new(),
            cache: Mutex::new(BTreeMap::new()),
            summaries: Vec::new(),
            assembler: ToolpathAssembler::new(extruders),
        })
    }

    /// Hand a prepared mesh to the session, replacing any previous one.
    ///
    /// With auto-centering on, the mesh is moved to the middle of the bed and
    /// dropped onto z = 0.
    pub fn load_mesh(&mut self, mut mesh: HalfEdgeMesh) {
        self.purge();
        if self.config.auto_center {
            let bb = mesh.bounding_box();
            if bb.defined {
                let center = bb.center();
                let bed_center = PointF::new(
                    self.config.bed_origin_x + self.config.bed_size_x * 0.5,
                    self.config.bed_origin_y + self.config.bed_size_y * 0.5,
                );
                let offset = Vec3::new(
                    bed_center.x - center.x,
                    bed_center.y - center.y,
                    -bb.min.z,
                );
                debug!("Auto-centering mesh by {:?}", offset);
                mesh.translate(offset);
            }
        }
        self.mesh = Some(mesh);
    }

    pub fn mesh(&self) -> Option<&HalfEdgeMesh> {
        self.mesh.as_ref()
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    pub fn grid(&self) -> &RasterGrid {
        &self.grid
    }

    pub fn state(&self) -> SliceState {
        self.state
    }

    /// Number of layers of the last run.
    pub fn layer_count(&self) -> usize {
        self.planes.len()
    }

    /// Statistics of the layers sliced so far.
    pub fn summaries(&self) -> &[LayerSummary] {
        &self.summaries
    }

    /// Number of layers whose rasters are currently cached.
    pub fn cached_layer_count(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Toolpaths produced so far.
    pub fn toolpath(&self) -> &MachineToolpath {
        self.assembler.toolpath()
    }

    /// Discard cached rasters, toolpaths and statistics and return to idle.
    /// The mesh is kept.
    pub fn purge(&mut self) {
        match self.cache.get_mut() {
            Ok(cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.assembler.clear();
        self.summaries.clear();
        self.planes.clear();
        self.state = SliceState::Idle;
    }

    /// Slice the loaded mesh.
    ///
    /// Cancellation is not an error: it ends the run with
    /// [`SliceOutcome::Canceled`] and keeps whatever was computed.
    pub fn run<F>(&mut self, cancel: &CancellationToken, mut progress: F) -> Result<SliceOutcome>
    where
        F: FnMut(Progress),
    {
        let mesh = self
            .mesh
            .take()
            .ok_or_else(|| Error::Slicing("no mesh loaded".into()))?;
        let outcome = self.run_passes(&mesh, cancel, &mut progress);
        self.mesh = Some(mesh);
        outcome
    }

    fn run_passes(
        &mut self,
        mesh: &HalfEdgeMesh,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<SliceOutcome> {
        if self.state != SliceState::Idle {
            self.purge();
        }
        let bb = mesh.bounding_box();
        if !bb.defined || mesh.triangle_count() == 0 {
            return Err(Error::Slicing("mesh is empty".into()));
        }
        let footprint = bb.to_2d();
        let plate = self.plate_bounds();
        if footprint.min.x < plate.0.x
            || footprint.min.y < plate.0.y
            || footprint.max.x > plate.1.x
            || footprint.max.y > plate.1.y
        {
            warn!("Model extends beyond the build plate and will be clipped");
        }

        self.planes = layer_planes(bb.min.z, bb.max.z, self.config.layer_height);
        let total = self.planes.len();
        info!(
            "Slicing {} layers of {:.3}mm from z={:.3} to z={:.3}",
            total, self.config.layer_height, bb.min.z, bb.max.z
        );

        self.state = SliceState::SlicingShells;
        for index in 0..total {
            if cancel.checkpoint() {
                return Ok(self.canceled(Pass::Shells, index));
            }
            self.shell_layer(mesh, index)?;
            progress(Progress {
                pass: Pass::Shells,
                layer: index,
                total,
            });
        }
        info!(
            "Shell pass done: {} shell rings",
            self.summaries.iter().map(|s| s.shells).sum::<usize>()
        );

        self.state = SliceState::SlicingLidsAndInfill;
        let projector = if self.config.support_enabled && self.capabilities.support {
            Some(SupportProjector::new(mesh, self.grid, self.config.support_angle))
        } else {
            None
        };
        for index in 0..total {
            if cancel.checkpoint() {
                return Ok(self.canceled(Pass::LidsAndInfill, index));
            }
            self.fill_layer(index, projector.as_ref())?;
            progress(Progress {
                pass: Pass::LidsAndInfill,
                layer: index,
                total,
            });
        }

        self.lock_cache()?.clear();
        self.assembler.optimize();
        self.state = SliceState::Done;
        info!("Slicing complete:\n{}", self.assembler.toolpath().stats());
        Ok(SliceOutcome::Completed)
    }

    fn canceled(&mut self, pass: Pass, layers: usize) -> SliceOutcome {
        info!("Slicing canceled during {} pass after {} layers", pass, layers);
        self.state = SliceState::Canceled;
        SliceOutcome::Canceled { pass, layers }
    }

    fn plate_bounds(&self) -> (PointF, PointF) {
        let min = self.grid.origin;
        let max = PointF::new(
            min.x + self.config.bed_size_x,
            min.y + self.config.bed_size_y,
        );
        (min, max)
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, BTreeMap<usize, CachedLayer>>> {
        self.cache
            .lock()
            .map_err(|_| Error::Slicing("layer cache lock poisoned".into()))
    }

    /// Height of the top of layer `index`, where the nozzle prints it.
    fn print_z(&self, index: usize) -> CoordF {
        self.planes[index] + self.config.layer_height * 0.5
    }

    /// Shell pass for one layer: slice, rasterize, skirt, shells, cache.
    fn shell_layer(&mut self, mesh: &HalfEdgeMesh, index: usize) -> Result<()> {
        let z = self.planes[index];
        let print_z = self.print_z(index);
        let nozzle = self.config.nozzle_diameter;
        let trace = self.config.trace;

        let rims = slice_at(mesh, z);
        let open_rims = rims.iter().filter(|r| !r.is_closed()).count();
        let mut model = LayerRaster::new(self.grid);
        model.render_rims(&rims, FillRule::NonZero);
        self.assembler.begin_layer(index, print_z);

        if index == 0 && self.config.skirt_enabled && self.capabilities.skirt && !model.is_empty() {
            let base = model.expanded(self.config.skirt_distance + 2.0 * nozzle);
            let mut loops = Polylines::new();
            for k in 0..2 {
                let ring = base.contracted((k as CoordF + 0.5) * nozzle);
                loops.extend(ring.trace_to_polylines(&trace));
            }
            self.assembler
                .append(index, print_z, ToolpathRole::Skirt, &loops);
        }

        let wanted = self.config.shell_count.min(self.capabilities.max_shells) as usize;
        let mut shells = 0;
        for k in 0..wanted {
            let ring = model.contracted((k as CoordF + 0.5) * nozzle);
            if ring.is_empty() {
                break;
            }
            let polylines = ring.trace_to_polylines(&trace);
            self.assembler
                .append(index, print_z, ToolpathRole::Shell, &polylines);
            shells += 1;
        }
        let interior = if wanted > 0 {
            model.contracted(wanted as CoordF * nozzle)
        } else {
            model.clone()
        };

        debug!(
            "Layer {} z={:.3}: {} rims ({} open), {} shells, {} interior pixels",
            index,
            z,
            rims.len(),
            open_rims,
            shells,
            interior.count()
        );
        self.summaries.push(LayerSummary {
            index,
            z,
            rims: rims.len(),
            open_rims,
            shells,
            model_pixels: model.count(),
            interior_pixels: interior.count(),
            ..Default::default()
        });
        self.lock_cache()?
            .insert(index, CachedLayer { model, interior });
        Ok(())
    }

    /// Lid pass for one layer: support, lid/infill split, patterns.
    fn fill_layer(&mut self, index: usize, projector: Option<&SupportProjector>) -> Result<()> {
        let fill = {
            let cache = self.lock_cache()?;
            let current = cache.get(&index).ok_or_else(|| {
                Error::Slicing(format!("layer {} missing from the raster cache", index))
            })?;
            self.compose_fill(index, current, &cache, projector)
        };

        let print_z = self.print_z(index);
        self.assembler
            .append(index, print_z, ToolpathRole::Support, &fill.support);
        self.assembler
            .append(index, print_z, ToolpathRole::Lid, &fill.lid);
        self.assembler
            .append(index, print_z, ToolpathRole::Infill, &fill.infill);

        if let Some(summary) = self.summaries.get_mut(index) {
            summary.lid_pixels = fill.lid_pixels;
            summary.infill_pixels = fill.infill_pixels;
            summary.support_pixels = fill.support_pixels;
        }
        debug!(
            "Layer {}: {} lid, {} infill, {} support pixels",
            index, fill.lid_pixels, fill.infill_pixels, fill.support_pixels
        );

        // Layers below the bottom window of the next layer are no longer needed.
        let keep_below = if self.capabilities.lids {
            self.config.bottom_count as usize
        } else {
            0
        };
        if let Some(done) = index.checked_sub(keep_below) {
            self.lock_cache()?.remove(&done);
        }
        Ok(())
    }

    fn compose_fill(
        &self,
        index: usize,
        current: &CachedLayer,
        cache: &BTreeMap<usize, CachedLayer>,
        projector: Option<&SupportProjector>,
    ) -> LayerFill {
        let config = &self.config;
        let nozzle = config.nozzle_diameter;
        let total = self.planes.len();
        let mut fill = LayerFill::default();

        if let Some(projector) = projector {
            let gap = config.support_z_gap_layers as CoordF * config.layer_height;
            let mut support = projector.support_at(self.planes[index], gap);
            support.logic_and_not(&current.model.expanded(config.support_xy_gap));
            // Opening drops slivers narrower than one extrusion.
            support.contract(nozzle * 0.5);
            support.expand(nozzle * 0.5);
            if !support.is_empty() && config.support_density > 0.0 {
                fill.support_pixels = support.count();
                fill.support = support
                    .overlay_infill_pattern(
                        InfillPattern::Zigzag,
                        index,
                        nozzle / config.support_density,
                    )
                    .vectorize(&config.trace);
            }
        }

        if current.interior.is_empty() {
            return fill;
        }

        let (above, below): (Vec<Option<&LayerRaster>>, Vec<Option<&LayerRaster>>) =
            if self.capabilities.lids {
                (
                    (1..=config.lid_count as usize)
                        .map(|d| neighbour(cache, index.checked_add(d), total))
                        .collect(),
                    (1..=config.bottom_count as usize)
                        .map(|d| neighbour(cache, index.checked_sub(d), total))
                        .collect(),
                )
            } else {
                (Vec::new(), Vec::new())
            };
        let regions = compose_lid_and_infill(&current.interior, &above, &below);

        let lid = regions.lid();
        if !lid.is_empty() {
            fill.lid_pixels = lid.count();
            fill.lid = lid
                .overlay_infill_pattern(config.lid_pattern, index, nozzle)
                .vectorize(&config.trace);
        }

        let infill = &regions.infill;
        if self.capabilities.infill && !infill.is_empty() {
            let pattern = if self.capabilities.solid_fill {
                Some((config.lid_pattern, nozzle))
            } else if config.infill_density > 0.0 {
                Some((config.infill_pattern, nozzle / config.infill_density))
            } else {
                None
            };
            if let Some((pattern, spacing)) = pattern {
                fill.infill_pixels = infill.count();
                fill.infill = infill
                    .overlay_infill_pattern(pattern, index, spacing)
                    .vectorize(&config.trace);
            }
        }
        fill
    }

    /// Write the toolpaths as G-code.
    pub fn write_gcode(&mut self, out: &mut dyn Write) -> Result<()> {
        self.assembler.optimize();
        GCodeWriter::new(&self.config).write(self.assembler.toolpath(), out)
    }

    /// Write the toolpaths as DXF.
    pub fn write_dxf(&mut self, out: &mut dyn Write) -> Result<()> {
        self.assembler.optimize();
        DxfWriter::new().write(self.assembler.toolpath(), out)
    }

    /// Write the toolpaths in the printer's native format.
    pub fn write_output(&mut self, out: &mut dyn Write) -> Result<()> {
        self.write_format(self.config.output_format(), out)
    }

    /// Write the toolpaths in `format`.
    pub fn write_format(&mut self, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
        match format {
            OutputFormat::GCode => self.write_gcode(out),
            OutputFormat::Dxf => self.write_dxf(out),
        }
    }
}

/// Interior of a neighbouring layer; `None` outside the model.
fn neighbour(
    cache: &BTreeMap<usize, CachedLayer>,
    index: Option<usize>,
    total: usize,
) -> Option<&LayerRaster> {
    index
        .filter(|&i| i < total)
        .and_then(|i| cache.get(&i))
        .map(|c| &c.interior)
}

impl fmt::Debug for SliceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceSession")
            .field("state", &self.state)
            .field("printer", &self.config.printer_kind)
            .field("layers", &self.planes.len())
            .field("cached", &self.cached_layer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::box_mesh;

    fn config() -> PrintConfig {
        PrintConfig::default()
            .bed_size(20.0, 20.0)
            .raster_resolution(100)
            .layer_height(0.5)
            .nozzle_diameter(0.4)
            .shells(1)
            .lids(1, 1)
            .skirt(false)
            .support(false)
    }

    #[test]
    fn test_requires_mesh() {
        let mut session = SliceSession::new(config()).unwrap();
        let result = session.run(&CancellationToken::new(), |_| {});
        assert!(matches!(result, Err(Error::Slicing(_))));
        assert_eq!(session.state(), SliceState::Idle);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(SliceSession::new(config().layer_height(0.0)).is_err());
    }

    #[test]
    fn test_auto_center() {
        let mut session = SliceSession::new(config().auto_center(true)).unwrap();
        session.load_mesh(box_mesh(
            Vec3::new(-4.0, -4.0, 3.0),
            Vec3::new(0.0, 0.0, 5.0),
        ));
        let bb = session.mesh().unwrap().bounding_box();
        assert!((bb.min.x - 8.0).abs() < 1e-9);
        assert!((bb.max.y - 12.0).abs() < 1e-9);
        assert!(bb.min.z.abs() < 1e-9);
    }

    #[test]
    fn test_small_block_run() {
        let mut session = SliceSession::new(config().auto_center(true)).unwrap();
        session.load_mesh(box_mesh(Vec3::new(0.0, 0.0, 0.0), Vec3::new(8.0, 8.0, 2.0)));
        let mut events = Vec::new();
        let outcome = session
            .run(&CancellationToken::new(), |p| events.push(p))
            .unwrap();
        assert_eq!(outcome, SliceOutcome::Completed);
        assert_eq!(session.state(), SliceState::Done);
        assert_eq!(session.layer_count(), 4);
        assert_eq!(events.len(), 8);
        assert_eq!(events[0].pass, Pass::Shells);
        assert_eq!(events[7].pass, Pass::LidsAndInfill);
        assert_eq!(session.cached_layer_count(), 0);

        let summaries = session.summaries();
        assert_eq!(summaries.len(), 4);
        for s in summaries {
            assert_eq!(s.rims, 1);
            assert_eq!(s.open_rims, 0);
            assert_eq!(s.shells, 1);
        }
        // First and last layers are all lid; the middle ones have infill.
        assert_eq!(summaries[0].lid_pixels, summaries[0].interior_pixels);
        assert_eq!(summaries[3].lid_pixels, summaries[3].interior_pixels);
        assert_eq!(summaries[1].lid_pixels, 0);
        assert_eq!(summaries[1].infill_pixels, summaries[1].interior_pixels);

        let stats = session.toolpath().stats();
        assert_eq!(stats.layers, 4);
        assert!(stats.print_length > 0.0);

        session.purge();
        assert_eq!(session.state(), SliceState::Idle);
        assert!(session.toolpath().is_empty());
        assert!(session.mesh().is_some());
    }

    #[test]
    fn test_rerun_after_cancel() {
        let mut session = SliceSession::new(config().auto_center(true)).unwrap();
        session.load_mesh(box_mesh(Vec3::new(0.0, 0.0, 0.0), Vec3::new(8.0, 8.0, 2.0)));
        let outcome = session
            .run(&CancellationToken::after_checkpoints(5), |_| {})
            .unwrap();
        assert_eq!(
            outcome,
            SliceOutcome::Canceled {
                pass: Pass::LidsAndInfill,
                layers: 1
            }
        );
        assert_eq!(session.state(), SliceState::Canceled);

        let outcome = session.run(&CancellationToken::new(), |_| {}).unwrap();
        assert_eq!(outcome, SliceOutcome::Completed);
        assert_eq!(session.summaries().len(), 4);
    }

    #[test]
    fn test_laser_outline_only() {
        let config = config()
            .printer_kind(crate::config::PrinterKind::LaserCutter)
            .shells(3)
            .auto_center(true);
        let mut session = SliceSession::new(config).unwrap();
        session.load_mesh(box_mesh(Vec3::new(0.0, 0.0, 0.0), Vec3::new(8.0, 8.0, 1.0)));
        session.run(&CancellationToken::new(), |_| {}).unwrap();
        for layer in session.toolpath().layers() {
            assert_eq!(layer.toolpaths.len(), 1);
            assert_eq!(layer.toolpaths[0].role, ToolpathRole::Shell);
        }
        let mut out = Vec::new();
        session.write_output(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("0\nSECTION\n"));
        assert!(text.contains("LAYER_1"));
    }
}
