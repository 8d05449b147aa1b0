//! G-code program writer.

use super::GCodeCommand;
use crate::config::PrintConfig;
use crate::geometry::PointF;
use crate::toolpath::{LayerToolpath, MachineToolpath, ToolpathElement, ToolpathWriter};
use crate::{CoordF, Result, VERSION};
use std::io::Write;

/// Writes a machine toolpath as G-code.
///
/// Positioning is absolute and extrusion relative (`M83`): every print move
/// carries the filament length for its own segment. Layers that would take
/// less than the minimum layer time end with a `G4` dwell.
#[derive(Debug, Clone)]
pub struct GCodeWriter {
    /// Filament length per mm of print motion.
    e_per_mm: CoordF,
    /// mm/min
    print_feed: CoordF,
    /// mm/min
    travel_feed: CoordF,
    min_layer_time: CoordF,
    layer_height: CoordF,
    nozzle_diameter: CoordF,
    feed: Option<CoordF>,
    position: Option<PointF>,
    extruder: Option<u32>,
}

impl GCodeWriter {
    pub fn new(config: &PrintConfig) -> Self {
        let filament_area = config.filament_area();
        let e_per_mm = if filament_area > 0.0 {
            config.layer_height * config.nozzle_diameter / filament_area
                * config.extrusion_multiplier
        } else {
            0.0
        };
        Self {
            e_per_mm,
            print_feed: config.print_speed * 60.0,
            travel_feed: config.travel_speed * 60.0,
            min_layer_time: config.min_layer_time,
            layer_height: config.layer_height,
            nozzle_diameter: config.nozzle_diameter,
            feed: None,
            position: None,
            extruder: None,
        }
    }

    /// Filament length for a print motion of `length` mm.
    pub fn extrusion_for(&self, length: CoordF) -> CoordF {
        length * self.e_per_mm
    }

    /// Estimated time in seconds to run one layer's motions.
    pub fn layer_time(&self, layer: &LayerToolpath) -> CoordF {
        let print = layer.print_length();
        let travel: CoordF = layer.toolpaths.iter().map(|t| t.travel_length()).sum();
        let mut t = 0.0;
        if self.print_feed > 0.0 {
            t += print / self.print_feed * 60.0;
        }
        if self.travel_feed > 0.0 {
            t += travel / self.travel_feed * 60.0;
        }
        t
    }

    fn emit(out: &mut dyn Write, cmd: GCodeCommand) -> Result<()> {
        writeln!(out, "{}", cmd.to_gcode())?;
        Ok(())
    }

    /// Feed rate to put on the next move, if it changed.
    fn feed_for(&mut self, feed: CoordF) -> Option<CoordF> {
        if self.feed == Some(feed) {
            None
        } else {
            self.feed = Some(feed);
            Some(feed)
        }
    }

    fn write_header(&mut self, toolpath: &MachineToolpath, out: &mut dyn Write) -> Result<()> {
        let stats = toolpath.stats();
        writeln!(out, "; generated by raster-slicer {}", VERSION)?;
        writeln!(out, "; layer_height = {:.3}", self.layer_height)?;
        writeln!(out, "; nozzle_diameter = {:.3}", self.nozzle_diameter)?;
        writeln!(out, "; layer_count = {}", stats.layers)?;
        writeln!(out, "; print_length = {:.1}", stats.print_length)?;
        Self::emit(out, GCodeCommand::MetricUnits)?;
        Self::emit(out, GCodeCommand::AbsolutePositioning)?;
        Self::emit(out, GCodeCommand::RelativeExtrusion)?;
        Self::emit(
            out,
            GCodeCommand::SetPosition {
                x: None,
                y: None,
                z: None,
                e: Some(0.0),
            },
        )
    }

    fn write_layer(&mut self, layer: &LayerToolpath, out: &mut dyn Write) -> Result<()> {
        writeln!(out, ";LAYER:{}", layer.index)?;
        let f = self.feed_for(self.travel_feed);
        Self::emit(
            out,
            GCodeCommand::RapidMove {
                x: None,
                y: None,
                z: Some(layer.z),
                f,
            },
        )?;

        for toolpath in &layer.toolpaths {
            let Some(start) = toolpath.start() else {
                continue;
            };
            if self.extruder != Some(toolpath.extruder) {
                Self::emit(out, GCodeCommand::SelectTool(toolpath.extruder))?;
                self.extruder = Some(toolpath.extruder);
            }
            writeln!(out, ";TYPE:{}", toolpath.role.feature_name())?;
            if self.position != Some(start) {
                self.write_motion(out, start, true)?;
            }
            for element in &toolpath.elements {
                if let ToolpathElement::Motion { start, end, rapid } = *element {
                    if self.position != Some(start) {
                        self.write_motion(out, start, true)?;
                    }
                    self.write_motion(out, end, rapid)?;
                }
            }
        }

        let time = self.layer_time(layer);
        if time > 0.0 && time < self.min_layer_time {
            let milliseconds = ((self.min_layer_time - time) * 1000.0).round() as u64;
            Self::emit(out, GCodeCommand::Dwell { milliseconds })?;
        }
        Ok(())
    }

    fn write_motion(&mut self, out: &mut dyn Write, to: PointF, rapid: bool) -> Result<()> {
        let cmd = if rapid {
            GCodeCommand::RapidMove {
                x: Some(to.x),
                y: Some(to.y),
                z: None,
                f: self.feed_for(self.travel_feed),
            }
        } else {
            let length = self.position.map_or(0.0, |p| p.distance(to));
            GCodeCommand::LinearMove {
                x: Some(to.x),
                y: Some(to.y),
                z: None,
                e: Some(self.extrusion_for(length)),
                f: self.feed_for(self.print_feed),
            }
        };
        self.position = Some(to);
        Self::emit(out, cmd)
    }
}

impl ToolpathWriter for GCodeWriter {
    fn write(&mut self, toolpath: &MachineToolpath, out: &mut dyn Write) -> Result<()> {
        self.feed = None;
        self.position = None;
        self.extruder = None;

        self.write_header(toolpath, out)?;
        for layer in toolpath.layers() {
            self.write_layer(layer, out)?;
        }
        writeln!(out, "; end of program")?;
        Self::emit(out, GCodeCommand::MotorsOff)?;
        out.flush()?;
        Ok(())
    }
}
