//! Machine toolpaths.
//!
//! The slicer hands every traced outline and pattern stroke to a
//! [`ToolpathAssembler`], tagged with its layer and [`ToolpathRole`]. The
//! result is a [`MachineToolpath`]: layers in index order, each holding
//! toolpaths made of straight motions. Serializers consume it through the
//! [`ToolpathWriter`] trait as one flat stream of motions with layer-change
//! and extruder-select markers.

mod optimize;

pub use optimize::coalesce_motions;

use crate::config::ExtruderAssignment;
use crate::geometry::{PointF, Polyline};
use crate::{CoordF, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

/// What a toolpath prints. Declaration order is print order within a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolpathRole {
    /// Priming loop around the first layer.
    Skirt,
    /// Perimeter ring.
    Shell,
    /// Solid top or bottom fill.
    Lid,
    /// Sparse interior fill.
    Infill,
    /// Support structure.
    Support,
}

impl ToolpathRole {
    /// All roles in print order.
    pub const ALL: [ToolpathRole; 5] = [
        ToolpathRole::Skirt,
        ToolpathRole::Shell,
        ToolpathRole::Lid,
        ToolpathRole::Infill,
        ToolpathRole::Support,
    ];

    /// Get a descriptive name for this role.
    pub fn name(&self) -> &'static str {
        match self {
            ToolpathRole::Skirt => "skirt",
            ToolpathRole::Shell => "shell",
            ToolpathRole::Lid => "lid",
            ToolpathRole::Infill => "infill",
            ToolpathRole::Support => "support",
        }
    }

    /// Feature name written to `;TYPE:` comments.
    pub fn feature_name(&self) -> &'static str {
        match self {
            ToolpathRole::Skirt => "SKIRT",
            ToolpathRole::Shell => "WALL",
            ToolpathRole::Lid => "SKIN",
            ToolpathRole::Infill => "FILL",
            ToolpathRole::Support => "SUPPORT",
        }
    }

    /// Check if this role closes its strokes into loops.
    pub fn is_loop(&self) -> bool {
        matches!(self, ToolpathRole::Skirt | ToolpathRole::Shell)
    }
}

impl fmt::Display for ToolpathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One entry of a toolpath stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolpathElement {
    /// Straight move; `rapid` moves do not print.
    Motion {
        start: PointF,
        end: PointF,
        rapid: bool,
    },
    /// Switch to another extruder (tool).
    SelectExtruder(u32),
    /// Start of a new layer.
    LayerStart { index: usize, z: CoordF },
}

impl ToolpathElement {
    /// Print motion from `start` to `end`.
    pub fn print(start: PointF, end: PointF) -> Self {
        ToolpathElement::Motion {
            start,
            end,
            rapid: false,
        }
    }

    /// Travel motion from `start` to `end`.
    pub fn rapid(start: PointF, end: PointF) -> Self {
        ToolpathElement::Motion {
            start,
            end,
            rapid: true,
        }
    }

    /// Length of a motion; zero for markers.
    pub fn length(&self) -> CoordF {
        match self {
            ToolpathElement::Motion { start, end, .. } => start.distance(*end),
            _ => 0.0,
        }
    }
}

/// Motions of one role on one extruder within a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Toolpath {
    pub z: CoordF,
    pub role: ToolpathRole,
    pub extruder: u32,
    /// Motions only; markers live in the layer stream.
    pub elements: Vec<ToolpathElement>,
}

impl Toolpath {
    /// Create an empty toolpath.
    pub fn new(z: CoordF, role: ToolpathRole, extruder: u32) -> Self {
        Self {
            z,
            role,
            extruder,
            elements: Vec::new(),
        }
    }

    /// Append a polyline as print motions, with a rapid from the current end
    /// to its start when they differ.
    pub fn add_polyline(&mut self, polyline: &Polyline) {
        let points = polyline.points();
        if points.len() < 2 {
            return;
        }
        if let Some(end) = self.end() {
            if end != points[0] {
                self.elements.push(ToolpathElement::rapid(end, points[0]));
            }
        }
        for w in points.windows(2) {
            self.elements.push(ToolpathElement::print(w[0], w[1]));
        }
    }

    /// Start of the first motion.
    pub fn start(&self) -> Option<PointF> {
        self.elements.iter().find_map(|e| match e {
            ToolpathElement::Motion { start, .. } => Some(*start),
            _ => None,
        })
    }

    /// End of the last motion.
    pub fn end(&self) -> Option<PointF> {
        self.elements.iter().rev().find_map(|e| match e {
            ToolpathElement::Motion { end, .. } => Some(*end),
            _ => None,
        })
    }

    /// True if the toolpath has no motions.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Total length of print motions.
    pub fn print_length(&self) -> CoordF {
        self.motion_length(false)
    }

    /// Total length of rapid motions.
    pub fn travel_length(&self) -> CoordF {
        self.motion_length(true)
    }

    fn motion_length(&self, want_rapid: bool) -> CoordF {
        self.elements
            .iter()
            .filter(|e| matches!(e, ToolpathElement::Motion { rapid, .. } if *rapid == want_rapid))
            .map(ToolpathElement::length)
            .sum()
    }

    /// Split into maximal connected runs of print motions.
    pub fn strokes(&self) -> Vec<Vec<PointF>> {
        let mut strokes: Vec<Vec<PointF>> = Vec::new();
        let mut current: Vec<PointF> = Vec::new();
        for e in &self.elements {
            match *e {
                ToolpathElement::Motion {
                    start,
                    end,
                    rapid: false,
                } => {
                    if current.last() != Some(&start) {
                        if current.len() >= 2 {
                            strokes.push(std::mem::take(&mut current));
                        }
                        current.clear();
                        current.push(start);
                    }
                    current.push(end);
                }
                _ => {
                    if current.len() >= 2 {
                        strokes.push(std::mem::take(&mut current));
                    }
                    current.clear();
                }
            }
        }
        if current.len() >= 2 {
            strokes.push(current);
        }
        strokes
    }
}

/// All toolpaths of one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerToolpath {
    pub index: usize,
    pub z: CoordF,
    pub toolpaths: Vec<Toolpath>,
}

impl LayerToolpath {
    pub fn new(index: usize, z: CoordF) -> Self {
        Self {
            index,
            z,
            toolpaths: Vec::new(),
        }
    }

    /// Toolpaths of one role.
    pub fn role(&self, role: ToolpathRole) -> impl Iterator<Item = &Toolpath> {
        self.toolpaths.iter().filter(move |t| t.role == role)
    }

    /// Total print length of the layer.
    pub fn print_length(&self) -> CoordF {
        self.toolpaths.iter().map(Toolpath::print_length).sum()
    }
}

/// Toolpaths of a whole job, keyed by layer index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MachineToolpath {
    layers: BTreeMap<usize, LayerToolpath>,
}

impl MachineToolpath {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layer at `index`, created if missing.
    pub fn layer_mut(&mut self, index: usize, z: CoordF) -> &mut LayerToolpath {
        self.layers
            .entry(index)
            .or_insert_with(|| LayerToolpath::new(index, z))
    }

    /// The layer at `index`, if any.
    pub fn layer(&self, index: usize) -> Option<&LayerToolpath> {
        self.layers.get(&index)
    }

    /// Layers in index order.
    pub fn layers(&self) -> impl Iterator<Item = &LayerToolpath> {
        self.layers.values()
    }

    pub(crate) fn layers_mut(&mut self) -> impl Iterator<Item = &mut LayerToolpath> {
        self.layers.values_mut()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.values().all(|l| l.toolpaths.is_empty())
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Flatten into one stream.
    ///
    /// Each layer opens with a [`ToolpathElement::LayerStart`]. An
    /// extruder select is emitted only when the extruder changes, and rapids
    /// join toolpaths whose ends do not meet.
    pub fn stream(&self) -> Vec<ToolpathElement> {
        let mut out = Vec::new();
        let mut extruder = None;
        let mut pos: Option<PointF> = None;
        for layer in self.layers.values() {
            out.push(ToolpathElement::LayerStart {
                index: layer.index,
                z: layer.z,
            });
            for toolpath in &layer.toolpaths {
                let Some(start) = toolpath.start() else {
                    continue;
                };
                if extruder != Some(toolpath.extruder) {
                    out.push(ToolpathElement::SelectExtruder(toolpath.extruder));
                    extruder = Some(toolpath.extruder);
                }
                if let Some(p) = pos {
                    if p != start {
                        out.push(ToolpathElement::rapid(p, start));
                    }
                }
                out.extend(toolpath.elements.iter().copied());
                pos = toolpath.end();
            }
        }
        out
    }

    /// Summary statistics of the flattened stream.
    pub fn stats(&self) -> ToolpathStats {
        let mut stats = ToolpathStats {
            layers: self.layers.len(),
            toolpaths: self.layers.values().map(|l| l.toolpaths.len()).sum(),
            ..Default::default()
        };
        for e in self.stream() {
            match e {
                ToolpathElement::Motion { rapid: true, .. } => {
                    stats.rapid_moves += 1;
                    stats.travel_length += e.length();
                }
                ToolpathElement::Motion { rapid: false, .. } => {
                    stats.print_moves += 1;
                    stats.print_length += e.length();
                }
                ToolpathElement::SelectExtruder(_) => stats.extruder_selects += 1,
                ToolpathElement::LayerStart { .. } => {}
            }
        }
        stats
    }
}

/// Totals over a machine toolpath.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ToolpathStats {
    pub layers: usize,
    pub toolpaths: usize,
    pub print_moves: usize,
    pub rapid_moves: usize,
    pub extruder_selects: usize,
    /// mm
    pub print_length: CoordF,
    /// mm
    pub travel_length: CoordF,
}

impl ToolpathStats {
    /// Estimated motion time in seconds at the given speeds (mm/s).
    pub fn estimated_time(&self, print_speed: CoordF, travel_speed: CoordF) -> CoordF {
        let mut t = 0.0;
        if print_speed > 0.0 {
            t += self.print_length / print_speed;
        }
        if travel_speed > 0.0 {
            t += self.travel_length / travel_speed;
        }
        t
    }
}

impl fmt::Display for ToolpathStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Layers:          {}", self.layers)?;
        writeln!(f, "Toolpaths:       {}", self.toolpaths)?;
        writeln!(
            f,
            "Print moves:     {} ({:.1} mm)",
            self.print_moves, self.print_length
        )?;
        write!(
            f,
            "Rapid moves:     {} ({:.1} mm)",
            self.rapid_moves, self.travel_length
        )
    }
}

/// Serializer for a finished machine toolpath.
pub trait ToolpathWriter {
    /// Write the whole job to `out`.
    fn write(&mut self, toolpath: &MachineToolpath, out: &mut dyn Write) -> Result<()>;
}

/// Collects tagged polylines into a [`MachineToolpath`].
#[derive(Debug, Clone, Default)]
pub struct ToolpathAssembler {
    extruders: ExtruderAssignment,
    toolpath: MachineToolpath,
    optimized: bool,
}

impl ToolpathAssembler {
    pub fn new(extruders: ExtruderAssignment) -> Self {
        Self {
            extruders,
            toolpath: MachineToolpath::new(),
            optimized: false,
        }
    }

    /// Make sure layer `index` exists even if nothing is printed on it.
    pub fn begin_layer(&mut self, index: usize, z: CoordF) {
        self.toolpath.layer_mut(index, z);
    }

    /// Append polylines of one role to a layer. Returns the number of
    /// polylines that produced motions.
    pub fn append(
        &mut self,
        index: usize,
        z: CoordF,
        role: ToolpathRole,
        polylines: &[Polyline],
    ) -> usize {
        let extruder = self.extruders.for_role(role);
        let mut toolpath = Toolpath::new(z, role, extruder);
        let mut added = 0;
        for pl in polylines {
            if pl.len() >= 2 {
                toolpath.add_polyline(pl);
                added += 1;
            }
        }
        if !toolpath.is_empty() {
            self.toolpath.layer_mut(index, z).toolpaths.push(toolpath);
            self.optimized = false;
        }
        added
    }

    /// Reorder and coalesce every layer. Idempotent until more is appended.
    pub fn optimize(&mut self) {
        if self.optimized {
            return;
        }
        optimize::optimize(&mut self.toolpath);
        self.optimized = true;
    }

    pub fn is_optimized(&self) -> bool {
        self.optimized
    }

    pub fn toolpath(&self) -> &MachineToolpath {
        &self.toolpath
    }

    pub fn into_toolpath(self) -> MachineToolpath {
        self.toolpath
    }

    /// Drop everything collected so far.
    pub fn clear(&mut self) {
        self.toolpath.clear();
        self.optimized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, s: f64) -> Polyline {
        Polyline::closed_from_ring(vec![
            PointF::new(x, y),
            PointF::new(x + s, y),
            PointF::new(x + s, y + s),
            PointF::new(x, y + s),
        ])
    }

    #[test]
    fn test_add_polyline_links_with_rapid() {
        let mut tp = Toolpath::new(0.1, ToolpathRole::Shell, 0);
        tp.add_polyline(&square(0.0, 0.0, 1.0));
        tp.add_polyline(&square(5.0, 0.0, 1.0));
        assert_eq!(tp.elements.len(), 9);
        assert!((tp.print_length() - 8.0).abs() < 1e-12);
        assert!((tp.travel_length() - 5.0).abs() < 1e-12);
        assert_eq!(tp.strokes().len(), 2);
        assert_eq!(tp.start(), Some(PointF::new(0.0, 0.0)));
        assert_eq!(tp.end(), Some(PointF::new(5.0, 0.0)));
    }

    #[test]
    fn test_stream_markers() {
        let mut extruders = ExtruderAssignment::default();
        extruders.support = 1;
        let mut asm = ToolpathAssembler::new(extruders);
        asm.begin_layer(0, 0.1);
        asm.append(0, 0.1, ToolpathRole::Shell, &[square(0.0, 0.0, 1.0)]);
        asm.append(0, 0.1, ToolpathRole::Infill, &[square(0.2, 0.2, 0.5)]);
        asm.append(0, 0.1, ToolpathRole::Support, &[square(3.0, 3.0, 1.0)]);
        asm.append(1, 0.3, ToolpathRole::Shell, &[square(0.0, 0.0, 1.0)]);

        let stream = asm.toolpath().stream();
        let markers: Vec<&ToolpathElement> = stream
            .iter()
            .filter(|e| !matches!(e, ToolpathElement::Motion { .. }))
            .collect();
        assert_eq!(
            markers,
            vec![
                &ToolpathElement::LayerStart { index: 0, z: 0.1 },
                &ToolpathElement::SelectExtruder(0),
                &ToolpathElement::SelectExtruder(1),
                &ToolpathElement::LayerStart { index: 1, z: 0.3 },
                &ToolpathElement::SelectExtruder(0),
            ]
        );

        let stats = asm.toolpath().stats();
        assert_eq!(stats.layers, 2);
        assert_eq!(stats.toolpaths, 4);
        assert_eq!(stats.print_moves, 16);
        assert_eq!(stats.extruder_selects, 3);
        assert!((stats.print_length - 14.0).abs() < 1e-12);
        assert!(stats.estimated_time(10.0, 100.0) > 1.4);
    }

    #[test]
    fn test_empty_layers_are_kept() {
        let mut asm = ToolpathAssembler::new(ExtruderAssignment::default());
        asm.begin_layer(0, 0.1);
        asm.begin_layer(1, 0.3);
        assert_eq!(asm.append(1, 0.3, ToolpathRole::Lid, &[Polyline::new()]), 0);
        assert_eq!(asm.toolpath().layer_count(), 2);
        assert!(asm.toolpath().is_empty());
        asm.clear();
        assert_eq!(asm.toolpath().layer_count(), 0);
    }

    #[test]
    fn test_role_order_and_names() {
        let mut roles = vec![ToolpathRole::Support, ToolpathRole::Skirt, ToolpathRole::Lid];
        roles.sort();
        assert_eq!(
            roles,
            vec![ToolpathRole::Skirt, ToolpathRole::Lid, ToolpathRole::Support]
        );
        assert_eq!(ToolpathRole::Shell.feature_name(), "WALL");
        assert_eq!(ToolpathRole::Infill.to_string(), "infill");
        assert!(ToolpathRole::Shell.is_loop());
    }
}
