//! DXF output for cutters and plotters.
//!
//! Each print motion becomes a `LINE` entity on a DXF layer named after its
//! slice (`LAYER_0`, `LAYER_1`, ...). Rapids are not drawn.

use crate::toolpath::{MachineToolpath, ToolpathElement, ToolpathWriter};
use crate::{CoordF, Result};
use std::io::Write;

/// Writes a machine toolpath as an ASCII DXF entities section.
#[derive(Debug, Clone, Default)]
pub struct DxfWriter {
    /// Write z as the layer height instead of 0.
    pub with_z: bool,
}

impl DxfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer name for a slice index.
    pub fn layer_name(index: usize) -> String {
        format!("LAYER_{}", index)
    }

    fn group(out: &mut dyn Write, code: u32, value: &str) -> Result<()> {
        writeln!(out, "{}", code)?;
        writeln!(out, "{}", value)?;
        Ok(())
    }

    fn coord(out: &mut dyn Write, code: u32, value: CoordF) -> Result<()> {
        Self::group(out, code, &format!("{:.4}", value))
    }
}

impl ToolpathWriter for DxfWriter {
    fn write(&mut self, toolpath: &MachineToolpath, out: &mut dyn Write) -> Result<()> {
        Self::group(out, 0, "SECTION")?;
        Self::group(out, 2, "ENTITIES")?;

        let mut layer = Self::layer_name(0);
        let mut z = 0.0;
        for element in toolpath.stream() {
            match element {
                ToolpathElement::LayerStart { index, z: layer_z } => {
                    layer = Self::layer_name(index);
                    z = if self.with_z { layer_z } else { 0.0 };
                }
                ToolpathElement::Motion {
                    start,
                    end,
                    rapid: false,
                } => {
                    Self::group(out, 0, "LINE")?;
                    Self::group(out, 8, &layer)?;
                    Self::coord(out, 10, start.x)?;
                    Self::coord(out, 20, start.y)?;
                    Self::coord(out, 30, z)?;
                    Self::coord(out, 11, end.x)?;
                    Self::coord(out, 21, end.y)?;
                    Self::coord(out, 31, z)?;
                }
                _ => {}
            }
        }

        Self::group(out, 0, "ENDSEC")?;
        Self::group(out, 0, "EOF")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtruderAssignment;
    use crate::geometry::{PointF, Polyline};
    use crate::toolpath::{ToolpathAssembler, ToolpathRole};

    #[test]
    fn test_lines_per_layer() {
        let mut asm = ToolpathAssembler::new(ExtruderAssignment::default());
        let square = Polyline::closed_from_ring(vec![
            PointF::new(0.0, 0.0),
            PointF::new(2.0, 0.0),
            PointF::new(2.0, 2.0),
            PointF::new(0.0, 2.0),
        ]);
        asm.append(0, 0.1, ToolpathRole::Shell, &[square.clone()]);
        asm.append(1, 0.3, ToolpathRole::Shell, &[square]);

        let mut out = Vec::new();
        DxfWriter::new().write(asm.toolpath(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(&lines[..4], &["0", "SECTION", "2", "ENTITIES"]);
        assert_eq!(&lines[lines.len() - 4..], &["0", "ENDSEC", "0", "EOF"]);
        assert_eq!(text.matches("\nLINE\n").count(), 8);
        assert_eq!(text.matches("\nLAYER_0\n").count(), 4);
        assert_eq!(text.matches("\nLAYER_1\n").count(), 4);
        assert!(text.contains("10\n2.0000\n20\n0.0000\n30\n0.0000\n"));
    }

    #[test]
    fn test_rapids_skipped_and_z() {
        let mut asm = ToolpathAssembler::new(ExtruderAssignment::default());
        asm.append(
            2,
            0.5,
            ToolpathRole::Infill,
            &[
                Polyline::from_points(vec![PointF::new(0.0, 0.0), PointF::new(1.0, 0.0)]),
                Polyline::from_points(vec![PointF::new(5.0, 0.0), PointF::new(6.0, 0.0)]),
            ],
        );
        let mut writer = DxfWriter { with_z: true };
        let mut out = Vec::new();
        writer.write(asm.toolpath(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("\nLINE\n").count(), 2);
        assert!(text.contains("30\n0.5000\n"));
        assert!(text.contains("LAYER_2"));
    }
}
