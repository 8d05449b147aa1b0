//! G-code generation module.
//!
//! [`GCodeCommand`] formats single G-code lines; [`GCodeWriter`] turns a
//! finished [`MachineToolpath`](crate::toolpath::MachineToolpath) into a
//! complete program.

mod writer;

pub use writer::GCodeWriter;

/// G-code command types.
#[derive(Clone, Debug, PartialEq)]
pub enum GCodeCommand {
    /// G0 - Rapid move (travel)
    RapidMove {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        f: Option<f64>,
    },
    /// G1 - Linear move (extrusion)
    LinearMove {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
        f: Option<f64>,
    },
    /// G4 - Dwell for a number of milliseconds
    Dwell { milliseconds: u64 },
    /// G21 - Millimetre units
    MetricUnits,
    /// G28 - Home
    Home { x: bool, y: bool, z: bool },
    /// G90 - Absolute positioning
    AbsolutePositioning,
    /// G92 - Set position
    SetPosition {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
    },
    /// M83 - Relative extrusion
    RelativeExtrusion,
    /// M84 - Disable motors
    MotorsOff,
    /// T - Select tool (extruder)
    SelectTool(u32),
    /// Comment
    Comment(String),
    /// Raw G-code line
    Raw(String),
}

impl GCodeCommand {
    /// Convert the command to a G-code string.
    pub fn to_gcode(&self) -> String {
        match self {
            GCodeCommand::RapidMove { x, y, z, f } => {
                let mut cmd = String::from("G0");
                push_axis(&mut cmd, 'X', x, 3);
                push_axis(&mut cmd, 'Y', y, 3);
                push_axis(&mut cmd, 'Z', z, 3);
                push_axis(&mut cmd, 'F', f, 0);
                cmd
            }
            GCodeCommand::LinearMove { x, y, z, e, f } => {
                let mut cmd = String::from("G1");
                push_axis(&mut cmd, 'X', x, 3);
                push_axis(&mut cmd, 'Y', y, 3);
                push_axis(&mut cmd, 'Z', z, 3);
                push_axis(&mut cmd, 'E', e, 5);
                push_axis(&mut cmd, 'F', f, 0);
                cmd
            }
            GCodeCommand::Dwell { milliseconds } => format!("G4 P{}", milliseconds),
            GCodeCommand::MetricUnits => "G21".to_string(),
            GCodeCommand::Home { x, y, z } => {
                let mut cmd = String::from("G28");
                if *x {
                    cmd.push_str(" X");
                }
                if *y {
                    cmd.push_str(" Y");
                }
                if *z {
                    cmd.push_str(" Z");
                }
                cmd
            }
            GCodeCommand::AbsolutePositioning => "G90".to_string(),
            GCodeCommand::SetPosition { x, y, z, e } => {
                let mut cmd = String::from("G92");
                push_axis(&mut cmd, 'X', x, 3);
                push_axis(&mut cmd, 'Y', y, 3);
                push_axis(&mut cmd, 'Z', z, 3);
                push_axis(&mut cmd, 'E', e, 5);
                cmd
            }
            GCodeCommand::RelativeExtrusion => "M83".to_string(),
            GCodeCommand::MotorsOff => "M84".to_string(),
            GCodeCommand::SelectTool(t) => format!("T{}", t),
            GCodeCommand::Comment(text) => format!("; {}", text),
            GCodeCommand::Raw(line) => line.clone(),
        }
    }
}

fn push_axis(cmd: &mut String, axis: char, value: &Option<f64>, precision: usize) {
    if let Some(v) = value {
        cmd.push_str(&format!(" {}{:.*}", axis, precision, v));
    }
}
