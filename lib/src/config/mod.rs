//! Configuration types.
//!
//! - [`PrintConfig`] - every setting a slicing session reads, loadable from JSON
//! - [`PrinterKind`] and [`Capabilities`] - per-machine feature table

mod print_config;
mod printer;

pub use print_config::{ExtruderAssignment, InfillPattern, PrintConfig};
pub use printer::{Capabilities, OutputFormat, PrinterKind};
