//! Layer rasters.
//!
//! Every layer region (model, shells, lids, infill, support) is a binary
//! bitmap over the build plate. Region algebra is pixelwise boolean logic,
//! offsets are thresholds of a distance transform, and vectors only come back
//! out through outline tracing and pattern vectorization.
//!
//! - [`RasterGrid`] - world/pixel mapping
//! - [`LayerRaster`] - bit-packed bitmap with boolean ops
//! - [`FillRule`] - polygon rendering
//! - [`DistanceField`] - contract/expand
//! - [`TraceParams`] - outline tracing
//! - [`InfillOverlay`] - zigzag and concentric patterns
//! - [`SupportProjector`] - overhang depth buffer

mod bitmap;
mod depth;
mod grid;
pub mod morphology;
mod pattern;
mod render;
pub mod trace;

pub use bitmap::LayerRaster;
pub use depth::SupportProjector;
pub use grid::RasterGrid;
pub use morphology::DistanceField;
pub use pattern::InfillOverlay;
pub use render::FillRule;
pub use trace::{TraceParams, TurnPolicy};
