//! Surface classification for layer rasters.
//!
//! A layer's model raster is split by comparing it with its neighbours:
//!
//! - **Lid**: pixels not covered by every one of the layers above
//! - **Bottom**: pixels not resting on every one of the layers below
//! - **Infill**: the rest, covered both ways
//!
//! Layers past the top or bottom of the model count as empty, so the first
//! and last layers are entirely solid.

use crate::raster::LayerRaster;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a region within a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    /// Solid region under a top surface.
    Lid,
    /// Solid region over a bottom surface.
    Bottom,
    /// Internal region that gets sparse infill.
    Infill,
}

impl SurfaceType {
    /// Check if this surface type is filled solid.
    #[inline]
    pub fn is_solid(&self) -> bool {
        matches!(self, SurfaceType::Lid | SurfaceType::Bottom)
    }

    /// Get a human-readable name for this surface type.
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Lid => "lid",
            SurfaceType::Bottom => "bottom",
            SurfaceType::Infill => "infill",
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A layer split into disjoint regions whose union is the input raster.
#[derive(Debug, Clone)]
pub struct LayerRegions {
    pub top: LayerRaster,
    pub bottom: LayerRaster,
    pub infill: LayerRaster,
}

impl LayerRegions {
    /// Region of one surface type.
    pub fn region(&self, surface: SurfaceType) -> &LayerRaster {
        match surface {
            SurfaceType::Lid => &self.top,
            SurfaceType::Bottom => &self.bottom,
            SurfaceType::Infill => &self.infill,
        }
    }

    /// All solid pixels: top and bottom together.
    pub fn lid(&self) -> LayerRaster {
        let mut lid = self.top.clone();
        lid.logic_or(&self.bottom);
        lid
    }
}

/// Split `current` into lid, bottom and infill regions.
///
/// `above` and `below` list the neighbouring layers nearest first; `None`
/// stands for a layer outside the model. Empty slices impose no constraint.
pub fn compose_lid_and_infill(
    current: &LayerRaster,
    above: &[Option<&LayerRaster>],
    below: &[Option<&LayerRaster>],
) -> LayerRegions {
    let covered_above = covered_by_all(current, above);
    let covered_below = covered_by_all(current, below);

    let mut top = current.clone();
    top.logic_and_not(&covered_above);

    let mut bottom = current.clone();
    bottom.logic_and_not(&covered_below);
    bottom.logic_and_not(&top);

    let mut infill = covered_above;
    infill.logic_and(&covered_below);

    LayerRegions {
        top,
        bottom,
        infill,
    }
}

/// Pixels of `current` that are set in every neighbour.
fn covered_by_all(current: &LayerRaster, neighbours: &[Option<&LayerRaster>]) -> LayerRaster {
    let mut covered = current.clone();
    for n in neighbours {
        match n {
            Some(layer) => covered.logic_and(layer),
            None => {
                covered.clear();
                break;
            }
        }
    }
    covered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointF;
    use crate::raster::RasterGrid;

    fn block(x0: usize, x1: usize) -> LayerRaster {
        let mut r = LayerRaster::new(RasterGrid::new(PointF::zero(), 1.0, 20, 4));
        for y in 0..4 {
            r.set_span(y, x0, x1);
        }
        r
    }

    fn assert_partition(current: &LayerRaster, regions: &LayerRegions) {
        let mut union = regions.lid();
        union.logic_or(&regions.infill);
        assert_eq!(&union, current);
        let mut overlap = regions.lid();
        overlap.logic_and(&regions.infill);
        assert!(overlap.is_empty());
        let mut tb = regions.top.clone();
        tb.logic_and(&regions.bottom);
        assert!(tb.is_empty());
    }

    #[test]
    fn test_enclosed_layer_is_all_infill() {
        let current = block(2, 18);
        let full = block(0, 20);
        let regions = compose_lid_and_infill(
            &current,
            &[Some(&full), Some(&full)],
            &[Some(&full), Some(&full)],
        );
        assert!(regions.top.is_empty());
        assert!(regions.bottom.is_empty());
        assert_eq!(regions.infill, current);
        assert_partition(&current, &regions);
    }

    #[test]
    fn test_missing_neighbour_makes_lid() {
        let current = block(2, 18);
        let full = block(0, 20);
        let regions = compose_lid_and_infill(&current, &[Some(&full), None], &[Some(&full)]);
        assert_eq!(regions.top, current);
        assert!(regions.bottom.is_empty());
        assert!(regions.infill.is_empty());
        assert_partition(&current, &regions);
    }

    #[test]
    fn test_step_splits_regions() {
        let current = block(0, 20);
        let above = block(0, 10);
        let below = block(5, 20);
        let regions = compose_lid_and_infill(&current, &[Some(&above)], &[Some(&below)]);
        assert_eq!(regions.top, block(10, 20));
        assert_eq!(regions.bottom, block(0, 5));
        assert_eq!(regions.infill, block(5, 10));
        assert_eq!(regions.region(SurfaceType::Infill).count(), 20);
        assert_partition(&current, &regions);
    }

    #[test]
    fn test_no_neighbours_requested() {
        let current = block(3, 7);
        let regions = compose_lid_and_infill(&current, &[], &[]);
        assert_eq!(regions.infill, current);
        assert!(regions.lid().is_empty());
    }

    #[test]
    fn test_surface_type_names() {
        assert!(SurfaceType::Lid.is_solid());
        assert!(!SurfaceType::Infill.is_solid());
        assert_eq!(SurfaceType::Bottom.to_string(), "bottom");
    }
}
