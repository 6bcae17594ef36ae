//! H3 spatial indexing over photo coordinates.
//!
//! Every photo with GPS coordinates is indexed at five fixed resolutions,
//! coarse to fine. The coarse cells group photos for batched reverse
//! geocoding; the fine cells support map drill-down.

use anyhow::Result;
use h3o::{CellIndex, LatLng, Resolution};

/// The five catalog resolutions with their approximate cell areas.
pub const INDEX_LEVELS: [IndexLevel; 5] = [
    IndexLevel { resolution: 3, approx_area: "~12,000 km²", description: "Country level" },
    IndexLevel { resolution: 6, approx_area: "~290 km²", description: "Region level" },
    IndexLevel { resolution: 9, approx_area: "~11 km²", description: "City/neighborhood level" },
    IndexLevel { resolution: 12, approx_area: "~0.3 km²", description: "Street level" },
    IndexLevel { resolution: 15, approx_area: "~0.9 m²", description: "Building level" },
];

#[derive(Debug, Clone, Copy)]
pub struct IndexLevel {
    pub resolution: u8,
    pub approx_area: &'static str,
    pub description: &'static str,
}

/// Cell indexes for one coordinate pair at all five resolutions.
///
/// Constructed atomically: a photo either has all five cells or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialCells {
    pub res_3: String,
    pub res_6: String,
    pub res_9: String,
    pub res_12: String,
    pub res_15: String,
}

impl SpatialCells {
    pub fn cell_at(&self, resolution: u8) -> Option<&str> {
        match resolution {
            3 => Some(&self.res_3),
            6 => Some(&self.res_6),
            9 => Some(&self.res_9),
            12 => Some(&self.res_12),
            15 => Some(&self.res_15),
            _ => None,
        }
    }
}

/// Compute the five cell indexes for a decimal-degree coordinate pair.
pub fn cells_for(latitude: f64, longitude: f64) -> Result<SpatialCells> {
    let coord = LatLng::new(latitude, longitude)?;
    let cell = |resolution| coord.to_cell(resolution).to_string();
    Ok(SpatialCells {
        res_3: cell(Resolution::Three),
        res_6: cell(Resolution::Six),
        res_9: cell(Resolution::Nine),
        res_12: cell(Resolution::Twelve),
        res_15: cell(Resolution::Fifteen),
    })
}

/// Center coordinates of a cell, used as the representative point for
/// batched reverse geocoding.
pub fn cell_center(cell: &str) -> Result<(f64, f64)> {
    let index: CellIndex = cell.parse()?;
    let center = LatLng::from(index);
    Ok((center.lat(), center.lng()))
}
