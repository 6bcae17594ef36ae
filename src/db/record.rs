use crate::geo::SpatialCells;

/// One catalog entry, keyed by the photo's path relative to the ingestion
/// root. Mirrors the `photos` table row for row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoRecord {
    pub id: Option<i64>,
    pub source_path: String,
    pub file_name: String,
    pub directory: String,

    /// Capture timestamp exactly as the EXIF text reads, unnormalized.
    pub date_time_original_text: Option<String>,
    /// Timezone-corrected capture datetime, RFC 3339. Set by enrichment.
    pub date_time_taken: Option<String>,

    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,

    // Enrichment, populated by the geocoding batch job
    pub location: Option<String>,
    pub country_code: Option<String>,
    pub geo_coded_at: Option<String>,

    // Spatial index cells, all present or all absent
    pub h3_res_3: Option<String>,
    pub h3_res_6: Option<String>,
    pub h3_res_9: Option<String>,
    pub h3_res_12: Option<String>,
    pub h3_res_15: Option<String>,

    pub perceptual_hash: Option<String>,
    pub average_hash: Option<String>,
    pub difference_hash: Option<String>,

    /// Complete tag mapping as extracted, stored as JSON.
    pub exif_meta: Option<serde_json::Value>,
}

impl PhotoRecord {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Self::default()
        }
    }

    pub fn has_gps(&self) -> bool {
        self.gps_latitude.is_some() && self.gps_longitude.is_some()
    }

    /// All five spatial cells present. A record with coordinates but any
    /// missing cell is incomplete and must be reprocessed.
    pub fn has_spatial_cells(&self) -> bool {
        self.h3_res_3.is_some()
            && self.h3_res_6.is_some()
            && self.h3_res_9.is_some()
            && self.h3_res_12.is_some()
            && self.h3_res_15.is_some()
    }

    /// The completeness criterion behind the skip decision: the fingerprint
    /// is always required; spatial cells only when coordinates exist.
    pub fn is_fully_processed(&self) -> bool {
        let has_hash = self.perceptual_hash.is_some();
        if self.has_gps() {
            self.has_spatial_cells() && has_hash
        } else {
            has_hash
        }
    }

    pub fn cell_at(&self, resolution: u8) -> Option<&str> {
        let cell = match resolution {
            3 => &self.h3_res_3,
            6 => &self.h3_res_6,
            9 => &self.h3_res_9,
            12 => &self.h3_res_12,
            15 => &self.h3_res_15,
            _ => return None,
        };
        cell.as_deref()
    }

    /// Install or clear all five cells at once; partial sets cannot exist.
    pub fn set_spatial_cells(&mut self, cells: Option<SpatialCells>) {
        match cells {
            Some(cells) => {
                self.h3_res_3 = Some(cells.res_3);
                self.h3_res_6 = Some(cells.res_6);
                self.h3_res_9 = Some(cells.res_9);
                self.h3_res_12 = Some(cells.res_12);
                self.h3_res_15 = Some(cells.res_15);
            }
            None => {
                self.h3_res_3 = None;
                self.h3_res_6 = None;
                self.h3_res_9 = None;
                self.h3_res_12 = None;
                self.h3_res_15 = None;
            }
        }
    }

    pub fn clear_enrichment(&mut self) {
        self.location = None;
        self.country_code = None;
        self.geo_coded_at = None;
    }
}
