//! Administrative reports over the catalog: geocoding cost estimation and
//! validation against an externally produced CSV manifest.

use anyhow::{bail, Result};
use std::path::Path;

use crate::db::Database;
use crate::geo::INDEX_LEVELS;

/// Google-style pricing: geocode + timezone lookup per cell, $5 per 1000.
const CALLS_PER_CELL: i64 = 2;
const USD_PER_THOUSAND_CALLS: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct ResolutionEstimate {
    pub resolution: u8,
    pub approx_area: &'static str,
    pub description: &'static str,
    pub unique_cells: i64,
    pub api_calls: i64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone)]
pub struct GeocodingEstimate {
    pub photos_needing_geocoding: i64,
    pub per_resolution: Vec<ResolutionEstimate>,
}

/// How many reverse-geocode calls a full enrichment run would cost at each
/// grouping resolution.
pub fn estimate_geocoding_cost(db: &Database) -> Result<GeocodingEstimate> {
    let photos_needing_geocoding = db.count_photos_needing_geocoding()?;

    let mut per_resolution = Vec::with_capacity(INDEX_LEVELS.len());
    for level in INDEX_LEVELS {
        let unique_cells = db.distinct_cells_needing_geocoding(level.resolution)?;
        let api_calls = unique_cells * CALLS_PER_CELL;
        per_resolution.push(ResolutionEstimate {
            resolution: level.resolution,
            approx_area: level.approx_area,
            description: level.description,
            unique_cells,
            api_calls,
            cost_usd: api_calls as f64 / 1000.0 * USD_PER_THOUSAND_CALLS,
        });
    }

    Ok(GeocodingEstimate { photos_needing_geocoding, per_resolution })
}

#[derive(Debug, Clone, Default)]
pub struct ValidationStats {
    pub total_rows: usize,
    pub matched: usize,
    pub missing: usize,
    pub gps_mismatch: usize,
    pub timestamp_mismatch: usize,
    pub warnings: Vec<String>,
}

const GPS_TOLERANCE: f64 = 0.0001;

/// Check the catalog against a CSV manifest (e.g. an exiftool export).
/// Requires `SourceFile` and `FileName` columns; `GPSLatitude`,
/// `GPSLongitude` and `DateTimeOriginal` are compared when present.
pub fn validate_against_csv(db: &Database, csv_path: &Path) -> Result<ValidationStats> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let Some(source_col) = column("SourceFile") else {
        bail!("CSV missing required field: SourceFile");
    };
    let Some(name_col) = column("FileName") else {
        bail!("CSV missing required field: FileName");
    };
    let lat_col = column("GPSLatitude");
    let lon_col = column("GPSLongitude");
    let taken_col = column("DateTimeOriginal");

    let mut stats = ValidationStats::default();

    for (row_num, row) in reader.records().enumerate() {
        let row = row?;
        stats.total_rows += 1;
        // Header is line 1, data starts at line 2
        let line = row_num + 2;

        let source_file = row.get(source_col).unwrap_or("").trim_start_matches("./");
        let file_name = row.get(name_col).unwrap_or("");
        if source_file.is_empty() {
            continue;
        }

        let Some(record) = db.find_by_path(source_file)? else {
            stats.missing += 1;
            stats
                .warnings
                .push(format!("row {line}: MISSING - {file_name} (source: {source_file})"));
            continue;
        };

        let mut has_mismatch = false;

        let csv_lat = lat_col.and_then(|c| row.get(c)).and_then(parse_decimal);
        let csv_lon = lon_col.and_then(|c| row.get(c)).and_then(parse_decimal);

        if let (Some(csv_lat), Some(csv_lon)) = (csv_lat, csv_lon) {
            match (record.gps_latitude, record.gps_longitude) {
                (Some(lat), Some(lon)) => {
                    if (lat - csv_lat).abs() > GPS_TOLERANCE || (lon - csv_lon).abs() > GPS_TOLERANCE {
                        stats.gps_mismatch += 1;
                        stats.warnings.push(format!(
                            "row {line}: GPS MISMATCH - {file_name} \
                             (CSV {csv_lat},{csv_lon} vs DB {lat},{lon})"
                        ));
                        has_mismatch = true;
                    }
                }
                _ => {
                    stats.gps_mismatch += 1;
                    stats
                        .warnings
                        .push(format!("row {line}: GPS MISMATCH - {file_name} (CSV has GPS, DB missing)"));
                    has_mismatch = true;
                }
            }
        }

        if let Some(csv_taken) = taken_col.and_then(|c| row.get(c)).filter(|t| !t.is_empty()) {
            if record.date_time_original_text.as_deref() != Some(csv_taken) {
                stats.timestamp_mismatch += 1;
                stats.warnings.push(format!(
                    "row {line}: TIMESTAMP MISMATCH - {file_name} \
                     (CSV {csv_taken:?} vs DB {:?})",
                    record.date_time_original_text
                ));
                has_mismatch = true;
            }
        }

        if !has_mismatch {
            stats.matched += 1;
        }
    }

    Ok(stats)
}

fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}
