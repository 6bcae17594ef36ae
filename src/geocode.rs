//! Reverse-geocoding enrichment over the spatial index.
//!
//! Photos are grouped by their H3 cell at a configurable resolution and
//! each distinct cell is resolved once, using the cell center as the
//! representative point. The concrete provider stays behind the
//! `ReverseGeocoder` trait; this module owns only the grouping, the bulk
//! write-back, and the timezone correction of capture timestamps.

use anyhow::Result;
use chrono::{NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::mpsc;
use tracing::warn;

use crate::db::{Database, GeocodeUpdate, PhotoRecord};
use crate::geo;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding provider failure: {0}")]
    Provider(String),
}

/// One reverse-geocode result for a representative coordinate.
#[derive(Debug, Clone)]
pub struct ResolvedPlace {
    pub formatted_address: String,
    pub country_code: Option<String>,
    /// IANA identifier, e.g. `America/Los_Angeles`.
    pub timezone_id: Option<String>,
}

/// The mapping-API seam. Implementations do the network I/O; `Ok(None)`
/// means the provider had no answer for the coordinate.
pub trait ReverseGeocoder {
    fn resolve(&self, latitude: f64, longitude: f64) -> Result<Option<ResolvedPlace>, GeocodeError>;
}

#[derive(Debug, Clone, Default)]
pub struct GeocodeStats {
    pub total_photos: usize,
    pub processed_photos: usize,
    pub skipped_photos: usize,
    pub api_calls: usize,
    pub errors: usize,
    pub error_details: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum GeocodeProgress {
    Started { total_photos: usize, groups: usize },
    Resolved { cell: String, photos: usize },
    Completed { processed: usize, api_calls: usize, errors: usize },
}

pub struct GeocodingService<'a, G: ReverseGeocoder> {
    geocoder: &'a G,
    grouping_resolution: u8,
}

impl<'a, G: ReverseGeocoder> GeocodingService<'a, G> {
    pub fn new(geocoder: &'a G, grouping_resolution: u8) -> Self {
        Self { geocoder, grouping_resolution }
    }

    /// Enrich every record that has coordinates but no geocoding yet
    /// (or all coordinate-bearing records, when recalculating).
    pub fn geocode_photos(
        &self,
        db: &Database,
        recalculate: bool,
        progress_tx: Option<mpsc::Sender<GeocodeProgress>>,
    ) -> Result<GeocodeStats> {
        let mut stats = GeocodeStats::default();

        let candidates = db.photos_needing_geocoding(recalculate)?;
        stats.total_photos = candidates.len();
        if candidates.is_empty() {
            return Ok(stats);
        }

        let groups = self.group_by_cell(candidates, &mut stats);

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(GeocodeProgress::Started {
                total_photos: stats.total_photos,
                groups: groups.len(),
            });
        }

        for (cell, photos) in groups {
            match self.resolve_cell(db, &cell, &photos) {
                Ok(resolved) => {
                    stats.api_calls += 1;
                    if resolved {
                        stats.processed_photos += photos.len();
                    } else {
                        warn!("no geocoding result for cell {cell}");
                        stats.skipped_photos += photos.len();
                    }
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.send(GeocodeProgress::Resolved {
                            cell,
                            photos: photos.len(),
                        });
                    }
                }
                Err(e) => {
                    let message = format!("error geocoding cell {cell}: {e:#}");
                    warn!("{message}");
                    stats.errors += 1;
                    stats.error_details.push(message);
                    stats.skipped_photos += photos.len();
                }
            }
        }

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(GeocodeProgress::Completed {
                processed: stats.processed_photos,
                api_calls: stats.api_calls,
                errors: stats.errors,
            });
        }

        Ok(stats)
    }

    fn group_by_cell(
        &self,
        candidates: Vec<PhotoRecord>,
        stats: &mut GeocodeStats,
    ) -> BTreeMap<String, Vec<PhotoRecord>> {
        let mut groups: BTreeMap<String, Vec<PhotoRecord>> = BTreeMap::new();
        for record in candidates {
            let cell = record.cell_at(self.grouping_resolution).map(str::to_string);
            match cell {
                Some(cell) => groups.entry(cell).or_default().push(record),
                None => {
                    warn!(
                        "{} has coordinates but no cell at resolution {}; run a scan first",
                        record.source_path, self.grouping_resolution
                    );
                    stats.skipped_photos += 1;
                }
            }
        }
        groups
    }

    /// One provider call per cell, applied to every photo in the group.
    /// Returns false when the provider had no answer.
    fn resolve_cell(&self, db: &Database, cell: &str, photos: &[PhotoRecord]) -> Result<bool> {
        let (latitude, longitude) = geo::cell_center(cell)?;
        let Some(place) = self.geocoder.resolve(latitude, longitude)? else {
            return Ok(false);
        };

        let geo_coded_at = Utc::now().to_rfc3339();
        let updates: Vec<GeocodeUpdate> = photos
            .iter()
            .filter_map(|photo| {
                let date_time_taken = match (&place.timezone_id, &photo.date_time_original_text) {
                    (Some(tz), Some(text)) => timezone_corrected(text, tz),
                    _ => None,
                };
                Some(GeocodeUpdate {
                    id: photo.id?,
                    location: Some(truncate(&place.formatted_address, 255)),
                    country_code: place.country_code.as_deref().map(|c| truncate(c, 2)),
                    geo_coded_at: geo_coded_at.clone(),
                    date_time_taken,
                })
            })
            .collect();

        db.bulk_update_geocoding(&updates)?;
        Ok(true)
    }
}

/// Localize an EXIF capture timestamp ("2023:10:15 14:30:25") into the
/// given IANA timezone. Unparseable input yields `None`, logged upstream
/// by omission rather than failing the batch.
fn timezone_corrected(text: &str, timezone_id: &str) -> Option<String> {
    let naive = NaiveDateTime::parse_from_str(text, "%Y:%m:%d %H:%M:%S").ok()?;
    let tz: chrono_tz::Tz = timezone_id.parse().ok()?;
    let localized = tz.from_local_datetime(&naive).earliest()?;
    Some(localized.to_rfc3339())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct StubGeocoder {
        place: Option<ResolvedPlace>,
        fail: bool,
        calls: RefCell<usize>,
    }

    impl StubGeocoder {
        fn returning(place: Option<ResolvedPlace>) -> Self {
            Self { place, fail: false, calls: RefCell::new(0) }
        }

        fn failing() -> Self {
            Self { place: None, fail: true, calls: RefCell::new(0) }
        }
    }

    impl ReverseGeocoder for StubGeocoder {
        fn resolve(&self, _lat: f64, _lon: f64) -> Result<Option<ResolvedPlace>, GeocodeError> {
            *self.calls.borrow_mut() += 1;
            if self.fail {
                return Err(GeocodeError::Provider("quota exceeded".into()));
            }
            Ok(self.place.clone())
        }
    }

    fn sf_place() -> ResolvedPlace {
        ResolvedPlace {
            formatted_address: "San Francisco, CA, USA".into(),
            country_code: Some("US".into()),
            timezone_id: Some("America/Los_Angeles".into()),
        }
    }

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn seed(db: &Database, path: &str, lat: f64, lon: f64) -> PhotoRecord {
        let mut record = PhotoRecord::new(path);
        record.file_name = path.to_string();
        record.gps_latitude = Some(lat);
        record.gps_longitude = Some(lon);
        record.set_spatial_cells(Some(geo::cells_for(lat, lon).unwrap()));
        record.date_time_original_text = Some("2023:10:15 14:30:25".into());
        db.upsert(&record).unwrap()
    }

    #[test]
    fn test_one_call_per_distinct_cell() {
        let db = test_db();
        // A burst pair at one spot shares a resolution-9 cell, one far away
        seed(&db, "a.jpg", 37.7749, -122.4194);
        seed(&db, "b.jpg", 37.7749, -122.4194);
        seed(&db, "c.jpg", 48.8584, 2.2945);

        let geocoder = StubGeocoder::returning(Some(sf_place()));
        let service = GeocodingService::new(&geocoder, 9);
        let stats = service.geocode_photos(&db, false, None).unwrap();

        assert_eq!(stats.total_photos, 3);
        assert_eq!(stats.api_calls, 2);
        assert_eq!(*geocoder.calls.borrow(), 2);
        assert_eq!(stats.processed_photos, 3);
        assert_eq!(stats.errors, 0);

        let enriched = db.find_by_path("b.jpg").unwrap().unwrap();
        assert_eq!(enriched.country_code.as_deref(), Some("US"));
        assert_eq!(enriched.location.as_deref(), Some("San Francisco, CA, USA"));
        assert!(enriched.geo_coded_at.is_some());
        assert_eq!(
            enriched.date_time_taken.as_deref(),
            Some("2023-10-15T14:30:25-07:00")
        );
    }

    #[test]
    fn test_already_geocoded_skipped_unless_recalculating() {
        let db = test_db();
        let mut record = seed(&db, "a.jpg", 37.7749, -122.4194);
        record.geo_coded_at = Some("2026-08-01T00:00:00Z".into());
        db.upsert(&record).unwrap();

        let geocoder = StubGeocoder::returning(Some(sf_place()));
        let service = GeocodingService::new(&geocoder, 9);

        let stats = service.geocode_photos(&db, false, None).unwrap();
        assert_eq!(stats.total_photos, 0);
        assert_eq!(*geocoder.calls.borrow(), 0);

        let stats = service.geocode_photos(&db, true, None).unwrap();
        assert_eq!(stats.total_photos, 1);
        assert_eq!(stats.api_calls, 1);
    }

    #[test]
    fn test_no_result_counts_as_skipped() {
        let db = test_db();
        seed(&db, "a.jpg", 37.7749, -122.4194);

        let geocoder = StubGeocoder::returning(None);
        let service = GeocodingService::new(&geocoder, 9);
        let stats = service.geocode_photos(&db, false, None).unwrap();

        assert_eq!(stats.api_calls, 1);
        assert_eq!(stats.processed_photos, 0);
        assert_eq!(stats.skipped_photos, 1);

        let record = db.find_by_path("a.jpg").unwrap().unwrap();
        assert!(record.geo_coded_at.is_none());
    }

    #[test]
    fn test_provider_failure_continues_batch() {
        let db = test_db();
        seed(&db, "a.jpg", 37.7749, -122.4194);
        seed(&db, "c.jpg", 48.8584, 2.2945);

        let geocoder = StubGeocoder::failing();
        let service = GeocodingService::new(&geocoder, 9);
        let stats = service.geocode_photos(&db, false, None).unwrap();

        assert_eq!(stats.errors, 2);
        assert_eq!(stats.skipped_photos, 2);
        assert_eq!(stats.error_details.len(), 2);
    }

    #[test]
    fn test_timezone_corrected() {
        assert_eq!(
            timezone_corrected("2023:10:15 14:30:25", "America/Los_Angeles").as_deref(),
            Some("2023-10-15T14:30:25-07:00")
        );
        // Standard time after the DST switch
        assert_eq!(
            timezone_corrected("2023:12:15 14:30:25", "America/Los_Angeles").as_deref(),
            Some("2023-12-15T14:30:25-08:00")
        );
        assert_eq!(timezone_corrected("not a date", "America/Los_Angeles"), None);
        assert_eq!(timezone_corrected("2023:10:15 14:30:25", "Not/AZone"), None);
    }

    #[test]
    fn test_truncate_limits() {
        let long = "x".repeat(300);
        assert_eq!(truncate(&long, 255).len(), 255);
        assert_eq!(truncate("USA", 2), "US");
    }
}
