pub mod discovery;
pub mod fingerprint;
pub mod gps;
pub mod metadata;

use anyhow::Result;
use std::path::Path;
use std::sync::mpsc;
use tracing::warn;

use crate::config::ScannerConfig;
use crate::db::{Database, PhotoRecord};
use crate::geo;

pub use discovery::discover_photos;
pub use fingerprint::Fingerprints;
pub use metadata::ExifMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestAction {
    Created,
    Updated,
    Skipped,
}

/// Aggregate result of one directory ingestion run. The batch never fails
/// on a per-file problem; callers read `error_details` instead.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub total_files: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub processed: usize,
    pub errors: usize,
    pub error_details: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum IngestProgress {
    Started { total_files: usize },
    Scanning { current: usize, total: usize, path: String },
    Completed { created: usize, updated: usize, skipped: usize, errors: usize },
    Error { message: String },
}

pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Ingest every photo under a directory, sequentially.
    pub fn process_directory(
        &self,
        directory: &Path,
        db: &Database,
        force_reprocess: bool,
        progress_tx: Option<mpsc::Sender<IngestProgress>>,
    ) -> Result<IngestStats> {
        let mut stats = IngestStats::default();

        let photo_files = discover_photos(directory, &self.config.image_extensions)?;
        stats.total_files = photo_files.len();

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(IngestProgress::Started { total_files: stats.total_files });
        }

        for (index, file_path) in photo_files.iter().enumerate() {
            if let Some(ref tx) = progress_tx {
                let _ = tx.send(IngestProgress::Scanning {
                    current: index + 1,
                    total: stats.total_files,
                    path: file_path.to_string_lossy().to_string(),
                });
            }

            match self.process_single_photo(db, file_path, directory, force_reprocess) {
                Ok((IngestAction::Skipped, _)) => stats.skipped += 1,
                Ok((IngestAction::Created, _)) => {
                    stats.created += 1;
                    stats.processed += 1;
                }
                Ok((IngestAction::Updated, _)) => {
                    stats.updated += 1;
                    stats.processed += 1;
                }
                Err(e) => {
                    let message = format!("error processing {}: {e:#}", file_path.display());
                    warn!("{message}");
                    stats.errors += 1;
                    stats.error_details.push(message.clone());
                    if let Some(ref tx) = progress_tx {
                        let _ = tx.send(IngestProgress::Error { message });
                    }
                }
            }
        }

        if let Some(ref tx) = progress_tx {
            let _ = tx.send(IngestProgress::Completed {
                created: stats.created,
                updated: stats.updated,
                skipped: stats.skipped,
                errors: stats.errors,
            });
        }

        Ok(stats)
    }

    /// Ingest one photo file against the catalog.
    ///
    /// The pipeline order is fixed: metadata, coordinates, spatial cells,
    /// fingerprints last. Fingerprinting is the step most likely to fail
    /// on exotic containers and must not block metadata capture.
    pub fn process_single_photo(
        &self,
        db: &Database,
        file_path: &Path,
        base_directory: &Path,
        force_reprocess: bool,
    ) -> Result<(IngestAction, PhotoRecord)> {
        let relative_path = file_path
            .strip_prefix(base_directory)
            .unwrap_or(file_path)
            .to_string_lossy()
            .to_string();

        let (mut record, is_new) = match db.find_by_path(&relative_path)? {
            Some(record) => (record, false),
            None => (PhotoRecord::new(&relative_path), true),
        };

        if !force_reprocess && !is_new && record.is_fully_processed() {
            return Ok((IngestAction::Skipped, record));
        }

        record.file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        record.directory = Path::new(&relative_path)
            .parent()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let extracted = metadata::extract_metadata(file_path);

        record.exif_meta = Some(serde_json::Value::Object(extracted.tags.clone()));
        if extracted.date_time_original_text.is_some() {
            record.date_time_original_text = extracted.date_time_original_text.clone();
        }

        // Coordinates are committed as a pair; a file that stopped
        // yielding GPS keeps whatever the catalog already holds
        if extracted.has_coordinates() {
            record.gps_latitude = extracted.latitude;
            record.gps_longitude = extracted.longitude;
            if extracted.altitude.is_some() {
                record.gps_altitude = extracted.altitude;
            }
        }

        if let (Some(latitude), Some(longitude)) = (record.gps_latitude, record.gps_longitude) {
            match geo::cells_for(latitude, longitude) {
                Ok(cells) => record.set_spatial_cells(Some(cells)),
                Err(e) => warn!(
                    "could not index coordinates ({latitude}, {longitude}) for {}: {e}",
                    record.file_name
                ),
            }
        }

        match fingerprint::compute_fingerprints(file_path) {
            Ok(prints) => {
                record.perceptual_hash = Some(prints.perceptual);
                record.average_hash = Some(prints.average);
                record.difference_hash = Some(prints.difference);
            }
            Err(e) => warn!("could not fingerprint {}: {e}", file_path.display()),
        }

        // Recomputed coordinates invalidate any prior enrichment
        if force_reprocess && record.has_gps() {
            record.clear_enrichment();
        }

        let stored = db.upsert(&record)?;

        let action = if is_new { IngestAction::Created } else { IngestAction::Updated };
        Ok((action, stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn scanner() -> Scanner {
        Scanner::new(ScannerConfig::default())
    }

    fn write_png(path: &Path) {
        image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([(x * 8) as u8, (y * 8) as u8, 64]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_created_then_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path);
        let db = test_db();

        let (action, record) = scanner()
            .process_single_photo(&db, &path, dir.path(), false)
            .unwrap();
        assert_eq!(action, IngestAction::Created);
        assert_eq!(record.source_path, "a.png");
        assert!(record.perceptual_hash.is_some());
        assert!(record.is_fully_processed());

        let (action, second) = scanner()
            .process_single_photo(&db, &path, dir.path(), false)
            .unwrap();
        assert_eq!(action, IngestAction::Skipped);
        assert_eq!(second, record);
    }

    #[test]
    fn test_forced_reprocess_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path);
        let db = test_db();

        let (_, first) = scanner()
            .process_single_photo(&db, &path, dir.path(), false)
            .unwrap();
        let (action, second) = scanner()
            .process_single_photo(&db, &path, dir.path(), true)
            .unwrap();

        assert_eq!(action, IngestAction::Updated);
        assert_eq!(second.perceptual_hash, first.perceptual_hash);
        assert_eq!(second.average_hash, first.average_hash);
        assert_eq!(second.difference_hash, first.difference_hash);
    }

    #[test]
    fn test_incomplete_record_reprocessed_without_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path);
        let db = test_db();

        // Seed a shell without a fingerprint, as if an earlier run died
        let mut shell = PhotoRecord::new("a.png");
        shell.file_name = "a.png".into();
        db.upsert(&shell).unwrap();

        let (action, record) = scanner()
            .process_single_photo(&db, &path, dir.path(), false)
            .unwrap();
        assert_eq!(action, IngestAction::Updated);
        assert!(record.perceptual_hash.is_some());
    }

    #[test]
    fn test_missing_cell_forces_reprocessing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path);
        let db = test_db();

        // Coordinates with an incomplete cell set: not fully processed
        let mut seeded = PhotoRecord::new("a.png");
        seeded.file_name = "a.png".into();
        seeded.gps_latitude = Some(48.8584);
        seeded.gps_longitude = Some(2.2945);
        seeded.perceptual_hash = Some("00ff00ff00ff00ff".into());
        seeded.set_spatial_cells(Some(crate::geo::cells_for(48.8584, 2.2945).unwrap()));
        seeded.h3_res_12 = None;
        db.upsert(&seeded).unwrap();

        let (action, record) = scanner()
            .process_single_photo(&db, &path, dir.path(), false)
            .unwrap();
        assert_eq!(action, IngestAction::Updated);
        // Cells recomputed from the retained coordinates
        assert!(record.has_spatial_cells());
        assert_eq!(record.gps_latitude, Some(48.8584));
    }

    #[test]
    fn test_forced_reprocess_clears_enrichment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path);
        let db = test_db();

        let mut seeded = PhotoRecord::new("a.png");
        seeded.file_name = "a.png".into();
        seeded.gps_latitude = Some(48.8584);
        seeded.gps_longitude = Some(2.2945);
        seeded.set_spatial_cells(Some(crate::geo::cells_for(48.8584, 2.2945).unwrap()));
        seeded.perceptual_hash = Some("00ff00ff00ff00ff".into());
        seeded.location = Some("Paris, France".into());
        seeded.country_code = Some("FR".into());
        seeded.geo_coded_at = Some("2026-08-01T00:00:00Z".into());
        db.upsert(&seeded).unwrap();

        let (action, record) = scanner()
            .process_single_photo(&db, &path, dir.path(), true)
            .unwrap();
        assert_eq!(action, IngestAction::Updated);
        assert!(record.location.is_none());
        assert!(record.country_code.is_none());
        assert!(record.geo_coded_at.is_none());
    }

    #[test]
    fn test_undecodable_file_still_recorded_without_fingerprint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not actually a jpeg").unwrap();
        let db = test_db();

        let (action, record) = scanner()
            .process_single_photo(&db, &path, dir.path(), false)
            .unwrap();
        assert_eq!(action, IngestAction::Created);
        assert!(record.perceptual_hash.is_none());
        assert!(!record.is_fully_processed());
    }

    #[test]
    fn test_process_directory_stats_and_progress() {
        let dir = tempdir().unwrap();
        write_png(&dir.path().join("a.png"));
        write_png(&dir.path().join("b.png"));
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        let db = test_db();

        let (tx, rx) = mpsc::channel();
        let stats = scanner()
            .process_directory(dir.path(), &db, false, Some(tx))
            .unwrap();

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.created, 2);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.errors, 0);

        let events: Vec<_> = rx.try_iter().collect();
        assert!(matches!(events.first(), Some(IngestProgress::Started { total_files: 2 })));
        assert!(matches!(events.last(), Some(IngestProgress::Completed { created: 2, .. })));

        // A second run over the unchanged tree skips everything
        let stats = scanner()
            .process_directory(dir.path(), &db, false, None)
            .unwrap();
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.processed, 0);
        assert_eq!(db.photo_count().unwrap(), 2);
    }
}
