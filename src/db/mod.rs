mod schema;
pub mod record;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub use record::PhotoRecord;
pub use schema::{MIGRATIONS, SCHEMA};

/// Enrichment fields written back by the geocoding batch job.
#[derive(Debug, Clone)]
pub struct GeocodeUpdate {
    pub id: i64,
    pub location: Option<String>,
    pub country_code: Option<String>,
    pub geo_coded_at: String,
    pub date_time_taken: Option<String>,
}

const RECORD_COLUMNS: &str = "id, source_path, file_name, directory, \
     date_time_original_text, date_time_taken, \
     gps_latitude, gps_longitude, gps_altitude, \
     location, country_code, geo_coded_at, \
     h3_res_3, h3_res_6, h3_res_9, h3_res_12, h3_res_15, \
     perceptual_hash, average_hash, difference_hash, exif_meta";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    pub fn find_by_path(&self, source_path: &str) -> Result<Option<PhotoRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM photos WHERE source_path = ?");
        let result = self.conn.query_row(&sql, [source_path], row_to_record);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or update on the `source_path` uniqueness constraint and
    /// return the stored row. Re-ingesting a path never duplicates it.
    pub fn upsert(&self, record: &PhotoRecord) -> Result<PhotoRecord> {
        let exif_meta = record
            .exif_meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            r#"
            INSERT INTO photos (
                source_path, file_name, directory,
                date_time_original_text, date_time_taken,
                gps_latitude, gps_longitude, gps_altitude,
                location, country_code, geo_coded_at,
                h3_res_3, h3_res_6, h3_res_9, h3_res_12, h3_res_15,
                perceptual_hash, average_hash, difference_hash, exif_meta
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
            ON CONFLICT(source_path) DO UPDATE SET
                file_name = excluded.file_name,
                directory = excluded.directory,
                date_time_original_text = excluded.date_time_original_text,
                date_time_taken = excluded.date_time_taken,
                gps_latitude = excluded.gps_latitude,
                gps_longitude = excluded.gps_longitude,
                gps_altitude = excluded.gps_altitude,
                location = excluded.location,
                country_code = excluded.country_code,
                geo_coded_at = excluded.geo_coded_at,
                h3_res_3 = excluded.h3_res_3,
                h3_res_6 = excluded.h3_res_6,
                h3_res_9 = excluded.h3_res_9,
                h3_res_12 = excluded.h3_res_12,
                h3_res_15 = excluded.h3_res_15,
                perceptual_hash = excluded.perceptual_hash,
                average_hash = excluded.average_hash,
                difference_hash = excluded.difference_hash,
                exif_meta = excluded.exif_meta,
                updated_at = CURRENT_TIMESTAMP
            "#,
            rusqlite::params![
                record.source_path,
                record.file_name,
                record.directory,
                record.date_time_original_text,
                record.date_time_taken,
                record.gps_latitude,
                record.gps_longitude,
                record.gps_altitude,
                record.location,
                record.country_code,
                record.geo_coded_at,
                record.h3_res_3,
                record.h3_res_6,
                record.h3_res_9,
                record.h3_res_12,
                record.h3_res_15,
                record.perceptual_hash,
                record.average_hash,
                record.difference_hash,
                exif_meta,
            ],
        )?;

        self.find_by_path(&record.source_path)?
            .ok_or_else(|| anyhow::anyhow!("upsert lost record {}", record.source_path))
    }

    /// Records with coordinates that still lack enrichment (or all of
    /// them, when recalculating).
    pub fn photos_needing_geocoding(&self, recalculate: bool) -> Result<Vec<PhotoRecord>> {
        let mut sql = format!(
            "SELECT {RECORD_COLUMNS} FROM photos \
             WHERE gps_latitude IS NOT NULL AND gps_longitude IS NOT NULL"
        );
        if !recalculate {
            sql.push_str(" AND geo_coded_at IS NULL");
        }
        sql.push_str(" ORDER BY source_path");

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn count_photos_needing_geocoding(&self) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM photos \
             WHERE gps_latitude IS NOT NULL AND gps_longitude IS NOT NULL \
             AND geo_coded_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Distinct spatial cells among records needing enrichment, i.e. the
    /// number of reverse-geocode lookups a run at this resolution costs.
    pub fn distinct_cells_needing_geocoding(&self, resolution: u8) -> Result<i64> {
        let Some(column) = cell_column(resolution) else {
            anyhow::bail!("unsupported H3 resolution: {resolution}");
        };
        let sql = format!(
            "SELECT COUNT(DISTINCT {column}) FROM photos \
             WHERE gps_latitude IS NOT NULL AND gps_longitude IS NOT NULL \
             AND geo_coded_at IS NULL AND {column} IS NOT NULL"
        );
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Apply enrichment results in one transaction. A `None`
    /// `date_time_taken` leaves the stored value untouched.
    pub fn bulk_update_geocoding(&self, updates: &[GeocodeUpdate]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut applied = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE photos SET \
                     location = ?1, country_code = ?2, geo_coded_at = ?3, \
                     date_time_taken = COALESCE(?4, date_time_taken), \
                     updated_at = CURRENT_TIMESTAMP \
                 WHERE id = ?5",
            )?;
            for update in updates {
                applied += stmt.execute(rusqlite::params![
                    update.location,
                    update.country_code,
                    update.geo_coded_at,
                    update.date_time_taken,
                    update.id,
                ])?;
            }
        }
        tx.commit()?;
        Ok(applied)
    }

    pub fn photo_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn cell_column(resolution: u8) -> Option<&'static str> {
    match resolution {
        3 => Some("h3_res_3"),
        6 => Some("h3_res_6"),
        9 => Some("h3_res_9"),
        12 => Some("h3_res_12"),
        15 => Some("h3_res_15"),
        _ => None,
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<PhotoRecord> {
    let exif_meta: Option<String> = row.get(20)?;
    Ok(PhotoRecord {
        id: row.get(0)?,
        source_path: row.get(1)?,
        file_name: row.get(2)?,
        directory: row.get(3)?,
        date_time_original_text: row.get(4)?,
        date_time_taken: row.get(5)?,
        gps_latitude: row.get(6)?,
        gps_longitude: row.get(7)?,
        gps_altitude: row.get(8)?,
        location: row.get(9)?,
        country_code: row.get(10)?,
        geo_coded_at: row.get(11)?,
        h3_res_3: row.get(12)?,
        h3_res_6: row.get(13)?,
        h3_res_9: row.get(14)?,
        h3_res_12: row.get(15)?,
        h3_res_15: row.get(16)?,
        perceptual_hash: row.get(17)?,
        average_hash: row.get(18)?,
        difference_hash: row.get(19)?,
        exif_meta: exif_meta.and_then(|text| serde_json::from_str(&text).ok()),
    })
}
