pub const SCHEMA: &str = r#"
-- Photos table: one row per ingested source file
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_path TEXT NOT NULL UNIQUE,
    file_name TEXT NOT NULL,
    directory TEXT NOT NULL,

    -- Capture time: raw EXIF text, and the timezone-corrected datetime
    -- computed during enrichment
    date_time_original_text TEXT,
    date_time_taken TEXT,

    -- GPS coordinates from EXIF (decimal degrees / meters)
    gps_latitude REAL,
    gps_longitude REAL,
    gps_altitude REAL,

    -- Geocoded location information
    location TEXT,
    country_code TEXT,
    geo_coded_at TEXT,

    -- H3 spatial indexes, coarse to fine; populated together
    h3_res_3 TEXT,
    h3_res_6 TEXT,
    h3_res_9 TEXT,
    h3_res_12 TEXT,
    h3_res_15 TEXT,

    -- Similarity hashes (64-bit, hex)
    perceptual_hash TEXT,
    average_hash TEXT,
    difference_hash TEXT,

    -- Complete EXIF data as JSON
    exif_meta TEXT,

    imported_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Indexes for common queries
CREATE INDEX IF NOT EXISTS idx_photos_file_name ON photos(file_name);
CREATE INDEX IF NOT EXISTS idx_photos_gps ON photos(gps_latitude, gps_longitude);
CREATE INDEX IF NOT EXISTS idx_photos_country_code ON photos(country_code);
CREATE INDEX IF NOT EXISTS idx_photos_date_time_taken ON photos(date_time_taken);
CREATE INDEX IF NOT EXISTS idx_photos_h3_res_3 ON photos(h3_res_3);
CREATE INDEX IF NOT EXISTS idx_photos_h3_res_6 ON photos(h3_res_6);
CREATE INDEX IF NOT EXISTS idx_photos_h3_res_9 ON photos(h3_res_9);
CREATE INDEX IF NOT EXISTS idx_photos_h3_res_12 ON photos(h3_res_12);
CREATE INDEX IF NOT EXISTS idx_photos_h3_res_15 ON photos(h3_res_15);
CREATE INDEX IF NOT EXISTS idx_photos_perceptual ON photos(perceptual_hash);
CREATE INDEX IF NOT EXISTS idx_photos_average ON photos(average_hash);
CREATE INDEX IF NOT EXISTS idx_photos_difference ON photos(difference_hash);
"#;

/// Additive migrations for catalogs created before these columns existed.
/// Failures are ignored; a fresh schema already contains them.
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE photos ADD COLUMN average_hash TEXT",
    "ALTER TABLE photos ADD COLUMN difference_hash TEXT",
    "ALTER TABLE photos ADD COLUMN date_time_taken TEXT",
];
