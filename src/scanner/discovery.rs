use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively discover photo files under a directory.
///
/// Filtering is case-insensitive on the extension. Unreadable entries are
/// skipped rather than failing the walk; the result is sorted so repeated
/// scans visit files in the same order.
pub fn discover_photos(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut photos = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension() {
                let ext_lower = ext.to_string_lossy().to_lowercase();
                if extensions.iter().any(|e| e.to_lowercase() == ext_lower) {
                    photos.push(path.to_path_buf());
                }
            }
        }
    }

    photos.sort();

    Ok(photos)
}
