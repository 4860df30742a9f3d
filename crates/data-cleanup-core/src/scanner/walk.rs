use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Directories directly under `dir`, sorted by name. Files are skipped.
pub fn list_subdirectories(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut dirs: Vec<(String, PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Error reading entry in {}: {}", dir.display(), err);
                None
            }
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some((name, path))
        })
        .collect();

    dirs.sort();
    Ok(dirs)
}

/// Fractional days since `path` was last modified. Future timestamps count as zero.
pub fn days_since_last_modification(path: &Path) -> io::Result<f64> {
    let modified = fs::metadata(path)?.modified()?;
    let age = SystemTime::now()
        .duration_since(modified)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok(age / SECONDS_PER_DAY)
}

/// Sum of regular file sizes under `folder`, in megabytes.
pub fn folder_size_mb(folder: &Path) -> f64 {
    let total_bytes: u64 = WalkDir::new(folder)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("Skipping unreadable entry under {}: {}", folder.display(), err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum();

    total_bytes as f64 / BYTES_PER_MB
}
