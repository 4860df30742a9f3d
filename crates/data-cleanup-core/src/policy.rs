//! Deletion eligibility.
//!
//! A session folder may be removed only when it is older than the age limit
//! *and* the catalog confirms it was captured upstream. Named subfolders can
//! carry their own, usually shorter, age limit so bulky data can be purged
//! early while the rest of the session is kept.

use crate::config::CleanupConfig;
use crate::models::{Dataset, SubfolderDecision};
use crate::scanner;
use std::fs;
use tracing::debug;

/// Strictly older than the limit and present in the catalog.
pub fn is_deletable(age_days: f64, exists_in_catalog: bool, age_limit_days: u32) -> bool {
    exists_in_catalog && age_days > f64::from(age_limit_days)
}

/// Fill in `ok_to_delete` and the subfolder decisions for a scanned dataset.
///
/// Whole-dataset deletion takes precedence: when the dataset itself is
/// eligible no subfolder decisions are produced. Subfolders are only
/// considered when the dataset is present in the catalog.
pub fn evaluate_dataset(dataset: &mut Dataset, config: &CleanupConfig) {
    dataset.ok_to_delete = is_deletable(
        dataset.folder_age,
        dataset.exists_in_catalog,
        config.age_limit_days,
    );
    dataset.subfolders.clear();

    if dataset.ok_to_delete || !dataset.exists_in_catalog || config.subfolder_age.is_empty() {
        return;
    }

    let entries = match fs::read_dir(&dataset.folder) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(
                "Could not list subfolders of {}: {}",
                dataset.folder.display(),
                err
            );
            return;
        }
    };

    let mut subfolders: Vec<SubfolderDecision> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let age_limit_days = *config.subfolder_age.get(&name)?;
            let path = entry.path();
            let age_days = match scanner::days_since_last_modification(&path) {
                Ok(age) => age,
                Err(err) => {
                    debug!("Could not read age of {}: {}", path.display(), err);
                    return None;
                }
            };
            Some(SubfolderDecision {
                ok_to_delete: is_deletable(age_days, dataset.exists_in_catalog, age_limit_days),
                size_mb: scanner::folder_size_mb(&path),
                name,
                path,
                age_days,
                age_limit_days,
            })
        })
        .collect();

    subfolders.sort_by(|a, b| a.name.cmp(&b.name));
    dataset.subfolders = subfolders;
}
