//! Discovery of session folders.
//!
//! The data root is expected to look like:
//!
//! ```text
//! 447-1-B                                        <- rig
//!     750034                                     <- mouse id
//!         behavior_750034_2025-03-28_11-06-44    <- session
//!     769362
//!         behavior_769362_2025-05-19_13-21-31
//!         behavior_769362_2025-05-20_13-56-53
//! ```
//!
//! Anything that is not a directory at the mouse or session level is skipped.

pub mod walk;

pub use walk::{days_since_last_modification, folder_size_mb, list_subdirectories};

use crate::catalog::Catalog;
use crate::config::CleanupConfig;
use crate::error::Error;
use crate::models::Dataset;
use crate::progress::ProgressReporter;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Walk `rig/mouse/session` under the configured data directory and build one
/// [`Dataset`] per session folder.
///
/// Catalog lookup failures are logged and the dataset is treated as absent
/// from the catalog, so it can never be deleted in this run. Eligibility is
/// left unset; see [`crate::policy::evaluate_dataset`].
pub fn find_datasets(
    config: &CleanupConfig,
    catalog: &dyn Catalog,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<Dataset>, Error> {
    let root = config.data_directory.as_path();
    info!("Searching for data in {}", root.display());

    let mut datasets = Vec::new();
    for (rig, rig_folder) in list_subdirectories(root)? {
        for (mouse_id, mouse_folder) in subdirectories_or_skip(&rig_folder) {
            for (session_name, session_folder) in subdirectories_or_skip(&mouse_folder) {
                let folder_age = match days_since_last_modification(&session_folder) {
                    Ok(age) => age,
                    Err(err) => {
                        warn!(
                            "Could not read modification time of {}: {}",
                            session_folder.display(),
                            err
                        );
                        continue;
                    }
                };

                let exists_in_catalog = match catalog.exists(&session_name) {
                    Ok(exists) => exists,
                    Err(err) => {
                        error!(
                            session_name = %session_name,
                            error = %err,
                            "Catalog query failed, treating dataset as not captured"
                        );
                        false
                    }
                };

                let dataset = Dataset {
                    mouse_id: mouse_id.clone(),
                    size_mb: folder_size_mb(&session_folder),
                    session_name,
                    rig: rig.clone(),
                    folder: session_folder,
                    folder_age,
                    exists_in_catalog,
                    ok_to_delete: false,
                    subfolders: Vec::new(),
                };

                debug!(
                    mouse_id = %dataset.mouse_id,
                    rig = %dataset.rig,
                    folder = %dataset.folder.display(),
                    folder_age = dataset.folder_age,
                    size_mb = dataset.size_mb,
                    exists_in_catalog = dataset.exists_in_catalog,
                    "Found dataset {}",
                    dataset.session_name
                );

                if is_aging_out(&dataset, config) {
                    warn!(
                        mouse_id = %dataset.mouse_id,
                        rig = %dataset.rig,
                        folder_age = dataset.folder_age,
                        "Dataset '{}' is old but not in the catalog",
                        dataset.session_name
                    );
                }

                reporter.on_dataset_scanned(datasets.len() + 1, &dataset);
                datasets.push(dataset);
            }
        }
    }

    Ok(datasets)
}

/// Past the deletion age, not yet past the warning age, and never captured upstream.
pub fn is_aging_out(dataset: &Dataset, config: &CleanupConfig) -> bool {
    !dataset.exists_in_catalog
        && dataset.folder_age > f64::from(config.age_limit_days)
        && dataset.folder_age < f64::from(config.too_old_for_warning_days)
}

fn subdirectories_or_skip(dir: &Path) -> Vec<(String, PathBuf)> {
    list_subdirectories(dir).unwrap_or_else(|err| {
        warn!("Skipping unreadable folder {}: {}", dir.display(), err);
        Vec::new()
    })
}
