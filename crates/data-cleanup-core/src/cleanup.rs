use crate::config::CleanupConfig;
use crate::models::Dataset;
use crate::progress::ProgressReporter;
use filetime::FileTime;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, info_span, warn};

/// Outcome of one cleanup pass.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CleanupReport {
    pub datasets_found: usize,
    /// Datasets eligible for whole-folder removal.
    pub datasets_deletable: usize,
    pub datasets_deleted: usize,
    pub subfolders_deleted: usize,
    /// Removals that were attempted and failed.
    pub failures: usize,
    pub freed_mb: f64,
    pub dry_run: bool,
}

impl CleanupReport {
    pub fn has_deletions(&self) -> bool {
        self.datasets_deleted > 0 || self.subfolders_deleted > 0
    }
}

/// Remove (or, in dry-run mode, only log) everything the policy marked deletable.
///
/// A folder that cannot be removed is logged and skipped; the remaining
/// datasets are still processed. Only successful removals count toward
/// `datasets_deleted`, `subfolders_deleted` and `freed_mb`.
pub fn execute(
    datasets: &[Dataset],
    config: &CleanupConfig,
    reporter: &dyn ProgressReporter,
) -> CleanupReport {
    let mut report = CleanupReport {
        datasets_found: datasets.len(),
        datasets_deletable: datasets.iter().filter(|d| d.ok_to_delete).count(),
        dry_run: !config.actually_delete,
        ..Default::default()
    };

    let with_work: Vec<&Dataset> = datasets.iter().filter(|d| d.has_work()).collect();
    info!(
        "Found {} total datasets, {} deletable",
        report.datasets_found, report.datasets_deletable
    );
    reporter.on_cleanup_start(with_work.len());

    for (index, dataset) in with_work.iter().enumerate() {
        let span = info_span!(
            "dataset",
            mouse_id = %dataset.mouse_id,
            session_name = %dataset.session_name,
            rig = %dataset.rig,
            folder = %dataset.folder.display(),
            folder_age = dataset.folder_age,
            size_mb = dataset.size_mb,
            exists_in_catalog = dataset.exists_in_catalog,
        );
        let _enter = span.enter();

        if dataset.ok_to_delete {
            if !config.actually_delete {
                info!(
                    outcome = "identified",
                    "Identified deletable dataset {}",
                    dataset.session_name
                );
            } else {
                info!("Deleting dataset {}", dataset.session_name);
                if remove_folder(&dataset.folder) {
                    report.datasets_deleted += 1;
                    report.freed_mb += dataset.size_mb;
                } else {
                    report.failures += 1;
                }
            }
        } else {
            let parent_mtime = fs::metadata(&dataset.folder)
                .map(|meta| FileTime::from_last_modification_time(&meta))
                .ok();
            let removed_before = report.subfolders_deleted;

            for subfolder in dataset.deletable_subfolders() {
                if !config.actually_delete {
                    info!(
                        outcome = "identified",
                        subfolder_age = subfolder.age_days,
                        "Identified deletable subfolder {} of {}",
                        subfolder.name,
                        dataset.session_name
                    );
                    continue;
                }

                info!(
                    subfolder_age = subfolder.age_days,
                    "Deleting subfolder {} of {}", subfolder.name, dataset.session_name
                );
                if remove_folder(&subfolder.path) {
                    report.subfolders_deleted += 1;
                    report.freed_mb += subfolder.size_mb;
                } else {
                    report.failures += 1;
                }
            }

            // Removing a child bumps the session's mtime, which would restart its age.
            if report.subfolders_deleted > removed_before {
                if let Some(mtime) = parent_mtime {
                    restore_mtime(&dataset.folder, mtime);
                }
            }
        }

        reporter.on_dataset_processed(index + 1, with_work.len());
    }

    info!(
        freed_mb = report.freed_mb,
        datasets_deleted = report.datasets_deleted,
        subfolders_deleted = report.subfolders_deleted,
        failures = report.failures,
        dry_run = report.dry_run,
        config = ?config,
        "Deleted {:.2} MB of data across {} datasets",
        report.freed_mb,
        report.datasets_deleted
    );

    report
}

fn remove_folder(path: &Path) -> bool {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            info!(outcome = "deleted", "Removed {}", path.display());
            true
        }
        Err(err) => {
            error!(
                outcome = "failed",
                error = %err,
                "Could not remove folder {}",
                path.display()
            );
            false
        }
    }
}

fn restore_mtime(folder: &Path, mtime: FileTime) {
    if let Err(err) = filetime::set_file_mtime(folder, mtime) {
        warn!(
            error = %err,
            "Could not restore modification time of {}",
            folder.display()
        );
    }
}
