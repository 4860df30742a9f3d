use crate::catalog::Catalog;
use crate::cleanup::{self, CleanupReport};
use crate::config::CleanupConfig;
use crate::error::Error;
use crate::policy;
use crate::progress::ProgressReporter;
use crate::scanner;
use std::time::Instant;
use tracing::{debug, info};

pub struct CleanupEngine<C: Catalog> {
    config: CleanupConfig,
    catalog: C,
}

impl<C: Catalog> CleanupEngine<C> {
    pub fn new(config: CleanupConfig, catalog: C) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Run one full pass:
    /// 1. Walk `rig/mouse/session` folders and look each session up in the catalog
    /// 2. Decide what is deletable
    /// 3. Remove it (or only log it when `actually_delete` is off)
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<CleanupReport, Error> {
        let dry_run_msg = if self.config.actually_delete { "" } else { " (DRY RUN)" };
        info!(
            "Starting cleanup of {}{}",
            self.config.data_directory.display(),
            dry_run_msg
        );

        // Phase 1: Scan
        reporter.on_scan_start(&self.config.data_directory.to_string_lossy());
        let scan_start = Instant::now();
        let mut datasets = scanner::find_datasets(&self.config, &self.catalog, reporter)?;
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(datasets.len(), scan_duration.as_secs_f64());
        debug!(
            "Scan completed in {:.2}s, {} datasets",
            scan_duration.as_secs_f64(),
            datasets.len()
        );

        // Phase 2: Evaluate
        for dataset in datasets.iter_mut() {
            policy::evaluate_dataset(dataset, &self.config);
        }

        // Phase 3: Delete
        let cleanup_start = Instant::now();
        let report = cleanup::execute(&datasets, &self.config, reporter);
        reporter.on_cleanup_complete(report.freed_mb, cleanup_start.elapsed().as_secs_f64());

        Ok(report)
    }
}
