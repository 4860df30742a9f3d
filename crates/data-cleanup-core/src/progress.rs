use crate::models::Dataset;

/// Trait for reporting run progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter {
    fn on_scan_start(&self, _root: &str) {}
    fn on_dataset_scanned(&self, _datasets_found: usize, _dataset: &Dataset) {}
    fn on_scan_complete(&self, _total_datasets: usize, _duration_secs: f64) {}
    fn on_cleanup_start(&self, _datasets_with_work: usize) {}
    fn on_dataset_processed(&self, _processed: usize, _total: usize) {}
    fn on_cleanup_complete(&self, _freed_mb: f64, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
