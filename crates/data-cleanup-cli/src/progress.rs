use data_cleanup_core::{Dataset, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::time::Duration;

/// CLI progress reporter using indicatif.
///
/// - Scan phase: spinner (number of sessions unknown upfront)
/// - Cleanup phase: progress bar over datasets with something to remove
pub struct CliReporter {
    bar: RefCell<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: RefCell::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Some(old) = self.bar.borrow_mut().replace(pb) {
            old.finish_and_clear();
        }
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, root: &str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(spinner_style());
        pb.set_message(format!("Scanning {}...", root));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_dataset_scanned(&self, datasets_found: usize, dataset: &Dataset) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_message(format!(
                "Scanning... {} sessions found ({})",
                datasets_found, dataset.session_name
            ));
        }
    }

    fn on_scan_complete(&self, total_datasets: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} sessions in {:.2}s",
            total_datasets, duration_secs
        );
    }

    fn on_cleanup_start(&self, datasets_with_work: usize) {
        let pb = ProgressBar::new(datasets_with_work as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Cleaning [{bar:30.cyan/dim}] {pos}/{len} datasets",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_dataset_processed(&self, processed: usize, _total: usize) {
        if let Some(pb) = self.bar.borrow().as_ref() {
            pb.set_position(processed as u64);
        }
    }

    fn on_cleanup_complete(&self, freed_mb: f64, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Cleanup complete: {:.2} MB freed in {:.2}s",
            freed_mb, duration_secs
        );
    }
}
