use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use tempfile::tempdir;

use data_cleanup_core::{
    policy, scanner, Catalog, CleanupConfig, CleanupEngine, ConfigLoader, ConfigOverrides, Dataset,
    Error, InMemoryCatalog, ProgressReporter, SilentReporter,
};
use serde_json::json;

const KNOWN_SESSIONS: [&str; 3] = [
    "behavior_750034_2025-03-28_11-06-44",
    "behavior_769362_2025-05-19_13-21-31",
    "behavior_769362_2025-05-20_13-56-53",
];

fn backdate(path: &Path, hours: u64) {
    let then = SystemTime::now() - Duration::from_secs(hours * 3600);
    set_file_mtime(path, FileTime::from_system_time(then)).unwrap();
}

/// Layout:
///   root/
///     rig/
///       750034/
///         behavior_750034_2025-03-28_11-06-44/
///       769362/
///         behavior_769362_2025-05-19_13-21-31/
///         behavior_769362_2025-05-20_13-56-53/
///         nope/                                  <- not in the catalog
///
/// Every session folder holds a 1 MB file and is backdated by one hour.
fn create_test_tree(root: &Path) -> Vec<PathBuf> {
    let sessions: Vec<PathBuf> = vec![
        root.join("rig").join("750034").join(KNOWN_SESSIONS[0]),
        root.join("rig").join("769362").join(KNOWN_SESSIONS[1]),
        root.join("rig").join("769362").join(KNOWN_SESSIONS[2]),
        root.join("rig").join("769362").join("nope"),
    ];
    for session in &sessions {
        fs::create_dir_all(session).unwrap();
        fs::write(session.join("data.bin"), vec![0u8; 1024 * 1024]).unwrap();
        backdate(session, 1);
    }
    sessions
}

fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(KNOWN_SESSIONS)
}

fn config(root: &Path, age_limit_days: u32, actually_delete: bool) -> CleanupConfig {
    let mut config = CleanupConfig::new(root);
    config.age_limit_days = age_limit_days;
    config.actually_delete = actually_delete;
    config
}

#[test]
fn test_dry_run_never_touches_the_filesystem() {
    let tmp = tempdir().unwrap();
    let sessions = create_test_tree(tmp.path());

    let engine = CleanupEngine::new(config(tmp.path(), 0, false), catalog());
    let report = engine.run(&SilentReporter).unwrap();

    assert!(sessions.iter().all(|s| s.exists()));
    assert_eq!(report.datasets_found, 4);
    assert_eq!(report.datasets_deletable, 3);
    assert_eq!(report.datasets_deleted, 0);
    assert!(report.dry_run);
}

#[test]
fn test_actual_delete_removes_only_cataloged_sessions() {
    let tmp = tempdir().unwrap();
    let sessions = create_test_tree(tmp.path());

    let engine = CleanupEngine::new(config(tmp.path(), 0, true), catalog());
    let report = engine.run(&SilentReporter).unwrap();

    assert!(sessions[..3].iter().all(|s| !s.exists()));
    assert!(sessions[3].exists());
    assert_eq!(report.datasets_deleted, 3);
    assert_eq!(report.failures, 0);
    assert!((report.freed_mb - 3.0).abs() < 1e-9);
}

#[test]
fn test_young_sessions_are_kept() {
    let tmp = tempdir().unwrap();
    let sessions = create_test_tree(tmp.path());

    let engine = CleanupEngine::new(config(tmp.path(), 14, true), catalog());
    let report = engine.run(&SilentReporter).unwrap();

    assert!(sessions.iter().all(|s| s.exists()));
    assert_eq!(report.datasets_deletable, 0);
}

#[test]
fn test_scan_is_repeatable() {
    let tmp = tempdir().unwrap();
    create_test_tree(tmp.path());
    let config = config(tmp.path(), 0, false);

    let decisions = || -> Vec<(String, bool)> {
        let mut datasets = scanner::find_datasets(&config, &catalog(), &SilentReporter).unwrap();
        datasets
            .iter_mut()
            .map(|d| {
                policy::evaluate_dataset(d, &config);
                (d.session_name.clone(), d.ok_to_delete)
            })
            .collect()
    };

    let first = decisions();
    let second = decisions();
    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            (KNOWN_SESSIONS[0].to_string(), true),
            (KNOWN_SESSIONS[1].to_string(), true),
            (KNOWN_SESSIONS[2].to_string(), true),
            ("nope".to_string(), false),
        ]
    );
}

#[test]
fn test_scan_fills_dataset_fields() {
    let tmp = tempdir().unwrap();
    create_test_tree(tmp.path());

    let datasets =
        scanner::find_datasets(&config(tmp.path(), 0, false), &catalog(), &SilentReporter)
            .unwrap();
    let first = &datasets[0];

    assert_eq!(first.rig, "rig");
    assert_eq!(first.mouse_id, "750034");
    assert_eq!(first.session_name, KNOWN_SESSIONS[0]);
    assert_eq!(first.folder, tmp.path().join("rig/750034").join(KNOWN_SESSIONS[0]));
    assert!((first.size_mb - 1.0).abs() < 1e-9);
    assert!((first.folder_age - 1.0 / 24.0).abs() < 0.01);
    assert!(first.exists_in_catalog);
    assert!(!first.ok_to_delete);
}

#[test]
fn test_unexpected_layout_is_skipped() {
    let tmp = tempdir().unwrap();
    create_test_tree(tmp.path());
    fs::write(tmp.path().join("README.txt"), "top-level file").unwrap();
    fs::write(tmp.path().join("rig").join("rig.json"), "{}").unwrap();
    fs::write(tmp.path().join("rig").join("769362").join("notes.txt"), "x").unwrap();
    fs::create_dir_all(tmp.path().join("shallow")).unwrap();

    let datasets =
        scanner::find_datasets(&config(tmp.path(), 0, false), &catalog(), &SilentReporter)
            .unwrap();
    assert_eq!(datasets.len(), 4);
}

#[test]
fn test_missing_root_is_an_error() {
    let tmp = tempdir().unwrap();
    let engine = CleanupEngine::new(config(&tmp.path().join("missing"), 0, false), catalog());
    assert!(matches!(engine.run(&SilentReporter), Err(Error::Io(_))));
}

/// Fails the lookup for one session name, answers from the inner catalog otherwise.
struct FlakyCatalog {
    inner: InMemoryCatalog,
    failing: &'static str,
}

impl Catalog for FlakyCatalog {
    fn exists(&self, name: &str) -> Result<bool, Error> {
        if name == self.failing {
            return Err(Error::Catalog("connection reset".to_string()));
        }
        self.inner.exists(name)
    }
}

#[test]
fn test_catalog_failure_keeps_dataset_and_continues() {
    let tmp = tempdir().unwrap();
    let sessions = create_test_tree(tmp.path());

    let catalog = FlakyCatalog {
        inner: catalog(),
        failing: KNOWN_SESSIONS[1],
    };
    let engine = CleanupEngine::new(config(tmp.path(), 0, true), catalog);
    let report = engine.run(&SilentReporter).unwrap();

    assert!(!sessions[0].exists());
    assert!(sessions[1].exists());
    assert!(!sessions[2].exists());
    assert!(sessions[3].exists());
    assert_eq!(report.datasets_deleted, 2);
}

/// Removes one folder right before deletion starts, as a concurrent process might.
struct VanishingReporter {
    victim: PathBuf,
    processed: Cell<usize>,
}

impl ProgressReporter for VanishingReporter {
    fn on_cleanup_start(&self, _datasets_with_work: usize) {
        fs::remove_dir_all(&self.victim).unwrap();
    }

    fn on_dataset_processed(&self, processed: usize, _total: usize) {
        self.processed.set(processed);
    }
}

#[test]
fn test_failed_removal_does_not_stop_the_run() {
    let tmp = tempdir().unwrap();
    let sessions = create_test_tree(tmp.path());

    let reporter = VanishingReporter {
        victim: sessions[0].clone(),
        processed: Cell::new(0),
    };
    let engine = CleanupEngine::new(config(tmp.path(), 0, true), catalog());
    let report = engine.run(&reporter).unwrap();

    assert!(!sessions[1].exists());
    assert!(!sessions[2].exists());
    assert!(sessions[3].exists());
    assert_eq!(reporter.processed.get(), 3);
    assert_eq!(report.datasets_deletable, 3);
    assert_eq!(report.datasets_deleted, 2);
    assert_eq!(report.failures, 1);
    assert!((report.freed_mb - 2.0).abs() < 1e-9);
}

#[test]
fn test_subfolder_policy_removes_only_videos() {
    let tmp = tempdir().unwrap();
    let session = tmp.path().join("rig").join("750034").join(KNOWN_SESSIONS[0]);
    let videos = session.join("behavior-videos");
    let behavior = session.join("behavior");
    fs::create_dir_all(&videos).unwrap();
    fs::create_dir_all(&behavior).unwrap();
    fs::write(videos.join("camera.avi"), vec![0u8; 1024 * 1024]).unwrap();
    fs::write(behavior.join("trials.json"), "[]").unwrap();
    backdate(&videos, 1);

    let mut config = config(tmp.path(), 14, true);
    config.subfolder_age.insert("behavior-videos".to_string(), 0);
    let report = CleanupEngine::new(config, catalog())
        .run(&SilentReporter)
        .unwrap();

    assert!(!videos.exists());
    assert!(behavior.exists());
    assert!(session.exists());
    assert_eq!(report.datasets_deleted, 0);
    assert_eq!(report.subfolders_deleted, 1);
    assert!((report.freed_mb - 1.0).abs() < 1e-9);
}

#[test]
fn test_loaded_subfolder_policy_matches_mixed_case_names() {
    let tmp = tempdir().unwrap();
    let session = tmp.path().join("rig").join("750034").join(KNOWN_SESSIONS[0]);
    let videos = session.join("Behavior-Videos");
    let behavior = session.join("behavior");
    fs::create_dir_all(&videos).unwrap();
    fs::create_dir_all(&behavior).unwrap();
    backdate(&videos, 1);

    let remote = json!({
        "data_directory": tmp.path(),
        "actually_delete": true,
        "subfolder_age": { "Behavior-Videos": 0 },
    });
    let config = ConfigLoader::new()
        .without_local_file()
        .without_env()
        .load(remote.as_object().unwrap(), &ConfigOverrides::default())
        .unwrap();
    let report = CleanupEngine::new(config, catalog())
        .run(&SilentReporter)
        .unwrap();

    assert!(!videos.exists());
    assert!(behavior.exists());
    assert_eq!(report.subfolders_deleted, 1);
}

#[test]
fn test_subfolder_policy_dry_run() {
    let tmp = tempdir().unwrap();
    let session = tmp.path().join("rig").join("750034").join(KNOWN_SESSIONS[0]);
    let videos = session.join("behavior-videos");
    fs::create_dir_all(&videos).unwrap();
    backdate(&videos, 1);

    let mut config = config(tmp.path(), 14, false);
    config.subfolder_age.insert("behavior-videos".to_string(), 0);
    let report = CleanupEngine::new(config, catalog())
        .run(&SilentReporter)
        .unwrap();

    assert!(videos.exists());
    assert!(!report.has_deletions());
}

fn aging_dataset(age: f64, exists_in_catalog: bool) -> Dataset {
    Dataset {
        mouse_id: "769362".to_string(),
        session_name: "behavior_769362_2025-05-20_13-56-53".to_string(),
        rig: "rig".to_string(),
        folder: PathBuf::from("/data/rig/769362/behavior_769362_2025-05-20_13-56-53"),
        folder_age: age,
        exists_in_catalog,
        size_mb: 0.0,
        ok_to_delete: false,
        subfolders: Vec::new(),
    }
}

#[test]
fn test_aging_out_window() {
    let config = CleanupConfig::new("/data");

    assert!(scanner::is_aging_out(&aging_dataset(20.0, false), &config));
    assert!(!scanner::is_aging_out(&aging_dataset(20.0, true), &config));
    assert!(!scanner::is_aging_out(&aging_dataset(10.0, false), &config));
    assert!(!scanner::is_aging_out(&aging_dataset(14.0, false), &config));
    assert!(!scanner::is_aging_out(&aging_dataset(30.0, false), &config));
    assert!(!scanner::is_aging_out(&aging_dataset(45.0, false), &config));
}
