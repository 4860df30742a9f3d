pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod models;
pub mod policy;
pub mod progress;
pub mod remote;
pub mod scanner;

pub use catalog::{Catalog, DocDbCatalog, InMemoryCatalog};
pub use cleanup::CleanupReport;
pub use config::{CleanupConfig, ConfigLoader, ConfigOverrides};
pub use engine::CleanupEngine;
pub use error::Error;
pub use models::{Dataset, SubfolderDecision};
pub use progress::{ProgressReporter, SilentReporter};

/// Name used for the remote config lookup, the lock file and log tagging.
pub const APP_NAME: &str = "data-cleanup";
