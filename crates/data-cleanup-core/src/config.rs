//! Run configuration.
//!
//! A [`CleanupConfig`] is assembled once at startup from several layers,
//! lowest priority first:
//!
//! 1. compiled-in defaults
//! 2. the JSON object fetched from the remote config server
//! 3. an optional local `Config.{toml,json}` file
//! 4. `DATA_CLEANUP_*` environment variables
//! 5. explicit overrides from the caller (CLI flags)
//!
//! The merged result is deserialized into the fixed schema and validated
//! before anything touches the filesystem.
//!
//! `subfolder_age` keys are matched against directory names, which are case
//! sensitive, while the `config` crate lowercases every key it merges. That
//! map is therefore merged separately from the remote, local file and
//! override layers with its keys kept as written. It cannot be set from the
//! environment.

use crate::error::Error;
use crate::APP_NAME;
use config::{Config, Environment, File as ConfigFile, FileFormat};
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CleanupConfig {
    /// Root folder holding `rig/mouse/session` directories.
    pub data_directory: PathBuf,

    /// Sessions older than this (in days) and present in the catalog are deleted.
    #[serde(default = "default_age_limit_days")]
    pub age_limit_days: u32,

    /// Sessions between `age_limit_days` and this age that are missing from
    /// the catalog produce a warning.
    #[serde(default = "default_too_old_for_warning_days")]
    pub too_old_for_warning_days: u32,

    /// When false, eligible datasets are only logged.
    #[serde(default)]
    pub actually_delete: bool,

    /// Per-subfolder age limits in days, keyed by subfolder name.
    #[serde(default)]
    pub subfolder_age: BTreeMap<String, u32>,

    /// Address of the log aggregator that ships this run's records.
    #[serde(default)]
    pub logserver_url: Option<String>,

    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Lock file guarding against overlapping runs on the same host.
    #[serde(default)]
    pub lock_file: Option<PathBuf>,
}

/// Location of the metadata catalog queried for dataset presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,

    #[serde(default = "default_catalog_database")]
    pub database: String,

    #[serde(default = "default_catalog_collection")]
    pub collection: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            database: default_catalog_database(),
            collection: default_catalog_collection(),
            timeout_secs: default_catalog_timeout_secs(),
        }
    }
}

fn default_age_limit_days() -> u32 {
    14
}

fn default_too_old_for_warning_days() -> u32 {
    30
}

fn default_catalog_url() -> String {
    "https://api.allenneuraldynamics.org".to_string()
}

fn default_catalog_database() -> String {
    "metadata_index".to_string()
}

fn default_catalog_collection() -> String {
    "data_assets".to_string()
}

fn default_catalog_timeout_secs() -> u64 {
    60
}

impl CleanupConfig {
    /// Config with defaults for everything but the data root.
    pub fn new(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
            age_limit_days: default_age_limit_days(),
            too_old_for_warning_days: default_too_old_for_warning_days(),
            actually_delete: false,
            subfolder_age: BTreeMap::new(),
            logserver_url: None,
            catalog: CatalogConfig::default(),
            lock_file: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.data_directory.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "data_directory must not be empty".to_string(),
            ));
        }
        if self.too_old_for_warning_days < self.age_limit_days {
            return Err(Error::InvalidConfig(format!(
                "too_old_for_warning_days ({}) must be >= age_limit_days ({})",
                self.too_old_for_warning_days, self.age_limit_days
            )));
        }
        if self.catalog.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "catalog.timeout_secs must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.catalog.url)?;
        Ok(())
    }

    pub fn lock_path(&self) -> PathBuf {
        self.lock_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{}.lock", APP_NAME)))
    }
}

/// Values supplied explicitly by the caller. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_limit_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub too_old_for_warning_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actually_delete: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub subfolder_age: BTreeMap<String, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_file: Option<PathBuf>,
}

/// Builds a [`CleanupConfig`] from the layered sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    local_file: Option<String>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            local_file: Some("Config".to_string()),
            env_prefix: Some("DATA_CLEANUP".to_string()),
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the optional local file from `name` (extension is probed) instead of `Config`.
    pub fn with_local_file(mut self, name: &str) -> Self {
        self.local_file = Some(name.to_string());
        self
    }

    pub fn without_local_file(mut self) -> Self {
        self.local_file = None;
        self
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    pub fn load(
        &self,
        remote: &serde_json::Map<String, serde_json::Value>,
        overrides: &ConfigOverrides,
    ) -> Result<CleanupConfig, Error> {
        let defaults = serde_json::json!({
            "age_limit_days": default_age_limit_days(),
            "too_old_for_warning_days": default_too_old_for_warning_days(),
            "actually_delete": false,
            "catalog": CatalogConfig::default(),
        });

        let mut builder = Config::builder()
            .add_source(ConfigFile::from_str(&defaults.to_string(), FileFormat::Json))
            .add_source(ConfigFile::from_str(
                &serde_json::to_string(remote)?,
                FileFormat::Json,
            ));

        let mut local = serde_json::Value::Null;
        if let Some((path, format)) = self.local_file.as_deref().and_then(find_local_file) {
            let text = fs::read_to_string(&path)?;
            local = parse_local_file(&text, &format)?;
            builder = builder.add_source(ConfigFile::from_str(&text, format));
        }
        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config = builder
            .add_source(ConfigFile::from_str(
                &serde_json::to_string(overrides)?,
                FileFormat::Json,
            ))
            .build()?
            .try_deserialize::<CleanupConfig>()?;

        let mut subfolder_age = subfolder_age_layer(remote.get("subfolder_age"))?;
        subfolder_age.extend(subfolder_age_layer(local.get("subfolder_age"))?);
        subfolder_age.extend(overrides.subfolder_age.clone());
        config.subfolder_age = subfolder_age;

        config.validate()?;
        Ok(config)
    }
}

/// `{name}.toml` or `{name}.json`, whichever exists first.
fn find_local_file(name: &str) -> Option<(PathBuf, FileFormat)> {
    [("toml", FileFormat::Toml), ("json", FileFormat::Json)]
        .into_iter()
        .map(|(ext, format)| (PathBuf::from(format!("{}.{}", name, ext)), format))
        .find(|(path, _)| path.is_file())
}

fn parse_local_file(text: &str, format: &FileFormat) -> Result<serde_json::Value, Error> {
    match format {
        FileFormat::Toml => Ok(toml::from_str(text)?),
        _ => Ok(serde_json::from_str(text)?),
    }
}

fn subfolder_age_layer(
    value: Option<&serde_json::Value>,
) -> Result<BTreeMap<String, u32>, Error> {
    match value {
        Some(value) if !value.is_null() => Ok(serde_json::from_value(value.clone())?),
        _ => Ok(BTreeMap::new()),
    }
}

/// JSON schema describing every option [`CleanupConfig`] accepts.
pub fn config_schema() -> RootSchema {
    schemars::schema_for!(CleanupConfig)
}

/// Write the schema as pretty JSON to `path`, creating parent folders.
pub fn write_config_schema(path: &Path) -> Result<String, Error> {
    let text = serde_json::to_string_pretty(&config_schema())?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &text)?;
    Ok(text)
}
