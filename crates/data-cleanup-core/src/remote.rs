//! Per-rig configuration served by the central config API.

use crate::error::Error;
use serde_json::{Map, Value};
use std::env;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const CONFIG_API_URL_VAR: &str = "ALLENINST_CONFIG_API_URL";
pub const COMP_ID_VAR: &str = "aibs_comp_id";
pub const RIG_ID_VAR: &str = "aibs_rig_id";

const DEFAULT_CONFIG_API_URL: &str = "http://eng-tools:8888/api/v1beta/configs/projects/";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RemoteConfigSource {
    pub base_url: String,
    pub app_name: String,
    pub rig_name: String,
}

impl RemoteConfigSource {
    pub fn new(base_url: &str, app_name: &str, rig_name: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            app_name: app_name.to_string(),
            rig_name: rig_name.to_string(),
        }
    }

    pub fn from_env(app_name: &str) -> Self {
        let base_url =
            env::var(CONFIG_API_URL_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_API_URL.to_string());
        Self::new(&base_url, app_name, &env_or_unknown(COMP_ID_VAR))
    }

    pub fn url(&self) -> Result<Url, Error> {
        let base = Url::parse(&format!("{}/", self.base_url.trim_end_matches('/')))?;
        let mut url = base.join(&self.app_name)?;
        url.query_pairs_mut().append_pair("rig_name", &self.rig_name);
        Ok(url)
    }

    /// Fetch the JSON object for this app and rig.
    pub fn fetch(&self) -> Result<Map<String, Value>, Error> {
        let url = self.url()?;
        debug!("Fetching config from {}", url);

        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;
        let body: Value = client.get(url).send()?.error_for_status()?.json()?;

        match body {
            Value::Object(map) => Ok(map),
            other => Err(Error::InvalidConfig(format!(
                "remote config must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Value of an environment variable, or `"unknown"` when unset.
pub fn env_or_unknown(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| "unknown".to_string())
}
