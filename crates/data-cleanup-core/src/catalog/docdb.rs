use super::Catalog;
use crate::config::CatalogConfig;
use crate::error::Error;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::trace;
use url::Url;

/// Blocking client for the metadata document database's `find` endpoint.
///
/// Requests look like `GET {url}/v1/{database}/{collection}/find?filter={...}`
/// and the response body is a JSON array of matching records.
#[derive(Clone)]
pub struct DocDbCatalog {
    find_url: Url,
    client: reqwest::blocking::Client,
}

impl DocDbCatalog {
    pub fn new(config: &CatalogConfig) -> Result<Self, Error> {
        let base = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))?;
        let find_url = base.join(&format!(
            "v1/{}/{}/find",
            config.database, config.collection
        ))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { find_url, client })
    }

    /// Return every record matching `filter`.
    pub fn find(&self, filter: &Value) -> Result<Vec<Value>, Error> {
        let records: Vec<Value> = self
            .client
            .get(self.find_url.clone())
            .query(&[("filter", filter.to_string())])
            .send()?
            .error_for_status()?
            .json()?;
        trace!(filter = %filter, count = records.len(), "Received records from catalog");
        Ok(records)
    }
}

impl Catalog for DocDbCatalog {
    fn exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.find(&json!({ "name": name }))?.len() == 1)
    }
}
