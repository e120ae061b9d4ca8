//! REST API client for the village boundary service.
//!
//! Handles all communication with the backend: search, detail lookups and
//! raw vector tile downloads.

use crate::backend::VillageBackend;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use batas_core::config::ApiConfig;
use batas_core::tile::TileCoord;
use bytes::Bytes;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SEARCH_PATH: [&str; 4] = ["api", "v1", "desa", "search"];
const DETAIL_PATH: [&str; 4] = ["api", "v1", "desa", "detail"];
const TILES_PATH: &str = "api/v1/tiles/batas_desa";

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new API client with an explicit request timeout
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .with_context(|| format!("Invalid API base URL: {}", base_url.as_ref()))?;

        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry paths: {}", base_url);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { base_url, client })
    }

    /// Create a client from the `api` configuration section
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base URL cannot carry paths: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("{} request failed ({}): {}", what, status, error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }

    /// Search villages by name or code
    pub async fn search(&self, query: &str) -> Result<Value> {
        let url = self.endpoint(SEARCH_PATH)?;
        tracing::debug!(%url, query, "searching villages");

        self.get_json(self.client.get(url).query(&[("q", query)]), "Search")
            .await
    }

    /// Get the full record of a village
    pub async fn detail(&self, code: &str) -> Result<Value> {
        let url = self.endpoint(DETAIL_PATH.into_iter().chain([code]))?;
        tracing::debug!(%url, "fetching village detail");

        self.get_json(self.client.get(url), "Detail").await
    }

    /// URL template of the boundary overlay tiles, with `{z}/{x}/{y}` placeholders
    pub fn tile_url_template(&self) -> String {
        format!(
            "{}/{}/{{z}}/{{x}}/{{y}}.pbf",
            self.base_url.as_str().trim_end_matches('/'),
            TILES_PATH
        )
    }

    /// URL of a single boundary tile
    pub fn tile_url(&self, tile: TileCoord) -> String {
        tile.fill_template(&self.tile_url_template())
    }

    /// Download a raw vector tile payload
    pub async fn fetch_tile(&self, tile: TileCoord) -> Result<Bytes> {
        let url = self.tile_url(tile);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to request tile {}", tile))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Tile {} request failed ({}): {}", tile, status, error_text);
        }

        response
            .bytes()
            .await
            .with_context(|| format!("Failed to read tile {} payload", tile))
    }
}

#[async_trait]
impl VillageBackend for ApiClient {
    async fn search(&self, query: &str) -> Result<Value> {
        ApiClient::search(self, query).await
    }

    async fn detail(&self, code: &str) -> Result<Value> {
        ApiClient::detail(self, code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(ApiClient::new("http://localhost").is_ok());
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:desa@example.org").is_err());
    }

    #[test]
    fn test_endpoints() {
        let client = ApiClient::new("http://localhost").unwrap();
        assert_eq!(
            client.endpoint(SEARCH_PATH).unwrap().as_str(),
            "http://localhost/api/v1/desa/search"
        );
        assert_eq!(
            client
                .endpoint(DETAIL_PATH.into_iter().chain(["33/01"]))
                .unwrap()
                .as_str(),
            "http://localhost/api/v1/desa/detail/33%2F01"
        );
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let client = ApiClient::new("https://example.org/gis/").unwrap();
        assert_eq!(
            client.endpoint(SEARCH_PATH).unwrap().as_str(),
            "https://example.org/gis/api/v1/desa/search"
        );
    }

    #[test]
    fn test_tile_urls() {
        let client = ApiClient::new("http://localhost").unwrap();
        assert_eq!(
            client.tile_url_template(),
            "http://localhost/api/v1/tiles/batas_desa/{z}/{x}/{y}.pbf"
        );
        let tile = TileCoord::new(14, 13215, 8547).unwrap();
        assert_eq!(
            client.tile_url(tile),
            "http://localhost/api/v1/tiles/batas_desa/14/13215/8547.pbf"
        );
    }

    #[test]
    fn test_from_config() {
        let config = ApiConfig {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 5,
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:8080/");
    }
}
