//! Endpoint configuration for the three upstream services.

use std::time::Duration;

use serde::Deserialize;

use crate::RegistryError;

/// Address substring a parcel must contain to be kept by the locator.
pub const DEFAULT_LOCALITY: &str = "성남시";

/// WFS geometry service used to resolve parcels inside a bounding box.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub base_url: String,
    pub api_key: String,
    /// Referer domain registered with the API key, if the service checks it.
    pub domain: Option<String>,
    pub layer: String,
    pub srs: String,
    pub max_features: u32,
    /// Fixed allow-list; never read from a config file.
    #[serde(skip, default = "default_locality")]
    pub locality: String,
}

fn default_locality() -> String {
    DEFAULT_LOCALITY.to_string()
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.vworld.kr/req/wfs".into(),
            api_key: String::new(),
            domain: None,
            layer: "lp_pa_cbnd_bubun".into(),
            srs: "EPSG:4326".into(),
            max_features: 1000,
            locality: default_locality(),
        }
    }
}

/// Building-registry hub service; one operation per category.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub service_key: String,
    pub page_size: u32,
    pub page_no: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apis.data.go.kr/1613000/BldRgstHubService".into(),
            service_key: String::new(),
            page_size: 100,
            page_no: 1,
        }
    }
}

/// Authenticated owner-scraping backend. No endpoint means no enrichment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwnerConfig {
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub geometry: GeometryConfig,
    pub registry: RegistryConfig,
    pub owner: OwnerConfig,
    /// Per-request timeout. Unset means calls may hang indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl ServiceConfig {
    /// Shared HTTP client for all three services.
    pub fn http_client(&self) -> Result<reqwest::Client, RegistryError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }
}
