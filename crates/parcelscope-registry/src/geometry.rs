//! Parcel resolution from a drawn polygon via a WFS bounding-box query.

use std::collections::HashSet;

use parcelscope_core::{BoundingBox, LatLng, ParcelRef};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{GeometryConfig, RegistryError};

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Deserialize, Default)]
struct FeatureProperties {
    #[serde(default)]
    pnu: Option<String>,
    #[serde(default)]
    addr: Option<String>,
}

/// Resolves the parcels inside a polygon's bounding box.
pub struct ParcelLocator {
    client: reqwest::Client,
    config: GeometryConfig,
}

impl ParcelLocator {
    pub fn new(client: reqwest::Client, config: GeometryConfig) -> Self {
        Self { client, config }
    }

    /// Query the geometry service for parcels intersecting the bounding box of
    /// `vertices`, keeping only those whose address contains the configured
    /// locality.
    ///
    /// Fewer than 3 vertices yields `Ok(vec![])` without a network call. A
    /// transport or parse failure is returned as `Err`, so callers can tell
    /// "no parcels here" apart from "query failed".
    pub async fn locate(&self, vertices: &[LatLng]) -> Result<Vec<ParcelRef>, RegistryError> {
        if vertices.len() < 3 {
            warn!(vertices = vertices.len(), "polygon too small, skipping geometry query");
            return Ok(Vec::new());
        }
        let Some(bbox) = BoundingBox::from_vertices(vertices) else {
            return Ok(Vec::new());
        };

        let mut query = vec![
            ("SERVICE", "WFS".to_string()),
            ("REQUEST", "GetFeature".to_string()),
            ("VERSION", "1.1.0".to_string()),
            ("TYPENAME", self.config.layer.clone()),
            ("SRSNAME", self.config.srs.clone()),
            ("OUTPUT", "application/json".to_string()),
            ("MAXFEATURES", self.config.max_features.to_string()),
            ("BBOX", bbox.to_query_param()),
            ("KEY", self.config.api_key.clone()),
        ];
        if let Some(domain) = &self.config.domain {
            query.push(("DOMAIN", domain.clone()));
        }

        info!(url = %self.config.base_url, bbox = %bbox.to_query_param(), "querying parcels in bounding box");
        let resp = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let collection: FeatureCollection = serde_json::from_str(&resp.text().await?)?;
        let total = collection.features.len();
        let parcels = self.filter_features(collection.features);
        info!(features = total, kept = parcels.len(), locality = %self.config.locality, "parcels resolved");
        Ok(parcels)
    }

    fn filter_features(&self, features: Vec<Feature>) -> Vec<ParcelRef> {
        let mut seen = HashSet::new();
        features
            .into_iter()
            .filter_map(|f| {
                let identifier = f.properties.pnu?.trim().to_string();
                let address = f.properties.addr?.trim().to_string();
                (!identifier.is_empty() && address.contains(self.config.locality.as_str()))
                    .then_some(ParcelRef {
                        identifier,
                        address,
                    })
            })
            .filter(|p| seen.insert(p.identifier.clone()))
            .collect()
    }
}
