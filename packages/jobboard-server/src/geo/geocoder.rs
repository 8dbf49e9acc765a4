use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::GeoPoint;
use crate::models::Location;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors from resolving an address
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("No location found for: {0}")]
    NoResults(String),

    #[error("Geocoder is not configured")]
    NotConfigured,

    #[error("Geocoding request failed: {0}")]
    Upstream(String),
}

/// Resolves free-form addresses and postal codes to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `query` to its best match
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError>;
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// MapQuest geocoding API client
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    #[serde(default)]
    street: String,
    /// City
    #[serde(default)]
    admin_area5: String,
    /// State
    #[serde(default)]
    admin_area3: String,
    /// Country
    #[serde(default)]
    admin_area1: String,
    #[serde(default)]
    postal_code: String,
    lat_lng: MapQuestLatLng,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl From<MapQuestLocation> for Location {
    fn from(loc: MapQuestLocation) -> Self {
        let region = format!("{} {}", loc.admin_area3, loc.postal_code);
        let formatted_address = [
            loc.street.as_str(),
            loc.admin_area5.as_str(),
            region.as_str(),
            loc.admin_area1.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

        Location {
            latitude: loc.lat_lng.lat,
            longitude: loc.lat_lng.lng,
            formatted_address,
            city: non_empty(loc.admin_area5),
            state: non_empty(loc.admin_area3),
            zipcode: non_empty(loc.postal_code),
            country: non_empty(loc.admin_area1),
        }
    }
}

impl MapQuestGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeocodeError::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError> {
        let api_key = self.api_key.as_deref().ok_or(GeocodeError::NotConfigured)?;
        let url = format!("{}/geocoding/v1/address", self.base_url);

        debug!("Geocoding {:?}", query);
        let response = self
            .client
            .get(&url)
            .query(&[("key", api_key), ("location", query), ("maxResults", "1")])
            .send()
            .await
            .map_err(|e| {
                warn!("Geocoder request failed: {}", e);
                GeocodeError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            warn!("Geocoder returned status {}", response.status());
            return Err(GeocodeError::Upstream(format!(
                "status {}",
                response.status()
            )));
        }

        let body: MapQuestResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Upstream(e.to_string()))?;

        body.results
            .into_iter()
            .flat_map(|result| result.locations)
            .next()
            .map(Location::from)
            .ok_or_else(|| GeocodeError::NoResults(query.to_string()))
    }
}

/// Fixed lookup table of query -> location, for tests
#[cfg(test)]
#[derive(Default)]
pub struct StaticGeocoder {
    entries: std::collections::HashMap<String, Location>,
}

#[cfg(test)]
impl StaticGeocoder {
    pub fn with(mut self, query: &str, latitude: f64, longitude: f64) -> Self {
        self.entries.insert(
            query.to_string(),
            Location {
                latitude,
                longitude,
                formatted_address: query.to_string(),
                city: None,
                state: None,
                zipcode: Some(query.to_string()),
                country: Some("US".to_string()),
            },
        );
        self
    }
}

#[cfg(test)]
#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError> {
        self.entries
            .get(query)
            .cloned()
            .ok_or_else(|| GeocodeError::NoResults(query.to_string()))
    }
}
