//! Reverse geocoding collaborator.
//!
//! The geocoder is injected wherever an address is wanted; failures are
//! never fatal to a query — callers log and fall back to an empty string.

use async_trait::async_trait;
use log::warn;
use serde::Deserialize;

use crate::error::Error;

/// Turns a coordinate into a formatted address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<String, Error>;
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    formatted_address: String,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

/// Geocoder backed by a Google-style `geocode/json` endpoint.
pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGeocoder {
    pub const DEFAULT_BASE_URL: &'static str = "https://maps.googleapis.com/maps/api/geocode/json";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpGeocoder {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for HttpGeocoder {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<String, Error> {
        let external = |e: reqwest::Error| Error::ExternalServiceFailure(Box::new(e));
        let response: GeocodingResponse = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", format!("{lat},{lng}")), ("key", self.api_key.clone())])
            .send()
            .await
            .map_err(external)?
            .error_for_status()
            .map_err(external)?
            .json()
            .await
            .map_err(external)?;

        match response.results.into_iter().next() {
            Some(result) => Ok(result.formatted_address),
            None => {
                warn!("no address found for [{lat},{lng}]");
                Err(Error::ExternalServiceFailure(
                    format!("no address for [{lat},{lng}]").into(),
                ))
            }
        }
    }
}
