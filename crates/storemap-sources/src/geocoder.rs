//! Photon geocoder client.
//!
//! Resolves a street address and city to a coordinate with a free-text query
//! scoped to Croatia. No retry: geocoding is best-effort and callers already
//! pace their requests.

use reqwest::{Client, Url};
use storemap_core::Coordinate;

use crate::error::SourceError;
use crate::types::FeatureCollection;
use crate::{build_http_client, parse_base_url, HttpSettings};

const COUNTRY: &str = "Croatia";

/// Client for a Photon-compatible geocoding service.
pub struct GeocoderClient {
    client: Client,
    base_url: Url,
}

impl GeocoderClient {
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_http_client(settings)?,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// # Errors
    ///
    /// See [`GeocoderClient::new`].
    pub fn from_app_config(config: &storemap_core::AppConfig) -> Result<Self, SourceError> {
        Self::new(&config.geocoder_url, &HttpSettings::from_app_config(config))
    }

    /// Looks up one address.
    ///
    /// Returns `Ok(None)` when the service has no match. Failures are logged
    /// at `warn` and returned so batch callers can count them.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::UnexpectedStatus`] for a non-2xx response.
    /// - [`SourceError::Deserialize`] if the body is not a feature collection.
    pub async fn geocode_address(
        &self,
        address: &str,
        city: &str,
    ) -> Result<Option<Coordinate>, SourceError> {
        let url = self.search_url(address, city);
        let result = self.fetch(url).await;
        if let Err(e) = &result {
            tracing::warn!(address, city, error = %e, "geocoding failed");
        }
        result
    }

    async fn fetch(&self, url: Url) -> Result<Option<Coordinate>, SourceError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let collection: FeatureCollection =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: "geocoder response".to_string(),
                source: e,
            })?;
        Ok(collection.first_coordinate())
    }

    fn search_url(&self, address: &str, city: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", ""]);
        }
        url.query_pairs_mut()
            .append_pair("q", &search_query(address, city))
            .append_pair("limit", "1");
        url
    }
}

/// The free-text query sent to the geocoder.
#[must_use]
pub fn search_query(address: &str, city: &str) -> String {
    format!("{address}, {city}, {COUNTRY}")
}
