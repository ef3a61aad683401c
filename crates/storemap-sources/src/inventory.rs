//! HTTP client for the remote inventory API.
//!
//! The API lists retail chains and, per chain, the stores it operates. Every
//! request carries a bearer token; a client built without one fails each call
//! with [`SourceError::MissingCredential`] before touching the network.

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use storemap_core::Store;

use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::types::{ChainsResponse, StoresResponse};
use crate::{build_http_client, parse_base_url, HttpSettings};

const SERVICE: &str = "inventory API";

/// Client for the remote inventory API.
pub struct InventoryClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl InventoryClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the `reqwest::Client` cannot be built
    /// or [`SourceError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        settings: &HttpSettings,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_http_client(settings)?,
            base_url: parse_base_url(base_url)?,
            token: token.filter(|t| !t.trim().is_empty()),
            max_retries: settings.max_retries,
            retry_backoff_ms: settings.retry_backoff_ms,
        })
    }

    /// Builds a client from the application config.
    ///
    /// # Errors
    ///
    /// See [`InventoryClient::new`].
    pub fn from_app_config(config: &storemap_core::AppConfig) -> Result<Self, SourceError> {
        Self::new(
            &config.inventory_api_url,
            config.inventory_api_token.clone(),
            &HttpSettings::from_app_config(config),
        )
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    /// Lists every chain code known to the API.
    ///
    /// # Errors
    ///
    /// - [`SourceError::MissingCredential`] when no token is configured.
    /// - [`SourceError::UnexpectedStatus`] / [`SourceError::RateLimited`] for
    ///   non-2xx responses that survive the retry budget.
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::Deserialize`] if the body is not `{ "chains": [...] }`.
    pub async fn list_chains(&self) -> Result<Vec<String>, SourceError> {
        let url = self.endpoint(&["v1", "chains", ""])?;
        let response: ChainsResponse = self.get_json(url, "chains").await?;
        Ok(response.chains)
    }

    /// Lists every store of one chain.
    ///
    /// # Errors
    ///
    /// Same as [`InventoryClient::list_chains`].
    pub async fn list_stores_for_chain(&self, chain_code: &str) -> Result<Vec<Store>, SourceError> {
        let url = self.endpoint(&["v1", chain_code, "stores", ""])?;
        let response: StoresResponse = self
            .get_json(url, &format!("stores for chain {chain_code}"))
            .await?;
        Ok(response.stores)
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends an authenticated GET with retry, maps non-2xx statuses to typed
    /// errors, and deserializes the body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, SourceError> {
        let token = self
            .token
            .as_deref()
            .ok_or(SourceError::MissingCredential { service: SERVICE })?;

        retry_with_backoff(self.max_retries, self.retry_backoff_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url.clone()).bearer_auth(token).send().await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(1);
                    return Err(SourceError::RateLimited {
                        url: url.to_string(),
                        retry_after_secs,
                    });
                }

                if !status.is_success() {
                    return Err(SourceError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| SourceError::Deserialize {
                    context: context.to_string(),
                    source: e,
                })
            }
        })
        .await
    }
}
