//! HTTP clients for the external systems the store mirror depends on: the
//! remote inventory API (chains and their stores) and a Photon-compatible
//! geocoder.

pub mod error;
pub mod geocoder;
pub mod inventory;
pub(crate) mod retry;
pub mod types;

pub use error::SourceError;
pub use geocoder::GeocoderClient;
pub use inventory::InventoryClient;

/// Settings shared by both HTTP clients.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl HttpSettings {
    #[must_use]
    pub fn from_app_config(config: &storemap_core::AppConfig) -> Self {
        Self {
            timeout_secs: config.http_timeout_secs,
            user_agent: config.http_user_agent.clone(),
            max_retries: config.http_max_retries,
            retry_backoff_ms: config.http_retry_backoff_ms,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "storemap/0.1 (store-locator)".to_string(),
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// Builds a `reqwest` client carrying the shared timeout and user agent.
pub(crate) fn build_http_client(settings: &HttpSettings) -> Result<reqwest::Client, SourceError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(settings.timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(10))
        .user_agent(settings.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Parses `base_url` and normalises it to end with exactly one slash so that
/// `Url::join` appends rather than replacing the last path segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<reqwest::Url, SourceError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    reqwest::Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}
