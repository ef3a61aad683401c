use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub inventory_api_url: String,
    /// Bearer token for the inventory API. Remote operations fail with a
    /// configuration error when this is absent.
    pub inventory_api_token: Option<String>,
    pub geocoder_url: String,
    pub http_timeout_secs: u64,
    pub http_user_agent: String,
    pub http_max_retries: u32,
    pub http_retry_backoff_ms: u64,
    pub geocode_batch_size: usize,
    pub geocode_batch_delay_ms: u64,
    pub update_geocode_delay_ms: u64,
    pub chain_fetch_delay_ms: u64,
    /// Cron expression for the scheduled full sync; `None` disables it.
    pub sync_cron: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("inventory_api_url", &self.inventory_api_url)
            .field(
                "inventory_api_token",
                &self.inventory_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field("geocoder_url", &self.geocoder_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("http_user_agent", &self.http_user_agent)
            .field("http_max_retries", &self.http_max_retries)
            .field("http_retry_backoff_ms", &self.http_retry_backoff_ms)
            .field("geocode_batch_size", &self.geocode_batch_size)
            .field("geocode_batch_delay_ms", &self.geocode_batch_delay_ms)
            .field("update_geocode_delay_ms", &self.update_geocode_delay_ms)
            .field("chain_fetch_delay_ms", &self.chain_fetch_delay_ms)
            .field("sync_cron", &self.sync_cron)
            .finish()
    }
}
