use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty values count as unset so `FOO=` in a .env file disables a feature.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("STOREMAP_ENV", "development"))?;

    let bind_addr: SocketAddr = parse_as(
        "STOREMAP_BIND_ADDR",
        &or_default("STOREMAP_BIND_ADDR", "0.0.0.0:3000"),
    )?;
    let log_level = or_default("STOREMAP_LOG_LEVEL", "info");

    let db_max_connections = parse_as(
        "STOREMAP_DB_MAX_CONNECTIONS",
        &or_default("STOREMAP_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_as(
        "STOREMAP_DB_MIN_CONNECTIONS",
        &or_default("STOREMAP_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_as(
        "STOREMAP_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("STOREMAP_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    let inventory_api_url = or_default("STOREMAP_INVENTORY_API_URL", "https://api.cijene.dev");
    let inventory_api_token = optional("STOREMAP_INVENTORY_API_TOKEN");
    let geocoder_url = or_default("STOREMAP_GEOCODER_URL", "https://photon.komoot.io");

    let http_timeout_secs = parse_as(
        "STOREMAP_HTTP_TIMEOUT_SECS",
        &or_default("STOREMAP_HTTP_TIMEOUT_SECS", "15"),
    )?;
    let http_user_agent = or_default("STOREMAP_USER_AGENT", "storemap/0.1 (store-locator)");
    let http_max_retries = parse_as(
        "STOREMAP_HTTP_MAX_RETRIES",
        &or_default("STOREMAP_HTTP_MAX_RETRIES", "2"),
    )?;
    let http_retry_backoff_ms = parse_as(
        "STOREMAP_HTTP_RETRY_BACKOFF_MS",
        &or_default("STOREMAP_HTTP_RETRY_BACKOFF_MS", "500"),
    )?;

    let geocode_batch_size: usize = parse_as(
        "STOREMAP_GEOCODE_BATCH_SIZE",
        &or_default("STOREMAP_GEOCODE_BATCH_SIZE", "5"),
    )?;
    if geocode_batch_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOREMAP_GEOCODE_BATCH_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let geocode_batch_delay_ms = parse_as(
        "STOREMAP_GEOCODE_BATCH_DELAY_MS",
        &or_default("STOREMAP_GEOCODE_BATCH_DELAY_MS", "1000"),
    )?;
    let update_geocode_delay_ms = parse_as(
        "STOREMAP_UPDATE_GEOCODE_DELAY_MS",
        &or_default("STOREMAP_UPDATE_GEOCODE_DELAY_MS", "200"),
    )?;
    let chain_fetch_delay_ms = parse_as(
        "STOREMAP_CHAIN_FETCH_DELAY_MS",
        &or_default("STOREMAP_CHAIN_FETCH_DELAY_MS", "100"),
    )?;
    let sync_cron = optional("STOREMAP_SYNC_CRON");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        inventory_api_url,
        inventory_api_token,
        geocoder_url,
        http_timeout_secs,
        http_user_agent,
        http_max_retries,
        http_retry_backoff_ms,
        geocode_batch_size,
        geocode_batch_delay_ms,
        update_geocode_delay_ms,
        chain_fetch_delay_ms,
        sync_cron,
    })
}

fn parse_as<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STOREMAP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
