//! Read operations for the `stores` table.

use sqlx::PgPool;

use super::types::StoreRecord;

/// Fetch a single store by its identity key.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn find_store_by_key(
    pool: &PgPool,
    chain_code: &str,
    code: &str,
) -> Result<Option<StoreRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoreRecord>(
        "SELECT id, chain_code, code, store_type, address, city, zipcode, \
                lat, lon, created_at, updated_at \
         FROM stores \
         WHERE chain_code = $1 AND code = $2",
    )
    .bind(chain_code)
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// List stores, optionally restricted to one chain.
///
/// Results are ordered by `chain_code ASC, code ASC`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_stores(
    pool: &PgPool,
    chain_code: Option<&str>,
) -> Result<Vec<StoreRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoreRecord>(
        "SELECT id, chain_code, code, store_type, address, city, zipcode, \
                lat, lon, created_at, updated_at \
         FROM stores \
         WHERE ($1::text IS NULL OR chain_code = $1) \
         ORDER BY chain_code ASC, code ASC",
    )
    .bind(chain_code)
    .fetch_all(pool)
    .await
}

/// List stores that have coordinates, optionally restricted to one chain.
///
/// Used to populate map pins.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_geocoded_stores(
    pool: &PgPool,
    chain_code: Option<&str>,
) -> Result<Vec<StoreRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoreRecord>(
        "SELECT id, chain_code, code, store_type, address, city, zipcode, \
                lat, lon, created_at, updated_at \
         FROM stores \
         WHERE lat IS NOT NULL AND lon IS NOT NULL \
           AND ($1::text IS NULL OR chain_code = $1) \
         ORDER BY chain_code ASC, code ASC",
    )
    .bind(chain_code)
    .fetch_all(pool)
    .await
}

/// List stores still waiting for a geocode, optionally restricted to one chain.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_stores_missing_coordinates(
    pool: &PgPool,
    chain_code: Option<&str>,
) -> Result<Vec<StoreRecord>, sqlx::Error> {
    sqlx::query_as::<_, StoreRecord>(
        "SELECT id, chain_code, code, store_type, address, city, zipcode, \
                lat, lon, created_at, updated_at \
         FROM stores \
         WHERE (lat IS NULL OR lon IS NULL) \
           AND ($1::text IS NULL OR chain_code = $1) \
         ORDER BY chain_code ASC, code ASC",
    )
    .bind(chain_code)
    .fetch_all(pool)
    .await
}
