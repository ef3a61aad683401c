//! Write operations for the `stores` table.

use sqlx::PgPool;
use storemap_core::{Store, StoreKey};

use super::types::{CoordinateUpdate, StoreRecord, StoreUpdate};

/// Insert one store and return the persisted row.
///
/// `created_at` and `updated_at` are both set to `NOW()`. Coordinates are
/// written only when the store carries both `lat` and `lon`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the insert fails, including a unique violation
/// when the key already exists.
pub async fn create_store(pool: &PgPool, store: &Store) -> Result<StoreRecord, sqlx::Error> {
    let coordinate = store.coordinate();

    sqlx::query_as::<_, StoreRecord>(
        "INSERT INTO stores \
             (chain_code, code, store_type, address, city, zipcode, lat, lon) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id, chain_code, code, store_type, address, city, zipcode, \
                   lat, lon, created_at, updated_at",
    )
    .bind(&store.chain_code)
    .bind(&store.code)
    .bind(&store.store_type)
    .bind(&store.address)
    .bind(&store.city)
    .bind(&store.zipcode)
    .bind(coordinate.map(|c| c.lat))
    .bind(coordinate.map(|c| c.lon))
    .fetch_one(pool)
    .await
}

/// Apply a typed update to one store and return the updated row.
///
/// Returns `Ok(None)` when no row matches the key; this never inserts.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the update fails.
pub async fn update_store(
    pool: &PgPool,
    chain_code: &str,
    code: &str,
    update: &StoreUpdate,
) -> Result<Option<StoreRecord>, sqlx::Error> {
    match update {
        StoreUpdate::Address(address) => {
            sqlx::query_as::<_, StoreRecord>(
                "UPDATE stores SET \
                     address    = $3, \
                     city       = $4, \
                     zipcode    = $5, \
                     lat        = $6, \
                     lon        = $7, \
                     updated_at = NOW() \
                 WHERE chain_code = $1 AND code = $2 \
                 RETURNING id, chain_code, code, store_type, address, city, zipcode, \
                           lat, lon, created_at, updated_at",
            )
            .bind(chain_code)
            .bind(code)
            .bind(&address.address)
            .bind(&address.city)
            .bind(&address.zipcode)
            .bind(address.coordinate.map(|c| c.lat))
            .bind(address.coordinate.map(|c| c.lon))
            .fetch_optional(pool)
            .await
        }
        StoreUpdate::Coordinates(coordinate) => {
            sqlx::query_as::<_, StoreRecord>(
                "UPDATE stores SET lat = $3, lon = $4, updated_at = NOW() \
                 WHERE chain_code = $1 AND code = $2 \
                 RETURNING id, chain_code, code, store_type, address, city, zipcode, \
                           lat, lon, created_at, updated_at",
            )
            .bind(chain_code)
            .bind(code)
            .bind(coordinate.lat)
            .bind(coordinate.lon)
            .fetch_optional(pool)
            .await
        }
    }
}

/// Insert a batch of stores in one round-trip.
///
/// Every row in the batch shares the statement's `NOW()` timestamp. Keys
/// that already exist are skipped, so the returned count is the number of
/// rows actually inserted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn bulk_create_stores(pool: &PgPool, stores: &[Store]) -> Result<u64, sqlx::Error> {
    if stores.is_empty() {
        return Ok(0);
    }

    let mut chain_codes: Vec<String> = Vec::with_capacity(stores.len());
    let mut codes: Vec<String> = Vec::with_capacity(stores.len());
    let mut store_types: Vec<String> = Vec::with_capacity(stores.len());
    let mut addresses: Vec<String> = Vec::with_capacity(stores.len());
    let mut cities: Vec<String> = Vec::with_capacity(stores.len());
    let mut zipcodes: Vec<String> = Vec::with_capacity(stores.len());
    let mut lats: Vec<Option<f64>> = Vec::with_capacity(stores.len());
    let mut lons: Vec<Option<f64>> = Vec::with_capacity(stores.len());

    for store in stores {
        let coordinate = store.coordinate();
        chain_codes.push(store.chain_code.clone());
        codes.push(store.code.clone());
        store_types.push(store.store_type.clone());
        addresses.push(store.address.clone());
        cities.push(store.city.clone());
        zipcodes.push(store.zipcode.clone());
        lats.push(coordinate.map(|c| c.lat));
        lons.push(coordinate.map(|c| c.lon));
    }

    let rows_affected = sqlx::query(
        "INSERT INTO stores \
             (chain_code, code, store_type, address, city, zipcode, lat, lon) \
         SELECT * FROM UNNEST(\
              $1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], \
              $7::float8[], $8::float8[]) \
         ON CONFLICT (chain_code, code) DO NOTHING",
    )
    .bind(&chain_codes)
    .bind(&codes)
    .bind(&store_types)
    .bind(&addresses)
    .bind(&cities)
    .bind(&zipcodes)
    .bind(&lats)
    .bind(&lons)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Write coordinates for a batch of stores in one round-trip.
///
/// Returns the number of rows whose coordinates actually changed. Unknown
/// keys and writes that would store the same point again are not counted
/// (and do not bump `updated_at`). Rows whose address or city no longer
/// match the geocoded ones are skipped, so a stale geocode never overwrites
/// the coordinates of a newer address.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn bulk_update_coordinates(
    pool: &PgPool,
    updates: &[CoordinateUpdate],
) -> Result<u64, sqlx::Error> {
    if updates.is_empty() {
        return Ok(0);
    }

    let mut chain_codes: Vec<String> = Vec::with_capacity(updates.len());
    let mut codes: Vec<String> = Vec::with_capacity(updates.len());
    let mut addresses: Vec<String> = Vec::with_capacity(updates.len());
    let mut cities: Vec<String> = Vec::with_capacity(updates.len());
    let mut lats: Vec<f64> = Vec::with_capacity(updates.len());
    let mut lons: Vec<f64> = Vec::with_capacity(updates.len());

    for update in updates {
        chain_codes.push(update.key.chain_code.clone());
        codes.push(update.key.code.clone());
        addresses.push(update.address.clone());
        cities.push(update.city.clone());
        lats.push(update.coordinate.lat);
        lons.push(update.coordinate.lon);
    }

    let rows_affected = sqlx::query(
        "UPDATE stores AS s SET \
             lat        = u.lat, \
             lon        = u.lon, \
             updated_at = NOW() \
         FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], \
                     $5::float8[], $6::float8[]) \
              AS u(chain_code, code, address, city, lat, lon) \
         WHERE s.chain_code = u.chain_code \
           AND s.code = u.code \
           AND s.address = u.address \
           AND s.city = u.city \
           AND (s.lat IS DISTINCT FROM u.lat OR s.lon IS DISTINCT FROM u.lon)",
    )
    .bind(&chain_codes)
    .bind(&codes)
    .bind(&addresses)
    .bind(&cities)
    .bind(&lats)
    .bind(&lons)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}

/// Delete one store by key. Returns `true` if a row was removed.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn delete_store(
    pool: &PgPool,
    chain_code: &str,
    code: &str,
) -> Result<bool, sqlx::Error> {
    let rows_affected = sqlx::query("DELETE FROM stores WHERE chain_code = $1 AND code = $2")
        .bind(chain_code)
        .bind(code)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected > 0)
}

/// Delete every store of a chain. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn delete_stores_by_chain(pool: &PgPool, chain_code: &str) -> Result<u64, sqlx::Error> {
    let rows_affected = sqlx::query("DELETE FROM stores WHERE chain_code = $1")
        .bind(chain_code)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(rows_affected)
}

/// Delete an explicit set of stores. Returns the number of rows removed.
///
/// An empty key set deletes nothing.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn delete_stores_by_keys(pool: &PgPool, keys: &[StoreKey]) -> Result<u64, sqlx::Error> {
    if keys.is_empty() {
        return Ok(0);
    }

    let chain_codes: Vec<&str> = keys.iter().map(|k| k.chain_code.as_str()).collect();
    let codes: Vec<&str> = keys.iter().map(|k| k.code.as_str()).collect();

    let rows_affected = sqlx::query(
        "DELETE FROM stores AS s \
         USING UNNEST($1::text[], $2::text[]) AS k(chain_code, code) \
         WHERE s.chain_code = k.chain_code AND s.code = k.code",
    )
    .bind(&chain_codes)
    .bind(&codes)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected)
}
