//! Database operations for the `stores` table.

mod read;
mod types;
mod write;

use sqlx::PgPool;
use storemap_core::{Store, StoreKey};

use crate::{connect_pool, DbError, PoolConfig};

pub use read::{
    find_store_by_key, list_geocoded_stores, list_stores, list_stores_missing_coordinates,
};
pub use types::{AddressUpdate, CoordinateUpdate, StoreRecord, StoreUpdate};
pub use write::{
    bulk_create_stores, bulk_update_coordinates, create_store, delete_store,
    delete_stores_by_chain, delete_stores_by_keys, update_store,
};

/// Store repository backed by a Postgres pool.
///
/// Owns its pool explicitly: build it with [`PgStoreRepository::connect`] (or
/// wrap an existing pool with [`PgStoreRepository::new`]) and release it with
/// [`PgStoreRepository::close`]. Cloning shares the same pool.
#[derive(Debug, Clone)]
pub struct PgStoreRepository {
    pool: PgPool,
}

impl PgStoreRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the connection cannot be established.
    pub async fn connect(database_url: &str, config: PoolConfig) -> Result<Self, DbError> {
        let pool = connect_pool(database_url, config).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn find_by_key(
        &self,
        chain_code: &str,
        code: &str,
    ) -> Result<Option<StoreRecord>, DbError> {
        Ok(find_store_by_key(&self.pool, chain_code, code).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn list_all(&self, chain_code: Option<&str>) -> Result<Vec<StoreRecord>, DbError> {
        Ok(list_stores(&self.pool, chain_code).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn list_geocoded(
        &self,
        chain_code: Option<&str>,
    ) -> Result<Vec<StoreRecord>, DbError> {
        Ok(list_geocoded_stores(&self.pool, chain_code).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn list_missing_coordinates(
        &self,
        chain_code: Option<&str>,
    ) -> Result<Vec<StoreRecord>, DbError> {
        Ok(list_stores_missing_coordinates(&self.pool, chain_code).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the insert fails.
    pub async fn create(&self, store: &Store) -> Result<StoreRecord, DbError> {
        Ok(create_store(&self.pool, store).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the update fails.
    pub async fn update(
        &self,
        chain_code: &str,
        code: &str,
        update: &StoreUpdate,
    ) -> Result<Option<StoreRecord>, DbError> {
        Ok(update_store(&self.pool, chain_code, code, update).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the insert fails.
    pub async fn bulk_create(&self, stores: &[Store]) -> Result<u64, DbError> {
        Ok(bulk_create_stores(&self.pool, stores).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the update fails.
    pub async fn bulk_update_coordinates(
        &self,
        updates: &[CoordinateUpdate],
    ) -> Result<u64, DbError> {
        Ok(bulk_update_coordinates(&self.pool, updates).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the delete fails.
    pub async fn delete_by_key(&self, chain_code: &str, code: &str) -> Result<bool, DbError> {
        Ok(delete_store(&self.pool, chain_code, code).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the delete fails.
    pub async fn delete_by_chain(&self, chain_code: &str) -> Result<u64, DbError> {
        Ok(delete_stores_by_chain(&self.pool, chain_code).await?)
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the delete fails.
    pub async fn delete_by_keys(&self, keys: &[StoreKey]) -> Result<u64, DbError> {
        Ok(delete_stores_by_keys(&self.pool, keys).await?)
    }
}
