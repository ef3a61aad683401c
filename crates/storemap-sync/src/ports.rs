//! Traits the pipeline depends on, with the production implementations.
//!
//! The reconciliation code only talks to these traits so it can run against
//! in-memory doubles in tests.

use std::future::Future;

use storemap_core::{Coordinate, Store, StoreKey};
use storemap_db::{CoordinateUpdate, DbError, PgStoreRepository, StoreRecord, StoreUpdate};
use storemap_sources::{GeocoderClient, InventoryClient, SourceError};

/// Persistence for the local store mirror.
pub trait StoreRepository: Send + Sync {
    fn list_all(
        &self,
        chain_code: Option<&str>,
    ) -> impl Future<Output = Result<Vec<StoreRecord>, DbError>> + Send;

    fn find_by_key(
        &self,
        chain_code: &str,
        code: &str,
    ) -> impl Future<Output = Result<Option<StoreRecord>, DbError>> + Send;

    fn bulk_create(&self, stores: &[Store]) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn bulk_update_coordinates(
        &self,
        updates: &[CoordinateUpdate],
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn update(
        &self,
        chain_code: &str,
        code: &str,
        update: &StoreUpdate,
    ) -> impl Future<Output = Result<Option<StoreRecord>, DbError>> + Send;

    fn delete_by_key(
        &self,
        chain_code: &str,
        code: &str,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    fn delete_by_chain(&self, chain_code: &str)
        -> impl Future<Output = Result<u64, DbError>> + Send;

    fn delete_by_keys(&self, keys: &[StoreKey])
        -> impl Future<Output = Result<u64, DbError>> + Send;
}

/// Address-to-coordinate lookup.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        address: &str,
        city: &str,
    ) -> impl Future<Output = Result<Option<Coordinate>, SourceError>> + Send;
}

/// The remote source of truth for which stores exist.
pub trait StoreSource: Send + Sync {
    fn list_chains(&self) -> impl Future<Output = Result<Vec<String>, SourceError>> + Send;

    fn list_stores_for_chain(
        &self,
        chain_code: &str,
    ) -> impl Future<Output = Result<Vec<Store>, SourceError>> + Send;
}

impl StoreRepository for PgStoreRepository {
    async fn list_all(&self, chain_code: Option<&str>) -> Result<Vec<StoreRecord>, DbError> {
        PgStoreRepository::list_all(self, chain_code).await
    }

    async fn find_by_key(
        &self,
        chain_code: &str,
        code: &str,
    ) -> Result<Option<StoreRecord>, DbError> {
        PgStoreRepository::find_by_key(self, chain_code, code).await
    }

    async fn bulk_create(&self, stores: &[Store]) -> Result<u64, DbError> {
        PgStoreRepository::bulk_create(self, stores).await
    }

    async fn bulk_update_coordinates(&self, updates: &[CoordinateUpdate]) -> Result<u64, DbError> {
        PgStoreRepository::bulk_update_coordinates(self, updates).await
    }

    async fn update(
        &self,
        chain_code: &str,
        code: &str,
        update: &StoreUpdate,
    ) -> Result<Option<StoreRecord>, DbError> {
        PgStoreRepository::update(self, chain_code, code, update).await
    }

    async fn delete_by_key(&self, chain_code: &str, code: &str) -> Result<bool, DbError> {
        PgStoreRepository::delete_by_key(self, chain_code, code).await
    }

    async fn delete_by_chain(&self, chain_code: &str) -> Result<u64, DbError> {
        PgStoreRepository::delete_by_chain(self, chain_code).await
    }

    async fn delete_by_keys(&self, keys: &[StoreKey]) -> Result<u64, DbError> {
        PgStoreRepository::delete_by_keys(self, keys).await
    }
}

impl Geocoder for GeocoderClient {
    async fn geocode(&self, address: &str, city: &str) -> Result<Option<Coordinate>, SourceError> {
        self.geocode_address(address, city).await
    }
}

impl StoreSource for InventoryClient {
    async fn list_chains(&self) -> Result<Vec<String>, SourceError> {
        InventoryClient::list_chains(self).await
    }

    async fn list_stores_for_chain(&self, chain_code: &str) -> Result<Vec<Store>, SourceError> {
        InventoryClient::list_stores_for_chain(self, chain_code).await
    }
}
