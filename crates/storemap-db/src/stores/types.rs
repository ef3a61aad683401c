//! Row and payload types for the `stores` table.

use chrono::{DateTime, Utc};
use storemap_core::{Coordinate, StoreKey};

/// A row from the `stores` table.
///
/// `lat` and `lon` are either both set or both null; the table carries a
/// `CHECK` constraint and every write path goes through [`Coordinate`].
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StoreRecord {
    pub id: i64,
    pub chain_code: String,
    pub code: String,
    pub store_type: String,
    pub address: String,
    pub city: String,
    pub zipcode: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreRecord {
    #[must_use]
    pub fn key(&self) -> StoreKey {
        StoreKey::new(&self.chain_code, &self.code)
    }

    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.lat, self.lon)
    }

    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.coordinate().is_some()
    }
}

/// New address fields for an existing store, with the result of re-geocoding
/// them. `coordinate: None` clears any previously stored point.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressUpdate {
    pub address: String,
    pub city: String,
    pub zipcode: String,
    pub coordinate: Option<Coordinate>,
}

/// A typed partial update for one store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUpdate {
    Address(AddressUpdate),
    Coordinates(Coordinate),
}

/// One entry of a bulk coordinate write.
///
/// `address` and `city` are the values that were geocoded; the write only
/// lands while the stored row still carries them.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateUpdate {
    pub key: StoreKey,
    pub address: String,
    pub city: String,
    pub coordinate: Coordinate,
}
