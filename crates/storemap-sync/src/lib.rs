//! Store reconciliation and geocoding pipeline.
//!
//! Keeps the local `stores` table in line with the remote inventory listing:
//! backfills missing coordinates, diffs remote against local by
//! `(chain_code, code)`, and applies the resulting removals, inserts, and
//! address updates through the [`ports`] traits.

pub mod diff;
pub mod error;
pub mod geocode;
pub mod orchestrator;
pub mod pacing;
pub mod ports;
pub mod reconcile;
pub mod remote;

#[cfg(test)]
mod testing;

pub use diff::{diff_stores, StoreDiff};
pub use error::SyncError;
pub use geocode::{geocode_batch, Addressable, GeocodeStats, Geocoded};
pub use orchestrator::{
    BackfillReport, DeleteCriteria, StoreStats, StoreSync, StoresSnapshot, SyncPacing,
};
pub use pacing::Pacer;
pub use ports::{Geocoder, StoreRepository, StoreSource};
pub use reconcile::{reconcile, ReconcilePacing, ReconcileReport};
pub use remote::{fetch_remote_listing, RemoteListing};
