//! The sync orchestrator: the single entry point the server, scheduler, and
//! CLI call to read the store mirror and optionally converge it.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use storemap_core::{AppConfig, ChainScope, StoreKey};
use storemap_db::{CoordinateUpdate, StoreRecord};
use tokio::sync::Mutex;

use crate::error::SyncError;
use crate::geocode::{geocode_batch, GeocodeStats};
use crate::pacing::Pacer;
use crate::ports::{Geocoder, StoreRepository, StoreSource};
use crate::reconcile::{reconcile, ReconcilePacing, ReconcileReport};
use crate::remote::fetch_remote_listing;

/// Pacing for every upstream-facing phase of a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPacing {
    pub backfill: Pacer,
    pub add: Pacer,
    pub update: Pacer,
    pub chains: Pacer,
}

impl Default for SyncPacing {
    fn default() -> Self {
        Self {
            backfill: Pacer::new(5, Duration::from_millis(1000)),
            add: Pacer::new(5, Duration::from_millis(1000)),
            update: Pacer::sequential(Duration::from_millis(200)),
            chains: Pacer::sequential(Duration::from_millis(100)),
        }
    }
}

impl SyncPacing {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let batch = Pacer::new(
            config.geocode_batch_size,
            Duration::from_millis(config.geocode_batch_delay_ms),
        );
        Self {
            backfill: batch,
            add: batch,
            update: Pacer::sequential(Duration::from_millis(config.update_geocode_delay_ms)),
            chains: Pacer::sequential(Duration::from_millis(config.chain_fetch_delay_ms)),
        }
    }

    /// No delays anywhere. Used by tests.
    #[must_use]
    pub fn unpaced() -> Self {
        Self {
            backfill: Pacer::new(5, Duration::ZERO),
            add: Pacer::new(5, Duration::ZERO),
            update: Pacer::unpaced(),
            chains: Pacer::unpaced(),
        }
    }

    fn reconcile(&self) -> ReconcilePacing {
        ReconcilePacing {
            add: self.add,
            update: self.update,
        }
    }
}

/// Counts over a set of store records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub geocoded: usize,
    pub missing_coordinates: usize,
}

impl StoreStats {
    #[must_use]
    pub fn from_records(records: &[StoreRecord]) -> Self {
        let geocoded = records.iter().filter(|r| r.has_coordinates()).count();
        Self {
            total: records.len(),
            geocoded,
            missing_coordinates: records.len() - geocoded,
        }
    }
}

/// Result of geocoding records that had no coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub attempted: usize,
    pub updated: u64,
    pub geocoding: GeocodeStats,
}

/// Store records for a scope after a `get_stores` call, with what the call did.
#[derive(Debug, Clone)]
pub struct StoresSnapshot {
    pub stores: Vec<StoreRecord>,
    pub stats: StoreStats,
    pub backfill: BackfillReport,
    /// Present only when a remote sync ran.
    pub reconcile: Option<ReconcileReport>,
}

/// Which stores an administrative delete targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteCriteria {
    Key(StoreKey),
    Chain(String),
    Keys(Vec<StoreKey>),
}

/// Drives backfill and reconciliation over a repository, geocoder, and
/// remote source.
pub struct StoreSync<R, G, S> {
    repo: R,
    geocoder: G,
    source: S,
    pacing: SyncPacing,
    sync_lock: Mutex<()>,
}

impl<R, G, S> StoreSync<R, G, S>
where
    R: StoreRepository,
    G: Geocoder,
    S: StoreSource,
{
    pub fn new(repo: R, geocoder: G, source: S, pacing: SyncPacing) -> Self {
        Self {
            repo,
            geocoder,
            source,
            pacing,
            sync_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the stores for `scope`, backfilling missing coordinates first
    /// and, when `sync` is set, reconciling against the remote listing.
    ///
    /// Sync runs are serialised: a second `sync = true` call waits for the
    /// first to finish. Reads without `sync` never wait.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Configuration`] when the inventory credential is absent.
    /// - [`SyncError::Upstream`] when the remote listing cannot be fetched;
    ///   reconciliation does not start in that case.
    /// - [`SyncError::Persistence`] for storage failures outside per-store
    ///   best-effort steps.
    pub async fn get_stores(
        &self,
        scope: &ChainScope,
        sync: bool,
    ) -> Result<StoresSnapshot, SyncError> {
        let _guard = if sync {
            Some(self.sync_lock.lock().await)
        } else {
            None
        };

        let chain_code = scope.chain_code();
        let local = self.repo.list_all(chain_code).await?;
        let backfill = self.backfill_records(&local).await?;

        let reconcile = if sync {
            Some(self.sync_scope(scope, &local).await?)
        } else {
            None
        };

        let stores = self.repo.list_all(chain_code).await?;
        let stats = StoreStats::from_records(&stores);
        tracing::info!(
            scope = %scope,
            sync,
            total = stats.total,
            geocoded = stats.geocoded,
            missing_coordinates = stats.missing_coordinates,
            "store snapshot ready"
        );

        Ok(StoresSnapshot {
            stores,
            stats,
            backfill,
            reconcile,
        })
    }

    /// Geocodes stores in `scope` that have no coordinates and stores the
    /// results.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] if listing or writing fails.
    pub async fn backfill(&self, scope: &ChainScope) -> Result<BackfillReport, SyncError> {
        let local = self.repo.list_all(scope.chain_code()).await?;
        self.backfill_records(&local).await
    }

    /// Deletes stores matching `criteria` and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] if the delete fails.
    pub async fn delete_stores(&self, criteria: &DeleteCriteria) -> Result<u64, SyncError> {
        let deleted = match criteria {
            DeleteCriteria::Key(key) => {
                u64::from(self.repo.delete_by_key(&key.chain_code, &key.code).await?)
            }
            DeleteCriteria::Chain(chain_code) => self.repo.delete_by_chain(chain_code).await?,
            DeleteCriteria::Keys(keys) => self.repo.delete_by_keys(keys).await?,
        };
        tracing::info!(?criteria, deleted, "deleted stores");
        Ok(deleted)
    }

    async fn backfill_records(&self, records: &[StoreRecord]) -> Result<BackfillReport, SyncError> {
        let missing: Vec<&StoreRecord> = records.iter().filter(|r| !r.has_coordinates()).collect();
        if missing.is_empty() {
            return Ok(BackfillReport::default());
        }

        let attempted = missing.len();
        tracing::info!(attempted, "backfilling missing coordinates");

        let geocoded = geocode_batch(&self.geocoder, &self.pacing.backfill, missing).await;
        let geocoding = GeocodeStats::from_results(&geocoded);
        let updates: Vec<CoordinateUpdate> = geocoded
            .iter()
            .filter_map(|result| {
                result.coordinate().map(|coordinate| CoordinateUpdate {
                    key: result.item.key(),
                    address: result.item.address.clone(),
                    city: result.item.city.clone(),
                    coordinate,
                })
            })
            .collect();

        let updated = if updates.is_empty() {
            0
        } else {
            self.repo.bulk_update_coordinates(&updates).await?
        };

        tracing::info!(
            attempted,
            updated,
            no_match = geocoding.no_match,
            failed = geocoding.failed,
            "backfill complete"
        );

        Ok(BackfillReport {
            attempted,
            updated,
            geocoding,
        })
    }

    async fn sync_scope(
        &self,
        scope: &ChainScope,
        local: &[StoreRecord],
    ) -> Result<ReconcileReport, SyncError> {
        let listing = fetch_remote_listing(&self.source, scope, &self.pacing.chains).await?;

        let withheld: HashSet<&str> = listing.failed_chains.iter().map(String::as_str).collect();
        let local: Vec<StoreRecord> = if withheld.is_empty() {
            local.to_vec()
        } else {
            tracing::warn!(
                chains = ?listing.failed_chains,
                "keeping local stores of chains whose listing failed"
            );
            local
                .iter()
                .filter(|r| !withheld.contains(r.chain_code.as_str()))
                .cloned()
                .collect()
        };

        reconcile(
            &self.repo,
            &self.geocoder,
            &self.pacing.reconcile(),
            listing.stores,
            &local,
        )
        .await
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
