//! The reconciliation engine: applies a [`StoreDiff`](crate::StoreDiff) to the
//! local mirror.

use serde::Serialize;
use storemap_core::Store;
use storemap_db::{AddressUpdate, StoreRecord, StoreUpdate};

use crate::diff::diff_stores;
use crate::error::SyncError;
use crate::geocode::{geocode_batch, GeocodeStats};
use crate::pacing::Pacer;
use crate::ports::{Geocoder, StoreRepository};

/// Pacing for the two geocoding phases of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePacing {
    /// New stores: small concurrent batches.
    pub add: Pacer,
    /// Changed stores: one at a time.
    pub update: Pacer,
}

/// What a reconciliation run actually persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: u64,
    pub removed: u64,
    pub updated: u64,
    pub update_failures: usize,
    pub geocoding: GeocodeStats,
}

/// Converges the local mirror onto `remote`.
///
/// Order: delete local keys missing remotely, geocode and bulk-insert new
/// keys, then geocode and update stores whose address changed. Each store
/// added or updated is geocoded afresh; coordinates carried by the remote
/// listing are ignored. A geocode that fails or finds nothing leaves the
/// store without coordinates.
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] if the bulk delete or bulk insert
/// fails. Per-store update failures are counted in
/// [`ReconcileReport::update_failures`] instead.
pub async fn reconcile<R, G>(
    repo: &R,
    geocoder: &G,
    pacing: &ReconcilePacing,
    remote: Vec<Store>,
    local: &[StoreRecord],
) -> Result<ReconcileReport, SyncError>
where
    R: StoreRepository,
    G: Geocoder,
{
    let diff = diff_stores(remote, local);
    tracing::info!(
        to_add = diff.to_add.len(),
        to_update = diff.to_update.len(),
        to_remove = diff.to_remove.len(),
        unchanged = diff.unchanged.len(),
        "computed store diff"
    );

    let mut report = ReconcileReport::default();

    if !diff.to_remove.is_empty() {
        report.removed = repo.delete_by_keys(&diff.to_remove).await?;
    }

    if !diff.to_add.is_empty() {
        let geocoded = geocode_batch(geocoder, &pacing.add, diff.to_add).await;
        report.geocoding.merge(GeocodeStats::from_results(&geocoded));

        let stores: Vec<Store> = geocoded
            .into_iter()
            .map(|result| {
                let coordinate = result.coordinate();
                Store {
                    lat: coordinate.map(|c| c.lat),
                    lon: coordinate.map(|c| c.lon),
                    ..result.item
                }
            })
            .collect();
        report.added = repo.bulk_create(&stores).await?;
    }

    if !diff.to_update.is_empty() {
        let outcomes = pacing
            .update
            .run(diff.to_update, |store| async move {
                let geocode = geocoder.geocode(&store.address, &store.city).await;
                let coordinate = geocode.as_ref().ok().copied().flatten();
                let update = StoreUpdate::Address(AddressUpdate {
                    address: store.address.clone(),
                    city: store.city.clone(),
                    zipcode: store.zipcode.clone(),
                    coordinate,
                });
                let persisted = repo.update(&store.chain_code, &store.code, &update).await;
                (store.key(), geocode, persisted)
            })
            .await;

        for (key, geocode, persisted) in outcomes {
            report.geocoding.record(&geocode);
            match persisted {
                Ok(Some(_)) => report.updated += 1,
                Ok(None) => {
                    tracing::warn!(key = %key, "store vanished before its update was applied");
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "failed to update store");
                    report.update_failures += 1;
                }
            }
        }
    }

    tracing::info!(
        added = report.added,
        removed = report.removed,
        updated = report.updated,
        update_failures = report.update_failures,
        geocode_failed = report.geocoding.failed,
        "reconciliation complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{remote_store, FakeGeocoder, InMemoryRepository};
    use storemap_core::{Coordinate, StoreKey};

    fn pacing() -> ReconcilePacing {
        ReconcilePacing {
            add: Pacer::new(5, std::time::Duration::ZERO),
            update: Pacer::unpaced(),
        }
    }

    async fn run(
        repo: &InMemoryRepository,
        geocoder: &FakeGeocoder,
        remote: Vec<Store>,
    ) -> ReconcileReport {
        let local = repo.snapshot();
        reconcile(repo, geocoder, &pacing(), remote, &local)
            .await
            .expect("reconcile should succeed")
    }

    #[tokio::test]
    async fn adds_new_store_with_coordinates() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new().with_match("A", 45.81, 15.97);

        let report = run(&repo, &geocoder, vec![remote_store("konzum", "1", "A")]).await;

        assert_eq!((report.added, report.removed, report.updated), (1, 0, 0));
        let record = repo.get(&StoreKey::new("konzum", "1")).expect("created");
        assert_eq!(record.coordinate(), Some(Coordinate::new(45.81, 15.97)));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn store_without_geocode_result_is_still_created() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new().with_failure("Broken 1");

        let report = run(
            &repo,
            &geocoder,
            vec![
                remote_store("konzum", "1", "Broken 1"),
                remote_store("konzum", "2", "Nowhere 2"),
            ],
        )
        .await;

        assert_eq!(report.added, 2);
        assert_eq!(report.geocoding.failed, 1);
        assert_eq!(report.geocoding.no_match, 1);
        for code in ["1", "2"] {
            let record = repo.get(&StoreKey::new("konzum", code)).expect("created");
            assert_eq!(record.lat, None);
            assert_eq!(record.lon, None);
        }
    }

    #[tokio::test]
    async fn remote_coordinates_are_discarded_on_add() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new();
        let mut store = remote_store("konzum", "1", "Nowhere");
        store.lat = Some(1.0);
        store.lon = Some(2.0);

        run(&repo, &geocoder, vec![store]).await;

        let record = repo.get(&StoreKey::new("konzum", "1")).expect("created");
        assert!(!record.has_coordinates());
    }

    #[tokio::test]
    async fn removes_store_missing_remotely() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new();
        run(
            &repo,
            &geocoder,
            vec![remote_store("konzum", "1", "A"), remote_store("konzum", "2", "B")],
        )
        .await;

        let report = run(&repo, &geocoder, vec![remote_store("konzum", "1", "A")]).await;

        assert_eq!((report.added, report.removed, report.updated), (0, 1, 0));
        assert!(repo.get(&StoreKey::new("konzum", "2")).is_none());
    }

    #[tokio::test]
    async fn address_change_updates_and_regeocodes() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new()
            .with_match("Old St 1", 45.0, 16.0)
            .with_match("New St 2", 43.5, 16.44);
        run(&repo, &geocoder, vec![remote_store("konzum", "1", "Old St 1")]).await;

        let report = run(&repo, &geocoder, vec![remote_store("konzum", "1", "New St 2")]).await;

        assert_eq!((report.added, report.removed, report.updated), (0, 0, 1));
        let record = repo.get(&StoreKey::new("konzum", "1")).expect("exists");
        assert_eq!(record.address, "New St 2");
        assert_eq!(record.coordinate(), Some(Coordinate::new(43.5, 16.44)));
        assert_eq!(geocoder.calls_for("New St 2"), 1);
    }

    #[tokio::test]
    async fn failed_regeocode_clears_coordinates_but_updates() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new()
            .with_match("Old St 1", 45.0, 16.0)
            .with_failure("New St 2");
        run(&repo, &geocoder, vec![remote_store("konzum", "1", "Old St 1")]).await;

        let report = run(&repo, &geocoder, vec![remote_store("konzum", "1", "New St 2")]).await;

        assert_eq!(report.updated, 1);
        assert_eq!(report.update_failures, 0);
        assert_eq!(report.geocoding.failed, 1);
        let record = repo.get(&StoreKey::new("konzum", "1")).expect("exists");
        assert_eq!(record.address, "New St 2");
        assert_eq!(record.lat, None);
        assert_eq!(record.lon, None);
    }

    #[tokio::test]
    async fn update_failure_does_not_abort_siblings() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new();
        run(
            &repo,
            &geocoder,
            vec![
                remote_store("konzum", "1", "A"),
                remote_store("konzum", "2", "B"),
                remote_store("konzum", "3", "C"),
            ],
        )
        .await;
        repo.fail_updates_for(StoreKey::new("konzum", "2"));

        let report = run(
            &repo,
            &geocoder,
            vec![
                remote_store("konzum", "1", "A2"),
                remote_store("konzum", "2", "B2"),
                remote_store("konzum", "3", "C2"),
            ],
        )
        .await;

        assert_eq!(report.updated, 2);
        assert_eq!(report.update_failures, 1);
        assert_eq!(
            repo.get(&StoreKey::new("konzum", "3")).expect("exists").address,
            "C2"
        );
        assert_eq!(
            repo.get(&StoreKey::new("konzum", "2")).expect("exists").address,
            "B"
        );
    }

    #[tokio::test]
    async fn second_run_without_changes_is_a_noop() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new().with_match("A", 45.0, 16.0);
        let remote = vec![
            remote_store("konzum", "1", "A"),
            remote_store("konzum", "2", "B"),
            remote_store("spar", "1", "C"),
        ];

        let first = run(&repo, &geocoder, remote.clone()).await;
        assert_eq!(first.added, 3);

        let second = run(&repo, &geocoder, remote).await;
        assert_eq!((second.added, second.removed, second.updated), (0, 0, 0));
        assert_eq!(second.geocoding.attempted(), 0);
    }

    #[tokio::test]
    async fn coordinates_stay_paired_across_runs() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new()
            .with_match("A", 45.0, 16.0)
            .with_failure("B2");
        run(
            &repo,
            &geocoder,
            vec![remote_store("konzum", "1", "A"), remote_store("konzum", "2", "B")],
        )
        .await;
        run(
            &repo,
            &geocoder,
            vec![remote_store("konzum", "1", "A"), remote_store("konzum", "2", "B2")],
        )
        .await;

        for record in repo.snapshot() {
            assert_eq!(record.lat.is_some(), record.lon.is_some(), "{}", record.key());
        }
    }

    #[tokio::test]
    async fn bulk_delete_failure_propagates() {
        let repo = InMemoryRepository::new();
        let geocoder = FakeGeocoder::new();
        run(&repo, &geocoder, vec![remote_store("konzum", "1", "A")]).await;
        repo.fail_bulk_writes();

        let local = repo.snapshot();
        let err = reconcile(&repo, &geocoder, &pacing(), Vec::new(), &local)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Persistence(_)));
    }
}
