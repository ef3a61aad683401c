//! In-memory doubles for the pipeline ports.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use storemap_core::{Coordinate, Store, StoreKey};
use storemap_db::{CoordinateUpdate, DbError, StoreRecord, StoreUpdate};
use storemap_sources::SourceError;
use tokio::sync::Notify;

use crate::ports::{Geocoder, StoreRepository, StoreSource};

pub(crate) fn remote_store(chain_code: &str, code: &str, address: &str) -> Store {
    Store {
        chain_code: chain_code.to_string(),
        code: code.to_string(),
        store_type: "supermarket".to_string(),
        address: address.to_string(),
        city: "Zagreb".to_string(),
        zipcode: "10000".to_string(),
        lat: None,
        lon: None,
    }
}

pub(crate) fn local_record(id: i64, chain_code: &str, code: &str, address: &str) -> StoreRecord {
    let now = Utc::now();
    StoreRecord {
        id,
        chain_code: chain_code.to_string(),
        code: code.to_string(),
        store_type: "supermarket".to_string(),
        address: address.to_string(),
        city: "Zagreb".to_string(),
        zipcode: "10000".to_string(),
        lat: None,
        lon: None,
        created_at: now,
        updated_at: now,
    }
}

fn injected(what: &str) -> DbError {
    DbError::Sqlx(sqlx::Error::Protocol(format!("injected {what} failure")))
}

/// A `stores` table held in a `BTreeMap`, so listings come back ordered by key
/// like the Postgres queries.
#[derive(Default)]
pub(crate) struct InMemoryRepository {
    rows: Mutex<BTreeMap<StoreKey, StoreRecord>>,
    next_id: AtomicI64,
    failing_updates: Mutex<HashSet<StoreKey>>,
    fail_bulk: Mutex<bool>,
}

impl InMemoryRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_records(records: Vec<StoreRecord>) -> Self {
        let repo = Self::new();
        {
            let mut rows = repo.rows.lock().unwrap();
            for record in records {
                rows.insert(record.key(), record);
            }
        }
        repo
    }

    pub(crate) fn snapshot(&self) -> Vec<StoreRecord> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub(crate) fn get(&self, key: &StoreKey) -> Option<StoreRecord> {
        self.rows.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn fail_updates_for(&self, key: StoreKey) {
        self.failing_updates.lock().unwrap().insert(key);
    }

    pub(crate) fn fail_bulk_writes(&self) {
        *self.fail_bulk.lock().unwrap() = true;
    }

    fn bulk_should_fail(&self) -> bool {
        *self.fail_bulk.lock().unwrap()
    }
}

impl StoreRepository for InMemoryRepository {
    async fn list_all(&self, chain_code: Option<&str>) -> Result<Vec<StoreRecord>, DbError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| chain_code.is_none_or(|c| r.chain_code == c))
            .cloned()
            .collect())
    }

    async fn find_by_key(
        &self,
        chain_code: &str,
        code: &str,
    ) -> Result<Option<StoreRecord>, DbError> {
        Ok(self.get(&StoreKey::new(chain_code, code)))
    }

    async fn bulk_create(&self, stores: &[Store]) -> Result<u64, DbError> {
        if self.bulk_should_fail() {
            return Err(injected("bulk create"));
        }
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let mut inserted = 0;
        for store in stores {
            let key = store.key();
            if rows.contains_key(&key) {
                continue;
            }
            let coordinate = store.coordinate();
            rows.insert(
                key,
                StoreRecord {
                    id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                    chain_code: store.chain_code.clone(),
                    code: store.code.clone(),
                    store_type: store.store_type.clone(),
                    address: store.address.clone(),
                    city: store.city.clone(),
                    zipcode: store.zipcode.clone(),
                    lat: coordinate.map(|c| c.lat),
                    lon: coordinate.map(|c| c.lon),
                    created_at: now,
                    updated_at: now,
                },
            );
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn bulk_update_coordinates(&self, updates: &[CoordinateUpdate]) -> Result<u64, DbError> {
        if self.bulk_should_fail() {
            return Err(injected("bulk update"));
        }
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        let mut modified = 0;
        for update in updates {
            if let Some(row) = rows.get_mut(&update.key) {
                if row.address != update.address || row.city != update.city {
                    continue;
                }
                if row.coordinate() != Some(update.coordinate) {
                    row.lat = Some(update.coordinate.lat);
                    row.lon = Some(update.coordinate.lon);
                    row.updated_at = now;
                    modified += 1;
                }
            }
        }
        Ok(modified)
    }

    async fn update(
        &self,
        chain_code: &str,
        code: &str,
        update: &StoreUpdate,
    ) -> Result<Option<StoreRecord>, DbError> {
        let key = StoreKey::new(chain_code, code);
        if self.failing_updates.lock().unwrap().contains(&key) {
            return Err(injected("update"));
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(&key) else {
            return Ok(None);
        };
        match update {
            StoreUpdate::Address(address) => {
                row.address.clone_from(&address.address);
                row.city.clone_from(&address.city);
                row.zipcode.clone_from(&address.zipcode);
                row.lat = address.coordinate.map(|c| c.lat);
                row.lon = address.coordinate.map(|c| c.lon);
            }
            StoreUpdate::Coordinates(coordinate) => {
                row.lat = Some(coordinate.lat);
                row.lon = Some(coordinate.lon);
            }
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_by_key(&self, chain_code: &str, code: &str) -> Result<bool, DbError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .remove(&StoreKey::new(chain_code, code))
            .is_some())
    }

    async fn delete_by_chain(&self, chain_code: &str) -> Result<u64, DbError> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|key, _| key.chain_code != chain_code);
        Ok((before - rows.len()) as u64)
    }

    async fn delete_by_keys(&self, keys: &[StoreKey]) -> Result<u64, DbError> {
        if self.bulk_should_fail() {
            return Err(injected("bulk delete"));
        }
        let mut rows = self.rows.lock().unwrap();
        Ok(keys.iter().filter(|k| rows.remove(*k).is_some()).count() as u64)
    }
}

enum GeocodeAnswer {
    Match(Coordinate),
    Fail,
}

/// Holds the first lookup of one address until released.
struct GeocodeGate {
    address: String,
    armed: AtomicBool,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

/// Answers by exact address. Unknown addresses are "no match".
#[derive(Default)]
pub(crate) struct FakeGeocoder {
    answers: HashMap<String, GeocodeAnswer>,
    calls: Mutex<HashMap<String, usize>>,
    total_calls: AtomicUsize,
    gate: Option<GeocodeGate>,
}

impl FakeGeocoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_match(mut self, address: &str, lat: f64, lon: f64) -> Self {
        self.answers.insert(
            address.to_string(),
            GeocodeAnswer::Match(Coordinate::new(lat, lon)),
        );
        self
    }

    pub(crate) fn with_failure(mut self, address: &str) -> Self {
        self.answers.insert(address.to_string(), GeocodeAnswer::Fail);
        self
    }

    /// Pause the first lookup of `address`: `entered` fires once it starts,
    /// and it answers only after `release` is notified. Later lookups of
    /// the same address answer immediately.
    pub(crate) fn gated_on(
        mut self,
        address: &str,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    ) -> Self {
        self.gate = Some(GeocodeGate {
            address: address.to_string(),
            armed: AtomicBool::new(true),
            entered,
            release,
        });
        self
    }

    pub(crate) fn calls_for(&self, address: &str) -> usize {
        self.calls.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for FakeGeocoder {
    async fn geocode(
        &self,
        address: &str,
        _city: &str,
    ) -> Result<Option<Coordinate>, SourceError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default() += 1;
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if gate.address == address && gate.armed.swap(false, Ordering::SeqCst) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        match self.answers.get(address) {
            Some(GeocodeAnswer::Match(coordinate)) => Ok(Some(*coordinate)),
            Some(GeocodeAnswer::Fail) => Err(SourceError::UnexpectedStatus {
                status: 500,
                url: "http://geocoder.invalid/api/".to_string(),
            }),
            None => Ok(None),
        }
    }
}

/// A remote inventory with a fixed set of chains.
pub(crate) struct FakeSource {
    chains: Vec<String>,
    stores: HashMap<String, Vec<Store>>,
    failing_chains: HashSet<String>,
    chain_list_fails: bool,
    has_credential: bool,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self {
            chains: Vec::new(),
            stores: HashMap::new(),
            failing_chains: HashSet::new(),
            chain_list_fails: false,
            has_credential: true,
        }
    }

    pub(crate) fn with_chain(mut self, chain_code: &str, stores: Vec<Store>) -> Self {
        self.chains.push(chain_code.to_string());
        self.stores.insert(chain_code.to_string(), stores);
        self
    }

    pub(crate) fn with_failing_chain(mut self, chain_code: &str) -> Self {
        self.chains.push(chain_code.to_string());
        self.failing_chains.insert(chain_code.to_string());
        self
    }

    pub(crate) fn failing_chain_list(mut self) -> Self {
        self.chain_list_fails = true;
        self
    }

    pub(crate) fn without_credential(mut self) -> Self {
        self.has_credential = false;
        self
    }

    fn check_credential(&self) -> Result<(), SourceError> {
        if self.has_credential {
            Ok(())
        } else {
            Err(SourceError::MissingCredential {
                service: "inventory API",
            })
        }
    }
}

impl StoreSource for FakeSource {
    async fn list_chains(&self) -> Result<Vec<String>, SourceError> {
        self.check_credential()?;
        if self.chain_list_fails {
            return Err(SourceError::UnexpectedStatus {
                status: 503,
                url: "http://inventory.invalid/v1/chains/".to_string(),
            });
        }
        Ok(self.chains.clone())
    }

    async fn list_stores_for_chain(&self, chain_code: &str) -> Result<Vec<Store>, SourceError> {
        self.check_credential()?;
        if self.failing_chains.contains(chain_code) {
            return Err(SourceError::UnexpectedStatus {
                status: 502,
                url: format!("http://inventory.invalid/v1/{chain_code}/stores/"),
            });
        }
        Ok(self.stores.get(chain_code).cloned().unwrap_or_default())
    }
}
