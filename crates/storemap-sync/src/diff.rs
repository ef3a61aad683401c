//! Remote-versus-local store diff.

use std::collections::{HashMap, HashSet};

use storemap_core::{Store, StoreKey};
use storemap_db::StoreRecord;

/// The partition of a remote listing and a local mirror by identity key.
///
/// `to_add` and `to_remove` are disjoint; every local key lands in exactly one
/// of `unchanged`, `to_update`, or `to_remove`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDiff {
    /// Remote stores with no local record.
    pub to_add: Vec<Store>,
    /// Remote stores whose address, city, or zipcode differs from the local record.
    pub to_update: Vec<Store>,
    /// Local keys missing from the remote listing.
    pub to_remove: Vec<StoreKey>,
    pub unchanged: Vec<StoreKey>,
}

impl StoreDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Diffs `remote` against `local` in one pass over each side.
///
/// Coordinates are never compared. When the remote listing repeats a key the
/// last occurrence wins. Output order follows the remote listing for
/// `to_add`/`to_update`/`unchanged` and the local listing for `to_remove`.
#[must_use]
pub fn diff_stores(remote: Vec<Store>, local: &[StoreRecord]) -> StoreDiff {
    let mut last_index: HashMap<StoreKey, usize> = HashMap::with_capacity(remote.len());
    for (index, store) in remote.iter().enumerate() {
        if let Some(previous) = last_index.insert(store.key(), index) {
            tracing::warn!(
                key = %store.key(),
                previous,
                index,
                "duplicate key in remote listing, keeping the last one"
            );
        }
    }

    let local_by_key: HashMap<StoreKey, &StoreRecord> =
        local.iter().map(|record| (record.key(), record)).collect();

    let mut diff = StoreDiff::default();
    let mut seen: HashSet<StoreKey> = HashSet::with_capacity(last_index.len());

    for (index, store) in remote.into_iter().enumerate() {
        let key = store.key();
        if last_index.get(&key) != Some(&index) {
            continue;
        }
        match local_by_key.get(&key) {
            None => diff.to_add.push(store),
            Some(record) if address_changed(&store, record) => diff.to_update.push(store),
            Some(_) => diff.unchanged.push(key.clone()),
        }
        seen.insert(key);
    }

    for record in local {
        let key = record.key();
        if !seen.contains(&key) {
            diff.to_remove.push(key);
        }
    }

    diff
}

/// `true` when any of the address fields differ.
#[must_use]
pub fn address_changed(remote: &Store, local: &StoreRecord) -> bool {
    remote.address != local.address || remote.city != local.city || remote.zipcode != local.zipcode
}
