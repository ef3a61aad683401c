//! Best-effort batch geocoding.

use serde::Serialize;
use storemap_core::{Coordinate, Store};
use storemap_db::StoreRecord;
use storemap_sources::SourceError;

use crate::pacing::Pacer;
use crate::ports::Geocoder;

/// Anything with a street address and city that can be geocoded.
pub trait Addressable {
    fn address(&self) -> &str;
    fn city(&self) -> &str;
}

impl<T: Addressable + ?Sized> Addressable for &T {
    fn address(&self) -> &str {
        (**self).address()
    }

    fn city(&self) -> &str {
        (**self).city()
    }
}

impl Addressable for Store {
    fn address(&self) -> &str {
        &self.address
    }

    fn city(&self) -> &str {
        &self.city
    }
}

impl Addressable for StoreRecord {
    fn address(&self) -> &str {
        &self.address
    }

    fn city(&self) -> &str {
        &self.city
    }
}

/// An input item paired with its own geocoding outcome.
#[derive(Debug)]
pub struct Geocoded<T> {
    pub item: T,
    pub outcome: Result<Option<Coordinate>, SourceError>,
}

impl<T> Geocoded<T> {
    /// The coordinate found, or `None` for no match and for failures alike.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.outcome.as_ref().ok().copied().flatten()
    }
}

/// Outcome counts for a set of geocoding calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeocodeStats {
    pub found: usize,
    pub no_match: usize,
    pub failed: usize,
}

impl GeocodeStats {
    pub fn record(&mut self, outcome: &Result<Option<Coordinate>, SourceError>) {
        match outcome {
            Ok(Some(_)) => self.found += 1,
            Ok(None) => self.no_match += 1,
            Err(_) => self.failed += 1,
        }
    }

    #[must_use]
    pub fn from_results<T>(results: &[Geocoded<T>]) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.record(&result.outcome);
        }
        stats
    }

    pub fn merge(&mut self, other: Self) {
        self.found += other.found;
        self.no_match += other.no_match;
        self.failed += other.failed;
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.found + self.no_match + self.failed
    }
}

/// Geocodes every item under `pacer`, returning one [`Geocoded`] per input in
/// input order. A failure for one item never affects its siblings.
pub async fn geocode_batch<G, T>(geocoder: &G, pacer: &Pacer, items: Vec<T>) -> Vec<Geocoded<T>>
where
    G: Geocoder,
    T: Addressable,
{
    pacer
        .run(items, |item| async move {
            let outcome = geocoder.geocode(item.address(), item.city()).await;
            Geocoded { item, outcome }
        })
        .await
}
