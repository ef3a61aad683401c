//! Store domain types shared by the sources, persistence, and sync crates.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A WGS84 point in decimal degrees.
///
/// Latitude and longitude always travel together; there is no way to build a
/// `Coordinate` with only one of them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Builds a coordinate from a nullable column pair. Returns `None` unless
    /// both halves are present.
    #[must_use]
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Self { lat, lon }),
            _ => None,
        }
    }
}

/// Identity of a physical store: `(chain_code, code)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
    pub chain_code: String,
    pub code: String,
}

impl StoreKey {
    #[must_use]
    pub fn new(chain_code: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            chain_code: chain_code.into(),
            code: code.into(),
        }
    }

    /// Parses the `chain:code` form used on the command line.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (chain_code, code) = raw.split_once(':')?;
        let chain_code = chain_code.trim();
        let code = code.trim();
        if chain_code.is_empty() || code.is_empty() {
            return None;
        }
        Some(Self::new(chain_code, code))
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_code, self.code)
    }
}

/// A store as listed by the remote inventory API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub chain_code: String,
    pub code: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub store_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub zipcode: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Store {
    #[must_use]
    pub fn key(&self) -> StoreKey {
        StoreKey::new(&self.chain_code, &self.code)
    }

    /// Coordinates supplied by the remote listing, if both halves are present.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_parts(self.lat, self.lon)
    }
}

/// Which part of the store universe an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainScope {
    All,
    Chain(String),
}

impl ChainScope {
    /// Parses a `chain` query value. `"all"` (any case) and blank input mean
    /// the whole universe.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Chain(trimmed.to_string())
        }
    }

    /// The chain filter to hand to repository queries.
    #[must_use]
    pub fn chain_code(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Chain(code) => Some(code.as_str()),
        }
    }
}

impl fmt::Display for ChainScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Chain(code) => write!(f, "{code}"),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
