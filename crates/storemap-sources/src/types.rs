//! Wire types for the inventory API and the Photon geocoder.

use serde::Deserialize;
use storemap_core::{Coordinate, Store};

/// `GET /v1/chains/`
#[derive(Debug, Clone, Deserialize)]
pub struct ChainsResponse {
    pub chains: Vec<String>,
}

/// `GET /v1/{chain}/stores/`
#[derive(Debug, Clone, Deserialize)]
pub struct StoresResponse {
    #[serde(default)]
    pub stores: Vec<Store>,
}

/// A GeoJSON feature collection as returned by Photon's `/api/` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub geometry: Geometry,
}

/// Point geometry. GeoJSON orders coordinates `[lon, lat]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    pub coordinates: Vec<f64>,
}

impl FeatureCollection {
    /// The first feature's point, transposed to [`Coordinate`]. Features
    /// whose geometry has fewer than two numbers are ignored.
    #[must_use]
    pub fn first_coordinate(&self) -> Option<Coordinate> {
        let feature = self.features.first()?;
        match feature.geometry.coordinates.as_slice() {
            [lon, lat, ..] => Some(Coordinate::new(*lat, *lon)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_coordinate_transposes_lon_lat() {
        let json = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [15.97, 45.81] },
                    "properties": {}
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [16.44, 43.5] },
                    "properties": {}
                }
            ]
        });
        let collection: FeatureCollection = serde_json::from_value(json).unwrap();
        assert_eq!(
            collection.first_coordinate(),
            Some(Coordinate::new(45.81, 15.97))
        );
    }

    #[test]
    fn empty_collection_has_no_coordinate() {
        let collection: FeatureCollection =
            serde_json::from_value(serde_json::json!({ "features": [] })).unwrap();
        assert_eq!(collection.first_coordinate(), None);
    }

    #[test]
    fn short_geometry_is_ignored() {
        let json = serde_json::json!({
            "features": [ { "geometry": { "coordinates": [15.97] } } ]
        });
        let collection: FeatureCollection = serde_json::from_value(json).unwrap();
        assert_eq!(collection.first_coordinate(), None);
    }

    #[test]
    fn stores_response_defaults_to_empty() {
        let response: StoresResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response.stores.is_empty());
    }
}
