//! STAC (SpatioTemporal Asset Catalog) data types.
//!
//! Serde models for the subset of STAC Item Search used to draw scene
//! footprints: the request body, the returned item collection, and the item
//! properties surfaced as footprint attributes.

use std::collections::HashMap;

use geoweave_core::{AttributeValue, Feature, FeatureSet};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search` (STAC API – Item Search).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StacSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl StacSearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bounding box `[west, south, east, north]`.
    pub fn bbox(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.bbox = Some([west, south, east, north]);
        self
    }

    /// Set datetime or datetime range (e.g. `"2024-06-01/2024-06-30"`).
    pub fn datetime(mut self, dt: &str) -> Self {
        self.datetime = Some(dt.to_string());
        self
    }

    pub fn collections<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.collections = Some(cols.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    /// Set maximum items returned.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default)]
    pub features: Vec<StacItem>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,
}

impl StacItemCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    /// Unique item identifier.
    pub id: String,

    /// Footprint geometry as raw GeoJSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,

    /// Bounding box `[west, south, east, north]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(default)]
    pub properties: StacItemProperties,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// STAC Item properties.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension).
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform name (e.g., "sentinel-2a").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// GSD (ground sample distance).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gsd: Option<f64>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl StacItem {
    /// Footprint feature in lon/lat with the catalog attributes that are present.
    ///
    /// An item without a usable geometry still yields a feature, with no
    /// geometry, so it stays listed in attribute queries.
    pub fn to_footprint(&self) -> Feature {
        let geometry = self
            .geometry
            .clone()
            .and_then(|g| geojson::Geometry::from_json_value(g).ok())
            .and_then(|g| geo_types::Geometry::<f64>::try_from(g).ok());

        let mut feature = Feature::empty().with_property("id", self.id.as_str());
        feature.geometry = geometry;
        feature.id = Some(self.id.clone());
        if let Some(c) = &self.collection {
            feature.set_property("collection", AttributeValue::from(c.as_str()));
        }
        let p = &self.properties;
        if let Some(dt) = &p.datetime {
            feature.set_property("datetime", AttributeValue::from(dt.as_str()));
        }
        if let Some(cc) = p.eo_cloud_cover {
            feature.set_property("eo:cloud_cover", AttributeValue::Float(cc));
        }
        if let Some(platform) = &p.platform {
            feature.set_property("platform", AttributeValue::from(platform.as_str()));
        }
        if let Some(gsd) = p.gsd {
            feature.set_property("gsd", AttributeValue::Float(gsd));
        }
        feature
    }
}

/// All items of a page as lon/lat footprints.
pub fn footprints(collection: &StacItemCollection) -> FeatureSet {
    collection.features.iter().map(StacItem::to_footprint).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
