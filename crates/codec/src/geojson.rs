//! GeoJSON reading and writing.
//!
//! Reading accepts a FeatureCollection, a single Feature or a bare Geometry.
//! Coordinates are returned as declared: RFC 7946 lon/lat unless a legacy
//! `crs` member names Web Mercator.

use geojson::{feature::Id, FeatureCollection, GeoJson, JsonObject, JsonValue};
use geoweave_core::vector::{is_geometry_alias, Attributes};
use geoweave_core::{AttributeValue, Crs, Feature, FeatureSet};

use crate::error::Result;

/// Parse GeoJSON text into features plus the CRS the coordinates are in.
pub fn read_geojson(text: &str) -> Result<(FeatureSet, Crs)> {
    let geojson: GeoJson = text.trim_start_matches('\u{feff}').parse()?;
    from_geojson(geojson)
}

/// Convert a JSON value already known to be GeoJSON (e.g. a decoded HTTP body).
pub fn read_geojson_value(value: JsonValue) -> Result<(FeatureSet, Crs)> {
    from_geojson(GeoJson::from_json_value(value)?)
}

fn from_geojson(geojson: GeoJson) -> Result<(FeatureSet, Crs)> {
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            let crs = legacy_crs(fc.foreign_members.as_ref());
            let features = fc
                .features
                .into_iter()
                .map(convert_feature)
                .collect::<Result<Vec<_>>>()?;
            Ok((FeatureSet { features }, crs))
        }
        GeoJson::Feature(f) => {
            let crs = legacy_crs(f.foreign_members.as_ref());
            let feature = convert_feature(f)?;
            Ok((FeatureSet { features: vec![feature] }, crs))
        }
        GeoJson::Geometry(g) => {
            let geometry = geo_types::Geometry::<f64>::try_from(g.value)?;
            Ok((FeatureSet { features: vec![Feature::new(geometry)] }, Crs::wgs84()))
        }
    }
}

/// Serialize lon/lat features as a FeatureCollection.
///
/// Geometry-name aliases are dropped from the attribute objects.
pub fn write_geojson<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Result<String> {
    let features = features
        .into_iter()
        .map(|f| geojson::Feature {
            bbox: None,
            geometry: f
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: f.id.clone().map(Id::String),
            properties: Some(to_json_object(&f.properties)),
            foreign_members: None,
        })
        .collect();
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_string(&collection)?)
}

fn convert_feature(f: geojson::Feature) -> Result<Feature> {
    let geometry = match f.geometry {
        Some(g) => Some(geo_types::Geometry::<f64>::try_from(g.value)?),
        None => None,
    };
    let id = f.id.map(|id| match id {
        Id::String(s) => s,
        Id::Number(n) => n.to_string(),
    });
    let properties = f
        .properties
        .map(|props| attributes_from_json(&props))
        .unwrap_or_default();
    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

/// Map a JSON object onto scalar attributes; nested values keep their JSON text.
pub fn attributes_from_json(props: &JsonObject) -> Attributes {
    props
        .iter()
        .map(|(k, v)| (k.clone(), attribute_from_json(v)))
        .collect()
}

pub fn attribute_from_json(value: &JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn to_json_object(attrs: &Attributes) -> JsonObject {
    attrs
        .iter()
        .filter(|(k, _)| !is_geometry_alias(k))
        .map(|(k, v)| {
            let value = match v {
                AttributeValue::Null => JsonValue::Null,
                AttributeValue::Bool(b) => JsonValue::Bool(*b),
                AttributeValue::Int(i) => JsonValue::from(*i),
                AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null),
                AttributeValue::String(s) => JsonValue::String(s.clone()),
            };
            (k.clone(), value)
        })
        .collect()
}

/// Legacy (GeoJSON 2008) `"crs": {"type": "name", "properties": {"name": "EPSG:3857"}}`.
fn legacy_crs(foreign: Option<&JsonObject>) -> Crs {
    foreign
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(JsonValue::as_str)
        .and_then(Crs::from_identifier)
        .unwrap_or_else(Crs::wgs84)
}
