//! Shapefile datasets: `.shp` geometry, `.shx` index, `.dbf` attributes, `.prj` CRS.

pub mod dbf;
pub mod fields;
pub mod shp;

use geo_types::Geometry;
use geoweave_core::crs::WGS84_PRJ_WKT;
use geoweave_core::vector::is_geometry_alias;
use geoweave_core::{AttributeValue, Crs, Feature, FeatureSet, GeometryFamily};
use tracing::{debug, warn};

use crate::error::Result;
use dbf::DbfColumn;
use fields::{sanitize_field_names, FieldKind};
use shp::ShapeType;

pub use fields::MAX_FIELD_NAME;

/// Raw members of one shapefile dataset.
#[derive(Debug, Clone, Copy)]
pub struct ShapefileSource<'a> {
    pub shp: &'a [u8],
    pub dbf: &'a [u8],
    pub prj: Option<&'a str>,
}

/// Decode a shapefile dataset into features plus the declared CRS.
///
/// Geometry and attribute records are joined by position; records deleted
/// in the DBF drop their geometry too.
pub fn read_shapefile(source: ShapefileSource<'_>) -> Result<(FeatureSet, Crs)> {
    let geometries = shp::read_shp(source.shp)?;
    let records = dbf::read_dbf(source.dbf)?;
    if geometries.len() != records.len() {
        warn!(
            shapes = geometries.len(),
            records = records.len(),
            "shapefile members disagree on record count"
        );
    }

    let crs = match source.prj {
        Some(wkt) => {
            let crs = Crs::from_wkt(wkt.trim());
            if crs.epsg().is_none() {
                warn!("unrecognised .prj, treating coordinates as WGS 84");
                Crs::wgs84()
            } else {
                crs
            }
        }
        None => Crs::wgs84(),
    };

    let mut records = records.into_iter();
    let features = geometries
        .into_iter()
        .filter_map(|geometry| {
            let properties = match records.next() {
                Some(Some(attrs)) => attrs,
                Some(None) => return None,
                None => Default::default(),
            };
            Some(Feature {
                geometry,
                properties,
                id: None,
            })
        })
        .collect();
    Ok((features, crs))
}

/// All members of one encoded dataset.
#[derive(Debug, Clone)]
pub struct ShapefileMembers {
    pub shp: Vec<u8>,
    pub shx: Vec<u8>,
    pub dbf: Vec<u8>,
    pub prj: String,
    /// Sanitized DBF column names, in column order.
    pub field_names: Vec<String>,
}

/// Encode lon/lat features of one geometry family as a shapefile dataset.
///
/// Attribute keys are gathered across all features (first-seen order),
/// geometry aliases dropped, then sanitized into DBF field names.
pub fn write_shapefile(family: GeometryFamily, features: &[&Feature]) -> Result<ShapefileMembers> {
    let shape = match family {
        GeometryFamily::Point => {
            let any_multi = features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .any(|g| !matches!(g, Geometry::Point(_)));
            if any_multi {
                ShapeType::MultiPoint
            } else {
                ShapeType::Point
            }
        }
        GeometryFamily::Line => ShapeType::PolyLine,
        GeometryFamily::Polygon => ShapeType::Polygon,
    };

    let mut keys: Vec<&str> = Vec::new();
    for feature in features {
        for key in feature.properties.keys() {
            if !is_geometry_alias(key) && !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }
    let names = sanitize_field_names(&keys);

    let null = AttributeValue::Null;
    let rows: Vec<Vec<&AttributeValue>> = features
        .iter()
        .map(|f| keys.iter().map(|k| f.properties.get(*k).unwrap_or(&null)).collect())
        .collect();
    let columns: Vec<DbfColumn> = names
        .iter()
        .enumerate()
        .map(|(i, name)| DbfColumn {
            name: name.clone(),
            kind: FieldKind::infer(rows.iter().map(|row| row[i])),
        })
        .collect();
    debug!(?shape, fields = columns.len(), features = features.len(), "encoding shapefile");

    let geometries: Vec<Option<&Geometry<f64>>> =
        features.iter().map(|f| f.geometry.as_ref()).collect();
    let shapes = shp::write_shp(shape, &geometries)?;
    let dbf = dbf::write_dbf(&columns, &rows)?;

    Ok(ShapefileMembers {
        shp: shapes.shp,
        shx: shapes.shx,
        dbf,
        prj: WGS84_PRJ_WKT.to_string(),
        field_names: names,
    })
}
