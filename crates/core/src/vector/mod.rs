//! Vector data structures: features, attribute values, feature sets.

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::extent::Extent;

/// Attribute names that only echo the geometry column of the source
/// (OGC services and desktop GIS name it differently).
pub const GEOMETRY_ALIASES: &[&str] = &["geometry", "geom", "the_geom", "wkb_geometry"];

/// Whether an attribute key is a geometry-name alias.
pub fn is_geometry_alias(key: &str) -> bool {
    GEOMETRY_ALIASES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(key))
}

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Ordered attribute mapping of a feature.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// The three geometry families a single-type dataset (e.g. a shapefile) can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeometryFamily {
    Point,
    Line,
    Polygon,
}

impl GeometryFamily {
    /// Family of a geometry. Collections take the family of their first member.
    pub fn of(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(Self::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Some(Self::Line)
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(Self::Polygon),
            Geometry::GeometryCollection(gc) => gc.iter().next().and_then(Self::of),
        }
    }

    /// Short lowercase label, used in archive member names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Point => "points",
            Self::Line => "lines",
            Self::Polygon => "polygons",
        }
    }
}

/// Human-readable geometry type name.
pub fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: Attributes,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Attributes::new(),
            id: None,
        }
    }

    /// Create a feature with no geometry
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: Attributes::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Attributes with geometry-name aliases removed.
    pub fn visible_attributes(&self) -> Attributes {
        self.properties
            .iter()
            .filter(|(k, _)| !is_geometry_alias(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn family(&self) -> Option<GeometryFamily> {
        self.geometry.as_ref().and_then(GeometryFamily::of)
    }

    pub fn extent(&self) -> Option<Extent> {
        self.geometry.as_ref().and_then(Extent::of_geometry)
    }
}

/// Ordered collection of features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }

    /// Apply a coordinate transform to every geometry in place.
    pub fn map_geometries(&mut self, f: impl Fn(&Geometry<f64>) -> Geometry<f64>) {
        for feature in &mut self.features {
            if let Some(g) = feature.geometry.as_mut() {
                *g = f(g);
            }
        }
    }

    /// Features whose predicate holds, cloned into a new set.
    pub fn filtered(&self, predicate: impl Fn(&Feature) -> bool) -> FeatureSet {
        self.features
            .iter()
            .filter(|f| predicate(f))
            .cloned()
            .collect()
    }

    /// Union of all feature extents.
    pub fn extent(&self) -> Option<Extent> {
        self.features
            .iter()
            .filter_map(Feature::extent)
            .reduce(|a, b| a.union(&b))
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl Extend<Feature> for FeatureSet {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        self.features.extend(iter);
    }
}

impl IntoIterator for FeatureSet {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon, GeometryCollection};

    #[test]
    fn geometry_aliases_are_hidden() {
        let f = Feature::new(point!(x: 1.0, y: 2.0).into())
            .with_property("name", "well")
            .with_property("the_geom", "POINT(1 2)")
            .with_property("GEOMETRY", AttributeValue::Null);
        let visible = f.visible_attributes();
        assert_eq!(visible.len(), 1);
        assert!(visible.contains_key("name"));
    }

    #[test]
    fn families() {
        let pt: Geometry<f64> = point!(x: 0.0, y: 0.0).into();
        let ls: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        let pg: Geometry<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        assert_eq!(GeometryFamily::of(&pt), Some(GeometryFamily::Point));
        assert_eq!(GeometryFamily::of(&ls), Some(GeometryFamily::Line));
        assert_eq!(GeometryFamily::of(&pg), Some(GeometryFamily::Polygon));
        let empty = Geometry::GeometryCollection(GeometryCollection::<f64>(vec![]));
        assert_eq!(GeometryFamily::of(&empty), None);
    }

    #[test]
    fn set_extent_is_union() {
        let set: FeatureSet = vec![
            Feature::new(point!(x: 0.0, y: 0.0).into()),
            Feature::new(point!(x: 4.0, y: -2.0).into()),
            Feature::empty(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.extent(), Some(Extent::new(0.0, -2.0, 4.0, 0.0)));
    }
}
