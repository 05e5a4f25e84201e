//! Category-based OpenStreetMap extraction through the Overpass API.
//!
//! A query is assembled from the selected categories' fragments, answered with
//! `out geom` (coordinates inlined on ways and relation members), and decoded
//! into lon/lat features carrying the OSM tags.

use geo::Contains;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use geoweave_core::{AttributeValue, Attributes, Feature, FeatureSet, GeoBBox, LayerStyle, Rgba};
use reqwest::Url;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{CloudError, Result};
use crate::http::{describe_error_body, HttpTransport};

// ── Category catalog ─────────────────────────────────────────────────────

/// A fixed OSM feature category.
#[derive(Debug)]
pub struct OsmCategory {
    pub id: &'static str,
    pub name: &'static str,
    /// Overpass selectors; each is suffixed with the bbox filter.
    selectors: &'static [&'static str],
    matcher: fn(&Attributes) -> bool,
    pub style: LayerStyle,
}

impl OsmCategory {
    /// Query statements for this category inside `bbox` (`s,w,n,e`).
    pub fn query_fragment(&self, bbox: &str) -> String {
        self.selectors
            .iter()
            .map(|s| format!("  {}({});\n", s, bbox))
            .collect()
    }

    /// Whether a decoded feature's tags belong to this category.
    pub fn matches(&self, tags: &Attributes) -> bool {
        (self.matcher)(tags)
    }
}

fn tag<'a>(tags: &'a Attributes, key: &str) -> Option<&'a str> {
    tags.get(key).and_then(AttributeValue::as_str)
}

fn tag_in(tags: &Attributes, key: &str, values: &[&str]) -> bool {
    tag(tags, key).map(|v| values.contains(&v)).unwrap_or(false)
}

const GREEN_LANDUSE: &[&str] = &["grass", "forest", "meadow", "recreation_ground", "village_green"];
const GREEN_LEISURE: &[&str] = &["park", "garden", "nature_reserve"];

/// The category catalog, in display order.
pub static OSM_CATEGORIES: &[OsmCategory] = &[
    OsmCategory {
        id: "buildings",
        name: "Buildings",
        selectors: &["way[\"building\"]", "relation[\"building\"]"],
        matcher: |t| t.contains_key("building"),
        style: LayerStyle::tinted(Rgba::rgb(214, 96, 77), 1.0),
    },
    OsmCategory {
        id: "roads",
        name: "Roads",
        selectors: &["way[\"highway\"]"],
        matcher: |t| t.contains_key("highway"),
        style: LayerStyle::new(Rgba::rgb(90, 90, 90), Rgba(0, 0, 0, 0), 2.0),
    },
    OsmCategory {
        id: "railways",
        name: "Railways",
        selectors: &["way[\"railway\"]"],
        matcher: |t| t.contains_key("railway"),
        style: LayerStyle::new(Rgba::rgb(120, 60, 140), Rgba(0, 0, 0, 0), 2.0),
    },
    OsmCategory {
        id: "water",
        name: "Water",
        selectors: &[
            "way[\"natural\"=\"water\"]",
            "relation[\"natural\"=\"water\"]",
            "way[\"waterway\"]",
        ],
        matcher: |t| tag(t, "natural") == Some("water") || t.contains_key("waterway"),
        style: LayerStyle::tinted(Rgba::rgb(51, 136, 255), 1.5),
    },
    OsmCategory {
        id: "green",
        name: "Green areas",
        selectors: &[
            "way[\"leisure\"~\"^(park|garden|nature_reserve)$\"]",
            "way[\"landuse\"~\"^(grass|forest|meadow|recreation_ground|village_green)$\"]",
            "way[\"natural\"=\"wood\"]",
            "relation[\"leisure\"=\"park\"]",
            "relation[\"landuse\"=\"forest\"]",
        ],
        matcher: |t| {
            tag_in(t, "leisure", GREEN_LEISURE)
                || tag_in(t, "landuse", GREEN_LANDUSE)
                || tag(t, "natural") == Some("wood")
        },
        style: LayerStyle::tinted(Rgba::rgb(60, 170, 80), 1.0),
    },
    OsmCategory {
        id: "amenities",
        name: "Amenities",
        selectors: &["node[\"amenity\"]", "way[\"amenity\"]"],
        matcher: |t| t.contains_key("amenity"),
        style: LayerStyle::tinted(Rgba::rgb(240, 160, 30), 1.5),
    },
];

/// Look up a category by id.
pub fn category(id: &str) -> Option<&'static OsmCategory> {
    OSM_CATEGORIES.iter().find(|c| c.id == id)
}

/// Resolve ids to categories, rejecting unknown ids.
pub fn categories(ids: &[impl AsRef<str>]) -> Result<Vec<&'static OsmCategory>> {
    ids.iter()
        .map(|id| {
            category(id.as_ref()).ok_or_else(|| {
                CloudError::Core(geoweave_core::Error::InvalidParameter {
                    name: "category",
                    value: id.as_ref().to_string(),
                    reason: "unknown OSM category".into(),
                })
            })
        })
        .collect()
}

// ── Query ────────────────────────────────────────────────────────────────

/// One combined Overpass QL query for all `categories` inside `bbox`.
pub fn build_query(bbox: &GeoBBox, categories: &[&OsmCategory], timeout_secs: u32) -> String {
    let filter = bbox.to_overpass();
    let mut query = format!("[out:json][timeout:{}];\n(\n", timeout_secs);
    for c in categories {
        query.push_str(&c.query_fragment(&filter));
    }
    query.push_str(");\nout geom;\n");
    query
}

/// Client for an Overpass interpreter endpoint.
#[derive(Debug, Clone)]
pub struct OverpassClient {
    pub endpoint: String,
    pub timeout_secs: u32,
}

impl OverpassClient {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_secs,
        }
    }

    /// Validate the bbox, submit the combined query and decode the answer.
    ///
    /// The bbox is checked before anything goes on the wire.
    pub async fn fetch<T: HttpTransport>(
        &self,
        transport: &T,
        bbox: &GeoBBox,
        categories: &[&OsmCategory],
    ) -> Result<FeatureSet> {
        bbox.validate()?;
        let query = build_query(bbox, categories, self.timeout_secs);
        debug!(%query, "overpass query");

        let mut url = Url::parse(&self.endpoint).map_err(|e| CloudError::InvalidUrl {
            url: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("data", &query);

        let response = transport.get(url.as_str()).await?;
        response.ensure_success(&self.endpoint, "Overpass")?;
        if !response.is_json() && !response.body.starts_with(b"{") {
            return Err(CloudError::RemoteService {
                service: "Overpass",
                message: describe_error_body(&response),
            });
        }
        let features = decode_response(&response.body)?;
        info!(features = features.len(), "overpass answered");
        Ok(features)
    }
}

// ── Response decoding ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    geometry: Vec<LatLon>,
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    geometry: Vec<LatLon>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(p: LatLon) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

/// Tag keys whose presence makes a closed way an area.
const AREA_KEYS: &[&str] = &[
    "building", "landuse", "leisure", "natural", "amenity", "water", "place", "shop", "tourism",
];

/// Decode an `out geom` JSON answer into lon/lat features.
pub fn decode_response(body: &[u8]) -> Result<FeatureSet> {
    let response: OverpassResponse =
        serde_json::from_slice(body).map_err(|e| CloudError::decode("Overpass", e))?;
    if let Some(remark) = response.remark.as_deref() {
        // runtime errors come back as a 200 with a remark and partial data
        if remark.contains("error") {
            return Err(CloudError::RemoteService {
                service: "Overpass",
                message: remark.to_string(),
            });
        }
    }

    let mut features = FeatureSet::new();
    for element in response.elements {
        if element.tags.is_empty() {
            continue;
        }
        let geometry = match element.kind.as_str() {
            "node" => match (element.lon, element.lat) {
                (Some(lon), Some(lat)) => Some(Geometry::Point(Point::new(lon, lat))),
                _ => None,
            },
            "way" => way_geometry(&element.geometry, &element.tags),
            "relation" if is_multipolygon(&element.tags) => relation_geometry(&element.members),
            _ => None,
        };
        let Some(geometry) = geometry else {
            debug!(kind = %element.kind, id = element.id, "skipping element without usable geometry");
            continue;
        };

        let mut properties: Attributes = element
            .tags
            .into_iter()
            .map(|(k, v)| (k, AttributeValue::String(v)))
            .collect();
        properties.insert("osm_id".into(), AttributeValue::Int(element.id));
        properties.insert("osm_type".into(), AttributeValue::String(element.kind.clone()));
        features.push(Feature {
            geometry: Some(geometry),
            properties,
            id: Some(format!("{}/{}", element.kind, element.id)),
        });
    }
    Ok(features)
}

fn is_multipolygon(tags: &BTreeMap<String, String>) -> bool {
    matches!(
        tags.get("type").map(String::as_str),
        Some("multipolygon") | Some("boundary")
    )
}

fn is_area(tags: &BTreeMap<String, String>) -> bool {
    match tags.get("area").map(String::as_str) {
        Some("yes") => true,
        Some("no") => false,
        _ => AREA_KEYS.iter().any(|k| tags.contains_key(*k)),
    }
}

fn way_geometry(points: &[LatLon], tags: &BTreeMap<String, String>) -> Option<Geometry<f64>> {
    if points.len() < 2 {
        return None;
    }
    let line: LineString<f64> = points.iter().copied().map(Coord::from).collect();
    if line.is_closed() && points.len() >= 4 && is_area(tags) {
        Some(Geometry::Polygon(Polygon::new(line, vec![])))
    } else {
        Some(Geometry::LineString(line))
    }
}

/// Outer members stitched into shells, inner members become holes of the
/// shell containing them.
fn relation_geometry(members: &[Member]) -> Option<Geometry<f64>> {
    let ways = |role: &str| -> Vec<Vec<Coord<f64>>> {
        members
            .iter()
            .filter(|m| m.kind == "way" && m.role == role && m.geometry.len() >= 2)
            .map(|m| m.geometry.iter().copied().map(Coord::from).collect())
            .collect()
    };
    let shells = stitch_rings(ways("outer"));
    if shells.is_empty() {
        return None;
    }
    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> =
        shells.into_iter().map(|s| (s, Vec::new())).collect();
    for hole in stitch_rings(ways("inner")) {
        let Some(probe) = hole.0.first().copied().map(Point::from) else {
            continue;
        };
        if let Some(owner) = polygons
            .iter_mut()
            .find(|(shell, _)| Polygon::new(shell.clone(), vec![]).contains(&probe))
        {
            owner.1.push(hole);
        }
    }
    let mut polygons: Vec<Polygon<f64>> = polygons
        .into_iter()
        .map(|(shell, holes)| Polygon::new(shell, holes))
        .collect();
    Some(if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    })
}

/// Join way segments end-to-end into closed rings; unclosable chains are dropped.
fn stitch_rings(mut segments: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();
    while let Some(mut ring) = segments.pop() {
        while ring.first() != ring.last() {
            let Some(end) = ring.last().copied() else { break };
            let next = segments
                .iter()
                .position(|s| s.first() == Some(&end) || s.last() == Some(&end));
            let Some(i) = next else { break };
            let mut segment = segments.swap_remove(i);
            if segment.first() != Some(&end) {
                segment.reverse();
            }
            ring.extend(segment.into_iter().skip(1));
        }
        if ring.len() >= 4 && ring.first() == ring.last() {
            rings.push(LineString::new(ring));
        } else {
            debug!(points = ring.len(), "dropping unclosed multipolygon ring");
        }
    }
    rings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_concatenates_fragments() {
        let bbox = GeoBBox::new(40.0, -3.8, 40.5, -3.6);
        let cats = categories(&["buildings", "amenities"]).unwrap();
        let q = build_query(&bbox, &cats, 25);
        assert!(q.starts_with("[out:json][timeout:25];"));
        assert!(q.contains("way[\"building\"](40,-3.8,40.5,-3.6);"));
        assert!(q.contains("node[\"amenity\"](40,-3.8,40.5,-3.6);"));
        assert!(q.trim_end().ends_with("out geom;"));
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(categories(&["buildings", "volcanoes"]).is_err());
    }

    const ANSWER: &str = r#"{
      "version": 0.6,
      "elements": [
        {"type": "node", "id": 1, "lat": 40.1, "lon": -3.7, "tags": {"amenity": "cafe", "name": "Sol"}},
        {"type": "node", "id": 2, "lat": 40.2, "lon": -3.7},
        {"type": "way", "id": 10, "tags": {"highway": "residential"},
         "geometry": [{"lat": 40.0, "lon": -3.7}, {"lat": 40.1, "lon": -3.6}]},
        {"type": "way", "id": 11, "tags": {"building": "yes"},
         "geometry": [{"lat": 40.0, "lon": -3.7}, {"lat": 40.0, "lon": -3.69},
                      {"lat": 40.01, "lon": -3.69}, {"lat": 40.0, "lon": -3.7}]},
        {"type": "relation", "id": 20, "tags": {"type": "multipolygon", "natural": "water"},
         "members": [
           {"type": "way", "ref": 100, "role": "outer",
            "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 0.0, "lon": 10.0}, {"lat": 10.0, "lon": 10.0}]},
           {"type": "way", "ref": 101, "role": "outer",
            "geometry": [{"lat": 0.0, "lon": 0.0}, {"lat": 10.0, "lon": 0.0}, {"lat": 10.0, "lon": 10.0}]},
           {"type": "way", "ref": 102, "role": "inner",
            "geometry": [{"lat": 2.0, "lon": 2.0}, {"lat": 2.0, "lon": 4.0}, {"lat": 4.0, "lon": 4.0}, {"lat": 2.0, "lon": 2.0}]}
         ]}
      ]
    }"#;

    #[test]
    fn decodes_elements() {
        let set = decode_response(ANSWER.as_bytes()).unwrap();
        assert_eq!(set.len(), 4);

        let cafe = &set.features[0];
        assert_eq!(cafe.get_property("osm_id"), Some(&AttributeValue::Int(1)));
        assert_eq!(cafe.get_property("osm_type"), Some(&AttributeValue::from("node")));
        assert!(matches!(cafe.geometry, Some(Geometry::Point(_))));

        assert!(matches!(set.features[1].geometry, Some(Geometry::LineString(_))));
        assert!(matches!(set.features[2].geometry, Some(Geometry::Polygon(_))));
        match &set.features[3].geometry {
            Some(Geometry::Polygon(p)) => {
                assert!(p.exterior().is_closed());
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn matchers_partition_results() {
        let set = decode_response(ANSWER.as_bytes()).unwrap();
        let count = |id: &str| {
            let c = category(id).unwrap();
            set.iter().filter(|f| c.matches(&f.properties)).count()
        };
        assert_eq!(count("amenities"), 1);
        assert_eq!(count("roads"), 1);
        assert_eq!(count("buildings"), 1);
        assert_eq!(count("water"), 1);
        assert_eq!(count("green"), 0);
    }

    #[test]
    fn runtime_error_remark_is_surfaced() {
        let body = br#"{"elements": [], "remark": "runtime error: Query timed out"}"#;
        let err = decode_response(body).unwrap_err();
        assert_eq!(err.kind(), geoweave_core::ErrorKind::RemoteServiceException);
    }
}
