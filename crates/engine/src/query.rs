//! Feature queries: point hit-test and extent intersection.
//!
//! Only visible vector layers (scratch included) take part. Results run
//! topmost layer first, and within a layer in feature order.

use geo::Intersects;
use geo_types::Coord;
use geoweave_core::{Attributes, Extent};

use crate::interaction::Pixel;
use crate::layer::{Layer, LayerId};
use crate::registry::LayerRegistry;

/// The renderer's current view in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coord<f64>,
    /// Map units per pixel.
    pub resolution: f64,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(center: Coord<f64>, resolution: f64, width: u32, height: u32) -> Self {
        Self {
            center,
            resolution,
            width,
            height,
        }
    }

    /// Map coordinate under a pixel (y grows downward on screen).
    pub fn pixel_to_coord(&self, pixel: Pixel) -> Coord<f64> {
        Coord {
            x: self.center.x + (pixel.x - self.width as f64 / 2.0) * self.resolution,
            y: self.center.y - (pixel.y - self.height as f64 / 2.0) * self.resolution,
        }
    }

    pub fn coord_to_pixel(&self, coord: Coord<f64>) -> Pixel {
        Pixel::new(
            (coord.x - self.center.x) / self.resolution + self.width as f64 / 2.0,
            (self.center.y - coord.y) / self.resolution + self.height as f64 / 2.0,
        )
    }

    /// The visible extent.
    pub fn extent(&self) -> Extent {
        let a = self.pixel_to_coord(Pixel::new(0.0, 0.0));
        let b = self.pixel_to_coord(Pixel::new(self.width as f64, self.height as f64));
        Extent::from_corners((a.x, a.y), (b.x, b.y))
    }

    /// Extent spanned by two pixels, in either order.
    pub fn pixel_extent(&self, from: Pixel, to: Pixel) -> Extent {
        let a = self.pixel_to_coord(from);
        let b = self.pixel_to_coord(to);
        Extent::from_corners((a.x, a.y), (b.x, b.y))
    }
}

impl Default for Viewport {
    /// The whole Web Mercator world in a 1024×1024 view.
    fn default() -> Self {
        let world = 2.0 * geoweave_core::transform::HALF_WORLD;
        Self::new(Coord { x: 0.0, y: 0.0 }, world / 1024.0, 1024, 1024)
    }
}

/// One feature that matched, with its visible attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub layer_id: LayerId,
    pub layer_name: String,
    pub attributes: Attributes,
}

/// Three distinguishable outcomes of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    NoFeatures,
    /// Features matched but none had a non-geometry attribute.
    NoAttributes,
    Found {
        hits: Vec<QueryHit>,
        /// Set when every hit comes from the same layer.
        layer_name: Option<String>,
    },
}

impl QueryOutcome {
    pub fn hits(&self) -> &[QueryHit] {
        match self {
            Self::Found { hits, .. } => hits,
            _ => &[],
        }
    }
}

fn queryable(registry: &LayerRegistry) -> impl Iterator<Item = &Layer> {
    registry
        .iter()
        .rev()
        .filter(|l| l.visible && l.has_vector_source())
}

/// Hit-test at `pixel` within `tolerance_px`.
pub fn query_at_point(
    registry: &LayerRegistry,
    viewport: &Viewport,
    pixel: Pixel,
    tolerance_px: f64,
) -> QueryOutcome {
    let at = viewport.pixel_to_coord(pixel);
    let probe = Extent::around(at.x, at.y, tolerance_px.max(0.0) * viewport.resolution).to_rect();
    collect(registry, |geometry, _| geometry.intersects(&probe))
}

/// Every feature whose bounding box intersects `extent`.
pub fn query_in_extent(registry: &LayerRegistry, extent: &Extent) -> QueryOutcome {
    collect(registry, |_, bounds| {
        bounds.map(|b| b.intersects(extent)).unwrap_or(false)
    })
}

fn collect(
    registry: &LayerRegistry,
    matches: impl Fn(&geo_types::Geometry<f64>, Option<Extent>) -> bool,
) -> QueryOutcome {
    let mut matched = 0usize;
    let mut hits = Vec::new();
    for layer in queryable(registry) {
        let Some(features) = layer.features() else {
            continue;
        };
        for feature in features.iter() {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            if !matches(geometry, feature.extent()) {
                continue;
            }
            matched += 1;
            let attributes = feature.visible_attributes();
            if attributes.is_empty() {
                continue;
            }
            hits.push(QueryHit {
                layer_id: layer.id.clone(),
                layer_name: layer.name.clone(),
                attributes,
            });
        }
    }

    if matched == 0 {
        return QueryOutcome::NoFeatures;
    }
    if hits.is_empty() {
        return QueryOutcome::NoAttributes;
    }
    let first = &hits[0].layer_id;
    let layer_name = hits
        .iter()
        .all(|h| &h.layer_id == first)
        .then(|| hits[0].layer_name.clone());
    QueryOutcome::Found { hits, layer_name }
}
