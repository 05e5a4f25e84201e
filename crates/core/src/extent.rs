//! Axis-aligned rectangles in projected and geographic space.

use geo::BoundingRect;
use geo_types::{coord, Geometry, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Widest longitude span (degrees) a box with `east < west` may cover and still
/// be read as crossing the antimeridian rather than as swapped edges.
pub const MAX_ANTIMERIDIAN_SPAN: f64 = 180.0;

/// A projected bounding box `(min_x, min_y, max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box spanned by two arbitrary corners (e.g. a drag rectangle).
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self::new(a.0.min(b.0), a.1.min(b.1), a.0.max(b.0), a.1.max(b.1))
    }

    /// Square of half-width `radius` around a point.
    pub fn around(x: f64, y: f64, radius: f64) -> Self {
        Self::new(x - radius, y - radius, x + radius, y + radius)
    }

    /// Bounding box of a geometry, `None` for empty geometries.
    pub fn of_geometry(geometry: &Geometry<f64>) -> Option<Self> {
        geometry.bounding_rect().map(Self::from)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if two boxes intersect. Touching edges count as intersecting.
    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }
}

impl From<Rect<f64>> for Extent {
    fn from(r: Rect<f64>) -> Self {
        Extent::new(r.min().x, r.min().y, r.max().x, r.max().y)
    }
}

/// A geographic bounding box in degrees, ordered as the glossary defines it:
/// south, west, north, east.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Whether `east < west` is being read as an antimeridian crossing.
    pub fn crosses_antimeridian(&self) -> bool {
        self.east < self.west
    }

    /// Reject obviously malformed boxes.
    ///
    /// `east < west` is accepted only when the box plausibly wraps the
    /// antimeridian: west in the eastern hemisphere, east in the western one and
    /// the wrapped span no wider than [`MAX_ANTIMERIDIAN_SPAN`].
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| -> Result<()> {
            Err(Error::InvalidBoundingBox {
                south: self.south,
                west: self.west,
                north: self.north,
                east: self.east,
                reason: reason.to_string(),
            })
        };

        if ![self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite())
        {
            return fail("non-finite coordinate");
        }
        if self.north < self.south {
            return fail("north is below south");
        }
        if self.south < -90.0 || self.north > 90.0 {
            return fail("latitude outside [-90, 90]");
        }
        if self.west < -180.0 || self.east > 180.0 || self.east < -180.0 || self.west > 180.0 {
            return fail("longitude outside [-180, 180]");
        }
        if self.east < self.west {
            let wrapped_span = self.east + 360.0 - self.west;
            let plausible = self.west > 0.0 && self.east < 0.0 && wrapped_span <= MAX_ANTIMERIDIAN_SPAN;
            if !plausible {
                return fail("east edge lies west of the west edge without crossing the antimeridian");
            }
        }
        Ok(())
    }

    /// Overpass QL order: `south,west,north,east`.
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }

    /// STAC / GeoJSON order: `[west, south, east, north]`.
    pub fn to_stac(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}
