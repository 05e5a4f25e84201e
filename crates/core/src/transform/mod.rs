//! Pure-Rust EPSG:4326 ↔ EPSG:3857 conversions (spherical Web Mercator).
//!
//! Every geometry resident in the layer registry is in Web Mercator metres;
//! the codec and the network adapters convert at their boundaries with the
//! functions below. No state, no external C dependencies.

use geo::MapCoords;
use geo_types::{Coord, Geometry};

use crate::crs::Crs;
use crate::extent::{Extent, GeoBBox};

// ── Spherical Web Mercator constants ─────────────────────────────────────

/// Sphere radius used by EPSG:3857 (metres).
pub const EARTH_RADIUS: f64 = 6_378_137.0;
/// Half of the projected world width (metres).
pub const HALF_WORLD: f64 = std::f64::consts::PI * EARTH_RADIUS;
/// Latitude at which the square Web Mercator world ends (degrees).
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

// ── Point conversions ────────────────────────────────────────────────────

/// Convert longitude/latitude degrees to Web Mercator metres.
///
/// Latitudes beyond ±[`MAX_MERCATOR_LAT`] are clamped.
#[inline]
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = lon.to_radians() * EARTH_RADIUS;
    let y = (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

/// Convert Web Mercator metres to longitude/latitude degrees.
///
/// The longitude is wrapped into [-180, 180] so coordinates from a wrapped
/// world view land on the canonical globe.
#[inline]
pub fn mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = wrap_longitude((x / EARTH_RADIUS).to_degrees());
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Wrap a longitude into [-180, 180]. Values already in range are untouched.
#[inline]
pub fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

// ── Geometry conversions ─────────────────────────────────────────────────

/// Project a lon/lat geometry into Web Mercator.
pub fn project_geometry(geometry: &Geometry<f64>) -> Geometry<f64> {
    geometry.map_coords(|c| {
        let (x, y) = lon_lat_to_mercator(c.x, c.y);
        Coord { x, y }
    })
}

/// Unproject a Web Mercator geometry back to lon/lat.
///
/// Longitudes are not wrapped here: a line crossing the antimeridian in a
/// wrapped view keeps its continuity.
pub fn unproject_geometry(geometry: &Geometry<f64>) -> Geometry<f64> {
    geometry.map_coords(|c| {
        let lon = (c.x / EARTH_RADIUS).to_degrees();
        let (_, lat) = mercator_to_lon_lat(0.0, c.y);
        Coord { x: lon, y: lat }
    })
}

/// Bring a geometry declared in `source` into the registry CRS.
pub fn to_registry_crs(geometry: &Geometry<f64>, source: &Crs) -> Geometry<f64> {
    if source.is_web_mercator() {
        geometry.clone()
    } else {
        if source.epsg().is_none() {
            tracing::warn!(crs = %source, "unrecognised source CRS, assuming lon/lat");
        }
        project_geometry(geometry)
    }
}

// ── Extent conversions ───────────────────────────────────────────────────

/// Convert a projected extent into a geographic bbox.
///
/// An extent at least one world wide maps to the full longitude range; a
/// narrower one whose edges wrap to opposite sides yields `east < west`,
/// i.e. an antimeridian-crossing box.
pub fn extent_to_geographic(extent: &Extent) -> GeoBBox {
    let (west, south) = mercator_to_lon_lat(extent.min_x, extent.min_y);
    let (east, north) = mercator_to_lon_lat(extent.max_x, extent.max_y);
    if extent.width() >= 2.0 * HALF_WORLD {
        GeoBBox::new(south, -180.0, north, 180.0)
    } else {
        GeoBBox::new(south, west, north, east)
    }
}

/// Convert a geographic bbox into a projected extent.
///
/// Antimeridian-crossing boxes are unrolled eastwards so `max_x > min_x`.
pub fn geographic_to_extent(bbox: &GeoBBox) -> Extent {
    let east = if bbox.crosses_antimeridian() {
        bbox.east + 360.0
    } else {
        bbox.east
    };
    let (min_x, min_y) = lon_lat_to_mercator(bbox.west, bbox.south);
    let (max_x, max_y) = lon_lat_to_mercator(east, bbox.north);
    Extent::new(min_x, min_y, max_x, max_y)
}

#[cfg(test)]
mod tests;
