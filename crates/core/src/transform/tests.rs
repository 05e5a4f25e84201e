use super::*;
use geo_types::{line_string, point, polygon};

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() < tol, "{} vs {} (tol {})", a, b, tol);
}

#[test]
fn origin_maps_to_origin() {
    let (x, y) = lon_lat_to_mercator(0.0, 0.0);
    assert_close(x, 0.0, 1e-9);
    assert_close(y, 0.0, 1e-9);
}

#[test]
fn known_point_madrid() {
    // EPSG:3857 reference values for (-3.7038, 40.4168)
    let (x, y) = lon_lat_to_mercator(-3.7038, 40.4168);
    assert_close(x, -412_305.13, 0.5);
    assert_close(y, 4_926_696.67, 0.5);
}

#[test]
fn round_trip_within_micro_degree() {
    for &(lon, lat) in &[(0.0, 0.0), (-179.9, -84.0), (12.5, 55.7), (151.2, -33.9)] {
        let (x, y) = lon_lat_to_mercator(lon, lat);
        let (lon2, lat2) = mercator_to_lon_lat(x, y);
        assert_close(lon, lon2, 1e-9);
        assert_close(lat, lat2, 1e-9);
    }
}

#[test]
fn latitude_is_clamped() {
    let (_, y) = lon_lat_to_mercator(0.0, 89.9);
    assert_close(y, HALF_WORLD, 1e-3);
}

#[test]
fn longitudes_wrap() {
    assert_close(wrap_longitude(190.0), -170.0, 1e-12);
    assert_close(wrap_longitude(-190.0), 170.0, 1e-12);
    assert_close(wrap_longitude(180.0), 180.0, 1e-12);
}

#[test]
fn geometry_round_trip() {
    let poly: Geometry<f64> = polygon![
        (x: 10.0, y: 50.0),
        (x: 11.0, y: 50.0),
        (x: 11.0, y: 51.0),
        (x: 10.0, y: 50.0),
    ]
    .into();
    let back = unproject_geometry(&project_geometry(&poly));
    let (Geometry::Polygon(a), Geometry::Polygon(b)) = (&poly, &back) else {
        panic!("geometry type changed");
    };
    for (ca, cb) in a.exterior().coords().zip(b.exterior().coords()) {
        assert_close(ca.x, cb.x, 1e-9);
        assert_close(ca.y, cb.y, 1e-9);
    }
}

#[test]
fn web_mercator_sources_are_not_reprojected() {
    let line: Geometry<f64> = line_string![(x: 1000.0, y: 2000.0), (x: 3000.0, y: 4000.0)].into();
    assert_eq!(to_registry_crs(&line, &Crs::web_mercator()), line);

    let pt: Geometry<f64> = point!(x: 1.0, y: 0.0).into();
    assert_ne!(to_registry_crs(&pt, &Crs::wgs84()), pt);
}

#[test]
fn extent_round_trip() {
    let bbox = GeoBBox::new(40.0, -4.0, 41.0, -3.0);
    let back = extent_to_geographic(&geographic_to_extent(&bbox));
    assert_close(back.south, 40.0, 1e-9);
    assert_close(back.west, -4.0, 1e-9);
    assert_close(back.north, 41.0, 1e-9);
    assert_close(back.east, -3.0, 1e-9);
}

#[test]
fn wrapped_view_crosses_antimeridian() {
    // A view centred on 180° spanning 170°E .. 170°W.
    let (min_x, _) = lon_lat_to_mercator(170.0, 0.0);
    let (max_x, _) = lon_lat_to_mercator(190.0, 0.0);
    let bbox = extent_to_geographic(&Extent::new(min_x, 0.0, max_x, 1000.0));
    assert!(bbox.crosses_antimeridian());
    assert_close(bbox.west, 170.0, 1e-9);
    assert_close(bbox.east, -170.0, 1e-9);
    assert!(bbox.validate().is_ok());
}

#[test]
fn whole_world_view() {
    let bbox = extent_to_geographic(&Extent::new(-3.0 * HALF_WORLD, 0.0, 3.0 * HALF_WORLD, 1.0));
    assert_eq!((bbox.west, bbox.east), (-180.0, 180.0));
}
