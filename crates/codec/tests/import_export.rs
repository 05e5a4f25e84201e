//! End-to-end import/export through the public codec API.

use std::collections::HashSet;

use geo_types::{Geometry, Point};
use geoweave_codec::archive::{write_zip, Archive};
use geoweave_codec::shapefile::{read_shapefile, ShapefileSource, MAX_FIELD_NAME};
use geoweave_codec::{export, import, ExportFormat, ExportLayer, InputFile, SourceFormat};
use geoweave_core::{ErrorKind, FeatureSet, GeometryFamily};

const PLACES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"name": "Quito", "elev": 2850},
     "geometry": {"type": "Point", "coordinates": [-78.4678, -0.1807]}},
    {"type": "Feature", "properties": {"name": "Reykjavik", "the_geom": "POINT"},
     "geometry": {"type": "Point", "coordinates": [-21.9426, 64.1466]}},
    {"type": "Feature", "properties": {"name": "Route", "lanes": 2},
     "geometry": {"type": "LineString", "coordinates": [[10.0, 45.0], [10.5, 45.2], [11.1, 45.9]]}},
    {"type": "Feature", "properties": {"name": "Block", "zoning": "R2", "use_description_text": "housing"},
     "geometry": {"type": "Polygon", "coordinates": [[[2.0, 48.0], [2.1, 48.0], [2.1, 48.1], [2.0, 48.1], [2.0, 48.0]]]}}
  ]
}"#;

fn import_places() -> FeatureSet {
    let file = InputFile::new("places.geojson", PLACES.as_bytes().to_vec());
    let mut datasets = import(&[file]).unwrap();
    assert_eq!(datasets.len(), 1);
    datasets.remove(0).features
}

fn coords(g: &Geometry<f64>) -> Vec<(f64, f64)> {
    use geo::CoordsIter;
    g.coords_iter().map(|c| (c.x, c.y)).collect()
}

#[test]
fn geojson_round_trip_keeps_geometry() {
    let original = geoweave_codec::geojson::read_geojson(PLACES).unwrap().0;
    let imported = import_places();
    assert_eq!(imported.len(), 4);

    let artifact = export(
        &[ExportLayer {
            name: "places",
            features: &imported,
            style: None,
        }],
        ExportFormat::GeoJson,
    )
    .unwrap();
    assert_eq!(artifact.file_name, "places.geojson");
    assert_eq!(artifact.media_type, "application/geo+json");

    let text = String::from_utf8(artifact.bytes).unwrap();
    let (back, _) = geoweave_codec::geojson::read_geojson(&text).unwrap();
    assert_eq!(back.len(), original.len());
    for (a, b) in original.iter().zip(back.iter()) {
        let (ca, cb) = (
            coords(a.geometry.as_ref().unwrap()),
            coords(b.geometry.as_ref().unwrap()),
        );
        assert_eq!(ca.len(), cb.len());
        for ((ax, ay), (bx, by)) in ca.into_iter().zip(cb) {
            assert!((ax - bx).abs() < 1e-6, "{} vs {}", ax, bx);
            assert!((ay - by).abs() < 1e-6, "{} vs {}", ay, by);
        }
    }
    // aliases are dropped on export
    assert!(back.features[1].get_property("the_geom").is_none());
}

#[test]
fn shapefile_export_partitions_by_geometry_kind() {
    let imported = import_places();
    let points_and_polygons =
        imported.filtered(|f| f.family() != Some(GeometryFamily::Line));

    let artifact = export(
        &[ExportLayer {
            name: "Mixed Layer",
            features: &points_and_polygons,
            style: None,
        }],
        ExportFormat::Shapefile,
    )
    .unwrap();
    assert_eq!(artifact.file_name, "mixed_layer.zip");

    let mut archive = Archive::open(&artifact.bytes).unwrap();
    let datasets = archive.find_shapefiles();
    assert_eq!(datasets.len(), 2);

    for entries in datasets {
        let shp = archive.read(entries.shp.as_deref().unwrap()).unwrap();
        let dbf = archive.read(entries.dbf.as_deref().unwrap()).unwrap();
        let prj = archive.read_text(entries.prj.as_deref().unwrap()).unwrap();
        let (set, _) = read_shapefile(ShapefileSource {
            shp: &shp,
            dbf: &dbf,
            prj: Some(&prj),
        })
        .unwrap();

        let families: HashSet<_> = set.iter().filter_map(|f| f.family()).collect();
        assert_eq!(families.len(), 1, "member {:?} mixes kinds", entries.shp);

        let keys: Vec<&String> = set.features[0].properties.keys().collect();
        assert!(keys.iter().all(|k| k.len() <= MAX_FIELD_NAME));
        let unique: HashSet<String> = keys.iter().map(|k| k.to_ascii_uppercase()).collect();
        assert_eq!(unique.len(), keys.len());
    }
}

#[test]
fn exported_shapefile_zip_imports_again() {
    let imported = import_places();
    let artifact = export(
        &[ExportLayer {
            name: "places",
            features: &imported,
            style: None,
        }],
        ExportFormat::Shapefile,
    )
    .unwrap();

    let datasets = import(&[InputFile::new("places.zip", artifact.bytes)]).unwrap();
    assert_eq!(datasets[0].format, SourceFormat::ZipShapefile);
    assert_eq!(datasets[0].features.len(), 4);
}

#[test]
fn kmz_import_reads_doc_kml() {
    let kml = r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document>
        <Placemark><name>Summit</name><Point><coordinates>86.925,27.988,8848</coordinates></Point></Placemark>
        </Document></kml>"#;
    let bytes = write_zip(vec![
        ("files/icon.png".to_string(), &b"\x89PNG"[..]),
        ("doc.kml".to_string(), kml.as_bytes()),
    ])
    .unwrap();

    let datasets = import(&[InputFile::new("Everest.KMZ", bytes)]).unwrap();
    assert_eq!(datasets[0].name, "Everest");
    assert_eq!(datasets[0].format, SourceFormat::Kmz);
    let feature = &datasets[0].features.features[0];
    match &feature.geometry {
        Some(Geometry::Point(p)) => {
            let (lon, lat) = geoweave_core::transform::mercator_to_lon_lat(p.x(), p.y());
            assert!((lon - 86.925).abs() < 1e-9 && (lat - 27.988).abs() < 1e-9);
        }
        other => panic!("unexpected geometry {:?}", other),
    }
}

#[test]
fn zip_with_kml_is_detected_before_shapefile() {
    let bytes = write_zip(vec![(
        "layer.kml".to_string(),
        &b"<kml><Placemark><Point><coordinates>1,2</coordinates></Point></Placemark></kml>"[..],
    )])
    .unwrap();
    let datasets = import(&[InputFile::new("bundle.zip", bytes)]).unwrap();
    assert_eq!(datasets[0].format, SourceFormat::ZipKml);
    assert_eq!(
        datasets[0].features.features[0].geometry,
        Some(Geometry::Point(Point::new(
            geoweave_core::transform::lon_lat_to_mercator(1.0, 2.0).0,
            geoweave_core::transform::lon_lat_to_mercator(1.0, 2.0).1
        )))
    );
}

#[test]
fn zip_without_usable_members_is_malformed() {
    let bytes = write_zip(vec![
        ("readme.txt".to_string(), &b"hello"[..]),
        ("roads.shp".to_string(), &b"no dbf next to me"[..]),
    ])
    .unwrap();
    let err = import(&[InputFile::new("bundle.zip", bytes)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedArchive);
    assert!(err.to_string().contains("unsupported ZIP contents"));
}

#[test]
fn empty_feature_collection_imports_as_empty_dataset() {
    let file = InputFile::new(
        "none.geojson",
        br#"{"type":"FeatureCollection","features":[]}"#.to_vec(),
    );
    let datasets = import(&[file]).unwrap();
    assert!(datasets[0].features.is_empty());
}
