//! End-to-end workbench behaviour against the in-memory transport double.

use geo_types::{coord, Geometry, LineString, Point, Polygon};
use geoweave_cloud::http::testing::RecordingTransport;
use geoweave_cloud::HttpResponse;
use geoweave_codec::{ExportFormat, InputFile};
use geoweave_core::transform::project_geometry;
use geoweave_core::{ErrorKind, GeoBBox};
use geoweave_engine::interaction::{Interaction, InteractionHandle};
use geoweave_engine::{
    Adapter, AddOutcome, DrawKind, EngineEvent, InteractionState, LayerId, LayerOrigin,
    NoticeLevel, PointerEvent, PointerKind, RenderSurface, Viewport, Workbench, WorkbenchConfig,
};

const CAPABILITIES: &str = r#"<?xml version="1.0"?>
<WMT_MS_Capabilities version="1.1.1"><Capability>
  <Exception>
    <Format>application/vnd.ogc.se_xml</Format>
    <Format>application/vnd.ogc.se_inimage</Format>
  </Exception>
  <Layer><Title>GeoServer</Title>
    <Layer><Name>topp:states</Name><Title>USA Population</Title></Layer>
    <Layer><Name>tiger:roads</Name><Title>Manhattan roads</Title></Layer>
  </Layer>
</Capability></WMT_MS_Capabilities>"#;

const STATES_JSON: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","properties":{"STATE_NAME":"Utah"},
   "geometry":{"type":"Point","coordinates":[-111.9,40.7]}}
]}"#;

const STAC_PAGE: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","id":"S2A_T30TVK","collection":"sentinel-2-l2a",
   "geometry":{"type":"Polygon","coordinates":[[[-4,40],[-3,40],[-3,41],[-4,41],[-4,40]]]},
   "properties":{"datetime":"2024-05-01T10:56:21Z","eo:cloud_cover":3.2}},
  {"type":"Feature","id":"S2B_T30TVL","collection":"sentinel-2-l2a",
   "geometry":{"type":"Polygon","coordinates":[[[-4,41],[-3,41],[-3,42],[-4,42],[-4,41]]]},
   "properties":{"datetime":"2024-05-03T10:56:19Z"}}
]}"#;

const PARKS: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","properties":{"name":"Retiro","area_ha":118.0},
   "geometry":{"type":"Point","coordinates":[-3.68,40.415]}},
  {"type":"Feature","properties":{"name":"Casa de Campo","area_ha":1722.6},
   "geometry":{"type":"Point","coordinates":[-3.75,40.42]}}
]}"#;

#[derive(Default)]
struct Surface {
    live: Vec<InteractionHandle>,
    drag_pan: bool,
    next: u64,
}

impl RenderSurface for Surface {
    fn is_ready(&self) -> bool {
        true
    }
    fn attach(&mut self, _interaction: Interaction) -> InteractionHandle {
        self.next += 1;
        self.live.push(InteractionHandle(self.next));
        InteractionHandle(self.next)
    }
    fn detach(&mut self, handle: InteractionHandle) {
        self.live.retain(|h| *h != handle);
    }
    fn drag_pan_enabled(&self) -> bool {
        self.drag_pan
    }
    fn set_drag_pan(&mut self, enabled: bool) {
        self.drag_pan = enabled;
    }
}

fn workbench(transport: RecordingTransport) -> Workbench<RecordingTransport> {
    Workbench::new(WorkbenchConfig::default(), transport)
}

fn geoserver() -> RecordingTransport {
    RecordingTransport::new()
        .respond(
            "GetCapabilities",
            HttpResponse::new(200, Some("application/vnd.ogc.wms_xml"), CAPABILITIES),
        )
        .respond(
            "GetFeature",
            HttpResponse::new(200, Some("application/json"), STATES_JSON),
        )
}

fn lon_lat_box(w: f64, s: f64, e: f64, n: f64) -> Geometry<f64> {
    let ring = LineString::from(vec![(w, s), (e, s), (e, n), (w, n), (w, s)]);
    project_geometry(&Geometry::Polygon(Polygon::new(ring, vec![])))
}

#[tokio::test]
async fn discovery_lists_nested_layers() {
    let transport = geoserver();
    let mut wb = workbench(transport.clone());

    let layers = wb.discover("geo.example.org/geoserver/web/").await.unwrap();
    let names: Vec<&str> = layers.iter().map(|l| l.remote_name.as_str()).collect();
    assert_eq!(names, vec!["topp:states", "tiger:roads"]);
    assert_eq!(layers[0].title, "USA Population");
    assert!(!wb.is_busy(Adapter::Capabilities));

    // default config routes through the local relay
    assert!(transport.requests()[0].url.starts_with("http://127.0.0.1:8787/api/proxy?url="));
}

#[tokio::test]
async fn wms_layer_is_added_once() {
    let mut wb = workbench(geoserver());
    wb.discover("http://geo.example.org/geoserver").await.unwrap();
    let events = wb.subscribe();

    let first = wb.add_wms_layer("topp:states").unwrap();
    let second = wb.add_wms_layer("topp:states").unwrap();

    assert!(first.is_added());
    assert_eq!(second, AddOutcome::Duplicate(LayerId::new("wms:topp:states")));
    assert_eq!(wb.registry().len(), 1);
    assert!(wb.discovered().get("topp:states").unwrap().wms_added);
    assert!(!wb.discovered().get("topp:states").unwrap().wfs_added);

    let warnings = events
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::Notice(n) if n.level == NoticeLevel::Warning))
        .count();
    assert_eq!(warnings, 1);
}

#[tokio::test]
async fn unknown_remote_layer_is_rejected() {
    let mut wb = workbench(geoserver());
    wb.discover("http://geo.example.org/geoserver").await.unwrap();
    assert!(wb.add_wms_layer("topp:nope").is_err());
    assert!(wb.registry().is_empty());
}

#[tokio::test]
async fn wfs_duplicate_is_caught_before_fetching() {
    let transport = geoserver();
    let mut wb = workbench(transport.clone());
    wb.discover("http://geo.example.org/geoserver").await.unwrap();

    let id = wb.add_wfs_layer("topp:states").await.unwrap().unwrap();
    assert_eq!(id.as_str(), "wfs:topp:states");
    assert!(wb.discovered().get("topp:states").unwrap().wfs_added);
    let sent = transport.requests().len();

    let err = wb.add_wfs_layer("topp:states").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateLayer);
    assert_eq!(transport.requests().len(), sent);
    assert!(!wb.is_busy(Adapter::Wfs));

    wb.remove_layer(&id).unwrap();
    assert!(!wb.discovered().get("topp:states").unwrap().wfs_added);
}

#[tokio::test]
async fn failed_discovery_empties_the_book() {
    let transport = RecordingTransport::new()
        .fail("other.example", "connection refused")
        .respond(
            "GetCapabilities",
            HttpResponse::new(200, Some("application/vnd.ogc.wms_xml"), CAPABILITIES),
        );
    let mut wb = workbench(transport);
    wb.discover("http://geo.example.org/geoserver").await.unwrap();
    assert_eq!(wb.discovered().layers().len(), 2);

    let err = wb.discover("http://other.example").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert!(wb.discovered().layers().is_empty());
}

#[tokio::test]
async fn inverted_bbox_never_reaches_overpass() {
    let transport = RecordingTransport::new();
    let mut wb = workbench(transport.clone());

    let err = wb
        .begin_osm_fetch_in(GeoBBox::new(5.0, 10.0, 3.0, 20.0), &["buildings"])
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::InvalidBoundingBox);
    assert!(transport.requests().is_empty());
    assert!(!wb.is_busy(Adapter::Overpass));
}

#[tokio::test]
async fn osm_requires_a_polygon() {
    let mut wb = workbench(RecordingTransport::new());
    let point = Geometry::Point(Point::new(0.0, 0.0));
    let err = wb.fetch_osm(&point, &["roads"]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidGeometryForOperation);
}

#[tokio::test]
async fn empty_osm_answer_adds_nothing() {
    let transport = RecordingTransport::new().respond(
        "overpass-api.de",
        HttpResponse::new(200, Some("application/json"), r#"{"elements":[]}"#),
    );
    let mut wb = workbench(transport);
    let events = wb.subscribe();

    let ids = wb
        .fetch_osm(&lon_lat_box(-3.8, 40.3, -3.6, 40.5), &["buildings", "roads"])
        .await
        .unwrap();

    assert!(ids.is_empty());
    assert!(wb.registry().is_empty());
    assert!(events
        .try_iter()
        .any(|e| matches!(e, EngineEvent::Notice(n) if n.level == NoticeLevel::Warning)));
}

#[tokio::test]
async fn osm_layers_follow_categories() {
    let body = r#"{"elements":[
        {"type":"node","id":1,"lat":40.41,"lon":-3.70,"tags":{"amenity":"cafe"}},
        {"type":"way","id":2,"tags":{"highway":"residential"},
         "geometry":[{"lat":40.40,"lon":-3.71},{"lat":40.42,"lon":-3.69}]}
    ]}"#;
    let transport = RecordingTransport::new().respond(
        "overpass-api.de",
        HttpResponse::new(200, Some("application/json"), body),
    );
    let mut wb = workbench(transport);

    let ids = wb
        .fetch_osm(&lon_lat_box(-3.8, 40.3, -3.6, 40.5), &["amenities", "roads", "water"])
        .await
        .unwrap();

    assert_eq!(ids.len(), 2);
    for id in &ids {
        let layer = wb.registry().get(id).unwrap();
        assert_eq!(layer.origin, LayerOrigin::Osm);
        assert_eq!(layer.features().map(|f| f.len()), Some(1));
        assert!(layer.style.is_some());
    }
}

#[tokio::test]
async fn second_search_while_busy_is_refused() {
    let transport = RecordingTransport::new().respond(
        "earth-search",
        HttpResponse::new(200, Some("application/geo+json"), STAC_PAGE),
    );
    let mut wb = workbench(transport.clone());

    let job = wb.begin_stac_search().unwrap();
    assert!(wb.is_busy(Adapter::Stac));
    let err = wb.begin_stac_search().err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Busy);

    let done = job.run().await;
    wb.finish_stac_search(done).unwrap();
    assert!(!wb.is_busy(Adapter::Stac));
    assert!(wb.begin_stac_search().is_ok());
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn abandoned_jobs_release_their_adapter() {
    let transport = RecordingTransport::new().respond(
        "earth-search",
        HttpResponse::new(200, Some("application/geo+json"), STAC_PAGE),
    );
    let mut wb = workbench(transport.clone());

    let job = wb.begin_stac_search().unwrap();
    drop(job);
    assert!(!wb.is_busy(Adapter::Stac));

    let done = wb.begin_stac_search().unwrap().run().await;
    assert!(wb.is_busy(Adapter::Stac));
    drop(done);
    assert!(!wb.is_busy(Adapter::Stac));
    assert!(wb.registry().get(&LayerId::new(LayerId::STAC_FOOTPRINTS)).is_none());

    assert!(wb.search_stac().await.unwrap().is_some());
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn stac_footprints_replace_each_other() {
    let transport = RecordingTransport::new().respond(
        "earth-search",
        HttpResponse::new(200, Some("application/geo+json"), STAC_PAGE),
    );
    let mut wb = workbench(transport.clone());

    let first = wb.search_stac().await.unwrap().unwrap();
    wb.set_viewport(Viewport::new(coord! { x: -390_000.0, y: 4_930_000.0 }, 150.0, 800, 600));
    let second = wb.search_stac().await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.as_str(), LayerId::STAC_FOOTPRINTS);
    assert_eq!(wb.registry().len(), 1);
    let layer = wb.registry().get(&first).unwrap();
    assert_eq!(layer.features().map(|f| f.len()), Some(2));

    let body = transport.requests()[1].body.clone().unwrap();
    let bbox = body["bbox"].as_array().unwrap();
    assert!(bbox[0].as_f64().unwrap() > -5.0 && bbox[2].as_f64().unwrap() < -2.0);
    assert_eq!(body["collections"][0], "sentinel-2-l2a");
}

#[tokio::test]
async fn empty_stac_page_keeps_previous_footprints() {
    let transport = RecordingTransport::new().respond(
        "earth-search",
        HttpResponse::new(
            200,
            Some("application/geo+json"),
            r#"{"type":"FeatureCollection","features":[]}"#,
        ),
    );
    let mut wb = workbench(transport);
    assert_eq!(wb.search_stac().await.unwrap(), None);
    assert!(wb.registry().is_empty());
}

#[test]
fn import_then_export_round_trips_attributes() {
    let mut wb = workbench(RecordingTransport::new());
    let ids = wb
        .import_files(&[InputFile::new("parks.geojson", PARKS.as_bytes().to_vec())])
        .unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(wb.registry().get(&ids[0]).unwrap().name, "parks");

    let artifact = wb.export_layers(&ids, ExportFormat::GeoJson).unwrap();
    assert_eq!(artifact.file_name, "parks.geojson");

    let json: serde_json::Value = serde_json::from_slice(&artifact.bytes).unwrap();
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["properties"]["name"], "Retiro");
    let lon = features[0]["geometry"]["coordinates"][0].as_f64().unwrap();
    assert!((lon + 3.68).abs() < 1e-6);
}

#[test]
fn empty_geojson_gives_no_layer() {
    let mut wb = workbench(RecordingTransport::new());
    let ids = wb
        .import_files(&[InputFile::new(
            "empty.geojson",
            br#"{"type":"FeatureCollection","features":[]}"#.to_vec(),
        )])
        .unwrap();
    assert!(ids.is_empty());
    assert!(wb.registry().is_empty());
}

#[test]
fn drawn_polygon_lands_in_scratch_and_extracts() {
    let mut wb = workbench(RecordingTransport::new());
    wb.import_files(&[InputFile::new("parks.geojson", PARKS.as_bytes().to_vec())])
        .unwrap();

    let mut surface = Surface {
        drag_pan: true,
        ..Surface::default()
    };
    wb.start_draw(DrawKind::Polygon, &mut surface);
    assert_eq!(
        wb.interaction_state(),
        InteractionState::Drawing { kind: DrawKind::Polygon }
    );
    assert!(wb.registry().scratch().is_some());

    // one pixel per metre around Retiro
    let centre = project_geometry(&Geometry::Point(Point::new(-3.68, 40.415)));
    let Geometry::Point(centre) = centre else { unreachable!() };
    wb.set_viewport(Viewport::new(centre.0, 1.0, 200, 200));
    for (x, y) in [(50.0, 50.0), (150.0, 50.0), (150.0, 150.0)] {
        wb.handle_pointer(&PointerEvent::new(PointerKind::Click, x, y));
    }
    wb.handle_pointer(&PointerEvent::new(PointerKind::DoubleClick, 50.0, 150.0));

    let scratch = wb.registry().scratch().unwrap();
    let drawn = scratch.features().unwrap().features[0].geometry.clone().unwrap();
    assert!(matches!(drawn, Geometry::Polygon(_)));

    let id = wb.extract_in_polygon(&drawn).unwrap().unwrap();
    let extraction = wb.registry().get(&id).unwrap();
    assert_eq!(extraction.name, "Extraction 1");
    // Casa de Campo is kilometres away, the scratch polygon itself is excluded
    assert_eq!(extraction.features().map(|f| f.len()), Some(1));

    wb.stop_draw(&mut surface);
    assert_eq!(wb.interaction_state(), InteractionState::Idle);
    assert!(surface.live.is_empty());
    assert!(surface.drag_pan);
}

#[test]
fn extraction_rejects_lines() {
    let mut wb = workbench(RecordingTransport::new());
    let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]));
    let err = wb.extract_in_polygon(&line).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidGeometryForOperation);
}
