//! Live STAC catalog searches.
//!
//! These need network access and are ignored by default.
//! Run with: `cargo test -p geoweave-cloud -- --ignored stac`

use std::time::Duration;

use geoweave_cloud::{ReqwestTransport, StacCatalog, StacClient};
use geoweave_core::GeoBBox;

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(Duration::from_secs(60), "geoweave-tests").expect("client")
}

/// Sentinel-2 footprints over Madrid from Earth Search.
#[tokio::test]
#[ignore]
async fn stac_earth_search_footprints() {
    let client = StacClient::new(StacCatalog::EarthSearch, vec!["sentinel-2-l2a".into()], 5);
    let bbox = GeoBBox::new(40.38, -3.75, 40.45, -3.65);

    let footprints = client
        .footprints(&transport(), &bbox)
        .await
        .expect("search failed");

    println!("Found {} footprints", footprints.len());
    assert!(!footprints.is_empty());
    assert!(footprints.len() <= 5);
    for f in footprints.iter() {
        assert!(f.geometry.is_some());
        assert!(f.get_property("collection").is_some());
    }
}

/// Same search against Planetary Computer.
#[tokio::test]
#[ignore]
async fn stac_planetary_computer_footprints() {
    let client = StacClient::new(
        StacCatalog::PlanetaryComputer,
        vec!["sentinel-2-l2a".into()],
        3,
    );
    let bbox = GeoBBox::new(40.38, -3.75, 40.45, -3.65);
    let footprints = client
        .footprints(&transport(), &bbox)
        .await
        .expect("search failed");
    assert!(!footprints.is_empty());
}
