//! # geoweave cloud
//!
//! Adapters for the external geodata services a workbench talks to.
//!
//! Every adapter follows the same shape: build a request, send it through an
//! [`HttpTransport`], decode the domain format, and hand back lon/lat
//! features or layer descriptors. Nothing here touches the layer registry.
//!
//! - [`overpass`]: OSM category catalog and Overpass QL fetch
//! - [`capabilities`]: WMS capabilities discovery, WMS tile sources, WFS features
//! - [`stac_client`]: STAC item search drawn as scene footprints
//! - [`proxy`]: same-origin relay routing for cross-origin requests

pub mod capabilities;
pub mod error;
pub mod http;
pub mod overpass;
pub mod proxy;
pub mod stac_client;
pub mod stac_models;

pub use capabilities::{
    fetch_capabilities, fetch_wfs_features, normalize_base_url, RemoteLayer, WmsTileSource,
};
pub use error::{CloudError, Result};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use overpass::{category, OsmCategory, OverpassClient, OSM_CATEGORIES};
pub use proxy::ProxyRoute;
pub use stac_client::{StacCatalog, StacClient};
pub use stac_models::{StacItem, StacItemCollection, StacSearchParams};
