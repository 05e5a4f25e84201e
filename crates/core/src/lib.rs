//! # geoweave core
//!
//! Core types shared by every geoweave crate.
//!
//! This crate provides:
//! - `Crs`: declared coordinate reference systems
//! - `transform`: the EPSG:4326 ↔ EPSG:3857 Coordinate Transform Utility
//! - `Extent` / `GeoBBox`: projected and geographic bounding boxes
//! - `Feature` / `FeatureSet`: vector features with scalar attributes
//! - `LayerStyle`: fixed vector styles
//! - `ErrorKind`: the failure taxonomy every crate reports against

pub mod crs;
pub mod error;
pub mod extent;
pub mod style;
pub mod transform;
pub mod vector;

pub use crs::Crs;
pub use error::{Error, ErrorKind, Result};
pub use extent::{Extent, GeoBBox};
pub use style::{LayerStyle, Rgba};
pub use vector::{AttributeValue, Attributes, Feature, FeatureSet, GeometryFamily};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::extent::{Extent, GeoBBox};
    pub use crate::style::{LayerStyle, Rgba};
    pub use crate::vector::{AttributeValue, Attributes, Feature, FeatureSet, GeometryFamily};
}
