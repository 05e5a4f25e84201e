//! Layer entity.

use std::fmt;

use geoweave_cloud::WmsTileSource;
use geoweave_core::{FeatureSet, LayerStyle};

/// Unique layer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub String);

impl LayerId {
    pub const SCRATCH: &'static str = "scratch";
    pub const STAC_FOOTPRINTS: &'static str = "stac-footprints";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn scratch() -> Self {
        Self::new(Self::SCRATCH)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Where a layer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerOrigin {
    File,
    Wms,
    Wfs,
    Osm,
    Stac,
    Scratch,
    Extraction,
}

impl LayerOrigin {
    /// Origins that correspond to an advertised remote layer.
    pub fn is_remote(self) -> bool {
        matches!(self, Self::Wms | Self::Wfs)
    }
}

/// Tile-backed sources, rendered but never hit-tested.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterSource {
    Wms(WmsTileSource),
}

/// Closed set of layer backings.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSource {
    Vector(FeatureSet),
    Raster(RasterSource),
}

/// Coarse kind reported to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Vector,
    Raster,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub source: LayerSource,
    pub visible: bool,
    /// Always within `[0, 1]`.
    pub opacity: f32,
    /// Assigned by the registry on insertion.
    pub z_index: i64,
    pub origin: LayerOrigin,
    /// Advertised name for WMS/WFS layers.
    pub remote_name: Option<String>,
    pub style: Option<LayerStyle>,
}

impl Layer {
    pub fn vector(
        id: impl Into<LayerId>,
        name: impl Into<String>,
        origin: LayerOrigin,
        features: FeatureSet,
    ) -> Self {
        Self::with_source(id.into(), name.into(), origin, LayerSource::Vector(features))
    }

    pub fn raster(
        id: impl Into<LayerId>,
        name: impl Into<String>,
        origin: LayerOrigin,
        source: RasterSource,
    ) -> Self {
        Self::with_source(id.into(), name.into(), origin, LayerSource::Raster(source))
    }

    fn with_source(id: LayerId, name: String, origin: LayerOrigin, source: LayerSource) -> Self {
        Self {
            id,
            name,
            source,
            visible: true,
            opacity: 1.0,
            z_index: 0,
            origin,
            remote_name: None,
            style: None,
        }
    }

    pub fn with_remote_name(mut self, remote_name: impl Into<String>) -> Self {
        self.remote_name = Some(remote_name.into());
        self
    }

    pub fn with_style(mut self, style: LayerStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn geometry_kind(&self) -> GeometryKind {
        match self.source {
            LayerSource::Vector(_) => GeometryKind::Vector,
            LayerSource::Raster(_) => GeometryKind::Raster,
        }
    }

    pub fn has_vector_source(&self) -> bool {
        matches!(self.source, LayerSource::Vector(_))
    }

    pub fn features(&self) -> Option<&FeatureSet> {
        match &self.source {
            LayerSource::Vector(fs) => Some(fs),
            LayerSource::Raster(_) => None,
        }
    }

    pub fn features_mut(&mut self) -> Option<&mut FeatureSet> {
        match &mut self.source {
            LayerSource::Vector(fs) => Some(fs),
            LayerSource::Raster(_) => None,
        }
    }

    pub fn is_scratch(&self) -> bool {
        self.origin == LayerOrigin::Scratch
    }
}

impl From<String> for LayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
