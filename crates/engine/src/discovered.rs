//! Layers advertised by the current capabilities server.

use geoweave_cloud::RemoteLayer;

use crate::layer::LayerOrigin;
use crate::registry::LayerRegistry;

/// A remote layer and whether it is on the map as WMS and/or WFS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLayer {
    pub remote_name: String,
    pub title: String,
    pub wms_added: bool,
    pub wfs_added: bool,
}

/// Discovery results for one server. Availability flags are derived from
/// the registry, never tracked independently.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredBook {
    base_url: Option<String>,
    layers: Vec<DiscoveredLayer>,
}

impl DiscoveredBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized base URL of the server the book describes.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn layers(&self) -> &[DiscoveredLayer] {
        &self.layers
    }

    pub fn get(&self, remote_name: &str) -> Option<&DiscoveredLayer> {
        self.layers.iter().find(|l| l.remote_name == remote_name)
    }

    /// Replace the book with a new server's layers.
    pub fn replace(&mut self, base_url: String, remote: Vec<RemoteLayer>, registry: &LayerRegistry) {
        self.base_url = Some(base_url);
        self.layers = remote
            .into_iter()
            .map(|r| DiscoveredLayer {
                remote_name: r.name,
                title: r.title,
                wms_added: false,
                wfs_added: false,
            })
            .collect();
        self.refresh(registry);
    }

    /// Forget the server; used when discovery failed.
    pub fn clear(&mut self, base_url: String) {
        self.base_url = Some(base_url);
        self.layers.clear();
    }

    /// Recompute availability from what is registered.
    pub fn refresh(&mut self, registry: &LayerRegistry) {
        for layer in &mut self.layers {
            layer.wms_added = registry
                .find_remote(&layer.remote_name, LayerOrigin::Wms)
                .is_some();
            layer.wfs_added = registry
                .find_remote(&layer.remote_name, LayerOrigin::Wfs)
                .is_some();
        }
    }
}
