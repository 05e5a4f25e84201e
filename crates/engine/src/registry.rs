//! Layer registry: the authoritative, ordered list of map layers.
//!
//! Layers are kept bottom→top. New layers get `z = max + 1`; the scratch layer
//! is pinned to the top and renumbered above whatever was added last. The
//! registry talks to a renderer only through [`LayerDiff`].

use geoweave_core::style::SCRATCH_STYLE;
use geoweave_core::FeatureSet;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventHub, Notice};
use crate::layer::{Layer, LayerId, LayerOrigin};

/// What `add` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(LayerId),
    /// The id was already registered; nothing changed.
    Duplicate(LayerId),
    /// A second scratch layer, or the scratch id on an ordinary layer.
    Rejected(LayerId),
}

impl AddOutcome {
    pub fn id(&self) -> &LayerId {
        match self {
            Self::Added(id) | Self::Duplicate(id) | Self::Rejected(id) => id,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

pub struct LayerRegistry {
    /// Bottom→top; the scratch layer, when present, is always last.
    layers: Vec<Layer>,
    events: EventHub,
}

impl LayerRegistry {
    pub fn new(events: EventHub) -> Self {
        Self {
            layers: Vec::new(),
            events,
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────────

    /// Append a layer above every non-scratch layer.
    ///
    /// A duplicate id is a no-op reported as a notice, never an error.
    pub fn add(&mut self, mut layer: Layer) -> AddOutcome {
        if self.contains(&layer.id) {
            warn!(id = %layer.id, "duplicate layer add ignored");
            self.events
                .notice(Notice::warning(format!("Layer \"{}\" is already on the map", layer.name)));
            return AddOutcome::Duplicate(layer.id);
        }
        if layer.is_scratch() != (layer.id.as_str() == LayerId::SCRATCH) {
            warn!(id = %layer.id, origin = ?layer.origin, "scratch layer mismatch");
            return AddOutcome::Rejected(layer.id);
        }

        let id = layer.id.clone();
        if layer.is_scratch() {
            layer.z_index = self.top_z() + 1;
            self.layers.push(layer);
        } else {
            layer.z_index = self.top_z() + 1;
            let remote = layer.origin.is_remote().then(|| layer.remote_name.clone()).flatten();
            let at = self.scratch_position().unwrap_or(self.layers.len());
            info!(id = %id, name = %layer.name, z = layer.z_index, "layer added");
            self.layers.insert(at, layer);
            self.lift_scratch();
            if let Some(remote_name) = remote {
                self.events.emit(EngineEvent::LayerStateChanged { remote_name });
            }
        }
        AddOutcome::Added(id)
    }

    /// Remove a layer; WMS/WFS removals announce their remote name.
    pub fn remove(&mut self, id: &LayerId) -> Result<Layer> {
        let pos = self.position(id).ok_or_else(|| EngineError::LayerNotFound(id.clone()))?;
        let layer = self.layers.remove(pos);
        info!(id = %id, "layer removed");
        if layer.origin.is_remote() {
            if let Some(remote_name) = &layer.remote_name {
                self.events.emit(EngineEvent::LayerStateChanged {
                    remote_name: remote_name.clone(),
                });
            }
        }
        Ok(layer)
    }

    /// Swap in `layer` for an existing one with the same id, keeping its z.
    pub fn replace(&mut self, mut layer: Layer) -> AddOutcome {
        match self.position(&layer.id) {
            Some(pos) if self.layers[pos].is_scratch() != layer.is_scratch() => {
                warn!(id = %layer.id, "replacement would move the scratch layer");
                AddOutcome::Rejected(layer.id)
            }
            Some(pos) => {
                layer.z_index = self.layers[pos].z_index;
                let id = layer.id.clone();
                debug!(id = %id, "layer replaced");
                self.layers[pos] = layer;
                AddOutcome::Added(id)
            }
            None => self.add(layer),
        }
    }

    pub fn set_visible(&mut self, id: &LayerId, visible: bool) -> Result<()> {
        self.get_mut(id)?.visible = visible;
        Ok(())
    }

    /// Set opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> Result<()> {
        let opacity = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
        self.get_mut(id)?.opacity = opacity;
        Ok(())
    }

    /// Move a layer to `position` (0 = bottom) among the non-scratch layers
    /// and renumber z so it stays strictly increasing bottom→top.
    pub fn reorder(&mut self, id: &LayerId, position: usize) -> Result<()> {
        let from = self.position(id).ok_or_else(|| EngineError::LayerNotFound(id.clone()))?;
        if self.layers[from].is_scratch() {
            warn!("the scratch layer always stays on top");
            return Ok(());
        }
        let layer = self.layers.remove(from);
        let ordinary = self.scratch_position().unwrap_or(self.layers.len());
        self.layers.insert(position.min(ordinary), layer);
        for (z, layer) in self.layers.iter_mut().enumerate() {
            layer.z_index = z as i64 + 1;
        }
        Ok(())
    }

    // ── Scratch layer ────────────────────────────────────────────────────

    /// The draw surface, created on first use.
    pub fn ensure_scratch(&mut self) -> &mut Layer {
        let pos = match self.scratch_position() {
            Some(pos) => pos,
            None => {
                let layer = Layer::vector(
                    LayerId::scratch(),
                    "Drawings",
                    LayerOrigin::Scratch,
                    FeatureSet::new(),
                )
                .with_style(SCRATCH_STYLE);
                self.add(layer);
                self.layers.len() - 1
            }
        };
        &mut self.layers[pos]
    }

    pub fn scratch(&self) -> Option<&Layer> {
        self.layers.last().filter(|l| l.is_scratch())
    }

    pub fn clear_scratch(&mut self) {
        if let Some(fs) = self
            .layers
            .last_mut()
            .filter(|l| l.is_scratch())
            .and_then(Layer::features_mut)
        {
            fs.clear();
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    fn get_mut(&mut self, id: &LayerId) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| EngineError::LayerNotFound(id.clone()))
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.position(id).is_some()
    }

    /// Layers bottom→top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The layer added for `remote_name` with the given origin, if any.
    pub fn find_remote(&self, remote_name: &str, origin: LayerOrigin) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.origin == origin && l.remote_name.as_deref() == Some(remote_name))
    }

    fn position(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    fn scratch_position(&self) -> Option<usize> {
        self.layers.iter().position(Layer::is_scratch)
    }

    fn top_z(&self) -> i64 {
        self.layers
            .iter()
            .filter(|l| !l.is_scratch())
            .map(|l| l.z_index)
            .max()
            .unwrap_or(0)
    }

    fn lift_scratch(&mut self) {
        let top = self.top_z();
        if let Some(scratch) = self.layers.last_mut().filter(|l| l.is_scratch()) {
            scratch.z_index = top + 1;
        }
    }

    // ── Renderer reconciliation ──────────────────────────────────────────

    /// What the renderer must do to match the registry.
    pub fn reconcile(&self, snapshot: &RendererSnapshot) -> LayerDiff {
        let mut diff = LayerDiff::default();

        for attached in &snapshot.attached {
            if !self.contains(&attached.id) {
                diff.removed.push(attached.id.clone());
            }
        }
        for layer in &self.layers {
            match snapshot.get(&layer.id) {
                None => diff.added.push(AttachedLayer::of(layer)),
                Some(attached) => {
                    if attached.z_index != layer.z_index {
                        diff.reordered.push((layer.id.clone(), layer.z_index));
                    }
                    if attached.visible != layer.visible {
                        diff.visibility.push((layer.id.clone(), layer.visible));
                    }
                    if attached.opacity != layer.opacity {
                        diff.opacity.push((layer.id.clone(), layer.opacity));
                    }
                }
            }
        }
        diff
    }
}

/// Renderer-side view of one attached layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedLayer {
    pub id: LayerId,
    pub z_index: i64,
    pub visible: bool,
    pub opacity: f32,
}

impl AttachedLayer {
    fn of(layer: &Layer) -> Self {
        Self {
            id: layer.id.clone(),
            z_index: layer.z_index,
            visible: layer.visible,
            opacity: layer.opacity,
        }
    }
}

/// What the renderer currently has attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RendererSnapshot {
    pub attached: Vec<AttachedLayer>,
}

impl RendererSnapshot {
    pub fn get(&self, id: &LayerId) -> Option<&AttachedLayer> {
        self.attached.iter().find(|a| &a.id == id)
    }

    fn get_mut(&mut self, id: &LayerId) -> Option<&mut AttachedLayer> {
        self.attached.iter_mut().find(|a| &a.id == id)
    }

    /// Apply a diff the way a renderer would.
    pub fn apply(&mut self, diff: &LayerDiff) {
        self.attached.retain(|a| !diff.removed.contains(&a.id));
        self.attached.extend(diff.added.iter().cloned());
        for (id, z) in &diff.reordered {
            if let Some(a) = self.get_mut(id) {
                a.z_index = *z;
            }
        }
        for (id, visible) in &diff.visibility {
            if let Some(a) = self.get_mut(id) {
                a.visible = *visible;
            }
        }
        for (id, opacity) in &diff.opacity {
            if let Some(a) = self.get_mut(id) {
                a.opacity = *opacity;
            }
        }
        self.attached.sort_by_key(|a| a.z_index);
    }
}

/// Changes a renderer has to apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerDiff {
    pub added: Vec<AttachedLayer>,
    pub removed: Vec<LayerId>,
    /// New z per layer whose z drifted.
    pub reordered: Vec<(LayerId, i64)>,
    pub visibility: Vec<(LayerId, bool)>,
    pub opacity: Vec<(LayerId, f32)>,
}

impl LayerDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.reordered.is_empty()
            && self.visibility.is_empty()
            && self.opacity.is_empty()
    }
}
