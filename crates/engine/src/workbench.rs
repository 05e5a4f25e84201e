//! The workbench: registry, interaction machine, queries and external fetches
//! composed behind one event-loop-owned handle.
//!
//! Network operations are split in three so the caller's loop never blocks:
//!
//! 1. `begin_*` validates synchronously and claims the adapter,
//! 2. the returned job's `run()` performs the request and owns everything it
//!    needs (it can be spawned anywhere),
//! 3. `finish_*` releases the claim and applies the result.
//!
//! The claim travels with the job and its result, so dropping either one
//! (a timeout, a lost `select!` branch) also frees the adapter.
//!
//! The `async` methods at the bottom chain the three for callers that can
//! simply await. A failed operation leaves the registry and the interaction
//! state as they were.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use geo::Intersects;
use geo_types::{Geometry, Polygon};
use geoweave_cloud::overpass::categories;
use geoweave_cloud::{
    CloudError, HttpTransport, OsmCategory, OverpassClient, ProxyRoute, RemoteLayer,
    ReqwestTransport, StacCatalog, StacClient, WmsTileSource,
};
use geoweave_codec::{ExportArtifact, ExportFormat, ExportLayer, InputFile};
use geoweave_core::transform::{extent_to_geographic, project_geometry, to_registry_crs};
use geoweave_core::vector::geometry_type_name;
use geoweave_core::{Crs, Extent, Feature, FeatureSet, GeoBBox, LayerStyle};
use tracing::{info, warn};

use crate::busy::{Adapter, AdapterClaim, BusySet};
use crate::config::WorkbenchConfig;
use crate::discovered::{DiscoveredBook, DiscoveredLayer};
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventHub, Notice};
use crate::interaction::{
    DrawKind, InteractionMachine, InteractionState, Pixel, PointerEvent, PointerOutcome,
    RenderSurface, Transition,
};
use crate::layer::{Layer, LayerId, LayerOrigin, RasterSource};
use crate::query::{query_at_point, query_in_extent, QueryOutcome, Viewport};
use crate::registry::{AddOutcome, LayerDiff, LayerRegistry, RendererSnapshot};

pub struct Workbench<T: HttpTransport> {
    config: WorkbenchConfig,
    transport: Arc<T>,
    route: ProxyRoute,
    events: EventHub,
    registry: LayerRegistry,
    interaction: InteractionMachine,
    discovered: DiscoveredBook,
    viewport: Viewport,
    busy: BusySet,
    file_seq: u64,
    osm_seq: u64,
    extraction_seq: u64,
}

/// A workbench over the real network transport.
pub type ReqwestWorkbench = Workbench<ReqwestTransport>;

impl Workbench<ReqwestTransport> {
    /// A workbench talking to the real network.
    pub fn connect(config: WorkbenchConfig) -> Result<Self> {
        let transport =
            ReqwestTransport::new(config.network.request_timeout(), &config.network.user_agent)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: HttpTransport> Workbench<T> {
    pub fn new(config: WorkbenchConfig, transport: T) -> Self {
        let events = EventHub::new();
        let route = ProxyRoute::from_config(config.network.proxy_url.as_deref());
        Self {
            registry: LayerRegistry::new(events.clone()),
            route,
            events,
            transport: Arc::new(transport),
            interaction: InteractionMachine::new(),
            discovered: DiscoveredBook::new(),
            viewport: Viewport::default(),
            busy: BusySet::default(),
            file_seq: 0,
            osm_seq: 0,
            extraction_seq: 0,
            config,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction.state()
    }

    pub fn discovered(&self) -> &DiscoveredBook {
        &self.discovered
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn is_busy(&self, adapter: Adapter) -> bool {
        self.busy.contains(adapter)
    }

    /// Report a failure on the event stream and hand it back.
    fn fail(&self, err: impl Into<EngineError>) -> EngineError {
        let err = err.into();
        if err.kind().is_soft() {
            warn!(error = %err, "soft failure");
            self.events.notice(Notice::warning(err.to_string()));
        } else {
            warn!(error = %err, kind = %err.kind(), "operation failed");
            self.events.notice(Notice::error(err.to_string()));
        }
        err
    }

    fn claim(&self, adapter: Adapter) -> Result<AdapterClaim> {
        self.busy
            .try_claim(adapter)
            .ok_or_else(|| self.fail(EngineError::Busy(adapter.label())))
    }

    // ── Layers ───────────────────────────────────────────────────────────

    pub fn add_layer(&mut self, layer: Layer) -> AddOutcome {
        let outcome = self.registry.add(layer);
        self.discovered.refresh(&self.registry);
        outcome
    }

    pub fn remove_layer(&mut self, id: &LayerId) -> Result<Layer> {
        let layer = self.registry.remove(id).map_err(|e| self.fail(e))?;
        self.discovered.refresh(&self.registry);
        Ok(layer)
    }

    pub fn set_visible(&mut self, id: &LayerId, visible: bool) -> Result<()> {
        self.registry.set_visible(id, visible)
    }

    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> Result<()> {
        self.registry.set_opacity(id, opacity)
    }

    pub fn reorder(&mut self, id: &LayerId, position: usize) -> Result<()> {
        self.registry.reorder(id, position)
    }

    pub fn reconcile(&self, snapshot: &RendererSnapshot) -> LayerDiff {
        self.registry.reconcile(snapshot)
    }

    pub fn notify_render_complete(&self) {
        self.events.emit(EngineEvent::RenderComplete);
    }

    // ── Interaction ──────────────────────────────────────────────────────

    pub fn start_draw(
        &mut self,
        kind: DrawKind,
        surface: &mut dyn RenderSurface,
    ) -> Transition {
        let t = self.interaction.start_draw(kind, surface);
        self.after_transition(t)
    }

    pub fn stop_draw(&mut self, surface: &mut dyn RenderSurface) -> Transition {
        let t = self.interaction.stop_draw(surface);
        self.after_transition(t)
    }

    pub fn toggle_inspect(&mut self, surface: &mut dyn RenderSurface) -> Transition {
        let t = self.interaction.toggle_inspect(surface);
        self.after_transition(t)
    }

    fn after_transition(&mut self, t: Transition) -> Transition {
        match t {
            Transition::Changed(state) => {
                if matches!(state, InteractionState::Drawing { .. }) {
                    self.registry.ensure_scratch();
                }
                self.events.emit(EngineEvent::InteractionChanged { state });
            }
            Transition::SurfaceNotReady => {
                self.events
                    .notice(Notice::warning("The map is not ready yet"));
            }
            Transition::Unchanged(_) => {}
        }
        t
    }

    /// Feed a pointer event; inspection gestures return their query result.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Option<QueryOutcome> {
        let outcome = self.interaction.handle_pointer(event, &self.viewport);
        self.apply_pointer_outcome(outcome)
    }

    /// Complete a line or polygon sketch without a double click.
    pub fn finish_drawing(&mut self) {
        if let InteractionState::Drawing { kind } = self.interaction.state() {
            let outcome = self.interaction.finish_sketch(kind);
            self.apply_pointer_outcome(outcome);
        }
    }

    fn apply_pointer_outcome(&mut self, outcome: PointerOutcome) -> Option<QueryOutcome> {
        match outcome {
            PointerOutcome::None => None,
            PointerOutcome::ShapeCompleted { kind, geometry } => {
                if let Some(features) = self.registry.ensure_scratch().features_mut() {
                    features.push(Feature::new(geometry.clone()));
                }
                self.events
                    .emit(EngineEvent::ShapeCompleted { kind, geometry });
                None
            }
            PointerOutcome::QueryPoint(pixel) => Some(self.query_at_point(pixel)),
            PointerOutcome::QueryBox { from, to } => {
                let extent = self.viewport.pixel_extent(from, to);
                Some(self.query_in_extent(&extent))
            }
        }
    }

    pub fn clear_scratch(&mut self) {
        self.registry.clear_scratch();
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn query_at_point(&self, pixel: Pixel) -> QueryOutcome {
        query_at_point(
            &self.registry,
            &self.viewport,
            pixel,
            self.config.query.hit_tolerance_px,
        )
    }

    pub fn query_in_extent(&self, extent: &Extent) -> QueryOutcome {
        query_in_extent(&self.registry, extent)
    }

    // ── Files ────────────────────────────────────────────────────────────

    /// Decode a file selection into one layer per dataset.
    ///
    /// Datasets with no features produce a notice, not a layer.
    pub fn import_files(&mut self, files: &[InputFile]) -> Result<Vec<LayerId>> {
        let datasets = geoweave_codec::import(files).map_err(|e| self.fail(e))?;
        let mut ids = Vec::new();
        for dataset in datasets {
            if dataset.features.is_empty() {
                warn!(file = %dataset.file_name, "no features found");
                self.events.notice(Notice::warning(format!(
                    "No features found in {}",
                    dataset.file_name
                )));
                continue;
            }
            self.file_seq += 1;
            let id = LayerId::new(format!("file:{}:{}", dataset.name, self.file_seq));
            let layer = Layer::vector(id, dataset.name, LayerOrigin::File, dataset.features)
                .with_style(LayerStyle::default());
            if let AddOutcome::Added(id) = self.registry.add(layer) {
                ids.push(id);
            }
        }
        if !ids.is_empty() {
            self.events
                .notice(Notice::success(format!("Imported {} layer(s)", ids.len())));
        }
        Ok(ids)
    }

    /// Serialize vector layers; tile layers in the selection are skipped.
    pub fn export_layers(&self, ids: &[LayerId], format: ExportFormat) -> Result<ExportArtifact> {
        let mut layers = Vec::with_capacity(ids.len());
        for id in ids {
            let layer = self
                .registry
                .get(id)
                .ok_or_else(|| self.fail(EngineError::LayerNotFound(id.clone())))?;
            if let Some(features) = layer.features() {
                layers.push(ExportLayer {
                    name: &layer.name,
                    features,
                    style: layer.style.as_ref(),
                });
            }
        }
        let artifact = geoweave_codec::export(&layers, format).map_err(|e| self.fail(e))?;
        info!(file = %artifact.file_name, bytes = artifact.bytes.len(), "exported");
        Ok(artifact)
    }

    /// Copy every visible feature intersecting `polygon` into a new layer.
    pub fn extract_in_polygon(&mut self, polygon: &Geometry<f64>) -> Result<Option<LayerId>> {
        let polygon = require_polygon(polygon).map_err(|e| self.fail(e))?;
        let extracted: FeatureSet = self
            .registry
            .iter()
            .filter(|l| l.visible && !l.is_scratch())
            .filter_map(Layer::features)
            .flat_map(|fs| fs.iter())
            .filter(|f| f.geometry.as_ref().is_some_and(|g| g.intersects(polygon)))
            .cloned()
            .collect();

        if extracted.is_empty() {
            self.events
                .notice(Notice::info("No features intersect the polygon"));
            return Ok(None);
        }
        self.extraction_seq += 1;
        let n = self.extraction_seq;
        let layer = Layer::vector(
            format!("extraction:{}", n),
            format!("Extraction {}", n),
            LayerOrigin::Extraction,
            extracted,
        )
        .with_style(LayerStyle::default());
        Ok(Some(self.registry.add(layer).id().clone()))
    }

    // ── OSM categories ───────────────────────────────────────────────────

    /// Validate a drawn polygon and the selected categories.
    pub fn begin_osm_fetch<S: AsRef<str>>(
        &mut self,
        polygon: &Geometry<f64>,
        category_ids: &[S],
    ) -> Result<OsmFetch<T>> {
        require_polygon(polygon).map_err(|e| self.fail(e))?;
        let extent = Extent::of_geometry(polygon)
            .ok_or_else(|| self.fail(geoweave_core::Error::EmptyGeometry))?;
        self.begin_osm_fetch_in(extent_to_geographic(&extent), category_ids)
    }

    /// Validate a geographic bbox and the selected categories.
    pub fn begin_osm_fetch_in<S: AsRef<str>>(
        &mut self,
        bbox: GeoBBox,
        category_ids: &[S],
    ) -> Result<OsmFetch<T>> {
        if self.is_busy(Adapter::Overpass) {
            return Err(self.fail(EngineError::Busy(Adapter::Overpass.label())));
        }
        bbox.validate().map_err(|e| self.fail(e))?;
        if category_ids.is_empty() {
            return Err(self.fail(geoweave_core::Error::InvalidParameter {
                name: "categories",
                value: String::new(),
                reason: "select at least one category".into(),
            }));
        }
        let categories = categories(category_ids).map_err(|e| self.fail(e))?;
        let claim = self.claim(Adapter::Overpass)?;
        Ok(OsmFetch {
            claim,
            transport: Arc::clone(&self.transport),
            client: OverpassClient::new(
                self.config.overpass.endpoint.clone(),
                self.config.overpass.timeout_secs,
            ),
            bbox,
            categories,
        })
    }

    /// Register one layer per category that matched something.
    pub fn finish_osm_fetch(&mut self, done: OsmFetchResult) -> Result<Vec<LayerId>> {
        drop(done.claim);
        let features = done.result.map_err(|e| self.fail(e))?;

        let mut ids = Vec::new();
        for category in done.categories {
            let mut subset = features.filtered(|f| category.matches(&f.properties));
            if subset.is_empty() {
                continue;
            }
            subset.map_geometries(project_geometry);
            self.osm_seq += 1;
            let layer = Layer::vector(
                format!("osm:{}:{}", category.id, self.osm_seq),
                category.name,
                LayerOrigin::Osm,
                subset,
            )
            .with_style(category.style);
            if let AddOutcome::Added(id) = self.registry.add(layer) {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            self.events.notice(Notice::warning(
                "No OSM features found for the selected categories in this area",
            ));
        } else {
            self.events
                .notice(Notice::success(format!("Added {} OSM layer(s)", ids.len())));
        }
        Ok(ids)
    }

    // ── Capabilities / WMS / WFS ─────────────────────────────────────────

    pub fn begin_discovery(&mut self, server_url: &str) -> Result<Discovery<T>> {
        if self.is_busy(Adapter::Capabilities) {
            return Err(self.fail(EngineError::Busy(Adapter::Capabilities.label())));
        }
        let base_url = geoweave_cloud::normalize_base_url(server_url).map_err(|e| self.fail(e))?;
        let claim = self.claim(Adapter::Capabilities)?;
        Ok(Discovery {
            claim,
            transport: Arc::clone(&self.transport),
            route: self.route.clone(),
            base_url,
        })
    }

    /// Replace the discovered-layer book. A failed discovery leaves it empty.
    pub fn finish_discovery(&mut self, done: DiscoveryResult) -> Result<Vec<DiscoveredLayer>> {
        drop(done.claim);
        match done.result {
            Ok(remote) => {
                let count = remote.len();
                self.discovered.replace(done.base_url, remote, &self.registry);
                if count == 0 {
                    self.events
                        .notice(Notice::warning("The server advertises no layers"));
                } else {
                    self.events
                        .notice(Notice::info(format!("Found {} layer(s)", count)));
                }
                Ok(self.discovered.layers().to_vec())
            }
            Err(e) => {
                self.discovered.clear(done.base_url);
                Err(self.fail(e))
            }
        }
    }

    fn remote_entry(&self, remote_name: &str) -> Result<(String, String)> {
        let base = self.discovered.base_url();
        match (base, self.discovered.get(remote_name)) {
            (Some(base), Some(layer)) => Ok((base.to_string(), layer.title.clone())),
            _ => Err(self.fail(EngineError::UnknownRemoteLayer(remote_name.to_string()))),
        }
    }

    /// Add a discovered layer as WMS tiles. No request is made here.
    pub fn add_wms_layer(&mut self, remote_name: &str) -> Result<AddOutcome> {
        let (base, title) = self.remote_entry(remote_name)?;
        let layer = Layer::raster(
            format!("wms:{}", remote_name),
            title,
            LayerOrigin::Wms,
            RasterSource::Wms(WmsTileSource::new(&base, remote_name)),
        )
        .with_remote_name(remote_name);
        Ok(self.add_layer(layer))
    }

    pub fn begin_wfs_fetch(&mut self, remote_name: &str) -> Result<WfsFetch<T>> {
        if self.is_busy(Adapter::Wfs) {
            return Err(self.fail(EngineError::Busy(Adapter::Wfs.label())));
        }
        let (base_url, title) = self.remote_entry(remote_name)?;
        if let Some(existing) = self.registry.find_remote(remote_name, LayerOrigin::Wfs) {
            return Err(self.fail(EngineError::DuplicateLayer(existing.id.clone())));
        }
        let claim = self.claim(Adapter::Wfs)?;
        Ok(WfsFetch {
            claim,
            transport: Arc::clone(&self.transport),
            route: self.route.clone(),
            base_url,
            remote_name: remote_name.to_string(),
            title,
        })
    }

    pub fn finish_wfs_fetch(&mut self, done: WfsFetchResult) -> Result<Option<LayerId>> {
        drop(done.claim);
        let (mut features, crs) = done.result.map_err(|e| self.fail(e))?;
        if features.is_empty() {
            self.events.notice(Notice::warning(format!(
                "{} returned no features",
                done.remote_name
            )));
            return Ok(None);
        }
        features.map_geometries(|g| to_registry_crs(g, &crs));
        let layer = Layer::vector(
            format!("wfs:{}", done.remote_name),
            done.title,
            LayerOrigin::Wfs,
            features,
        )
        .with_remote_name(done.remote_name)
        .with_style(LayerStyle::default());
        match self.add_layer(layer) {
            AddOutcome::Added(id) => Ok(Some(id)),
            AddOutcome::Duplicate(_) | AddOutcome::Rejected(_) => Ok(None),
        }
    }

    // ── STAC ─────────────────────────────────────────────────────────────

    /// Search the catalog over the current view.
    pub fn begin_stac_search(&mut self) -> Result<StacSearch<T>> {
        let bbox = extent_to_geographic(&self.viewport.extent());
        self.begin_stac_search_in(bbox)
    }

    pub fn begin_stac_search_in(&mut self, bbox: GeoBBox) -> Result<StacSearch<T>> {
        if self.is_busy(Adapter::Stac) {
            return Err(self.fail(EngineError::Busy(Adapter::Stac.label())));
        }
        bbox.validate().map_err(|e| self.fail(e))?;
        let claim = self.claim(Adapter::Stac)?;
        Ok(StacSearch {
            claim,
            transport: Arc::clone(&self.transport),
            client: StacClient::new(
                StacCatalog::Custom(self.config.stac.search_url.clone()),
                self.config.stac.collections.clone(),
                self.config.stac.limit,
            ),
            bbox,
        })
    }

    /// Register or replace the footprints layer; an empty page changes nothing.
    pub fn finish_stac_search(&mut self, done: StacSearchResult) -> Result<Option<LayerId>> {
        drop(done.claim);
        let mut footprints = done.result.map_err(|e| self.fail(e))?;
        if footprints.is_empty() {
            self.events
                .notice(Notice::info("No catalog items found in the current view"));
            return Ok(None);
        }
        let count = footprints.len();
        footprints.map_geometries(project_geometry);
        let layer = Layer::vector(
            LayerId::STAC_FOOTPRINTS,
            "STAC footprints",
            LayerOrigin::Stac,
            footprints,
        )
        .with_style(LayerStyle::default());
        let id = self.registry.replace(layer).id().clone();
        self.events
            .notice(Notice::success(format!("{} catalog item(s) found", count)));
        Ok(Some(id))
    }

    // ── Awaitable wrappers ───────────────────────────────────────────────

    pub async fn fetch_osm<S: AsRef<str>>(
        &mut self,
        polygon: &Geometry<f64>,
        category_ids: &[S],
    ) -> Result<Vec<LayerId>> {
        let job = self.begin_osm_fetch(polygon, category_ids)?;
        let done = job.run().await;
        self.finish_osm_fetch(done)
    }

    pub async fn discover(&mut self, server_url: &str) -> Result<Vec<DiscoveredLayer>> {
        let job = self.begin_discovery(server_url)?;
        let done = job.run().await;
        self.finish_discovery(done)
    }

    pub async fn add_wfs_layer(&mut self, remote_name: &str) -> Result<Option<LayerId>> {
        let job = self.begin_wfs_fetch(remote_name)?;
        let done = job.run().await;
        self.finish_wfs_fetch(done)
    }

    pub async fn search_stac(&mut self) -> Result<Option<LayerId>> {
        let job = self.begin_stac_search()?;
        let done = job.run().await;
        self.finish_stac_search(done)
    }

    pub async fn search_stac_in(&mut self, bbox: GeoBBox) -> Result<Option<LayerId>> {
        let job = self.begin_stac_search_in(bbox)?;
        let done = job.run().await;
        self.finish_stac_search(done)
    }
}

fn require_polygon(geometry: &Geometry<f64>) -> geoweave_core::Result<&Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Ok(p),
        other => Err(geoweave_core::Error::InvalidGeometry {
            expected: "Polygon",
            found: geometry_type_name(other),
        }),
    }
}

// ── Detached jobs ────────────────────────────────────────────────────────

/// A validated Overpass request, independent of the workbench.
pub struct OsmFetch<T> {
    claim: AdapterClaim,
    transport: Arc<T>,
    client: OverpassClient,
    bbox: GeoBBox,
    categories: Vec<&'static OsmCategory>,
}

pub struct OsmFetchResult {
    claim: AdapterClaim,
    categories: Vec<&'static OsmCategory>,
    result: std::result::Result<FeatureSet, CloudError>,
}

impl<T: HttpTransport> OsmFetch<T> {
    pub fn bbox(&self) -> &GeoBBox {
        &self.bbox
    }

    pub async fn run(self) -> OsmFetchResult {
        let result = self
            .client
            .fetch(self.transport.as_ref(), &self.bbox, &self.categories)
            .await;
        OsmFetchResult {
            claim: self.claim,
            categories: self.categories,
            result,
        }
    }
}

pub struct Discovery<T> {
    claim: AdapterClaim,
    transport: Arc<T>,
    route: ProxyRoute,
    base_url: String,
}

pub struct DiscoveryResult {
    claim: AdapterClaim,
    base_url: String,
    result: std::result::Result<Vec<RemoteLayer>, CloudError>,
}

impl<T: HttpTransport> Discovery<T> {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn run(self) -> DiscoveryResult {
        let result =
            geoweave_cloud::fetch_capabilities(self.transport.as_ref(), &self.route, &self.base_url)
                .await;
        DiscoveryResult {
            claim: self.claim,
            base_url: self.base_url,
            result,
        }
    }
}

pub struct WfsFetch<T> {
    claim: AdapterClaim,
    transport: Arc<T>,
    route: ProxyRoute,
    base_url: String,
    remote_name: String,
    title: String,
}

pub struct WfsFetchResult {
    claim: AdapterClaim,
    remote_name: String,
    title: String,
    result: std::result::Result<(FeatureSet, Crs), CloudError>,
}

impl<T: HttpTransport> WfsFetch<T> {
    pub async fn run(self) -> WfsFetchResult {
        let result = geoweave_cloud::fetch_wfs_features(
            self.transport.as_ref(),
            &self.route,
            &self.base_url,
            &self.remote_name,
        )
        .await;
        WfsFetchResult {
            claim: self.claim,
            remote_name: self.remote_name,
            title: self.title,
            result,
        }
    }
}

pub struct StacSearch<T> {
    claim: AdapterClaim,
    transport: Arc<T>,
    client: StacClient,
    bbox: GeoBBox,
}

pub struct StacSearchResult {
    claim: AdapterClaim,
    result: std::result::Result<FeatureSet, CloudError>,
}

impl<T: HttpTransport> StacSearch<T> {
    pub fn bbox(&self) -> &GeoBBox {
        &self.bbox
    }

    pub async fn run(self) -> StacSearchResult {
        StacSearchResult {
            claim: self.claim,
            result: self
                .client
                .footprints(self.transport.as_ref(), &self.bbox)
                .await,
        }
    }
}
