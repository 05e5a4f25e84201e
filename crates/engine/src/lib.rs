//! # geoweave engine
//!
//! The stateful half of the workbench: a z-ordered layer registry with a
//! pinned scratch layer, the draw/inspect interaction machine, feature
//! queries, and the [`Workbench`] that wires file codecs and remote adapters
//! into them.
//!
//! Nothing here renders. Renderers reconcile against the registry through
//! [`LayerRegistry::reconcile`] and drive interactions through
//! [`RenderSurface`]; user-facing messages leave through the [`EventHub`].

pub mod busy;
pub mod config;
pub mod discovered;
pub mod error;
pub mod events;
pub mod interaction;
pub mod layer;
pub mod query;
pub mod registry;
pub mod workbench;

pub use busy::{Adapter, AdapterClaim};
pub use config::WorkbenchConfig;
pub use discovered::{DiscoveredBook, DiscoveredLayer};
pub use error::{EngineError, Result};
pub use events::{EngineEvent, EventHub, Notice, NoticeLevel};
pub use interaction::{
    DrawKind, InspectMode, InteractionState, Pixel, PointerEvent, PointerKind, RenderSurface,
    Transition,
};
pub use layer::{Layer, LayerId, LayerOrigin, LayerSource, RasterSource};
pub use query::{QueryHit, QueryOutcome, Viewport};
pub use registry::{AddOutcome, LayerDiff, LayerRegistry, RendererSnapshot};
pub use workbench::{ReqwestWorkbench, Workbench};
