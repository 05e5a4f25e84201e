//! Interaction state machine: drawing and inspecting, never both.
//!
//! The state is one tagged union and every transition is total: any input is
//! admissible in any state. The machine owns the renderer interactions it
//! attaches and detaches exactly those on exit.

use geo_types::{Coord, Geometry, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::query::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawKind {
    Point,
    LineString,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InspectMode {
    Click,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionState {
    #[default]
    Idle,
    Drawing { kind: DrawKind },
    Inspecting { mode: InspectMode },
}

/// Renderer-side interactions the machine can install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Captures draw gestures on the scratch layer.
    DrawCapture(DrawKind),
    ClickProbe,
    BoxProbe,
}

/// Opaque token for an attached interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InteractionHandle(pub u64);

/// The part of a rendering engine the machine drives.
pub trait RenderSurface {
    /// False until the map is mounted.
    fn is_ready(&self) -> bool;
    fn attach(&mut self, interaction: Interaction) -> InteractionHandle;
    fn detach(&mut self, handle: InteractionHandle);
    /// Whether drag gestures currently pan the map.
    fn drag_pan_enabled(&self) -> bool;
    fn set_drag_pan(&mut self, enabled: bool);
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed(InteractionState),
    Unchanged(InteractionState),
    /// The surface was not ready; nothing happened.
    SurfaceNotReady,
}

// ── Pointer feed ─────────────────────────────────────────────────────────

/// A pixel position, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub x: f64,
    pub y: f64,
}

impl Pixel {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerKind {
    Click,
    /// Finishes a line or polygon sketch.
    DoubleClick,
    DragStart,
    DragMove,
    DragEnd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pixel: Pixel,
    /// Box-select modifier (e.g. shift) held.
    pub modifier: bool,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f64, y: f64) -> Self {
        Self {
            kind,
            pixel: Pixel::new(x, y),
            modifier: false,
        }
    }

    pub fn with_modifier(mut self) -> Self {
        self.modifier = true;
        self
    }
}

/// What a pointer event asks the workbench to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerOutcome {
    None,
    /// A drawn geometry is finished (map coordinates).
    ShapeCompleted { kind: DrawKind, geometry: Geometry<f64> },
    QueryPoint(Pixel),
    QueryBox { from: Pixel, to: Pixel },
}

// ── Machine ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InteractionMachine {
    state: InteractionState,
    attached: Vec<InteractionHandle>,
    /// Drag-pan setting to restore when inspecting ends.
    saved_drag_pan: Option<bool>,
    sketch: Vec<Coord<f64>>,
    box_start: Option<Pixel>,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Handles currently attached to the surface.
    pub fn attached(&self) -> &[InteractionHandle] {
        &self.attached
    }

    /// Vertices of the sketch in progress.
    pub fn sketch(&self) -> &[Coord<f64>] {
        &self.sketch
    }

    /// Enter `Drawing(kind)`, or go back to `Idle` if already drawing `kind`.
    pub fn start_draw(&mut self, kind: DrawKind, surface: &mut dyn RenderSurface) -> Transition {
        if !surface.is_ready() {
            warn!("draw requested before the map is ready");
            return Transition::SurfaceNotReady;
        }
        if self.state == (InteractionState::Drawing { kind }) {
            self.exit(surface);
            return self.changed();
        }
        self.exit(surface);
        let handle = surface.attach(Interaction::DrawCapture(kind));
        self.attached.push(handle);
        self.state = InteractionState::Drawing { kind };
        self.changed()
    }

    pub fn stop_draw(&mut self, surface: &mut dyn RenderSurface) -> Transition {
        if !surface.is_ready() {
            return Transition::SurfaceNotReady;
        }
        match self.state {
            InteractionState::Drawing { .. } => {
                self.exit(surface);
                self.changed()
            }
            state => Transition::Unchanged(state),
        }
    }

    /// `Idle ⇄ Inspecting(Click)`; drawing is stopped first.
    pub fn toggle_inspect(&mut self, surface: &mut dyn RenderSurface) -> Transition {
        if !surface.is_ready() {
            warn!("inspect requested before the map is ready");
            return Transition::SurfaceNotReady;
        }
        let was_inspecting = matches!(self.state, InteractionState::Inspecting { .. });
        self.exit(surface);
        if !was_inspecting {
            self.saved_drag_pan = Some(surface.drag_pan_enabled());
            surface.set_drag_pan(false);
            self.attached.push(surface.attach(Interaction::ClickProbe));
            self.attached.push(surface.attach(Interaction::BoxProbe));
            self.state = InteractionState::Inspecting {
                mode: InspectMode::Click,
            };
        }
        self.changed()
    }

    /// Leave the current state, detaching what it attached.
    fn exit(&mut self, surface: &mut dyn RenderSurface) {
        for handle in self.attached.drain(..) {
            surface.detach(handle);
        }
        if let Some(enabled) = self.saved_drag_pan.take() {
            surface.set_drag_pan(enabled);
        }
        self.sketch.clear();
        self.box_start = None;
        self.state = InteractionState::Idle;
    }

    fn changed(&self) -> Transition {
        debug!(state = ?self.state, "interaction state");
        Transition::Changed(self.state)
    }

    /// Feed one pointer event.
    pub fn handle_pointer(&mut self, event: &PointerEvent, viewport: &Viewport) -> PointerOutcome {
        match self.state {
            InteractionState::Idle => PointerOutcome::None,
            InteractionState::Drawing { kind } => self.draw_pointer(kind, event, viewport),
            InteractionState::Inspecting { .. } => self.inspect_pointer(event),
        }
    }

    fn draw_pointer(
        &mut self,
        kind: DrawKind,
        event: &PointerEvent,
        viewport: &Viewport,
    ) -> PointerOutcome {
        let coord = viewport.pixel_to_coord(event.pixel);
        match (kind, event.kind) {
            (DrawKind::Point, PointerKind::Click) => PointerOutcome::ShapeCompleted {
                kind,
                geometry: Geometry::Point(Point::from(coord)),
            },
            (_, PointerKind::Click) => {
                self.sketch.push(coord);
                PointerOutcome::None
            }
            (_, PointerKind::DoubleClick) => {
                if self.sketch.last() != Some(&coord) {
                    self.sketch.push(coord);
                }
                self.finish_sketch(kind)
            }
            _ => PointerOutcome::None,
        }
    }

    /// Close the sketch in progress, if it has enough vertices.
    pub fn finish_sketch(&mut self, kind: DrawKind) -> PointerOutcome {
        let vertices = std::mem::take(&mut self.sketch);
        let geometry = match kind {
            DrawKind::LineString if vertices.len() >= 2 => {
                Geometry::LineString(LineString::from(vertices))
            }
            DrawKind::Polygon if vertices.len() >= 3 => {
                Geometry::Polygon(Polygon::new(LineString::from(vertices), vec![]))
            }
            _ => return PointerOutcome::None,
        };
        PointerOutcome::ShapeCompleted { kind, geometry }
    }

    fn inspect_pointer(&mut self, event: &PointerEvent) -> PointerOutcome {
        let mode = if event.modifier {
            InspectMode::Box
        } else {
            InspectMode::Click
        };
        match event.kind {
            PointerKind::Click => {
                self.state = InteractionState::Inspecting {
                    mode: InspectMode::Click,
                };
                PointerOutcome::QueryPoint(event.pixel)
            }
            PointerKind::DragStart if mode == InspectMode::Box => {
                self.state = InteractionState::Inspecting { mode };
                self.box_start = Some(event.pixel);
                PointerOutcome::None
            }
            PointerKind::DragEnd => match self.box_start.take() {
                Some(from) => {
                    self.state = InteractionState::Inspecting {
                        mode: InspectMode::Click,
                    };
                    PointerOutcome::QueryBox {
                        from,
                        to: event.pixel,
                    }
                }
                None => PointerOutcome::None,
            },
            _ => PointerOutcome::None,
        }
    }
}
