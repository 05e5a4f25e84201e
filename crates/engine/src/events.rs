//! Outbound event stream.
//!
//! The engine never shows anything itself. Notices, state changes and finished
//! shapes are pushed to every subscriber over a `crossbeam_channel`; the UI
//! drains its receiver on its own loop.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crossbeam_channel::{Receiver, Sender};
use geo_types::Geometry;

use crate::interaction::{DrawKind, InteractionState};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message meant for the user, not the log.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: SystemTime,
}

impl Notice {
    fn with_level(level: NoticeLevel, msg: impl Into<String>) -> Self {
        Self {
            level,
            message: msg.into(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Info, msg)
    }

    pub fn success(msg: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Success, msg)
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Warning, msg)
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Error, msg)
    }
}

/// Everything the engine reports outward.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Notice(Notice),
    /// A WMS/WFS layer for this remote name was added or removed.
    LayerStateChanged { remote_name: String },
    /// One finished drawn geometry, in the registry CRS.
    ShapeCompleted { kind: DrawKind, geometry: Geometry<f64> },
    InteractionChanged { state: InteractionState },
    /// The renderer finished a frame.
    RenderComplete,
}

/// Fan-out of [`EngineEvent`]s. Clones share the subscriber list.
#[derive(Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<Sender<EngineEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    /// Deliver to every live subscriber; subscribers whose receiver is gone are dropped.
    pub fn emit(&self, event: EngineEvent) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub fn notice(&self, notice: Notice) {
        self.emit(EngineEvent::Notice(notice));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}
