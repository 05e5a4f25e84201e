//! Per-adapter busy flags.
//!
//! Starting a request takes an [`AdapterClaim`]; the flag stays set for as long
//! as the claim lives, so a job or future that is dropped half-way releases
//! its adapter just like one that runs to completion.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

/// External adapters guarded by a busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adapter {
    Overpass,
    Capabilities,
    Wfs,
    Stac,
}

impl Adapter {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Overpass => "OSM",
            Self::Capabilities => "capabilities",
            Self::Wfs => "WFS",
            Self::Stac => "catalog search",
        }
    }
}

/// Shared set of adapters with a request in flight.
#[derive(Debug, Clone, Default)]
pub(crate) struct BusySet(Arc<Mutex<HashSet<Adapter>>>);

impl BusySet {
    fn lock(&self) -> MutexGuard<'_, HashSet<Adapter>> {
        // The set is valid after any panic, a poisoned lock is still usable.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, adapter: Adapter) -> bool {
        self.lock().contains(&adapter)
    }

    /// Mark `adapter` busy, or `None` when it already is.
    pub fn try_claim(&self, adapter: Adapter) -> Option<AdapterClaim> {
        if self.lock().insert(adapter) {
            Some(AdapterClaim {
                busy: self.clone(),
                adapter,
            })
        } else {
            None
        }
    }
}

/// RAII guard for one adapter's busy flag.
#[derive(Debug)]
pub struct AdapterClaim {
    busy: BusySet,
    adapter: Adapter,
}

impl AdapterClaim {
    pub fn adapter(&self) -> Adapter {
        self.adapter
    }
}

impl Drop for AdapterClaim {
    fn drop(&mut self) {
        self.busy.lock().remove(&self.adapter);
        debug!(adapter = self.adapter.label(), "adapter released");
    }
}
