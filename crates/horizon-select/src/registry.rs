//! Single-slot registry of the currently open control.
//!
//! Opening a control closes whichever other control is registered as open,
//! then registers the newcomer (unless it was configured to coexist with
//! others). Stores share [`OpenRegistry::global`] unless one is injected
//! through the builder.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use horizon_select_core::logging::targets;
use parking_lot::Mutex;

/// Identity of a store instance in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

/// Callback closing a registered control.
pub type Closer = Arc<dyn Fn() + Send + Sync>;

struct OpenSlot {
    owner: StoreId,
    closer: Closer,
}

/// Tracks which control is currently open.
#[derive(Default)]
pub struct OpenRegistry {
    slot: Mutex<Option<OpenSlot>>,
}

impl OpenRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<OpenRegistry> {
        static GLOBAL: OnceLock<Arc<OpenRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(OpenRegistry::new())).clone()
    }

    /// Register `owner` as the open control.
    pub fn set_open(&self, owner: StoreId, closer: Closer) {
        tracing::debug!(target: targets::REGISTRY, %owner, "registered as open");
        *self.slot.lock() = Some(OpenSlot { owner, closer });
    }

    /// Close the registered control if it is not `owner`.
    ///
    /// The closer runs after the slot is emptied and its lock released.
    pub fn close_others(&self, owner: StoreId) {
        let previous = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(open) if open.owner != owner => slot.take(),
                _ => None,
            }
        };

        if let Some(previous) = previous {
            tracing::debug!(
                target: targets::REGISTRY,
                closing = %previous.owner,
                opening = %owner,
                "closing previously open control"
            );
            (previous.closer)();
        }
    }

    /// Forget `owner` if it is the registered control.
    pub fn release(&self, owner: StoreId) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|open| open.owner == owner) {
            *slot = None;
            tracing::trace!(target: targets::REGISTRY, %owner, "released");
        }
    }

    /// The currently registered control.
    pub fn current(&self) -> Option<StoreId> {
        self.slot.lock().as_ref().map(|open| open.owner)
    }
}

impl fmt::Debug for OpenRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRegistry")
            .field("current", &self.current())
            .finish()
    }
}
