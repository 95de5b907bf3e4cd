//! Subscription handles.

use std::cell::Cell;
use std::fmt;
use std::rc::Weak;

use super::events::ListenerId;
use super::StoreInner;

/// Handle to the listeners registered by one `subscribe`/`subscribe_all`
/// call.
///
/// Dropping the handle unsubscribes. Call [`detach`](Self::detach) to keep
/// the listeners registered for as long as the store lives.
#[must_use = "dropping a Subscription unsubscribes its listeners"]
pub struct Subscription {
    store: Weak<StoreInner>,
    entries: Vec<(String, ListenerId)>,
    active: Cell<bool>,
}

impl Subscription {
    pub(crate) fn new(store: Weak<StoreInner>) -> Self {
        Self {
            store,
            entries: Vec::new(),
            active: Cell::new(true),
        }
    }

    pub(crate) fn push(&mut self, key: String, id: ListenerId) {
        self.entries.push((key, id));
    }

    /// Ids of the registered listeners, one per subscribed path.
    #[must_use]
    pub fn ids(&self) -> Vec<ListenerId> {
        self.entries.iter().map(|(_, id)| *id).collect()
    }

    /// Returns true until the handle unsubscribes or detaches.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Removes the listeners. Idempotent, and safe to call from inside a
    /// listener; calls already planned for the current dispatch still run.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        let Some(store) = self.store.upgrade() else {
            return;
        };
        for (key, id) in &self.entries {
            store.remove_listener(key, *id);
        }
    }

    /// Gives up the handle without unsubscribing.
    pub fn detach(self) {
        self.active.set(false);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("entries", &self.entries)
            .field("active", &self.active.get())
            .finish()
    }
}
