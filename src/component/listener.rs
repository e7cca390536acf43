//! Subject-owned listener lists
//!
//! Every interactive entity owns its listeners: registration hands a
//! [`ListenerId`] back to the caller, and the subject drops the callback
//! when it is removed or when the subject itself is destroyed. One
//! `Listeners<E>` list exists per event kind, so there is no downcasting
//! to find the right sub-kind of listener.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier handed out by [`Listeners::add`], used to remove a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback<E> = Rc<dyn Fn(&E)>;

/// A typed list of listeners for one event kind, owned by the subject
pub struct Listeners<E> {
    entries: Vec<(ListenerId, Callback<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("entries", &format!("[{} listeners]", self.entries.len()))
            .finish()
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a listener; the subject owns it from here on
    pub fn add(&mut self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = ListenerId::next();
        self.entries.push((id, Rc::new(listener)));
        id
    }

    /// Remove a previously registered listener. Removing an unknown id is
    /// a no-op.
    pub fn remove(&mut self, id: ListenerId) {
        self.entries.retain(|(lid, _)| *lid != id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Notify all listeners in registration order.
    ///
    /// Callbacks are cloned out before invocation so a listener may
    /// register or remove listeners on the same subject without
    /// invalidating the iteration.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = self.entries.iter().map(|(_, cb)| cb.clone()).collect();
        for cb in snapshot {
            cb(event);
        }
    }
}
