//! Subscriber handles and the RAII [`Subscription`] guard.

use std::fmt;
use std::rc::Weak;

use slotmap::new_key_type;

use super::center::Shared;

new_key_type! {
    /// Handle to one subscriber entry in a [`Registry`](super::Registry).
    pub struct SubscriberId;
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Guard returned by [`Registry::subscribe`](super::Registry::subscribe).
///
/// Dropping the guard unsubscribes the callback. The guard only holds a weak
/// handle to the registry, so it never keeps the registry alive.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    registry: Weak<Shared>,
    id: Option<SubscriberId>,
}

impl Subscription {
    pub(crate) fn new(registry: Weak<Shared>, id: SubscriberId) -> Self {
        Self {
            registry,
            id: Some(id),
        }
    }

    /// The subscriber handle this guard owns.
    pub fn id(&self) -> Option<SubscriberId> {
        self.id
    }

    /// Whether the registry still holds the entry.
    pub fn is_active(&self) -> bool {
        match (self.id, self.registry.upgrade()) {
            (Some(id), Some(shared)) => shared.contains(id),
            _ => false,
        }
    }

    /// Release the guard without unsubscribing. The entry then lives until
    /// [`Registry::unsubscribe`](super::Registry::unsubscribe) is called with
    /// the returned handle.
    pub fn forget(mut self) -> Option<SubscriberId> {
        self.id.take()
    }

    /// Unsubscribe now. Returns whether an entry was removed.
    pub fn cancel(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        let Some(id) = self.id.take() else {
            return false;
        };
        match self.registry.upgrade() {
            Some(shared) => shared.unsubscribe(id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
