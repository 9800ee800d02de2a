//! The observation registry: keyed, weakly-held subscriber callbacks.
//!
//! A [`Registry`] maps [`Key`]s to subscriber entries stored in a slotmap
//! arena. Posting a key prunes entries whose owner has been dropped, takes a
//! snapshot of the remaining callbacks for that key, releases the borrow and
//! then invokes each callback in registration order. Callbacks are therefore
//! free to post, subscribe or unsubscribe while they run.
//!
//! Single-threaded by construction (`Rc`/`RefCell`). Writes coming from other
//! threads go through [`crate::observable::remote`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::SlotMap;

use super::notification::{Notification, Payload};
use super::subscription::{SubscriberId, Subscription};
use crate::config::{ConfigError, RegistryConfig};
use crate::key::Key;

/// A subscriber callback. Shared so a post can snapshot it cheaply.
pub type Callback = Rc<dyn Fn(&Notification<'_>)>;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Errors reported by [`Registry::try_post`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("post of key {key} refused at nesting depth {depth} (limit {limit})")]
    RecursionLimit { key: Key, depth: usize, limit: usize },
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct Entry {
    /// `None` for handle-owned entries (see [`Registry::subscribe`]); their
    /// lifetime ends only through explicit unsubscription.
    owner: Option<Weak<dyn Any>>,
    keys: Vec<Key>,
    callback: Callback,
}

impl Entry {
    fn is_alive(&self) -> bool {
        self.owner.as_ref().map_or(true, |w| w.strong_count() > 0)
    }

    fn is_owned_by(&self, addr: *const ()) -> bool {
        self.owner
            .as_ref()
            .is_some_and(|w| std::ptr::addr_eq(w.as_ptr(), addr))
    }
}

#[derive(Default)]
struct State {
    entries: SlotMap<SubscriberId, Entry>,
    by_key: HashMap<Key, Vec<SubscriberId>>,
    depth: usize,
}

impl State {
    fn insert(&mut self, entry: Entry) -> SubscriberId {
        let keys = entry.keys.clone();
        let id = self.entries.insert(entry);
        for key in keys {
            self.by_key.entry(key).or_default().push(id);
        }
        id
    }

    fn remove(&mut self, id: SubscriberId) -> Option<Entry> {
        let entry = self.entries.remove(id)?;
        for key in &entry.keys {
            if let Some(ids) = self.by_key.get_mut(key) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        Some(entry)
    }

    fn remove_owned_by(&mut self, addr: *const ()) -> Vec<Entry> {
        let ids: Vec<SubscriberId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_owned_by(addr))
            .map(|(id, _)| id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Remove every entry whose owner is gone. The removed entries are handed
    /// back so the caller can drop them after releasing the borrow.
    fn prune(&mut self) -> Vec<Entry> {
        let dead: Vec<SubscriberId> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.is_alive())
            .map(|(id, _)| id)
            .collect();
        dead.into_iter().filter_map(|id| self.remove(id)).collect()
    }
}

/// Shared interior of a [`Registry`] handle.
pub(crate) struct Shared {
    config: RegistryConfig,
    state: RefCell<State>,
}

impl Shared {
    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.state.borrow().entries.contains_key(id)
    }

    pub(crate) fn unsubscribe(&self, id: SubscriberId) -> bool {
        // Teardown can run from a Drop impl; never panic on a busy borrow.
        // A skipped entry is still swept by the next prune if its owner died.
        let removed = match self.state.try_borrow_mut() {
            Ok(mut state) => state.remove(id),
            Err(_) => None,
        };
        let found = removed.is_some();
        if found {
            tracing::debug!(
                message = "registry.unsubscribe",
                label = self.config.label.as_deref(),
                ?id
            );
        }
        drop(removed);
        found
    }
}

/// Decrements the nesting depth when a post finishes, even on unwind.
struct DepthGuard<'a>(&'a Shared);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.state.try_borrow_mut() {
            state.depth = state.depth.saturating_sub(1);
        }
    }
}

fn dedup_keys(keys: impl IntoIterator<Item = Key>) -> Vec<Key> {
    let mut out: Vec<Key> = Vec::new();
    for key in keys {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Keyed observation registry.
///
/// Cloning a `Registry` produces another handle to the same subscriber table.
/// The registry never holds a strong reference to a subscriber owner.
#[derive(Clone)]
pub struct Registry {
    shared: Rc<Shared>,
}

impl Registry {
    /// Create an empty registry with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(RegistryConfig::default())
    }

    /// Create an empty registry, validating `config` first.
    pub fn with_config(config: RegistryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: RegistryConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                config,
                state: RefCell::new(State::default()),
            }),
        }
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// Generate a fresh random key using the configured key length.
    pub fn new_key(&self) -> Key {
        Key::random_with_length(self.shared.config.key_length)
    }

    /// Whether two handles refer to the same registry.
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    fn label(&self) -> Option<&str> {
        self.shared.config.label.as_deref()
    }

    // -- registration --------------------------------------------------------

    /// Register `callback` for each key in `keys` on behalf of `subscriber`.
    ///
    /// The subscriber is held weakly: once its last `Rc` is dropped the entry
    /// is pruned at the next `post` or `add`. Duplicate keys are collapsed, so
    /// the callback runs at most once per post.
    pub fn add<S: Any>(
        &self,
        subscriber: &Rc<S>,
        keys: impl IntoIterator<Item = Key>,
        callback: impl Fn(&Notification<'_>) + 'static,
    ) -> SubscriberId {
        let owner: Weak<dyn Any> = Rc::downgrade(subscriber) as Weak<dyn Any>;
        self.insert(Some(owner), dedup_keys(keys), Rc::new(callback), "registry.add")
    }

    /// Register a callback owned by the returned [`Subscription`] guard rather
    /// than by a subscriber object.
    pub fn subscribe(
        &self,
        keys: impl IntoIterator<Item = Key>,
        callback: impl Fn(&Notification<'_>) + 'static,
    ) -> Subscription {
        let id = self.insert(None, dedup_keys(keys), Rc::new(callback), "registry.subscribe");
        Subscription::new(Rc::downgrade(&self.shared), id)
    }

    fn insert(
        &self,
        owner: Option<Weak<dyn Any>>,
        keys: Vec<Key>,
        callback: Callback,
        event: &'static str,
    ) -> SubscriberId {
        let key_count = keys.len();
        let (id, pruned) = {
            let mut state = self.shared.state.borrow_mut();
            let pruned = state.prune();
            let id = state.insert(Entry {
                owner,
                keys,
                callback,
            });
            (id, pruned)
        };
        tracing::debug!(
            message = event,
            label = self.label(),
            ?id,
            keys = key_count,
            pruned = pruned.len()
        );
        id
    }

    /// Drop every entry registered on behalf of `subscriber`.
    ///
    /// Returns the number of entries removed.
    pub fn remove<S: Any>(&self, subscriber: &Rc<S>) -> usize {
        let addr = Rc::as_ptr(subscriber) as *const ();
        let removed = self.shared.state.borrow_mut().remove_owned_by(addr);
        let count = removed.len();
        drop(removed);
        tracing::debug!(message = "registry.remove", label = self.label(), removed = count);
        count
    }

    /// Atomically replace every entry of `subscriber` with a single new entry
    /// for `keys`. No post can observe the intermediate state.
    pub fn replace<S: Any>(
        &self,
        subscriber: &Rc<S>,
        keys: impl IntoIterator<Item = Key>,
        callback: impl Fn(&Notification<'_>) + 'static,
    ) -> SubscriberId {
        let addr = Rc::as_ptr(subscriber) as *const ();
        let owner: Weak<dyn Any> = Rc::downgrade(subscriber) as Weak<dyn Any>;
        let keys = dedup_keys(keys);
        let key_count = keys.len();
        let (id, removed) = {
            let mut state = self.shared.state.borrow_mut();
            let mut removed = state.prune();
            removed.extend(state.remove_owned_by(addr));
            let id = state.insert(Entry {
                owner: Some(owner),
                keys,
                callback: Rc::new(callback),
            });
            (id, removed)
        };
        tracing::debug!(
            message = "registry.replace",
            label = self.label(),
            ?id,
            keys = key_count,
            removed = removed.len()
        );
        id
    }

    /// Invalidate a single subscriber handle. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.shared.unsubscribe(id)
    }

    // -- posting -------------------------------------------------------------

    /// Deliver a change notification for `key` to every live subscriber.
    ///
    /// Never fails: a post refused by the nesting guard is logged and
    /// delivers nothing. Returns the number of callbacks invoked.
    pub fn post(&self, key: &Key, payload: Payload<'_>) -> usize {
        match self.try_post(key, payload) {
            Ok(delivered) => delivered,
            Err(err) => {
                tracing::warn!(message = "registry.post.refused", label = self.label(), %err);
                0
            }
        }
    }

    /// Like [`post`](Self::post), but reports a refused nested post.
    pub fn try_post(&self, key: &Key, payload: Payload<'_>) -> Result<usize, RegistryError> {
        let limit = self.shared.config.max_post_depth;
        let (snapshot, pruned) = {
            let mut state = self.shared.state.borrow_mut();
            if state.depth >= limit {
                return Err(RegistryError::RecursionLimit {
                    key: key.clone(),
                    depth: state.depth,
                    limit,
                });
            }
            let pruned = state.prune();
            let snapshot: Vec<(SubscriberId, Option<Weak<dyn Any>>, Callback)> = state
                .by_key
                .get(key)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|&id| {
                            state
                                .entries
                                .get(id)
                                .map(|e| (id, e.owner.clone(), Rc::clone(&e.callback)))
                        })
                        .collect()
                })
                .unwrap_or_default();
            state.depth += 1;
            (snapshot, pruned)
        };
        let _depth = DepthGuard(&self.shared);
        if !pruned.is_empty() {
            tracing::debug!(message = "registry.prune", label = self.label(), pruned = pruned.len());
        }
        drop(pruned);

        let note = Notification::new(key, payload);
        let mut delivered = 0;
        for (id, owner, callback) in snapshot {
            // An earlier callback in this post may have removed or dropped it.
            if !self.shared.contains(id) {
                continue;
            }
            let _alive: Option<Rc<dyn Any>> = match owner {
                Some(weak) => match weak.upgrade() {
                    Some(strong) => Some(strong),
                    None => continue,
                },
                None => None,
            };
            callback(&note);
            delivered += 1;
        }
        tracing::trace!(message = "registry.post", label = self.label(), key = %key, delivered);
        Ok(delivered)
    }

    // -- introspection -------------------------------------------------------

    /// Sweep entries whose owner has been dropped. Returns how many went.
    pub fn prune(&self) -> usize {
        let pruned = self.shared.state.borrow_mut().prune();
        pruned.len()
    }

    /// Number of entries, including dead ones not yet pruned.
    pub fn len(&self) -> usize {
        self.shared.state.borrow().entries.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries registered for `key`, including dead ones not yet
    /// pruned.
    pub fn subscriber_count(&self, key: &Key) -> usize {
        self.shared
            .state
            .borrow()
            .by_key
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Every key with at least one entry. Order is unspecified.
    pub fn keys(&self) -> Vec<Key> {
        self.shared.state.borrow().by_key.keys().cloned().collect()
    }

    /// Keys an entry is registered for, in registration order.
    pub fn keys_of(&self, id: SubscriberId) -> Vec<Key> {
        self.shared
            .state
            .borrow()
            .entries
            .get(id)
            .map(|e| e.keys.clone())
            .unwrap_or_default()
    }

    /// Whether `id` is still registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.shared.contains(id)
    }

    /// Current post nesting depth (0 outside any post).
    pub fn depth(&self) -> usize {
        self.shared.state.borrow().depth
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Registry")
            .field("label", &self.shared.config.label)
            .field("entries", &state.entries.len())
            .field("keys", &state.by_key.len())
            .field("depth", &state.depth)
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
