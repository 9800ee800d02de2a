//! `ViewNode<V>`: a render fragment invalidated only by the keys it observes.
//!
//! A node registers itself with the [`Registry`] for a set of keys. A post for
//! any of them flips the node's dirty flag, runs its change callbacks and
//! notifies its host. The host later calls [`ViewNode::render`], which reads
//! the cells live (nothing is captured at subscribe time) and returns the
//! node to `Idle`.
//!
//! ```text
//!  Idle ──post──▶ Dirty ──render()──▶ Idle
//!    │                                  │
//!    └───────detach() / drop────────────┴──▶ Detached
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::invalidate::{Invalidate, NodeId};
use super::sources::Sources;
use crate::key::Key;
use crate::observable::Observable;
use crate::registry::{Notification, Registry, SubscriberId};

type ChangeCallback = Rc<dyn Fn(&Notification<'_>)>;
type Predicate = Rc<dyn Fn() -> bool>;

// ---------------------------------------------------------------------------
// NodeState
// ---------------------------------------------------------------------------

/// Where a node is in its invalidation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Registered and up to date.
    Idle,
    /// A key fired since the last render.
    Dirty,
    /// No longer registered with the registry.
    Detached,
}

// ---------------------------------------------------------------------------
// NodeInner
// ---------------------------------------------------------------------------

struct NodeInner<V: 'static> {
    id: NodeId,
    registry: Registry,
    keys: RefCell<Vec<Key>>,
    dirty: Cell<bool>,
    invalidations: Cell<u64>,
    subscription: Cell<Option<SubscriberId>>,
    render: Box<dyn Fn() -> V>,
    predicate: RefCell<Option<Predicate>>,
    on_change: RefCell<Vec<ChangeCallback>>,
    host: RefCell<Option<Rc<dyn Invalidate>>>,
}

impl<V: 'static> NodeInner<V> {
    /// Registry callback for every observed key.
    fn receive(&self, note: &Notification<'_>) {
        self.dirty.set(true);
        self.invalidations.set(self.invalidations.get() + 1);

        // Snapshots: callbacks may add callbacks or swap the host.
        let callbacks: Vec<ChangeCallback> = self.on_change.borrow().clone();
        for callback in &callbacks {
            callback(note);
        }
        let host = self.host.borrow().clone();
        if let Some(host) = host {
            host.invalidate(self.id);
        }
    }

    fn detach(&self) -> bool {
        match self.subscription.take() {
            Some(id) => self.registry.unsubscribe(id),
            None => false,
        }
    }
}

impl<V: 'static> Drop for NodeInner<V> {
    fn drop(&mut self) {
        self.detach();
    }
}

// ---------------------------------------------------------------------------
// ViewNode
// ---------------------------------------------------------------------------

/// A subscribing view fragment producing `V` when rendered.
///
/// Cloning shares the node. The registration lives until [`detach`] is called
/// or the last clone is dropped.
///
/// [`detach`]: ViewNode::detach
pub struct ViewNode<V: 'static> {
    inner: Rc<NodeInner<V>>,
}

impl<V: 'static> Clone for ViewNode<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: 'static> fmt::Debug for ViewNode<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewNode")
            .field("id", &self.inner.id)
            .field("keys", &*self.inner.keys.borrow())
            .field("state", &self.state())
            .field("invalidations", &self.inner.invalidations.get())
            .finish_non_exhaustive()
    }
}

impl<V: 'static> ViewNode<V> {
    /// Create a node observing raw `keys`.
    ///
    /// `render` should read whatever cells it depends on; it runs on every
    /// [`render`](Self::render) call.
    pub fn new(
        registry: &Registry,
        keys: impl IntoIterator<Item = Key>,
        render: impl Fn() -> V + 'static,
    ) -> Self {
        let mut unique: Vec<Key> = Vec::new();
        for key in keys {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        let node = Self {
            inner: Rc::new(NodeInner {
                id: NodeId::next(),
                registry: registry.clone(),
                keys: RefCell::new(unique),
                dirty: Cell::new(false),
                invalidations: Cell::new(0),
                subscription: Cell::new(None),
                render: Box::new(render),
                predicate: RefCell::new(None),
                on_change: RefCell::new(Vec::new()),
                host: RefCell::new(None),
            }),
        };
        node.register();
        node
    }

    /// Create a node from typed sources; `render` receives their live values.
    ///
    /// # Panics
    ///
    /// Panics if the cells post to different registries.
    ///
    /// ```ignore
    /// let node = ViewNode::observe((first.clone(), last.clone()), |(first, last)| {
    ///     format!("{first} {last}")
    /// });
    /// ```
    pub fn observe<S: Sources>(sources: S, render: impl Fn(S::Values) -> V + 'static) -> Self {
        assert!(
            sources.same_registry(),
            "all observed cells must share one registry"
        );
        let registry = sources.registry().clone();
        let keys = sources.keys();
        Self::new(&registry, keys, move || render(sources.values()))
    }

    /// (Re-)install the registration for the current key set. Any previous
    /// entry of this node is replaced in one step.
    fn register(&self) {
        let weak = Rc::downgrade(&self.inner);
        let keys = self.inner.keys.borrow().clone();
        let id = self.inner.registry.replace(&self.inner, keys, move |note| {
            if let Some(inner) = weak.upgrade() {
                inner.receive(note);
            }
        });
        self.inner.subscription.set(Some(id));
    }

    // -- combinators ---------------------------------------------------------

    /// Also observe `cell`. Combining an already observed cell is a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `cell` posts to a different registry than this node.
    pub fn combine<T: 'static>(&self, cell: &Observable<T>) -> &Self {
        assert!(
            cell.registry().ptr_eq(&self.inner.registry),
            "cell {} posts to a different registry than view node {:?}",
            cell.key(),
            self.inner.id
        );
        self.combine_key(cell.key().clone())
    }

    /// Also observe a raw key.
    pub fn combine_key(&self, key: Key) -> &Self {
        if self.inner.keys.borrow().contains(&key) {
            return self;
        }
        self.inner.keys.borrow_mut().push(key);
        if self.inner.subscription.get().is_some() {
            self.register();
        }
        self
    }

    /// Run `callback` with the post's notification every time an observed key
    /// fires, in addition to invalidating the node.
    pub fn on_change(self, callback: impl Fn(&Notification<'_>) + 'static) -> Self {
        self.inner.on_change.borrow_mut().push(Rc::new(callback));
        self
    }

    /// Only produce output while `predicate` holds. Evaluated on every render.
    pub fn build_if(self, predicate: impl Fn() -> bool + 'static) -> Self {
        *self.inner.predicate.borrow_mut() = Some(Rc::new(predicate));
        self
    }

    /// Tell `host` whenever this node becomes dirty.
    pub fn with_host(self, host: Rc<dyn Invalidate>) -> Self {
        *self.inner.host.borrow_mut() = Some(host);
        self
    }

    // -- rendering -----------------------------------------------------------

    /// Produce the node's output from the cells' current values.
    ///
    /// Returns `None` when the [`build_if`](Self::build_if) predicate is
    /// false. Either way the node is clean afterwards, unless rendering itself
    /// caused one of its keys to fire.
    pub fn render(&self) -> Option<V> {
        self.inner.dirty.set(false);
        let predicate = self.inner.predicate.borrow().clone();
        if let Some(predicate) = predicate {
            if !predicate() {
                return None;
            }
        }
        Some((self.inner.render)())
    }

    /// Render only if dirty. `None` means the node was already clean.
    pub fn render_if_dirty(&self) -> Option<Option<V>> {
        if self.is_dirty() {
            Some(self.render())
        } else {
            None
        }
    }

    // -- lifecycle -----------------------------------------------------------

    /// Unregister now. Returns whether a registration was removed.
    pub fn detach(&self) -> bool {
        self.inner.detach()
    }

    pub fn state(&self) -> NodeState {
        match self.inner.subscription.get() {
            Some(id) if self.inner.registry.contains(id) => {
                if self.inner.dirty.get() {
                    NodeState::Dirty
                } else {
                    NodeState::Idle
                }
            }
            _ => NodeState::Detached,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == NodeState::Dirty
    }

    /// Number of posts received over the node's lifetime.
    pub fn invalidations(&self) -> u64 {
        self.inner.invalidations.get()
    }

    /// Observed keys in registration order.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.keys.borrow().clone()
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// The node's current registry handle, if registered.
    pub fn subscriber_id(&self) -> Option<SubscriberId> {
        self.inner.subscription.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }
}

// ===========================================================================
// Tests
// ===========================================================================
