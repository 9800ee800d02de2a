//! Host-side render invalidation.
//!
//! A [`ViewNode`](super::ViewNode) flips its own dirty flag when one of its
//! keys fires, then tells its host through [`Invalidate`]. The
//! [`InvalidationQueue`] is a ready-made host that collects invalidated node
//! ids, in first-seen order without duplicates, until the render loop drains
//! them.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Stable identity of a view node, unchanged by `combine`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Invalidate
// ---------------------------------------------------------------------------

/// The host's "this fragment must re-render" primitive.
pub trait Invalidate {
    fn invalidate(&self, node: NodeId);
}

impl<F: Fn(NodeId)> Invalidate for F {
    fn invalidate(&self, node: NodeId) {
        self(node)
    }
}

// ---------------------------------------------------------------------------
// InvalidationQueue
// ---------------------------------------------------------------------------

/// Collects invalidated nodes until the host drains them.
#[derive(Debug, Default)]
pub struct InvalidationQueue {
    pending: RefCell<Vec<NodeId>>,
    seen: RefCell<HashSet<NodeId>>,
}

impl InvalidationQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return pending node ids in the order they were first
    /// invalidated.
    pub fn drain(&self) -> Vec<NodeId> {
        self.seen.borrow_mut().clear();
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    /// Whether `node` is waiting to be re-rendered.
    pub fn contains(&self, node: NodeId) -> bool {
        self.seen.borrow().contains(&node)
    }

    /// Number of distinct pending nodes.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl Invalidate for InvalidationQueue {
    fn invalidate(&self, node: NodeId) {
        if self.seen.borrow_mut().insert(node) {
            self.pending.borrow_mut().push(node);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn node_ids_are_unique() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn new_queue_is_empty() {
        let queue = InvalidationQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn invalidate_deduplicates() {
        let queue = InvalidationQueue::new();
        let a = NodeId::next();
        let b = NodeId::next();
        queue.invalidate(a);
        queue.invalidate(b);
        queue.invalidate(a);
        assert_eq!(queue.pending_count(), 2);
        assert!(queue.contains(a));
        assert_eq!(queue.drain(), vec![a, b]);
    }

    #[test]
    fn drain_resets() {
        let queue = InvalidationQueue::new();
        let a = NodeId::next();
        queue.invalidate(a);
        let _ = queue.drain();
        assert!(queue.is_empty());
        assert!(!queue.contains(a));
        queue.invalidate(a);
        assert_eq!(queue.drain(), vec![a]);
    }

    #[test]
    fn closures_are_hosts() {
        let hits = Cell::new(0);
        let host = |_: NodeId| hits.set(hits.get() + 1);
        host.invalidate(NodeId::next());
        host.invalidate(NodeId::next());
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn debug_format() {
        let id = NodeId(3);
        assert_eq!(format!("{id:?}"), "NodeId(3)");
    }
}
