//! Pilot: a headless host for view nodes.
//!
//! The `Pilot` plays the part of a UI framework. Mounted nodes report to its
//! [`InvalidationQueue`]; [`Pilot::frame`] re-renders only the nodes that were
//! invalidated since the previous frame and keeps the last output of every
//! other node, so tests can assert exactly which fragments re-rendered.

use std::collections::HashMap;
use std::rc::Rc;

use crate::registry::Registry;
use crate::view::{InvalidationQueue, NodeId, ViewNode};

// ---------------------------------------------------------------------------
// Pilot
// ---------------------------------------------------------------------------

struct Mounted {
    node: ViewNode<String>,
    output: Option<String>,
    renders: u64,
}

/// A headless host for testing.
///
/// # Examples
///
/// ```ignore
/// use mixx::testing::Pilot;
/// use mixx::view::ViewNode;
///
/// let mut pilot = Pilot::new();
/// let name = pilot.registry().observable(String::from("aname"));
/// let label = pilot.mount(ViewNode::observe(name.clone(), |n| format!("Name: {n}")));
/// name.set(String::from("bob"));
/// assert_eq!(pilot.frame(), 1);
/// assert_eq!(pilot.output(label), Some("Name: bob"));
/// ```
pub struct Pilot {
    registry: Registry,
    queue: Rc<InvalidationQueue>,
    mounted: Vec<Mounted>,
    index: HashMap<NodeId, usize>,
}

impl Pilot {
    /// Create a pilot with a fresh registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a pilot hosting nodes of an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            queue: Rc::new(InvalidationQueue::new()),
            mounted: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Attach `node` to this host and render it once.
    pub fn mount(&mut self, node: ViewNode<String>) -> NodeId {
        let node = node.with_host(self.queue.clone());
        let id = node.id();
        let output = node.render();
        self.index.insert(id, self.mounted.len());
        self.mounted.push(Mounted {
            node,
            output,
            renders: 1,
        });
        id
    }

    /// Detach and forget a node. Returns whether it was mounted.
    pub fn unmount(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.index.remove(&id) else {
            return false;
        };
        let mounted = self.mounted.remove(pos);
        mounted.node.detach();
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        true
    }

    // ── Frames ──────────────────────────────────────────────────────

    /// Re-render every invalidated node. Returns how many re-rendered.
    pub fn frame(&mut self) -> usize {
        let mut rendered = 0;
        for id in self.queue.drain() {
            let Some(&pos) = self.index.get(&id) else {
                continue;
            };
            let mounted = &mut self.mounted[pos];
            if let Some(output) = mounted.node.render_if_dirty() {
                mounted.output = output;
                mounted.renders += 1;
                rendered += 1;
            }
        }
        rendered
    }

    /// Whether any node is waiting to re-render.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    // ── Inspection ──────────────────────────────────────────────────

    /// The last output of a node, `None` if unknown or gated off.
    pub fn output(&self, id: NodeId) -> Option<&str> {
        let pos = *self.index.get(&id)?;
        self.mounted[pos].output.as_deref()
    }

    /// How many times a node has rendered (including the mount render).
    pub fn render_count(&self, id: NodeId) -> u64 {
        self.index
            .get(&id)
            .map_or(0, |&pos| self.mounted[pos].renders)
    }

    /// The node behind an id.
    pub fn node(&self, id: NodeId) -> Option<&ViewNode<String>> {
        self.index.get(&id).map(|&pos| &self.mounted[pos].node)
    }

    /// All visible outputs in mount order, one per line.
    pub fn screen(&self) -> String {
        self.mounted
            .iter()
            .filter_map(|m| m.output.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of mounted nodes.
    pub fn mounted_count(&self) -> usize {
        self.mounted.len()
    }
}

impl Default for Pilot {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_renders_once() {
        let mut pilot = Pilot::new();
        let name = pilot.registry().observable(String::from("aname"));
        let id = pilot.mount(ViewNode::observe(name, |n| n));
        assert_eq!(pilot.output(id), Some("aname"));
        assert_eq!(pilot.render_count(id), 1);
        assert!(!pilot.has_pending());
    }

    #[test]
    fn frame_rerenders_only_invalidated_nodes() {
        let mut pilot = Pilot::new();
        let a = pilot.registry().observable(1);
        let b = pilot.registry().observable(2);
        let na = pilot.mount(ViewNode::observe(a.clone(), |a| format!("a={a}")));
        let nb = pilot.mount(ViewNode::observe(b.clone(), |b| format!("b={b}")));

        a.set(10);
        a.set(11);
        assert!(pilot.has_pending());
        assert_eq!(pilot.frame(), 1);
        assert_eq!(pilot.render_count(na), 2);
        assert_eq!(pilot.render_count(nb), 1);
        assert_eq!(pilot.screen(), "a=11\nb=2");
        assert_eq!(pilot.frame(), 0);
    }

    #[test]
    fn unmount_detaches() {
        let mut pilot = Pilot::new();
        let a = pilot.registry().observable(1);
        let first = pilot.mount(ViewNode::observe(a.clone(), |a| a.to_string()));
        let second = pilot.mount(ViewNode::observe(a.clone(), |a| format!("#{a}")));
        assert!(pilot.unmount(first));
        assert!(!pilot.unmount(first));
        assert_eq!(pilot.mounted_count(), 1);

        a.set(2);
        pilot.frame();
        assert_eq!(pilot.output(second), Some("#2"));
        assert_eq!(pilot.registry().len(), 1);
    }

    #[test]
    fn unknown_node() {
        let pilot = Pilot::new();
        let stray = ViewNode::new(pilot.registry(), [], || String::new());
        assert_eq!(pilot.output(stray.id()), None);
        assert_eq!(pilot.render_count(stray.id()), 0);
        assert!(pilot.node(stray.id()).is_none());
    }
}
