//! Probe: a counting mock subscriber.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::key::Key;
use crate::registry::{Registry, SubscriberId};

/// One post seen by a [`Probe`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub key: Key,
    /// The previous value, when the post carried one of type `T`.
    pub previous: Option<T>,
}

struct Log<T> {
    records: RefCell<Vec<Record<T>>>,
}

/// Records every post for its keys.
///
/// The probe is a weakly-held subscriber like any other: dropping it leaves a
/// dead entry that the registry prunes on its next `post` or `add`.
pub struct Probe<T: 'static> {
    log: Rc<Log<T>>,
    id: SubscriberId,
}

impl<T: Clone + 'static> Probe<T> {
    /// Subscribe a new probe to `keys` on `registry`.
    pub fn new(registry: &Registry, keys: impl IntoIterator<Item = Key>) -> Self {
        let log = Rc::new(Log {
            records: RefCell::new(Vec::new()),
        });
        let weak = Rc::downgrade(&log);
        let id = registry.add(&log, keys, move |note| {
            if let Some(log) = weak.upgrade() {
                log.records.borrow_mut().push(Record {
                    key: note.key.clone(),
                    previous: note.previous::<T>().cloned(),
                });
            }
        });
        Self { log, id }
    }

    /// Number of posts received.
    pub fn count(&self) -> usize {
        self.log.records.borrow().len()
    }

    /// Every record, oldest first.
    pub fn records(&self) -> Vec<Record<T>> {
        self.log.records.borrow().clone()
    }

    /// The previous values carried by each post, oldest first.
    pub fn previous_values(&self) -> Vec<Option<T>> {
        self.log
            .records
            .borrow()
            .iter()
            .map(|r| r.previous.clone())
            .collect()
    }

    /// The posted keys, oldest first.
    pub fn keys(&self) -> Vec<Key> {
        self.log.records.borrow().iter().map(|r| r.key.clone()).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.log.records.borrow_mut().clear();
    }

    /// The probe's registry handle.
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl<T: 'static> fmt::Debug for Probe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("id", &self.id)
            .field("count", &self.log.records.borrow().len())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Payload;

    #[test]
    fn probe_counts_posts_for_its_keys() {
        let registry = Registry::new();
        let probe = Probe::<i32>::new(&registry, [Key::new("a"), Key::new("b")]);
        registry.post(&Key::new("a"), Payload::Previous(&1_i32));
        registry.post(&Key::new("c"), Payload::Signal);
        registry.post(&Key::new("b"), Payload::Signal);

        assert_eq!(probe.count(), 2);
        assert_eq!(probe.keys(), vec![Key::new("a"), Key::new("b")]);
        assert_eq!(probe.previous_values(), vec![Some(1), None]);
    }

    #[test]
    fn clear_resets_log() {
        let registry = Registry::new();
        let probe = Probe::<()>::new(&registry, [Key::new("a")]);
        registry.post(&Key::new("a"), Payload::Signal);
        probe.clear();
        assert_eq!(probe.count(), 0);
        assert!(probe.records().is_empty());
    }

    #[test]
    fn dropped_probe_is_pruned() {
        let registry = Registry::new();
        let probe = Probe::<()>::new(&registry, [Key::new("a")]);
        let id = probe.id();
        drop(probe);
        assert!(registry.contains(id));
        registry.post(&Key::new("a"), Payload::Signal);
        assert!(!registry.contains(id));
    }
}
