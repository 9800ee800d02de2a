//! `Observable<T>`: a mutable value slot with a stable key.
//!
//! Every change is announced through the owning [`Registry`] as a post for
//! the cell's key, carrying the previous value as [`Payload::Previous`].
//! Cells know nothing about their subscribers.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::binding::BindingState;
use crate::key::Key;
use crate::registry::{Payload, Registry};

// ---------------------------------------------------------------------------
// NotifyPolicy
// ---------------------------------------------------------------------------

/// When a write to an [`Observable`] posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyPolicy {
    /// Post only if the new value differs from the current one.
    OnChange,
    /// Post on every write, equal or not.
    Always,
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

struct Slot<T: 'static> {
    value: RefCell<T>,
    key: Key,
    registry: Registry,
    /// Present exactly when the policy is [`NotifyPolicy::OnChange`].
    eq: Option<fn(&T, &T) -> bool>,
    binding: RefCell<Weak<BindingState<T>>>,
}

// ---------------------------------------------------------------------------
// Observable
// ---------------------------------------------------------------------------

/// A shared, keyed value cell.
///
/// Cloning an `Observable` yields another handle to the same slot.
///
/// # Panics
///
/// Writing to a cell from inside its own [`with`](Self::with) closure panics
/// (`RefCell` borrow rules). Writing from a subscriber callback is fine: the
/// registry holds no borrow while callbacks run.
pub struct Observable<T: 'static> {
    slot: Rc<Slot<T>>,
}

impl<T: 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("key", &self.slot.key)
            .field("value", &*self.slot.value.borrow())
            .field("policy", &self.policy())
            .finish()
    }
}

impl<T: PartialEq + 'static> Observable<T> {
    /// Create an equality-aware cell with a random key.
    pub fn new(registry: &Registry, value: T) -> Self {
        Self::with_key(registry, registry.new_key(), value)
    }

    /// Create an equality-aware cell under an explicit (possibly shared) key.
    pub fn with_key(registry: &Registry, key: Key, value: T) -> Self {
        let eq: fn(&T, &T) -> bool = <T as PartialEq>::eq;
        Self::build(registry, key, value, Some(eq))
    }

    /// Create a cell with an explicit notification policy.
    pub fn with_policy(registry: &Registry, value: T, policy: NotifyPolicy) -> Self {
        match policy {
            NotifyPolicy::OnChange => Self::new(registry, value),
            NotifyPolicy::Always => Self::always(registry, value),
        }
    }
}

impl<T: 'static> Observable<T> {
    /// Create a cell that posts on every write. Works for any `T`, including
    /// types without equality.
    pub fn always(registry: &Registry, value: T) -> Self {
        Self::always_with_key(registry, registry.new_key(), value)
    }

    /// [`always`](Self::always) under an explicit key.
    pub fn always_with_key(registry: &Registry, key: Key, value: T) -> Self {
        Self::build(registry, key, value, None)
    }

    fn build(registry: &Registry, key: Key, value: T, eq: Option<fn(&T, &T) -> bool>) -> Self {
        Self {
            slot: Rc::new(Slot {
                value: RefCell::new(value),
                key,
                registry: registry.clone(),
                eq,
                binding: RefCell::new(Weak::new()),
            }),
        }
    }

    /// The key posted on every change.
    pub fn key(&self) -> &Key {
        &self.slot.key
    }

    /// The registry this cell posts to.
    pub fn registry(&self) -> &Registry {
        &self.slot.registry
    }

    pub fn policy(&self) -> NotifyPolicy {
        match self.slot.eq {
            Some(_) => NotifyPolicy::OnChange,
            None => NotifyPolicy::Always,
        }
    }

    /// Access the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.slot.value.borrow())
    }

    /// A clone of the current value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.slot.value.borrow().clone()
    }

    /// Store `value` and post, subject to the policy.
    ///
    /// Returns whether the post was delivered. It is `false` when the policy
    /// skipped the post and also when the registry refused it for nesting too
    /// deeply; in that case the value stays stored but nobody is notified.
    pub fn set(&self, value: T) -> bool {
        self.store(value).0
    }

    /// Store `value` unconditionally and return the old value. Posts subject
    /// to the policy.
    pub fn replace(&self, value: T) -> T {
        self.store(value).1
    }

    fn store(&self, value: T) -> (bool, T) {
        let (changed, previous) = {
            let mut current = self.slot.value.borrow_mut();
            let changed = self.slot.eq.map_or(true, |eq| !eq(&*current, &value));
            (changed, std::mem::replace(&mut *current, value))
        };
        let posted = changed && self.post_previous(&previous);
        (posted, previous)
    }

    /// Post `previous` for this cell's key. A refused post is logged and
    /// reported as `false`.
    fn post_previous(&self, previous: &T) -> bool {
        match self
            .slot
            .registry
            .try_post(&self.slot.key, Payload::Previous(previous))
        {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(message = "observable.post.refused", key = %self.slot.key, %err);
                false
            }
        }
    }

    /// Mutate the value in place and post, subject to the policy.
    ///
    /// Returns whether the post was delivered, as for [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool
    where
        T: Clone,
    {
        let (changed, previous) = {
            let mut current = self.slot.value.borrow_mut();
            let previous = current.clone();
            f(&mut *current);
            let changed = self.slot.eq.map_or(true, |eq| !eq(&previous, &*current));
            (changed, previous)
        };
        changed && self.post_previous(&previous)
    }

    /// Post a bare signal for this cell's key without touching the value.
    pub fn notify(&self) -> usize {
        self.slot.registry.post(&self.slot.key, Payload::Signal)
    }

    /// Whether two handles refer to the same slot.
    pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    pub(crate) fn cached_binding(&self) -> Option<Rc<BindingState<T>>> {
        self.slot.binding.borrow().upgrade()
    }

    pub(crate) fn cache_binding(&self, state: &Rc<BindingState<T>>) {
        *self.slot.binding.borrow_mut() = Rc::downgrade(state);
    }
}

impl Registry {
    /// Shorthand for [`Observable::new`] on this registry.
    pub fn observable<T: PartialEq + 'static>(&self, value: T) -> Observable<T> {
        Observable::new(self, value)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Probe;
    use pretty_assertions::assert_eq;

    #[test]
    fn get_set_basic() {
        let registry = Registry::new();
        let name = Observable::new(&registry, String::from("aname"));
        assert_eq!(name.get(), "aname");
        assert!(name.set(String::from("bob")));
        assert_eq!(name.get(), "bob");
    }

    #[test]
    fn generated_key_follows_registry_config() {
        let registry = Registry::new();
        let a = registry.observable(1);
        let b = registry.observable(1);
        assert_eq!(a.key().as_str().len(), crate::key::DEFAULT_KEY_LENGTH);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn set_posts_previous_value() {
        let registry = Registry::new();
        let name = Observable::new(&registry, String::from("aname"));
        let probe = Probe::<String>::new(&registry, [name.key().clone()]);

        name.set(String::from("bob"));
        assert_eq!(probe.count(), 1);
        assert_eq!(probe.previous_values(), vec![Some(String::from("aname"))]);
    }

    #[test]
    fn equal_write_does_not_post() {
        let registry = Registry::new();
        let cell = Observable::new(&registry, 5);
        let probe = Probe::<i32>::new(&registry, [cell.key().clone()]);
        assert!(!cell.set(5));
        assert_eq!(probe.count(), 0);
        assert_eq!(cell.policy(), NotifyPolicy::OnChange);
    }

    #[test]
    fn always_policy_posts_on_equal_write() {
        let registry = Registry::new();
        let cell = Observable::with_policy(&registry, 5, NotifyPolicy::Always);
        let probe = Probe::<i32>::new(&registry, [cell.key().clone()]);
        assert!(cell.set(5));
        assert!(cell.set(5));
        assert_eq!(probe.count(), 2);
        assert_eq!(cell.policy(), NotifyPolicy::Always);
    }

    #[test]
    fn cells_without_equality_always_post() {
        struct Opaque(u8);
        let registry = Registry::new();
        let cell = Observable::always(&registry, Opaque(1));
        let probe = Probe::<()>::new(&registry, [cell.key().clone()]);
        cell.set(Opaque(1));
        assert_eq!(probe.count(), 1);
        assert_eq!(cell.with(|v| v.0), 1);
    }

    #[test]
    fn replace_returns_old_value() {
        let registry = Registry::new();
        let cell = Observable::new(&registry, 'a');
        assert_eq!(cell.replace('b'), 'a');
        assert_eq!(cell.replace('b'), 'b');
        assert_eq!(cell.get(), 'b');
    }

    #[test]
    fn update_posts_only_on_change() {
        let registry = Registry::new();
        let cell = Observable::new(&registry, vec![1, 2]);
        let probe = Probe::<Vec<i32>>::new(&registry, [cell.key().clone()]);

        assert!(cell.update(|v| v.push(3)));
        assert!(!cell.update(|v| v.sort()));
        assert_eq!(cell.get(), vec![1, 2, 3]);
        assert_eq!(probe.previous_values(), vec![Some(vec![1, 2])]);
    }

    #[test]
    fn notify_sends_bare_signal() {
        let registry = Registry::new();
        let cell = Observable::new(&registry, 0);
        let probe = Probe::<i32>::new(&registry, [cell.key().clone()]);
        assert_eq!(cell.notify(), 1);
        assert_eq!(probe.previous_values(), vec![None]);
    }

    #[test]
    fn shared_key_fires_together() {
        let registry = Registry::new();
        let key = Key::new("shared");
        let a = Observable::with_key(&registry, key.clone(), 0);
        let b = Observable::with_key(&registry, key.clone(), String::new());
        let probe = Probe::<()>::new(&registry, [key]);

        a.set(1);
        b.set(String::from("x"));
        assert_eq!(probe.count(), 2);
    }

    #[test]
    fn clone_shares_slot() {
        let registry = Registry::new();
        let a = Observable::new(&registry, 1);
        let b = a.clone();
        b.set(2);
        assert_eq!(a.get(), 2);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn write_from_callback_is_allowed() {
        let registry = Registry::new();
        let source = Observable::new(&registry, 1);
        let mirror = Observable::new(&registry, 0);
        let mirror_c = mirror.clone();
        let source_c = source.clone();
        let _sub = registry.subscribe([source.key().clone()], move |_| {
            mirror_c.set(source_c.get() * 10);
        });

        source.set(4);
        assert_eq!(mirror.get(), 40);
    }

    #[test]
    fn refused_nested_post_reports_false() {
        use crate::config::RegistryConfig;
        use std::cell::Cell;
        use std::rc::Rc;

        let registry = Registry::with_config(RegistryConfig::new().with_max_post_depth(1)).unwrap();
        let a = registry.observable(0);
        let b = registry.observable(0);
        let b_probe = Probe::<i32>::new(&registry, [b.key().clone()]);
        let returned = Rc::new(Cell::new(None));

        let b_c = b.clone();
        let returned_c = Rc::clone(&returned);
        let _sub = registry.subscribe([a.key().clone()], move |_| {
            returned_c.set(Some(b_c.set(5)));
        });

        assert!(a.set(1));
        assert_eq!(returned.get(), Some(false));
        // Stored, but nobody heard about it.
        assert_eq!(b.get(), 5);
        assert_eq!(b_probe.count(), 0);
    }

    #[test]
    fn refused_nested_update_reports_false() {
        use crate::config::RegistryConfig;
        use std::cell::Cell;
        use std::rc::Rc;

        let registry = Registry::with_config(RegistryConfig::new().with_max_post_depth(1)).unwrap();
        let a = registry.observable(0);
        let b = registry.observable(vec![1]);
        let returned = Rc::new(Cell::new(None));

        let b_c = b.clone();
        let returned_c = Rc::clone(&returned);
        let _sub = registry.subscribe([a.key().clone()], move |_| {
            returned_c.set(Some(b_c.update(|v| v.push(2))));
        });

        a.set(1);
        assert_eq!(returned.get(), Some(false));
        assert_eq!(b.get(), vec![1, 2]);
        assert!(b.update(|v| v.push(3)));
    }

    #[test]
    fn debug_format() {
        let registry = Registry::new();
        let cell = Observable::with_key(&registry, Key::new("k"), 42);
        let dbg = format!("{cell:?}");
        assert!(dbg.contains("Observable"));
        assert!(dbg.contains("42"));
        assert!(dbg.contains("OnChange"));
    }
}
