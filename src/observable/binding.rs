//! Two-way bindings between a cell and an editable control.
//!
//! A [`Binding`] keeps a local copy of the cell's value for the control. Writes
//! from the control land in the local copy first and are forwarded to the
//! cell only when the cell holds something different. The binding is itself a
//! subscriber of the cell's key; when a post arrives it compares the cell's
//! value against the local copy and adopts it only if they differ.
//!
//! The comparison is what breaks the loop: the echo of the binding's own write
//! finds both sides already equal, so nothing is written back and the control
//! keeps its in-progress edit.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::cell::Observable;
use crate::key::Key;
use crate::registry::SubscriberId;

// ---------------------------------------------------------------------------
// BindingState
// ---------------------------------------------------------------------------

pub(crate) struct BindingState<T: 'static> {
    cell: Observable<T>,
    local: RefCell<T>,
    refresh: Cell<bool>,
    refreshes: Cell<u64>,
    id: Cell<Option<SubscriberId>>,
}

impl<T: PartialEq + Clone + 'static> BindingState<T> {
    /// Subscriber callback: adopt the cell's value if it moved away from ours.
    fn reconcile(&self) {
        let incoming = self.cell.with(|current| {
            if *current == *self.local.borrow() {
                None
            } else {
                Some(current.clone())
            }
        });
        if let Some(value) = incoming {
            *self.local.borrow_mut() = value;
            self.refresh.set(true);
            self.refreshes.set(self.refreshes.get() + 1);
        }
    }
}

impl<T: 'static> Drop for BindingState<T> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.cell.registry().unsubscribe(id);
        }
    }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Two-way accessor for an [`Observable`], created by
/// [`Observable::binding`].
///
/// Cloning shares the same binding. The registration lives as long as any
/// clone does.
pub struct Binding<T: 'static> {
    state: Rc<BindingState<T>>,
}

impl<T: 'static> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", self.state.cell.key())
            .field("local", &*self.state.local.borrow())
            .field("refreshes", &self.state.refreshes.get())
            .finish()
    }
}

impl<T: PartialEq + Clone + 'static> Observable<T> {
    /// The two-way binding for this cell.
    ///
    /// While a binding is alive every call returns the same one.
    pub fn binding(&self) -> Binding<T> {
        if let Some(state) = self.cached_binding() {
            return Binding { state };
        }
        let state = Rc::new(BindingState {
            cell: self.clone(),
            local: RefCell::new(self.get()),
            refresh: Cell::new(false),
            refreshes: Cell::new(0),
            id: Cell::new(None),
        });
        let weak = Rc::downgrade(&state);
        let id = self.registry().add(&state, [self.key().clone()], move |_| {
            if let Some(state) = weak.upgrade() {
                state.reconcile();
            }
        });
        state.id.set(Some(id));
        self.cache_binding(&state);
        Binding { state }
    }
}

impl<T: PartialEq + Clone + 'static> Binding<T> {
    /// The cell's current value.
    pub fn get(&self) -> T {
        self.state.cell.get()
    }

    /// The value the bound control is showing.
    pub fn local(&self) -> T {
        self.state.local.borrow().clone()
    }

    /// Write from the control side.
    ///
    /// The local copy is updated first; the cell is written (and posts) only
    /// when its value differs. Returns whether the write was posted to the
    /// cell's subscribers.
    pub fn set(&self, value: T) -> bool {
        *self.state.local.borrow_mut() = value.clone();
        let differs = self.state.cell.with(|current| *current != value);
        if !differs {
            return false;
        }
        self.state.cell.set(value)
    }
}

impl<T: 'static> Binding<T> {
    /// The key of the bound cell.
    pub fn key(&self) -> &Key {
        self.state.cell.key()
    }

    /// The bound cell.
    pub fn cell(&self) -> &Observable<T> {
        &self.state.cell
    }

    /// Returns `true` once after the cell was changed by someone other than
    /// this binding, so the control knows to redraw.
    pub fn take_refresh(&self) -> bool {
        self.state.refresh.replace(false)
    }

    /// How many external changes this binding has adopted.
    pub fn refreshes(&self) -> u64 {
        self.state.refreshes.get()
    }

    /// The registry handle of this binding's subscription.
    pub fn id(&self) -> Option<SubscriberId> {
        self.state.id.get()
    }

    /// Whether two bindings are the same binding.
    pub fn ptr_eq(&self, other: &Binding<T>) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
