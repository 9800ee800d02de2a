//! Change notifications delivered to subscriber callbacks.

use std::any::Any;
use std::fmt;

use crate::key::Key;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Metadata carried by a post.
#[derive(Clone, Copy)]
pub enum Payload<'a> {
    /// A bare signal: something under the key changed, no further detail.
    Signal,
    /// The value held before the change. Downcast with
    /// [`Notification::previous`] to the cell's value type.
    Previous(&'a dyn Any),
}

impl Payload<'_> {
    /// Whether this payload carries a previous value.
    pub fn has_previous(&self) -> bool {
        matches!(self, Payload::Previous(_))
    }
}

impl fmt::Debug for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Signal => f.write_str("Signal"),
            Payload::Previous(_) => f.write_str("Previous(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A single delivery of a post to one subscriber.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    /// The key that was posted.
    pub key: &'a Key,
    /// Metadata attached by the poster.
    pub payload: Payload<'a>,
}

impl<'a> Notification<'a> {
    pub fn new(key: &'a Key, payload: Payload<'a>) -> Self {
        Self { key, payload }
    }

    /// The previous value, if the payload carries one of type `T`.
    pub fn previous<T: 'static>(&self) -> Option<&'a T> {
        match self.payload {
            Payload::Previous(value) => value.downcast_ref::<T>(),
            Payload::Signal => None,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
