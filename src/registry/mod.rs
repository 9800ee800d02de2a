//! Observation registry: keys, posts, weakly-held subscribers.
//!
//! - [`Registry`] — keyed subscriber table with `post` / `add` / `remove`.
//! - [`Notification`] and [`Payload`] — what a callback receives.
//! - [`Subscription`] — RAII guard for handle-owned registrations.

pub mod center;
pub mod notification;
pub mod subscription;

pub use center::{Callback, Registry, RegistryError};
pub use notification::{Notification, Payload};
pub use subscription::{SubscriberId, Subscription};
