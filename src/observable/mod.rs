//! Observable cells and two-way bindings.
//!
//! - [`Observable`] — keyed value slot that posts on change.
//! - [`Binding`] — loop-free two-way accessor for editable controls.
//! - [`remote`] — queue for writes coming from other threads.

pub mod binding;
pub mod cell;
pub mod remote;

pub use binding::Binding;
pub use cell::{NotifyPolicy, Observable};
pub use remote::{RemoteApplier, RemoteSetter, SendError};
