//! Subscribing view nodes: fragments that re-render only for their own keys.
//!
//! - [`ViewNode`] — dirty-flag node with `combine`, `on_change`, `build_if`.
//! - [`Sources`] — one cell or a tuple of up to six, for typed render closures.
//! - [`Invalidate`] / [`InvalidationQueue`] — the host's invalidation hook.

pub mod invalidate;
pub mod node;
pub mod sources;

pub use invalidate::{Invalidate, InvalidationQueue, NodeId};
pub use node::{NodeState, ViewNode};
pub use sources::Sources;
