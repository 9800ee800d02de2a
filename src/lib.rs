//! # mixx
//!
//! Fine-grained view invalidation built on a keyed observation registry.
//!
//! A view fragment subscribes to the keys of the cells it reads and is
//! invalidated only when one of those keys is posted, rather than whenever
//! anything in its owning view changes.
//!
//! ## Core Systems
//!
//! - **[`registry`]** — Keyed subscriber table: `post`, `add`, `remove`, weak owners, RAII handles
//! - **[`observable`]** — `Observable<T>` cells, loop-free two-way `Binding`s, cross-thread writes
//! - **[`view`]** — `ViewNode` fragments with `combine`, `on_change`, `build_if`, host invalidation
//! - **[`key`]** — Opaque observation keys
//! - **[`config`]** — Registry configuration
//! - **[`testing`]** — Probe subscriber, headless host, text snapshots
//!
//! ## Example
//!
//! ```ignore
//! use mixx::{Registry, ViewNode};
//!
//! let registry = Registry::new();
//! let name = registry.observable(String::from("aname"));
//!
//! // Re-renders only when `name` changes.
//! let label = ViewNode::observe(name.clone(), |name| format!("Name: {name}"));
//!
//! // An editable control writes through a binding.
//! let field = name.binding();
//! field.set(String::from("bob"));
//!
//! assert!(label.is_dirty());
//! assert_eq!(label.render().as_deref(), Some("Name: bob"));
//! ```
//!
//! ## Threading
//!
//! Everything here is single-threaded (`Rc`/`RefCell`) and meant to live on the
//! UI thread. Posts are synchronous: a callback that writes another cell runs
//! that nested post to completion before the outer post continues. Nesting is
//! capped by [`RegistryConfig::max_post_depth`]. Other threads write through
//! [`observable::remote`].

// Foundation
pub mod config;
pub mod key;

// Core systems
pub mod observable;
pub mod registry;
pub mod view;

// Test support
pub mod testing;

pub use config::{ConfigError, RegistryConfig};
pub use key::{Key, KeyError};
pub use observable::{Binding, NotifyPolicy, Observable};
pub use registry::{Notification, Payload, Registry, RegistryError, SubscriberId, Subscription};
pub use view::{Invalidate, InvalidationQueue, NodeId, NodeState, ViewNode};
