//! Test support: probes, a headless host, text snapshots.
//!
//! Use a [`Probe`] to count and inspect posts for a set of keys. Use the
//! [`Pilot`] to mount view nodes into a headless host that re-renders only
//! invalidated nodes, and [`registry_to_string`] to capture registry contents
//! for snapshot-style assertions.

pub mod pilot;
pub mod probe;
pub mod snapshot;

pub use pilot::Pilot;
pub use probe::{Probe, Record};
pub use snapshot::registry_to_string;
