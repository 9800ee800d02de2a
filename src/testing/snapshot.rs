//! Text snapshots of registry contents.

use crate::registry::Registry;

/// Describe a registry as one `key: count` line per key, sorted by key.
///
/// Dead entries are pruned first so the output only reflects live
/// subscribers.
///
/// ```ignore
/// let text = registry_to_string(&registry);
/// insta::assert_snapshot!(text, @"name: 2");
/// ```
pub fn registry_to_string(registry: &Registry) -> String {
    registry.prune();
    let mut keys = registry.keys();
    keys.sort();
    keys.iter()
        .map(|key| format!("{key}: {}", registry.subscriber_count(key)))
        .collect::<Vec<_>>()
        .join("\n")
}

// ===========================================================================
// Tests
// ===========================================================================
