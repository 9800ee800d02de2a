//! Registry configuration.

use crate::key::{DEFAULT_KEY_LENGTH, MAX_KEY_LENGTH};

/// Default nesting limit for posts triggered from inside callbacks.
pub const DEFAULT_MAX_POST_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors reported by [`RegistryConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_post_depth must be at least 1")]
    ZeroDepth,
    #[error("key_length must be within 1..={max}, got {got}")]
    KeyLength { got: usize, max: usize },
}

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Registry`](crate::registry::Registry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum nesting of posts issued from inside subscriber callbacks.
    pub max_post_depth: usize,
    /// Length of keys generated for cells created through the registry.
    pub key_length: usize,
    /// Optional name attached to log records.
    pub label: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_post_depth: DEFAULT_MAX_POST_DEPTH,
            key_length: DEFAULT_KEY_LENGTH,
            label: None,
        }
    }
}

impl RegistryConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the post nesting limit (builder).
    pub fn with_max_post_depth(mut self, depth: usize) -> Self {
        self.max_post_depth = depth;
        self
    }

    /// Set the generated key length (builder).
    pub fn with_key_length(mut self, len: usize) -> Self {
        self.key_length = len;
        self
    }

    /// Set the label (builder).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Check that every field is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_post_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.key_length == 0 || self.key_length > MAX_KEY_LENGTH {
            return Err(ConfigError::KeyLength {
                got: self.key_length,
                max: MAX_KEY_LENGTH,
            });
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RegistryConfig::default();
        assert_eq!(config.max_post_depth, DEFAULT_MAX_POST_DEPTH);
        assert_eq!(config.key_length, DEFAULT_KEY_LENGTH);
        assert!(config.label.is_none());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn builder_chain() {
        let config = RegistryConfig::new()
            .with_max_post_depth(4)
            .with_key_length(12)
            .with_label("main");
        assert_eq!(config.max_post_depth, 4);
        assert_eq!(config.key_length, 12);
        assert_eq!(config.label.as_deref(), Some("main"));
    }

    #[test]
    fn zero_depth_rejected() {
        let config = RegistryConfig::new().with_max_post_depth(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroDepth));
    }

    #[test]
    fn key_length_bounds() {
        assert_eq!(
            RegistryConfig::new().with_key_length(0).validate(),
            Err(ConfigError::KeyLength { got: 0, max: MAX_KEY_LENGTH })
        );
        assert_eq!(
            RegistryConfig::new().with_key_length(33).validate(),
            Err(ConfigError::KeyLength { got: 33, max: MAX_KEY_LENGTH })
        );
        assert!(RegistryConfig::new().with_key_length(32).validate().is_ok());
    }
}
