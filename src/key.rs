//! Observation keys: the opaque identifiers correlating cells with subscribers.
//!
//! A [`Key`] is cheap to clone (shared string) and is the only thing the
//! [`Registry`](crate::registry::Registry) knows about a cell. Two cells that
//! share a key fire together.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

/// Length of a generated key when no configuration says otherwise.
///
/// Sixteen hex characters of a v4 UUID carry 60 random bits (one digit is the
/// version), so a birthday collision needs about a billion live cells. Shorter keys read better in logs but an
/// 8-character key (32 bits) collides with even odds at roughly 77k cells.
pub const DEFAULT_KEY_LENGTH: usize = 16;

/// Upper bound on generated key length (a simple-format UUID is 32 hex chars).
pub const MAX_KEY_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// KeyError
// ---------------------------------------------------------------------------

/// Errors produced when parsing a [`Key`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("key must not be empty")]
    Empty,
    #[error("key must not start or end with whitespace: {0:?}")]
    Whitespace(String),
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Opaque, comparable, hashable identifier for an observable value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Arc<str>);

impl Key {
    /// Wrap a raw string verbatim. Use this to share a key between cells.
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    /// Generate a random key of [`DEFAULT_KEY_LENGTH`] hex characters.
    pub fn random() -> Self {
        Self::random_with_length(DEFAULT_KEY_LENGTH)
    }

    /// Generate a random key of `len` hex characters.
    ///
    /// `len` is clamped to `1..=MAX_KEY_LENGTH`.
    pub fn random_with_length(len: usize) -> Self {
        let len = len.clamp(1, MAX_KEY_LENGTH);
        let mut buf = Uuid::encode_buffer();
        let hex = Uuid::new_v4().simple().encode_lower(&mut buf);
        Self(Arc::from(&hex[..len]))
    }

    /// Parse and validate a key from user-supplied text.
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        if raw.is_empty() {
            return Err(KeyError::Empty);
        }
        if raw.trim() != raw {
            return Err(KeyError::Whitespace(raw.to_string()));
        }
        Ok(Self::new(raw))
    }

    /// The raw string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
