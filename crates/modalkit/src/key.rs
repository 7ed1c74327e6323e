#![forbid(unsafe_code)]

//! Modal identity keys and the auto-incrementing key registry.
//!
//! # Invariants
//!
//! - Generated keys have the form `"<prefix>-<n>"` with `n` starting at 1.
//! - The counter never reuses a number until [`KeyRegistry::reset`].
//!
//! # Failure Modes
//!
//! - Generated keys are not checked against caller-supplied literal keys.
//!   Mixing `"modal-1"` literals with generated keys can collide.

use std::borrow::Borrow;
use std::fmt;

/// Default prefix for generated keys.
pub const DEFAULT_KEY_PREFIX: &str = "modal";

/// Opaque identifier for one open modal instance.
///
/// Either caller-supplied (a stable name reused across opens) or produced by
/// [`KeyRegistry::generate`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModalKey(String);

impl ModalKey {
    /// Wrap a caller-supplied key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ModalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModalKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for ModalKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl PartialEq<str> for ModalKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModalKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Monotonic counter backing generated [`ModalKey`]s.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    counter: u64,
}

impl KeyRegistry {
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Increment the counter and return `"<prefix>-<counter>"`.
    pub fn generate(&mut self, prefix: &str) -> ModalKey {
        self.counter += 1;
        ModalKey(format!("{prefix}-{}", self.counter))
    }

    /// Set the counter back to zero; the next key ends in `-1`.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Number of keys generated since the last reset.
    #[inline]
    pub const fn counter(&self) -> u64 {
        self.counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_starts_at_one() {
        let mut keys = KeyRegistry::new();
        assert_eq!(keys.generate(DEFAULT_KEY_PREFIX), "modal-1");
        assert_eq!(keys.generate(DEFAULT_KEY_PREFIX), "modal-2");
        assert_eq!(keys.counter(), 2);
    }

    #[test]
    fn custom_prefix_shares_counter() {
        let mut keys = KeyRegistry::new();
        assert_eq!(keys.generate("popup"), "popup-1");
        assert_eq!(keys.generate("drawer"), "drawer-2");
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut keys = KeyRegistry::new();
        for _ in 0..5 {
            keys.generate(DEFAULT_KEY_PREFIX);
        }
        keys.reset();
        assert_eq!(keys.counter(), 0);
        assert_eq!(keys.generate(DEFAULT_KEY_PREFIX), "modal-1");
    }

    #[test]
    fn key_conversions() {
        let a = ModalKey::from("settings");
        let b = ModalKey::new(String::from("settings"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "settings");
        assert_eq!(a.to_string(), "settings");
    }
}
