#![forbid(unsafe_code)]

//! Ordered stack of open modal keys.
//!
//! The `ModalStack` tracks every open modal in LIFO order. Only the topmost
//! key is "active"; dismissal triggers belonging to lower modals stay attached
//! but are gated off until the modals above them close.
//!
//! # Invariants
//!
//! - No key appears twice.
//! - New keys are appended at the tail; the tail is the active modal.
//! - Removal filters by value, so closing a modal from the middle keeps the
//!   relative order of the rest.
//!
//! # Failure Modes
//!
//! - `register()` of a present key returns `false` and logs a warning.
//! - `unregister()` of an absent key returns `false` and logs a warning.
//! - `is_active()` on an empty stack is `false` (no panic).

use tracing::warn;

use crate::key::ModalKey;

/// Stack of open modal keys, bottom to top.
#[derive(Debug, Clone, Default)]
pub struct ModalStack {
    keys: Vec<ModalKey>,
}

impl ModalStack {
    /// Create an empty stack.
    pub const fn new() -> Self {
        Self { keys: Vec::new() }
    }

    // --- Stack Operations ---

    /// Append `key` unless it is already open.
    ///
    /// Returns `false` for a duplicate; the stack is left unchanged.
    pub fn register(&mut self, key: &ModalKey) -> bool {
        if self.contains(key) {
            warn!(key = %key, "modal key is already registered, skipping");
            return false;
        }
        self.keys.push(key.clone());
        true
    }

    /// Remove `key` from wherever it sits in the stack.
    ///
    /// Returns `false` if the key was not registered.
    pub fn unregister(&mut self, key: &ModalKey) -> bool {
        if !self.contains(key) {
            warn!(key = %key, "modal key was not registered, nothing to remove");
            return false;
        }
        self.keys.retain(|k| k != key);
        true
    }

    /// Drop every key without any per-key teardown.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    // --- State Queries ---

    /// Whether `key` is the topmost open modal.
    pub fn is_active(&self, key: &ModalKey) -> bool {
        self.keys.last() == Some(key)
    }

    /// Key of the topmost modal, if any.
    pub fn top(&self) -> Option<&ModalKey> {
        self.keys.last()
    }

    pub fn contains(&self, key: &ModalKey) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.keys.len()
    }

    /// Keys bottom to top.
    pub fn keys(&self) -> &[ModalKey] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn key(name: &str) -> ModalKey {
        ModalKey::from(name)
    }

    #[test]
    fn empty_stack() {
        let stack = ModalStack::new();
        assert!(stack.is_empty());
        assert_eq!(stack.depth(), 0);
        assert!(stack.top().is_none());
        assert!(!stack.is_active(&key("a")));
    }

    #[test]
    fn register_appends_and_activates() {
        let mut stack = ModalStack::new();
        assert!(stack.register(&key("a")));
        assert!(stack.is_active(&key("a")));

        assert!(stack.register(&key("b")));
        assert_eq!(stack.depth(), 2);
        assert!(stack.is_active(&key("b")));
        assert!(!stack.is_active(&key("a")));
    }

    #[test]
    #[traced_test]
    fn duplicate_register_is_noop() {
        let mut stack = ModalStack::new();
        stack.register(&key("a"));
        stack.register(&key("b"));

        assert!(!stack.register(&key("a")));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top(), Some(&key("b")));
        assert!(logs_contain("already registered"));
    }

    #[test]
    fn unregister_from_middle_keeps_order() {
        let mut stack = ModalStack::new();
        for name in ["a", "b", "c"] {
            stack.register(&key(name));
        }

        assert!(stack.unregister(&key("b")));
        assert_eq!(stack.keys(), &[key("a"), key("c")]);
        assert!(stack.is_active(&key("c")));
    }

    #[test]
    fn unregister_top_activates_previous() {
        let mut stack = ModalStack::new();
        stack.register(&key("a"));
        stack.register(&key("b"));

        stack.unregister(&key("b"));
        assert!(stack.is_active(&key("a")));
    }

    #[test]
    #[traced_test]
    fn unregister_absent_is_noop() {
        let mut stack = ModalStack::new();
        stack.register(&key("a"));

        assert!(!stack.unregister(&key("ghost")));
        assert_eq!(stack.depth(), 1);
        assert!(logs_contain("was not registered"));
    }

    #[test]
    fn clear_empties() {
        let mut stack = ModalStack::new();
        stack.register(&key("a"));
        stack.register(&key("b"));
        stack.clear();
        assert!(stack.is_empty());
        assert!(stack.top().is_none());
    }
}
