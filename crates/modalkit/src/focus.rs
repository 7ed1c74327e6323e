#![forbid(unsafe_code)]

//! Per-modal memory of the element focused before the modal opened.
//!
//! # Invariants
//!
//! - At most one record per key.
//! - A record is consumed exactly once: `take()` removes it.
//!
//! The manager decides when a duplicate insert is a policy violation (only in
//! automatic mode); this registry just refuses to overwrite.

use ahash::AHashMap;

use crate::key::ModalKey;

/// Map from modal key to the element that should regain focus on close.
#[derive(Debug, Clone)]
pub struct FocusMemory<E> {
    records: AHashMap<ModalKey, E>,
}

impl<E> Default for FocusMemory<E> {
    fn default() -> Self {
        Self {
            records: AHashMap::new(),
        }
    }
}

impl<E> FocusMemory<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `element` for `key` unless a record already exists.
    ///
    /// Returns `false` when the existing record was kept.
    pub fn remember(&mut self, key: &ModalKey, element: E) -> bool {
        if self.records.contains_key(key) {
            return false;
        }
        self.records.insert(key.clone(), element);
        true
    }

    /// Remove and return the record for `key`.
    pub fn take(&mut self, key: &ModalKey) -> Option<E> {
        self.records.remove(key)
    }

    pub fn get(&self, key: &ModalKey) -> Option<&E> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &ModalKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keys with a stored record, sorted for stable output.
    pub fn keys(&self) -> Vec<ModalKey> {
        let mut keys: Vec<ModalKey> = self.records.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_refuses_overwrite() {
        let mut memory = FocusMemory::new();
        let key = ModalKey::from("a");
        assert!(memory.remember(&key, 1));
        assert!(!memory.remember(&key, 2));
        assert_eq!(memory.get(&key), Some(&1));
    }

    #[test]
    fn take_is_single_use() {
        let mut memory = FocusMemory::new();
        let key = ModalKey::from("a");
        memory.remember(&key, 7);
        assert_eq!(memory.take(&key), Some(7));
        assert_eq!(memory.take(&key), None);
        assert!(memory.is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let mut memory = FocusMemory::new();
        memory.remember(&ModalKey::from("b"), 0);
        memory.remember(&ModalKey::from("a"), 0);
        assert_eq!(memory.keys(), vec![ModalKey::from("a"), ModalKey::from("b")]);
        memory.clear();
        assert_eq!(memory.len(), 0);
    }
}
