#![forbid(unsafe_code)]

//! The document seam between the manager and a concrete DOM.
//!
//! [`DomHost`] is everything the manager needs from a document: listener
//! attach/detach on the body or an element, focus queries and moves,
//! containment, the live focusable set of a subtree, and a next-tick
//! scheduler.
//!
//! # Invariants
//!
//! - `remove_listener` detaches only a listener attached with the same
//!   target, kind, [`Listener`] identity and capture flag.
//! - `focusable_within` returns elements in document order and is computed
//!   at call time.
//! - `defer` runs tasks first-scheduled-first-run, after the current event
//!   dispatch completes. Tasks are never cancelled.

use std::fmt;

use crate::event::{EventKind, EventTarget, Listener};

/// CSS selector for elements reachable by Tab inside a modal.
pub const FOCUSABLE_SELECTOR: &str = "a[href]:not([disabled]), \
     button:not([disabled]), \
     textarea:not([disabled]), \
     input:not([disabled]), \
     select:not([disabled]), \
     [tabindex]:not([tabindex^=\"-\"])";

/// Errors reported by a [`DomHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The element is no longer part of the document.
    Detached,
    /// The element cannot receive focus.
    NotFocusable,
    /// The underlying platform call failed.
    Js(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => write!(f, "element is detached from the document"),
            Self::NotFocusable => write!(f, "element cannot receive focus"),
            Self::Js(msg) => write!(f, "host call failed: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

/// A document the manager can attach listeners to and move focus within.
pub trait DomHost {
    /// Element handle. Equality must be element identity.
    type Element: Clone + PartialEq + fmt::Debug + 'static;

    fn add_listener(
        &self,
        target: &EventTarget<Self::Element>,
        kind: EventKind,
        listener: &Listener<Self::Element>,
        capture: bool,
    ) -> Result<(), HostError>;

    fn remove_listener(
        &self,
        target: &EventTarget<Self::Element>,
        kind: EventKind,
        listener: &Listener<Self::Element>,
        capture: bool,
    ) -> Result<(), HostError>;

    /// Element currently holding focus.
    fn active_element(&self) -> Option<Self::Element>;

    fn focus(&self, element: &Self::Element) -> Result<(), HostError>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: &Self::Element, node: &Self::Element) -> bool;

    /// Focusable descendants of `root` in document order (see
    /// [`FOCUSABLE_SELECTOR`]).
    fn focusable_within(&self, root: &Self::Element) -> Vec<Self::Element>;

    /// Whether the element is still attached to the document.
    fn is_connected(&self, element: &Self::Element) -> bool;

    /// Run `task` after the current event dispatch completes.
    fn defer(&self, task: Box<dyn FnOnce()>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_error_display() {
        assert_eq!(
            HostError::Detached.to_string(),
            "element is detached from the document"
        );
        assert_eq!(
            HostError::Js("boom".into()).to_string(),
            "host call failed: boom"
        );
    }

    #[test]
    fn selector_excludes_every_negative_tabindex() {
        assert!(FOCUSABLE_SELECTOR.contains("[tabindex]:not([tabindex^=\"-\"])"));
        assert!(!FOCUSABLE_SELECTOR.contains("[tabindex=\"-1\"]"));
        assert!(FOCUSABLE_SELECTOR.contains("a[href]"));
    }
}
