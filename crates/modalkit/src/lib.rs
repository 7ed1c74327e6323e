#![forbid(unsafe_code)]

//! Layered, accessible modal management for a document.
//!
//! `modalkit` tracks which modal is on top of a stack, attaches and detaches
//! the listeners that make a modal accessible (Escape to close, Tab focus
//! trap, click outside to close), and remembers where focus was so it can be
//! returned when the modal closes. Showing, hiding and animating the modal
//! stay with the caller.
//!
//! # Architecture
//!
//! - [`ModalManager`]: the context object. One per document; clones share
//!   state.
//! - [`DomHost`]: the document seam. [`HeadlessDocument`] is the in-memory
//!   implementation; `modalkit-web` provides the browser one.
//! - [`ModalStack`], [`KeyRegistry`], [`BindingTable`], [`FocusMemory`]: the
//!   registries the manager owns, joined by [`ModalKey`].
//!
//! # Example
//!
//! ```
//! use modalkit::{AccessibilityOptions, HeadlessDocument, ModalManager};
//!
//! let doc = HeadlessDocument::new();
//! let dialog = doc.create_child(doc.body(), "div");
//! let manager = ModalManager::new(doc.clone());
//!
//! let key = manager.generate_key();
//! let handle = manager.clone();
//! let close_key = key.clone();
//! manager.add_accessibility_events(
//!     AccessibilityOptions::new(key.clone(), move || {
//!         handle.remove_accessibility_events(&close_key);
//!     })
//!     .boundary_element(dialog),
//! );
//! assert!(manager.is_active(&key));
//!
//! doc.press(modalkit::KeyCode::Escape);
//! assert!(manager.stack().is_empty());
//! ```

pub mod binder;
pub mod config;
pub mod event;
pub mod focus;
pub mod headless;
pub mod host;
pub mod key;
pub mod manager;
pub mod stack;

pub use binder::{BindingTable, EventBinding, TrapOutcome, trap_focus};
pub use config::{DEBUG_ENV_VAR, ModalManagerConfig};
pub use event::{DomEvent, EventDetail, EventKind, EventTarget, KeyCode, Listener, Modifiers};
pub use focus::FocusMemory;
pub use headless::{HeadlessDocument, NodeId};
pub use host::{DomHost, FOCUSABLE_SELECTOR, HostError};
pub use key::{DEFAULT_KEY_PREFIX, KeyRegistry, ModalKey};
pub use manager::{
    AccessibilityOptions, CloseHandler, ManagerSnapshot, ModalManager, RestoreFocusOptions,
    SaveFocusOptions,
};
pub use stack::ModalStack;
