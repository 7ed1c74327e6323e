#![forbid(unsafe_code)]

//! The modal manager: stack, listener lifecycle, and focus memory behind one
//! key.
//!
//! A page creates one [`ModalManager`] for its document and hands clones to
//! whatever code opens and closes modals. Clones share state.
//!
//! # Lifecycle
//!
//! ```ignore
//! let manager = ModalManager::new(document);
//! let key = manager.generate_key();
//!
//! // open
//! manager.add_accessibility_events(
//!     AccessibilityOptions::new(key.clone(), move || hide_dialog())
//!         .modal_element(dialog)
//!         .boundary_element(panel)
//!         .close_elements([close_button]),
//! );
//! manager.save_focus(SaveFocusOptions::new(key.clone(), first_input));
//!
//! // close (usually from inside `hide_dialog`)
//! manager.remove_accessibility_events(&key);
//! manager.restore_focus(RestoreFocusOptions::new(key));
//! ```
//!
//! # Invariants
//!
//! 1. A key is registered at most once; a duplicate add attaches nothing.
//!    Listeners left behind by `clear_active_modals` are detached when the
//!    key is added again, so each trigger fires once.
//! 2. Every listener attached by `add_accessibility_events` is detached by
//!    the matching `remove_accessibility_events`, with identical arguments.
//! 3. Close triggers only run the handler while their modal is on top.
//! 4. Outside clicks are observed in the capture phase on the body, so the
//!    click that opened a modal never reaches its own outside-click listener.
//! 5. Focus moves from save/restore run on the next tick, in call order.
//! 6. When the stack empties (by removal, `clear_active_modals` or `reset`),
//!    key numbering restarts.
//!
//! # Failure Modes
//!
//! | Misuse | Behavior |
//! |--------|----------|
//! | Add for an open key | Warning, no-op |
//! | Remove for an unknown key | Warning, no-op |
//! | Save focus twice (auto) | Warning, first record kept |
//! | Restore with no record (auto) | Warning, no-op |
//! | Focus target detached | Warning, focus not moved |
//! | Host listener/focus error | Warning, bookkeeping continues |
//!
//! A close handler that captures a manager clone keeps the manager alive
//! while its modal is registered; removal drops the handler.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::binder::{BindingTable, EventBinding, trap_focus};
use crate::config::ModalManagerConfig;
use crate::event::{DomEvent, EventKind, EventTarget, KeyCode, Listener};
use crate::focus::FocusMemory;
use crate::host::DomHost;
use crate::key::{KeyRegistry, ModalKey};
use crate::stack::ModalStack;

/// Zero-argument close callback supplied by the UI layer.
pub type CloseHandler = Rc<dyn Fn()>;

/// Arguments for [`ModalManager::add_accessibility_events`].
pub struct AccessibilityOptions<E> {
    pub key: ModalKey,
    /// Root element whose Tab navigation is trapped.
    pub modal_element: Option<E>,
    /// Clicks outside this element close the modal.
    pub boundary_element: Option<E>,
    /// Elements whose click closes the modal.
    pub close_elements: Vec<E>,
    /// Elements outside the boundary whose clicks do not close the modal.
    pub exempt_elements: Vec<E>,
    pub close_handler: CloseHandler,
}

impl<E> AccessibilityOptions<E> {
    pub fn new(key: impl Into<ModalKey>, close_handler: impl Fn() + 'static) -> Self {
        Self {
            key: key.into(),
            modal_element: None,
            boundary_element: None,
            close_elements: Vec::new(),
            exempt_elements: Vec::new(),
            close_handler: Rc::new(close_handler),
        }
    }

    pub fn modal_element(mut self, element: E) -> Self {
        self.modal_element = Some(element);
        self
    }

    pub fn boundary_element(mut self, element: E) -> Self {
        self.boundary_element = Some(element);
        self
    }

    pub fn close_elements(mut self, elements: impl IntoIterator<Item = E>) -> Self {
        self.close_elements = elements.into_iter().collect();
        self
    }

    pub fn exempt_elements(mut self, elements: impl IntoIterator<Item = E>) -> Self {
        self.exempt_elements = elements.into_iter().collect();
        self
    }
}

impl<E: fmt::Debug> fmt::Debug for AccessibilityOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessibilityOptions")
            .field("key", &self.key)
            .field("modal_element", &self.modal_element)
            .field("boundary_element", &self.boundary_element)
            .field("close_elements", &self.close_elements)
            .field("exempt_elements", &self.exempt_elements)
            .finish_non_exhaustive()
    }
}

/// Arguments for [`ModalManager::save_focus`].
#[derive(Debug, Clone)]
pub struct SaveFocusOptions<E> {
    pub key: ModalKey,
    /// Receives focus on the next tick.
    pub first_focusable: E,
    /// Element to remember instead of the currently focused one.
    pub previous: Option<E>,
    /// Store the remembered element (`true`) or hand it back to the caller.
    pub auto: bool,
}

impl<E> SaveFocusOptions<E> {
    pub fn new(key: impl Into<ModalKey>, first_focusable: E) -> Self {
        Self {
            key: key.into(),
            first_focusable,
            previous: None,
            auto: true,
        }
    }

    pub fn previous(mut self, element: E) -> Self {
        self.previous = Some(element);
        self
    }

    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }
}

/// Arguments for [`ModalManager::restore_focus`].
#[derive(Debug, Clone)]
pub struct RestoreFocusOptions<E> {
    pub key: ModalKey,
    /// Element to focus when `auto` is off.
    pub previous: Option<E>,
    pub auto: bool,
}

impl<E> RestoreFocusOptions<E> {
    pub fn new(key: impl Into<ModalKey>) -> Self {
        Self {
            key: key.into(),
            previous: None,
            auto: true,
        }
    }

    pub fn previous(mut self, element: E) -> Self {
        self.previous = Some(element);
        self
    }

    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }
}

/// Point-in-time view of the manager's registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerSnapshot {
    /// Open keys, bottom to top.
    pub stack: Vec<ModalKey>,
    pub key_counter: u64,
    /// Keys holding a focus record, sorted.
    pub focus_records: Vec<ModalKey>,
    pub body_bindings: usize,
    pub debug: bool,
}

struct State<E> {
    keys: KeyRegistry,
    stack: ModalStack,
    bindings: BindingTable<E>,
    focus: FocusMemory<E>,
}

impl<E> Default for State<E> {
    fn default() -> Self {
        Self {
            keys: KeyRegistry::new(),
            stack: ModalStack::new(),
            bindings: BindingTable::default(),
            focus: FocusMemory::default(),
        }
    }
}

struct Inner<H: DomHost> {
    host: H,
    config: RefCell<ModalManagerConfig>,
    state: RefCell<State<H::Element>>,
}

impl<H: DomHost> Inner<H> {
    fn debug_enabled(&self) -> bool {
        self.config.borrow().debug
    }

    fn is_active(&self, key: &ModalKey) -> bool {
        self.state.borrow().stack.is_active(key)
    }

    /// Move focus now, honoring the detached-element guard.
    fn move_focus(&self, element: &H::Element) {
        if self.config.borrow().guard_detached && !self.host.is_connected(element) {
            warn!(element = ?element, "focus target is no longer in the document, skipping");
            return;
        }
        if let Err(err) = self.host.focus(element) {
            warn!(element = ?element, error = %err, "could not move focus");
        }
    }

    fn detach_all(&self, bindings: &[EventBinding<H::Element>]) {
        for binding in bindings {
            if let Err(err) = binding.detach(&self.host) {
                warn!(
                    event = %binding.kind,
                    capture = binding.capture,
                    error = %err,
                    "could not detach listener"
                );
            }
        }
    }
}

/// Layered modal registry for one document.
///
/// Cheap to clone; clones share state.
pub struct ModalManager<H: DomHost> {
    inner: Rc<Inner<H>>,
}

impl<H: DomHost> Clone for ModalManager<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: DomHost + 'static> fmt::Debug for ModalManager<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalManager")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl<H: DomHost + 'static> ModalManager<H> {
    /// Create a manager with default configuration.
    pub fn new(host: H) -> Self {
        Self::with_config(host, ModalManagerConfig::default())
    }

    pub fn with_config(host: H, config: ModalManagerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                host,
                config: RefCell::new(config),
                state: RefCell::new(State::default()),
            }),
        }
    }

    /// The document this manager drives.
    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn config(&self) -> ModalManagerConfig {
        self.inner.config.borrow().clone()
    }

    // --- Debug ---

    /// Toggle debug logging of registry transitions.
    pub fn set_debug_mode(&self, enabled: bool) {
        self.inner.config.borrow_mut().debug = enabled;
        info!("modal manager debug mode {}", if enabled { "ON" } else { "OFF" });
    }

    pub fn debug_mode(&self) -> bool {
        self.inner.debug_enabled()
    }

    fn trace(&self, action: &str, key: &ModalKey) {
        if self.inner.debug_enabled() {
            let stack = self.inner.state.borrow().stack.keys().to_vec();
            debug!(key = %key, stack = ?stack, "{action}");
        }
    }

    // --- Keys ---

    /// Next generated key with the configured prefix (`"modal-1"`, ...).
    pub fn generate_key(&self) -> ModalKey {
        let prefix = self.inner.config.borrow().key_prefix.clone();
        self.generate_key_with_prefix(&prefix)
    }

    pub fn generate_key_with_prefix(&self, prefix: &str) -> ModalKey {
        self.inner.state.borrow_mut().keys.generate(prefix)
    }

    /// Restart key numbering at 1.
    pub fn reset_keys(&self) {
        self.inner.state.borrow_mut().keys.reset();
    }

    // --- Stack ---

    /// Whether `key` is the topmost open modal.
    pub fn is_active(&self, key: &ModalKey) -> bool {
        self.inner.is_active(key)
    }

    pub fn is_registered(&self, key: &ModalKey) -> bool {
        self.inner.state.borrow().stack.contains(key)
    }

    pub fn active_key(&self) -> Option<ModalKey> {
        self.inner.state.borrow().stack.top().cloned()
    }

    /// Open keys, bottom to top.
    pub fn stack(&self) -> Vec<ModalKey> {
        self.inner.state.borrow().stack.keys().to_vec()
    }

    /// Empty the stack without detaching anything, and restart key
    /// numbering.
    ///
    /// Listeners stay attached but gated off; prefer [`reset`](Self::reset)
    /// unless body events were already cleared. Re-adding a cleared key
    /// detaches its leftover listeners first.
    pub fn clear_active_modals(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.stack.clear();
        state.keys.reset();
    }

    // --- Accessibility events ---

    /// Register `options.key` and attach its dismissal and focus-trap
    /// listeners.
    ///
    /// Returns `false` (attaching nothing) when the key is already open.
    pub fn add_accessibility_events(&self, options: AccessibilityOptions<H::Element>) -> bool {
        let AccessibilityOptions {
            key,
            modal_element,
            boundary_element,
            close_elements,
            exempt_elements,
            close_handler,
        } = options;

        let stale = {
            let mut state = self.inner.state.borrow_mut();
            if !state.stack.register(&key) {
                return false;
            }
            state.bindings.take(&key)
        };
        if !stale.is_empty() {
            if self.inner.debug_enabled() {
                debug!(key = %key, count = stale.len(), "detaching leftover listeners for reopened modal");
            }
            self.inner.detach_all(&stale);
        }

        let gated = self.gated_close(&key, close_handler);
        let mut bindings = Vec::with_capacity(3 + close_elements.len());

        bindings.push(EventBinding::new(
            EventTarget::Body,
            EventKind::KeyDown,
            escape_listener(Rc::clone(&gated)),
            false,
        ));

        if let Some(boundary) = boundary_element {
            bindings.push(EventBinding::new(
                EventTarget::Body,
                EventKind::Click,
                self.outside_click_listener(boundary, exempt_elements, Rc::clone(&gated)),
                true,
            ));
        }

        if let Some(modal) = modal_element {
            bindings.push(EventBinding::new(
                EventTarget::Element(modal.clone()),
                EventKind::KeyDown,
                self.focus_trap_listener(modal),
                false,
            ));
        }

        if !close_elements.is_empty() {
            let on_close = close_element_listener(gated);
            for element in close_elements {
                bindings.push(EventBinding::new(
                    EventTarget::Element(element),
                    EventKind::Click,
                    on_close.clone(),
                    false,
                ));
            }
        }

        for binding in &bindings {
            if let Err(err) = binding.attach(&self.inner.host) {
                warn!(
                    key = %key,
                    event = %binding.kind,
                    error = %err,
                    "could not attach listener"
                );
            }
        }
        {
            let mut state = self.inner.state.borrow_mut();
            for binding in bindings {
                state.bindings.record(&key, binding);
            }
        }

        self.trace("registered modal", &key);
        true
    }

    /// Unregister `key` and detach everything attached for it.
    ///
    /// Returns `false` when the key was not registered.
    pub fn remove_accessibility_events(&self, key: &ModalKey) -> bool {
        let bindings = {
            let mut state = self.inner.state.borrow_mut();
            if !state.stack.unregister(key) {
                return false;
            }
            if state.stack.is_empty() {
                state.keys.reset();
            }
            state.bindings.take(key)
        };

        self.inner.detach_all(&bindings);
        self.trace("unregistered modal", key);
        true
    }

    /// Detach every body listener across all keys.
    ///
    /// The stack is untouched; element-scoped listeners stay attached.
    pub fn clear_document_body_events(&self) {
        let drained = self.inner.state.borrow_mut().bindings.take_body();
        if drained.is_empty() {
            return;
        }
        let bindings: Vec<_> = drained.into_iter().map(|(_, b)| b).collect();
        self.inner.detach_all(&bindings);
        if self.inner.debug_enabled() {
            debug!(count = bindings.len(), "cleared document body events");
        }
    }

    /// Listeners recorded for `key`.
    pub fn binding_count(&self, key: &ModalKey) -> usize {
        self.inner.state.borrow().bindings.binding_count(key)
    }

    /// Body listeners recorded across all keys.
    pub fn body_binding_count(&self) -> usize {
        self.inner.state.borrow().bindings.body_count()
    }

    /// Close callback that only fires while `key` is on top.
    fn gated_close(&self, key: &ModalKey, handler: CloseHandler) -> CloseHandler {
        let weak: Weak<Inner<H>> = Rc::downgrade(&self.inner);
        let key = key.clone();
        Rc::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if !inner.is_active(&key) {
                return;
            }
            if inner.debug_enabled() {
                debug!(key = %key, "closing active modal");
            }
            handler();
        })
    }

    fn outside_click_listener(
        &self,
        boundary: H::Element,
        exempt: Vec<H::Element>,
        gated: CloseHandler,
    ) -> Listener<H::Element> {
        let weak: Weak<Inner<H>> = Rc::downgrade(&self.inner);
        Listener::new(move |event: &DomEvent<H::Element>| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some(target) = event.target() else {
                return;
            };
            if inner.host.contains(&boundary, target) {
                return;
            }
            if exempt.iter().any(|e| inner.host.contains(e, target)) {
                return;
            }
            drop(inner);
            gated();
        })
    }

    fn focus_trap_listener(&self, modal: H::Element) -> Listener<H::Element> {
        let weak: Weak<Inner<H>> = Rc::downgrade(&self.inner);
        Listener::new(move |event: &DomEvent<H::Element>| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            trap_focus(&inner.host, &modal, event);
        })
    }

    // --- Focus ---

    /// Remember where focus was and move it into the modal on the next tick.
    ///
    /// In auto mode the remembered element is stored under the key and
    /// `None` is returned; otherwise it is returned to the caller.
    pub fn save_focus(&self, options: SaveFocusOptions<H::Element>) -> Option<H::Element> {
        let SaveFocusOptions {
            key,
            first_focusable,
            previous,
            auto,
        } = options;

        if auto && self.inner.state.borrow().focus.contains(&key) {
            warn!(key = %key, "duplicate focus registration for modal, skipping");
            return None;
        }

        let previous = previous.or_else(|| self.inner.host.active_element());

        if auto {
            match previous.clone() {
                Some(element) => {
                    self.inner.state.borrow_mut().focus.remember(&key, element);
                }
                None if self.inner.debug_enabled() => {
                    debug!(key = %key, "no focused element to remember");
                }
                None => {}
            }
        }

        self.defer_focus(first_focusable);
        self.trace("saved focus", &key);

        if auto { None } else { previous }
    }

    /// Return focus to the element remembered for `key` on the next tick.
    ///
    /// Returns `false` when there was nothing to restore.
    pub fn restore_focus(&self, options: RestoreFocusOptions<H::Element>) -> bool {
        let RestoreFocusOptions {
            key,
            previous,
            auto,
        } = options;

        let target = if auto {
            self.inner.state.borrow_mut().focus.take(&key)
        } else {
            previous
        };

        let Some(target) = target else {
            warn!(key = %key, auto, "no stored focus for modal to restore");
            return false;
        };

        self.defer_focus(target);
        self.trace("restored focus", &key);
        true
    }

    pub fn has_focus_record(&self, key: &ModalKey) -> bool {
        self.inner.state.borrow().focus.contains(key)
    }

    /// Drop every stored focus record without moving focus.
    pub fn clear_focus_registry(&self) {
        self.inner.state.borrow_mut().focus.clear();
    }

    fn defer_focus(&self, element: H::Element) {
        let weak: Weak<Inner<H>> = Rc::downgrade(&self.inner);
        self.inner.host.defer(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.move_focus(&element);
            }
        }));
    }

    // --- Lifecycle ---

    /// Full teardown: detach every listener, empty the stack and focus
    /// registry, and restart key numbering.
    pub fn reset(&self) {
        self.clear_document_body_events();
        let leftovers = self.inner.state.borrow_mut().bindings.take_all();
        self.inner.detach_all(&leftovers);

        let mut state = self.inner.state.borrow_mut();
        state.stack.clear();
        state.focus.clear();
        state.keys.reset();
        drop(state);

        if self.inner.debug_enabled() {
            debug!("modal manager reset");
        }
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let state = self.inner.state.borrow();
        ManagerSnapshot {
            stack: state.stack.keys().to_vec(),
            key_counter: state.keys.counter(),
            focus_records: state.focus.keys(),
            body_bindings: state.bindings.body_count(),
            debug: self.inner.debug_enabled(),
        }
    }
}

fn escape_listener<E: 'static>(gated: CloseHandler) -> Listener<E> {
    Listener::new(move |event: &DomEvent<E>| {
        if event.is_key(&KeyCode::Escape) {
            gated();
        }
    })
}

fn close_element_listener<E: 'static>(gated: CloseHandler) -> Listener<E> {
    Listener::new(move |event: &DomEvent<E>| {
        event.stop_propagation();
        gated();
    })
}
