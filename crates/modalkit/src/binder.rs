#![forbid(unsafe_code)]

//! Listener bookkeeping and the focus-trap algorithm.
//!
//! Every listener the manager attaches is recorded as an [`EventBinding`]
//! under its modal key, so teardown replays the exact attach arguments.
//! Body-scoped bindings are additionally indexed per key so the shared
//! document body can be cleaned across all keys at once (e.g. before a full
//! view swap in a single-page app).
//!
//! # Invariants
//!
//! 1. Every body binding in the per-key table also appears in the body index
//!    under the same key, and the two are always removed together.
//! 2. A detach uses the same target, kind, listener identity and capture
//!    flag as the matching attach.
//! 3. The focusable set is re-read from the host on every Tab press.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Host attach/detach error | Detached element, platform failure | Logged, binding still tracked/discarded |
//! | No focusable elements | Empty modal | Tab passes through |
//! | Focus move fails | Element removed mid-keystroke | Logged, default not suppressed |

use ahash::AHashMap;
use tracing::warn;

use crate::event::{DomEvent, EventKind, EventTarget, KeyCode, Listener, Modifiers};
use crate::host::{DomHost, HostError};
use crate::key::ModalKey;

/// One attached listener, with everything needed to detach it.
#[derive(Debug)]
pub struct EventBinding<E> {
    pub target: EventTarget<E>,
    pub kind: EventKind,
    pub listener: Listener<E>,
    pub capture: bool,
}

impl<E: Clone> Clone for EventBinding<E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            kind: self.kind,
            listener: self.listener.clone(),
            capture: self.capture,
        }
    }
}

impl<E> EventBinding<E> {
    pub fn new(target: EventTarget<E>, kind: EventKind, listener: Listener<E>, capture: bool) -> Self {
        Self {
            target,
            kind,
            listener,
            capture,
        }
    }

    /// Same attach arguments (listener compared by identity).
    pub fn matches(&self, other: &Self) -> bool
    where
        E: PartialEq,
    {
        self.target == other.target
            && self.kind == other.kind
            && self.capture == other.capture
            && self.listener.same(&other.listener)
    }
}

impl<E: Clone + PartialEq + std::fmt::Debug + 'static> EventBinding<E> {
    pub fn attach<H: DomHost<Element = E>>(&self, host: &H) -> Result<(), HostError> {
        host.add_listener(&self.target, self.kind, &self.listener, self.capture)
    }

    pub fn detach<H: DomHost<Element = E>>(&self, host: &H) -> Result<(), HostError> {
        host.remove_listener(&self.target, self.kind, &self.listener, self.capture)
    }
}

/// Per-key binding records plus the cross-key body index.
#[derive(Debug)]
pub struct BindingTable<E> {
    by_key: AHashMap<ModalKey, Vec<EventBinding<E>>>,
    body: AHashMap<ModalKey, Vec<EventBinding<E>>>,
}

impl<E> Default for BindingTable<E> {
    fn default() -> Self {
        Self {
            by_key: AHashMap::new(),
            body: AHashMap::new(),
        }
    }
}

impl<E: Clone> BindingTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `binding` under `key`; body bindings are mirrored into the index.
    pub fn record(&mut self, key: &ModalKey, binding: EventBinding<E>) {
        if binding.target.is_body() {
            self.body
                .entry(key.clone())
                .or_default()
                .push(binding.clone());
        }
        self.by_key.entry(key.clone()).or_default().push(binding);
    }

    /// Remove and return every binding recorded for `key`.
    pub fn take(&mut self, key: &ModalKey) -> Vec<EventBinding<E>> {
        self.body.remove(key);
        self.by_key.remove(key).unwrap_or_default()
    }

    /// Remove and return every body binding across all keys.
    ///
    /// The per-key records keep only their element-scoped bindings.
    pub fn take_body(&mut self) -> Vec<(ModalKey, EventBinding<E>)> {
        let mut drained = Vec::new();
        for (key, bindings) in self.body.drain() {
            drained.extend(bindings.into_iter().map(|b| (key.clone(), b)));
        }
        for bindings in self.by_key.values_mut() {
            bindings.retain(|b| !b.target.is_body());
        }
        self.by_key.retain(|_, bindings| !bindings.is_empty());
        drained
    }

    /// Remove and return everything still recorded.
    pub fn take_all(&mut self) -> Vec<EventBinding<E>> {
        self.body.clear();
        self.by_key.drain().flat_map(|(_, b)| b).collect()
    }

    /// Bindings recorded for `key`.
    pub fn bindings(&self, key: &ModalKey) -> &[EventBinding<E>] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn binding_count(&self, key: &ModalKey) -> usize {
        self.bindings(key).len()
    }

    /// Body bindings across all keys.
    pub fn body_count(&self) -> usize {
        self.body.values().map(Vec::len).sum()
    }

    pub fn body_count_for(&self, key: &ModalKey) -> usize {
        self.body.get(key).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty() && self.body.is_empty()
    }
}

/// What a keydown did inside a trapped modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrapOutcome<E> {
    /// Not a Tab press.
    Ignored,
    /// Tab moves normally within the modal.
    PassThrough,
    /// Focus wrapped to the given element; default was suppressed.
    Wrapped(E),
}

/// Keep Tab navigation inside `modal`.
///
/// Shift+Tab on the first focusable wraps to the last; Tab on the last wraps
/// to the first. Anything else is left to the browser.
pub fn trap_focus<H: DomHost>(
    host: &H,
    modal: &H::Element,
    event: &DomEvent<H::Element>,
) -> TrapOutcome<H::Element> {
    if !event.is_key(&KeyCode::Tab) {
        return TrapOutcome::Ignored;
    }

    let focusables = host.focusable_within(modal);
    let (Some(first), Some(last)) = (focusables.first(), focusables.last()) else {
        return TrapOutcome::PassThrough;
    };
    let active = host.active_element();

    let wrap_to = if event.modifiers().contains(Modifiers::SHIFT) {
        (active.as_ref() == Some(first)).then_some(last)
    } else {
        (active.as_ref() == Some(last)).then_some(first)
    };

    let Some(to) = wrap_to else {
        return TrapOutcome::PassThrough;
    };

    match host.focus(to) {
        Ok(()) => {
            event.prevent_default();
            TrapOutcome::Wrapped(to.clone())
        }
        Err(err) => {
            warn!(error = %err, "focus trap could not wrap focus");
            TrapOutcome::PassThrough
        }
    }
}
