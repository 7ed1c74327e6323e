#![forbid(unsafe_code)]

//! DOM-shaped event model shared by the manager and its hosts.
//!
//! Hosts translate their native events into [`DomEvent`] before invoking a
//! [`Listener`], then read back [`DomEvent::default_prevented`] and
//! [`DomEvent::propagation_stopped`] to forward those effects.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

/// Event names the manager listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyDown,
    Click,
}

impl EventKind {
    /// DOM event type string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyDown => "keydown",
            Self::Click => "click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyboard key, reduced to what the manager distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Tab,
    Enter,
    Char(char),
    /// Any other named key (`"ArrowDown"`, `"F1"`, ...).
    Other(String),
}

impl KeyCode {
    /// Parse a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "Escape" | "Esc" => Self::Escape,
            "Tab" => Self::Tab,
            "Enter" => Self::Enter,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => Self::Other(key.to_owned()),
                }
            }
        }
    }
}

bitflags! {
    /// Modifier keys held during a keyboard event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const META  = 0b1000;
    }
}

/// Where a listener is attached: the shared document body or one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget<E> {
    Body,
    Element(E),
}

impl<E> EventTarget<E> {
    #[inline]
    pub fn is_body(&self) -> bool {
        matches!(self, Self::Body)
    }
}

/// Payload specific to each [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDetail {
    Key { code: KeyCode, modifiers: Modifiers },
    Click,
}

/// An event delivered to a [`Listener`].
#[derive(Debug)]
pub struct DomEvent<E> {
    detail: EventDetail,
    target: Option<E>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl<E> DomEvent<E> {
    /// A keydown event dispatched at `target`.
    pub fn key_down(code: KeyCode, modifiers: Modifiers, target: Option<E>) -> Self {
        Self::new(EventDetail::Key { code, modifiers }, target)
    }

    /// A click dispatched at `target`.
    pub fn click(target: Option<E>) -> Self {
        Self::new(EventDetail::Click, target)
    }

    fn new(detail: EventDetail, target: Option<E>) -> Self {
        Self {
            detail,
            target,
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self.detail {
            EventDetail::Key { .. } => EventKind::KeyDown,
            EventDetail::Click => EventKind::Click,
        }
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    /// Element the event was dispatched at.
    pub fn target(&self) -> Option<&E> {
        self.target.as_ref()
    }

    /// Key code for keyboard events.
    pub fn key(&self) -> Option<&KeyCode> {
        match &self.detail {
            EventDetail::Key { code, .. } => Some(code),
            EventDetail::Click => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self.detail {
            EventDetail::Key { modifiers, .. } => modifiers,
            EventDetail::Click => Modifiers::empty(),
        }
    }

    pub fn is_key(&self, code: &KeyCode) -> bool {
        self.key() == Some(code)
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

/// Shared listener callback.
///
/// Identity is the allocation: detaching requires the same `Listener` that
/// was attached, compared with [`Listener::same`]. Clones share identity.
pub struct Listener<E> {
    callback: Rc<dyn Fn(&DomEvent<E>)>,
}

impl<E> Listener<E> {
    pub fn new(callback: impl Fn(&DomEvent<E>) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    /// Invoke the callback.
    pub fn call(&self, event: &DomEvent<E>) {
        (self.callback)(event)
    }

    /// Whether both handles point at the same callback.
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<E> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("ptr", &Rc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_key_parsing() {
        assert_eq!(KeyCode::from_dom_key("Escape"), KeyCode::Escape);
        assert_eq!(KeyCode::from_dom_key("Esc"), KeyCode::Escape);
        assert_eq!(KeyCode::from_dom_key("Tab"), KeyCode::Tab);
        assert_eq!(KeyCode::from_dom_key("a"), KeyCode::Char('a'));
        assert_eq!(
            KeyCode::from_dom_key("ArrowDown"),
            KeyCode::Other("ArrowDown".into())
        );
    }

    #[test]
    fn event_flags_are_sticky() {
        let event: DomEvent<u32> = DomEvent::click(Some(7));
        assert!(!event.default_prevented());
        event.prevent_default();
        event.stop_propagation();
        assert!(event.default_prevented());
        assert!(event.propagation_stopped());
        assert_eq!(event.target(), Some(&7));
        assert_eq!(event.kind(), EventKind::Click);
    }

    #[test]
    fn key_event_accessors() {
        let event: DomEvent<u32> = DomEvent::key_down(KeyCode::Tab, Modifiers::SHIFT, None);
        assert!(event.is_key(&KeyCode::Tab));
        assert!(event.modifiers().contains(Modifiers::SHIFT));
        assert_eq!(event.kind(), EventKind::KeyDown);
    }

    #[test]
    fn listener_identity_follows_clones() {
        let a: Listener<u32> = Listener::new(|_| {});
        let b = a.clone();
        let c: Listener<u32> = Listener::new(|_| {});
        assert!(a.same(&b));
        assert!(!a.same(&c));
    }
}
