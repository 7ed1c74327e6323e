#![forbid(unsafe_code)]

//! Browser [`DomHost`] for `modalkit`, built on `web-sys`.
//!
//! [`WebDocument`] wraps a `web_sys::Document`. Every [`Listener`] the
//! manager attaches is wrapped in one JS closure, and that same closure is
//! handed back to `removeEventListener`, so detaching always matches the
//! registration it undoes.
//!
//! Deferred tasks go through `setTimeout(.., 0)`, which the browser runs in
//! scheduling order once the current event dispatch has finished.
//!
//! ```ignore
//! let document = WebDocument::new()?;
//! let manager = ModalManager::new(document.clone());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use modalkit::{
    DomEvent, DomHost, EventKind, EventTarget, FOCUSABLE_SELECTOR, HostError, KeyCode, Listener,
    Modifiers,
};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, Element, HtmlElement, KeyboardEvent};

type JsListener = Closure<dyn FnMut(web_sys::Event)>;

struct Registration {
    target: EventTarget<Element>,
    kind: EventKind,
    capture: bool,
    listener: Listener<Element>,
    closure: JsListener,
}

impl Registration {
    fn is(
        &self,
        target: &EventTarget<Element>,
        kind: EventKind,
        listener: &Listener<Element>,
        capture: bool,
    ) -> bool {
        self.kind == kind
            && self.capture == capture
            && self.listener.same(listener)
            && self.target == *target
    }
}

struct Inner {
    document: Document,
    registrations: RefCell<Vec<Registration>>,
}

/// Shared handle to a browser document.
#[derive(Clone)]
pub struct WebDocument {
    inner: Rc<Inner>,
}

impl fmt::Debug for WebDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDocument")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl WebDocument {
    /// The current window's document.
    pub fn new() -> Result<Self, HostError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| HostError::Js("no window document".into()))?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: Document) -> Self {
        Self {
            inner: Rc::new(Inner {
                document,
                registrations: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Listeners currently attached through this handle.
    pub fn listener_count(&self) -> usize {
        self.inner.registrations.borrow().len()
    }

    fn resolve(&self, target: &EventTarget<Element>) -> Result<web_sys::EventTarget, HostError> {
        match target {
            EventTarget::Body => self
                .inner
                .document
                .body()
                .map(web_sys::EventTarget::from)
                .ok_or_else(|| HostError::Js("document has no body".into())),
            EventTarget::Element(element) => Ok(web_sys::EventTarget::from(element.clone())),
        }
    }
}

fn js_error(value: JsValue) -> HostError {
    HostError::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn modifiers_of(event: &KeyboardEvent) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, event.shift_key());
    modifiers.set(Modifiers::CTRL, event.ctrl_key());
    modifiers.set(Modifiers::ALT, event.alt_key());
    modifiers.set(Modifiers::META, event.meta_key());
    modifiers
}

/// Translate a browser event into the manager's event model.
fn to_dom_event(event: &web_sys::Event, kind: EventKind) -> DomEvent<Element> {
    let target = event.target().and_then(|t| t.dyn_into::<Element>().ok());
    match kind {
        EventKind::Click => DomEvent::click(target),
        EventKind::KeyDown => match event.dyn_ref::<KeyboardEvent>() {
            Some(key_event) => DomEvent::key_down(
                KeyCode::from_dom_key(&key_event.key()),
                modifiers_of(key_event),
                target,
            ),
            None => DomEvent::key_down(KeyCode::Other(String::new()), Modifiers::empty(), target),
        },
    }
}

fn wrap(listener: &Listener<Element>, kind: EventKind) -> JsListener {
    let listener = listener.clone();
    Closure::wrap(Box::new(move |event: web_sys::Event| {
        let dom_event = to_dom_event(&event, kind);
        listener.call(&dom_event);
        if dom_event.default_prevented() {
            event.prevent_default();
        }
        if dom_event.propagation_stopped() {
            event.stop_propagation();
        }
    }) as Box<dyn FnMut(web_sys::Event)>)
}

impl DomHost for WebDocument {
    type Element = Element;

    fn add_listener(
        &self,
        target: &EventTarget<Element>,
        kind: EventKind,
        listener: &Listener<Element>,
        capture: bool,
    ) -> Result<(), HostError> {
        if self
            .inner
            .registrations
            .borrow()
            .iter()
            .any(|r| r.is(target, kind, listener, capture))
        {
            return Ok(());
        }

        let node = self.resolve(target)?;
        let closure = wrap(listener, kind);
        node.add_event_listener_with_callback_and_bool(
            kind.as_str(),
            closure.as_ref().unchecked_ref::<js_sys::Function>(),
            capture,
        )
        .map_err(js_error)?;

        self.inner.registrations.borrow_mut().push(Registration {
            target: target.clone(),
            kind,
            capture,
            listener: listener.clone(),
            closure,
        });
        Ok(())
    }

    fn remove_listener(
        &self,
        target: &EventTarget<Element>,
        kind: EventKind,
        listener: &Listener<Element>,
        capture: bool,
    ) -> Result<(), HostError> {
        let Some(idx) = self
            .inner
            .registrations
            .borrow()
            .iter()
            .position(|r| r.is(target, kind, listener, capture))
        else {
            return Ok(());
        };

        // The closure must outlive the JS listener, so the record is only
        // dropped once the target is known.
        let node = self.resolve(target)?;
        let registration = self.inner.registrations.borrow_mut().remove(idx);
        node.remove_event_listener_with_callback_and_bool(
            kind.as_str(),
            registration.closure.as_ref().unchecked_ref(),
            capture,
        )
        .map_err(js_error)
    }

    fn active_element(&self) -> Option<Element> {
        self.inner.document.active_element()
    }

    fn focus(&self, element: &Element) -> Result<(), HostError> {
        if !element.is_connected() {
            return Err(HostError::Detached);
        }
        let html = element
            .dyn_ref::<HtmlElement>()
            .ok_or(HostError::NotFocusable)?;
        html.focus().map_err(js_error)
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        let node: &web_sys::Node = node;
        ancestor.contains(Some(node))
    }

    fn focusable_within(&self, root: &Element) -> Vec<Element> {
        let list = match root.query_selector_all(FOCUSABLE_SELECTOR) {
            Ok(list) => list,
            Err(err) => {
                warn!(error = %js_error(err), "focusable query failed");
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn is_connected(&self, element: &Element) -> bool {
        element.is_connected()
    }

    fn defer(&self, task: Box<dyn FnOnce()>) {
        let Some(window) = web_sys::window() else {
            warn!("no window to schedule deferred task on");
            return;
        };
        let callback = Closure::once_into_js(move || task());
        if let Err(err) = window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
        {
            warn!(error = %js_error(err), "could not schedule deferred task");
        }
    }
}
