//! Browser tests for `WebDocument`.
//!
//! Run: `wasm-pack test --headless --firefox crates/modalkit-web`

#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use modalkit::{AccessibilityOptions, DomHost, EventKind, EventTarget, Listener, ModalManager};
use modalkit_web::WebDocument;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Document, Element, HtmlElement, KeyboardEvent, KeyboardEventInit};

wasm_bindgen_test_configure!(run_in_browser);

fn element(doc: &WebDocument, parent: &Element, tag: &str) -> Element {
    let el = doc.document().create_element(tag).unwrap();
    parent.append_child(&el).unwrap();
    el
}

fn body(doc: &WebDocument) -> Element {
    doc.document().body().unwrap().into()
}

fn press(target: &Element, key: &str) {
    let init = KeyboardEventInit::new();
    init.set_key(key);
    init.set_bubbles(true);
    let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
    target.dispatch_event(&event).unwrap();
}

#[wasm_bindgen_test]
fn escape_closes_and_detaches() {
    let doc = WebDocument::new().unwrap();
    let panel = element(&doc, &body(&doc), "div");
    let manager = ModalManager::new(doc.clone());
    let closes = Rc::new(Cell::new(0));

    let handle = manager.clone();
    let counter = Rc::clone(&closes);
    manager.add_accessibility_events(
        AccessibilityOptions::new("web", move || {
            counter.set(counter.get() + 1);
            handle.remove_accessibility_events(&"web".into());
        })
        .boundary_element(panel.clone()),
    );
    assert_eq!(doc.listener_count(), 2);

    press(&panel, "Escape");
    assert_eq!(closes.get(), 1);
    assert_eq!(doc.listener_count(), 0);

    press(&panel, "Escape");
    assert_eq!(closes.get(), 1);
    panel.remove();
}

#[wasm_bindgen_test]
fn outside_click_closes_inside_click_does_not() {
    let doc = WebDocument::new().unwrap();
    let root = body(&doc);
    let panel = element(&doc, &root, "div");
    let inside = element(&doc, &panel, "button");
    let outside = element(&doc, &root, "button");
    let manager = ModalManager::new(doc.clone());
    let closes = Rc::new(Cell::new(0));

    let counter = Rc::clone(&closes);
    manager.add_accessibility_events(
        AccessibilityOptions::new("web-click", move || counter.set(counter.get() + 1))
            .boundary_element(panel.clone()),
    );

    inside.unchecked_ref::<HtmlElement>().click();
    assert_eq!(closes.get(), 0);
    outside.unchecked_ref::<HtmlElement>().click();
    assert_eq!(closes.get(), 1);

    manager.reset();
    assert_eq!(doc.listener_count(), 0);
    panel.remove();
    outside.remove();
}

#[wasm_bindgen_test]
fn focusable_query_and_focus() {
    let doc = WebDocument::new().unwrap();
    let root = body(&doc);
    let panel = element(&doc, &root, "div");
    let first = element(&doc, &panel, "button");
    let disabled = element(&doc, &panel, "button");
    disabled.set_attribute("disabled", "").unwrap();
    let last = element(&doc, &panel, "input");
    for value in ["-1", "-2", "-10"] {
        element(&doc, &panel, "div").set_attribute("tabindex", value).unwrap();
    }

    assert_eq!(doc.focusable_within(&panel), vec![first.clone(), last.clone()]);
    doc.focus(&last).unwrap();
    assert_eq!(doc.active_element(), Some(last.clone()));
    assert!(doc.contains(&panel, &first));

    panel.remove();
    assert!(!doc.is_connected(&first));
    assert!(doc.focus(&first).is_err());
}

#[wasm_bindgen_test]
fn failed_body_lookup_keeps_the_listener_tracked() {
    let document: Document = WebDocument::new()
        .unwrap()
        .document()
        .implementation()
        .unwrap()
        .create_html_document()
        .unwrap();
    let html = document.document_element().unwrap();
    let page_body: Element = document.body().unwrap().into();
    let doc = WebDocument::from_document(document);

    let listener: Listener<Element> = Listener::new(|_| {});
    doc.add_listener(&EventTarget::Body, EventKind::KeyDown, &listener, false)
        .unwrap();

    page_body.remove();
    assert!(
        doc.remove_listener(&EventTarget::Body, EventKind::KeyDown, &listener, false)
            .is_err()
    );
    assert_eq!(doc.listener_count(), 1);

    html.append_child(&page_body).unwrap();
    doc.remove_listener(&EventTarget::Body, EventKind::KeyDown, &listener, false)
        .unwrap();
    assert_eq!(doc.listener_count(), 0);
}
