#![forbid(unsafe_code)]

//! Deterministic in-memory document implementing [`DomHost`].
//!
//! `HeadlessDocument` models just enough of the DOM for the manager: an
//! element tree rooted at the body, attributes that drive focusability,
//! listener registration with capture flags, three-phase event dispatch, a
//! focused element, and a FIFO next-tick queue that only runs when asked.
//!
//! It is the fixture for this crate's tests and a usable host anywhere a real
//! browser is not available.
//!
//! # Dispatch Model
//!
//! Events travel capture (body down to the target's parent), target (capture
//! listeners, then bubbling listeners), then bubble (parent back up to the
//! body). Each node's listener list is read when dispatch reaches that node,
//! so a listener attached during dispatch fires only if its node has not been
//! visited yet. A listener removed before its turn does not fire.
//! `stop_propagation` finishes the current node and skips the rest.
//!
//! # Invariants
//!
//! - Handles are cheap clones sharing one document.
//! - Adding an identical listener twice is a no-op, as in the DOM.
//! - No internal borrow is held while a listener or task runs, so callbacks
//!   may freely mutate the document.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::event::{DomEvent, EventKind, EventTarget, KeyCode, Listener, Modifiers};
use crate::host::{DomHost, HostError};

/// Element handle in a [`HeadlessDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

const BODY: NodeId = NodeId(0);

#[derive(Debug)]
struct Node {
    tag: String,
    attributes: AHashMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: AHashMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    fn is_focusable(&self) -> bool {
        let disabled = self.has("disabled");
        let by_tag = match self.tag.as_str() {
            "a" => self.has("href") && !disabled,
            "button" | "textarea" | "input" | "select" => !disabled,
            _ => false,
        };
        let by_tabindex = self
            .attributes
            .get("tabindex")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .is_some_and(|i| i >= 0);
        by_tag || by_tabindex
    }
}

struct Registered {
    node: NodeId,
    kind: EventKind,
    listener: Listener<NodeId>,
    capture: bool,
}

impl Registered {
    fn is(&self, node: NodeId, kind: EventKind, listener: &Listener<NodeId>, capture: bool) -> bool {
        self.node == node && self.kind == kind && self.capture == capture && self.listener.same(listener)
    }
}

#[derive(Default)]
struct DocState {
    nodes: Vec<Node>,
    focused: Option<NodeId>,
    listeners: Vec<Registered>,
    tasks: VecDeque<Box<dyn FnOnce()>>,
    focus_log: Vec<NodeId>,
}

/// Shared handle to an in-memory document.
#[derive(Clone)]
pub struct HeadlessDocument {
    state: Rc<RefCell<DocState>>,
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeadlessDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("HeadlessDocument")
            .field("nodes", &st.nodes.len())
            .field("focused", &st.focused)
            .field("listeners", &st.listeners.len())
            .field("pending_tasks", &st.tasks.len())
            .finish()
    }
}

impl HeadlessDocument {
    /// A document holding only `<body>`.
    pub fn new() -> Self {
        let state = DocState {
            nodes: vec![Node::new("body")],
            ..DocState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    // --- Tree ---

    pub fn body(&self) -> NodeId {
        BODY
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut st = self.state.borrow_mut();
        let id = NodeId(st.nodes.len() as u32);
        st.nodes.push(Node::new(tag));
        id
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut st = self.state.borrow_mut();
        detach_from_parent(&mut st, child);
        st.nodes[child.0 as usize].parent = Some(parent);
        st.nodes[parent.0 as usize].children.push(child);
    }

    pub fn append_to_body(&self, child: NodeId) {
        self.append_child(BODY, child);
    }

    /// Create an element and append it to `parent`.
    pub fn create_child(&self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.create_element(tag);
        self.append_child(parent, id);
        id
    }

    /// Remove `node` (and its subtree) from the document.
    ///
    /// Focus inside the removed subtree falls back to nothing.
    pub fn remove(&self, node: NodeId) {
        let mut st = self.state.borrow_mut();
        detach_from_parent(&mut st, node);
        if let Some(focused) = st.focused
            && !connected(&st, focused)
        {
            st.focused = None;
        }
    }

    pub fn tag(&self, node: NodeId) -> String {
        self.state.borrow().nodes[node.0 as usize].tag.clone()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.state.borrow().nodes[node.0 as usize].children.clone()
    }

    // --- Attributes ---

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.state.borrow_mut().nodes[node.0 as usize]
            .attributes
            .insert(name.to_owned(), value.to_owned());
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        self.state.borrow_mut().nodes[node.0 as usize]
            .attributes
            .remove(name);
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.state.borrow().nodes[node.0 as usize]
            .attributes
            .get(name)
            .cloned()
    }

    /// Toggle the `disabled` attribute.
    pub fn set_disabled(&self, node: NodeId, disabled: bool) {
        if disabled {
            self.set_attribute(node, "disabled", "");
        } else {
            self.remove_attribute(node, "disabled");
        }
    }

    // --- Focus ---

    /// Set focus directly, without host bookkeeping (simulates user focus).
    pub fn set_focus(&self, node: Option<NodeId>) {
        self.state.borrow_mut().focused = node;
    }

    /// Every element focused through [`DomHost::focus`], oldest first.
    pub fn focus_log(&self) -> Vec<NodeId> {
        self.state.borrow().focus_log.clone()
    }

    // --- Listeners ---

    /// Total attached listeners.
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Listeners attached to one target/kind/capture triple.
    pub fn listener_count_on(&self, target: &EventTarget<NodeId>, kind: EventKind, capture: bool) -> usize {
        let node = node_of(target);
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|r| r.node == node && r.kind == kind && r.capture == capture)
            .count()
    }

    // --- Scheduling ---

    pub fn pending_tasks(&self) -> usize {
        self.state.borrow().tasks.len()
    }

    /// Run deferred tasks until the queue is empty, including tasks scheduled
    /// by the tasks themselves. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.state.borrow_mut().tasks.pop_front();
            let Some(task) = task else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    // --- Dispatch ---

    /// Dispatch a keydown at `target`, or at the focused element (falling
    /// back to the body) when `target` is `None`.
    pub fn key_down(&self, target: Option<NodeId>, code: KeyCode, modifiers: Modifiers) -> DomEvent<NodeId> {
        let target = target.or_else(|| self.state.borrow().focused).unwrap_or(BODY);
        let event = DomEvent::key_down(code, modifiers, Some(target));
        self.dispatch(target, &event);
        event
    }

    /// Press a key at the focused element.
    pub fn press(&self, code: KeyCode) -> DomEvent<NodeId> {
        self.key_down(None, code, Modifiers::empty())
    }

    /// Dispatch a click at `target`.
    pub fn click(&self, target: NodeId) -> DomEvent<NodeId> {
        let event = DomEvent::click(Some(target));
        self.dispatch(target, &event);
        event
    }

    fn dispatch(&self, target: NodeId, event: &DomEvent<NodeId>) {
        let path = self.path_to(target);
        let Some((&target_node, ancestors)) = path.split_last() else {
            return;
        };

        for &node in ancestors {
            self.fire(node, event, Some(true));
            if event.propagation_stopped() {
                return;
            }
        }

        self.fire(target_node, event, None);
        if event.propagation_stopped() {
            return;
        }

        for &node in ancestors.iter().rev() {
            self.fire(node, event, Some(false));
            if event.propagation_stopped() {
                return;
            }
        }
    }

    /// Root-to-target path. A detached target gets a single-node path.
    fn path_to(&self, target: NodeId) -> Vec<NodeId> {
        let st = self.state.borrow();
        let mut path = vec![target];
        let mut cursor = st.nodes[target.0 as usize].parent;
        while let Some(node) = cursor {
            path.push(node);
            cursor = st.nodes[node.0 as usize].parent;
        }
        path.reverse();
        path
    }

    /// Invoke `node`'s listeners for the event; `capture` of `None` means the
    /// target phase (capture listeners first).
    fn fire(&self, node: NodeId, event: &DomEvent<NodeId>, capture: Option<bool>) {
        let kind = event.kind();
        let snapshot: Vec<(Listener<NodeId>, bool)> = {
            let st = self.state.borrow();
            let mut matching: Vec<(Listener<NodeId>, bool)> = st
                .listeners
                .iter()
                .filter(|r| r.node == node && r.kind == kind)
                .filter(|r| capture.is_none_or(|c| r.capture == c))
                .map(|r| (r.listener.clone(), r.capture))
                .collect();
            if capture.is_none() {
                matching.sort_by_key(|(_, c)| !*c);
            }
            matching
        };

        for (listener, is_capture) in snapshot {
            let still_attached = self
                .state
                .borrow()
                .listeners
                .iter()
                .any(|r| r.is(node, kind, &listener, is_capture));
            if still_attached {
                listener.call(event);
            }
        }
    }
}

fn node_of(target: &EventTarget<NodeId>) -> NodeId {
    match target {
        EventTarget::Body => BODY,
        EventTarget::Element(id) => *id,
    }
}

fn detach_from_parent(st: &mut DocState, node: NodeId) {
    if let Some(parent) = st.nodes[node.0 as usize].parent.take() {
        st.nodes[parent.0 as usize].children.retain(|c| *c != node);
    }
}

fn connected(st: &DocState, node: NodeId) -> bool {
    let mut cursor = Some(node);
    while let Some(n) = cursor {
        if n == BODY {
            return true;
        }
        cursor = st.nodes[n.0 as usize].parent;
    }
    false
}

fn collect_focusable(st: &DocState, node: NodeId, out: &mut Vec<NodeId>) {
    for &child in &st.nodes[node.0 as usize].children {
        if st.nodes[child.0 as usize].is_focusable() {
            out.push(child);
        }
        collect_focusable(st, child, out);
    }
}

impl DomHost for HeadlessDocument {
    type Element = NodeId;

    fn add_listener(
        &self,
        target: &EventTarget<NodeId>,
        kind: EventKind,
        listener: &Listener<NodeId>,
        capture: bool,
    ) -> Result<(), HostError> {
        let node = node_of(target);
        let mut st = self.state.borrow_mut();
        if st.listeners.iter().any(|r| r.is(node, kind, listener, capture)) {
            return Ok(());
        }
        st.listeners.push(Registered {
            node,
            kind,
            listener: listener.clone(),
            capture,
        });
        Ok(())
    }

    fn remove_listener(
        &self,
        target: &EventTarget<NodeId>,
        kind: EventKind,
        listener: &Listener<NodeId>,
        capture: bool,
    ) -> Result<(), HostError> {
        let node = node_of(target);
        let mut st = self.state.borrow_mut();
        if let Some(idx) = st.listeners.iter().position(|r| r.is(node, kind, listener, capture)) {
            st.listeners.remove(idx);
        }
        Ok(())
    }

    fn active_element(&self) -> Option<NodeId> {
        self.state.borrow().focused
    }

    fn focus(&self, element: &NodeId) -> Result<(), HostError> {
        let mut st = self.state.borrow_mut();
        if !connected(&st, *element) {
            return Err(HostError::Detached);
        }
        st.focused = Some(*element);
        st.focus_log.push(*element);
        Ok(())
    }

    fn contains(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        let st = self.state.borrow();
        let mut cursor = Some(*node);
        while let Some(n) = cursor {
            if n == *ancestor {
                return true;
            }
            cursor = st.nodes[n.0 as usize].parent;
        }
        false
    }

    fn focusable_within(&self, root: &NodeId) -> Vec<NodeId> {
        let st = self.state.borrow();
        let mut out = Vec::new();
        collect_focusable(&st, *root, &mut out);
        out
    }

    fn is_connected(&self, element: &NodeId) -> bool {
        connected(&self.state.borrow(), *element)
    }

    fn defer(&self, task: Box<dyn FnOnce()>) {
        self.state.borrow_mut().tasks.push_back(task);
    }
}
