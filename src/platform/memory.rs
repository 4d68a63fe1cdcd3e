//! In-memory host tree.
//!
//! A [`Platform`] that keeps nodes in a map and logs every mutating call as
//! a [`HostOp`]. Tests assert against the serialized tree and the op log;
//! events are delivered with [`MemoryPlatform::dispatch`].

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::renderer::Platform;
use crate::types::{Callback, ElementHandle, Value};

/// One recorded host mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateElement { el: ElementHandle, tag: String },
    CreateText { el: ElementHandle, text: String },
    SetText { el: ElementHandle, text: String },
    SetElementText { el: ElementHandle, text: String },
    SetAttr { el: ElementHandle, key: String },
    RemoveAttr { el: ElementHandle, key: String },
    AddListener { el: ElementHandle, event: String },
    RemoveListener { el: ElementHandle, event: String },
    Insert { el: ElementHandle, parent: ElementHandle, anchor: Option<ElementHandle> },
    Remove { el: ElementHandle },
}

#[derive(Debug)]
enum NodeKind {
    Element { tag: String },
    Text(String),
}

#[derive(Debug)]
struct MemoryNode {
    kind: NodeKind,
    parent: Option<ElementHandle>,
    children: Vec<ElementHandle>,
    attrs: IndexMap<String, String>,
    listeners: IndexMap<String, Callback>,
}

impl MemoryNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attrs: IndexMap::new(),
            listeners: IndexMap::new(),
        }
    }
}

/// Host tree kept in memory.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    nodes: RefCell<HashMap<ElementHandle, MemoryNode>>,
    next_id: Cell<u64>,
    ops: RefCell<Vec<HostOp>>,
}

impl MemoryPlatform {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn alloc(&self, kind: NodeKind) -> ElementHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        let handle = ElementHandle(id);
        self.nodes.borrow_mut().insert(handle, MemoryNode::new(kind));
        handle
    }

    fn record(&self, op: HostOp) {
        self.ops.borrow_mut().push(op);
    }

    /// Create a detached container element reachable as `#id` through
    /// [`Platform::select`]. Not logged.
    pub fn create_root(&self, id: &str) -> ElementHandle {
        let root = self.alloc(NodeKind::Element {
            tag: "div".to_string(),
        });
        if let Some(node) = self.nodes.borrow_mut().get_mut(&root) {
            node.attrs.insert("id".to_string(), id.to_string());
        }
        root
    }

    /// Mutations since the last [`clear_ops`](Self::clear_ops).
    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    /// Serialized children of `el`.
    pub fn inner_html(&self, el: ElementHandle) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        if let Some(node) = nodes.get(&el) {
            for child in &node.children {
                write_node(&nodes, *child, &mut out);
            }
        }
        out
    }

    /// Serialized `el` itself.
    pub fn to_html(&self, el: ElementHandle) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        write_node(&nodes, el, &mut out);
        out
    }

    pub fn children(&self, el: ElementHandle) -> Vec<ElementHandle> {
        self.nodes
            .borrow()
            .get(&el)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Concatenated text of `el` and its descendants.
    pub fn text_content(&self, el: ElementHandle) -> String {
        fn collect(nodes: &HashMap<ElementHandle, MemoryNode>, el: ElementHandle, out: &mut String) {
            let Some(node) = nodes.get(&el) else {
                return;
            };
            match &node.kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element { .. } => {
                    for child in &node.children {
                        collect(nodes, *child, out);
                    }
                }
            }
        }
        let mut out = String::new();
        collect(&self.nodes.borrow(), el, &mut out);
        out
    }

    pub fn attr(&self, el: ElementHandle, key: &str) -> Option<String> {
        self.nodes.borrow().get(&el)?.attrs.get(key).cloned()
    }

    pub fn tag(&self, el: ElementHandle) -> Option<String> {
        match &self.nodes.borrow().get(&el)?.kind {
            NodeKind::Element { tag } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Descendants of `el` with the given tag, in document order.
    pub fn find_all(&self, el: ElementHandle, tag: &str) -> Vec<ElementHandle> {
        let mut found = Vec::new();
        let mut stack = vec![el];
        while let Some(current) = stack.pop() {
            for child in self.children(current).into_iter().rev() {
                if self.tag(child).as_deref() == Some(tag) {
                    found.push(child);
                }
                stack.push(child);
            }
        }
        found.sort_by_key(|h| self.document_position(*h));
        found
    }

    fn document_position(&self, el: ElementHandle) -> Vec<usize> {
        let nodes = self.nodes.borrow();
        let mut path = Vec::new();
        let mut current = el;
        while let Some(parent) = nodes.get(&current).and_then(|n| n.parent) {
            let index = nodes
                .get(&parent)
                .and_then(|p| p.children.iter().position(|c| *c == current))
                .unwrap_or(0);
            path.push(index);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Call the `event` listener on `el`. Returns `false` when none is set.
    pub fn dispatch(&self, el: ElementHandle, event: &str, args: &[Value]) -> bool {
        let listener = self
            .nodes
            .borrow()
            .get(&el)
            .and_then(|n| n.listeners.get(event).cloned());
        // the handler may mutate the tree
        match listener {
            Some(listener) => {
                listener.call(args);
                true
            }
            None => false,
        }
    }

    fn detach(&self, el: ElementHandle) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent) = nodes.get_mut(&el).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent) = nodes.get_mut(&parent) {
            parent.children.retain(|c| *c != el);
        }
    }
}

/// `onClick` → `click`.
fn event_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    let first = rest.chars().next()?;
    first
        .is_ascii_uppercase()
        .then(|| rest.to_ascii_lowercase())
}

impl Platform for MemoryPlatform {
    fn create_element(&self, tag: &str) -> ElementHandle {
        let el = self.alloc(NodeKind::Element { tag: tag.to_string() });
        self.record(HostOp::CreateElement {
            el,
            tag: tag.to_string(),
        });
        el
    }

    fn create_text(&self, text: &str) -> ElementHandle {
        let el = self.alloc(NodeKind::Text(text.to_string()));
        self.record(HostOp::CreateText {
            el,
            text: text.to_string(),
        });
        el
    }

    fn set_text(&self, node: ElementHandle, text: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.kind = NodeKind::Text(text.to_string());
        }
        self.record(HostOp::SetText {
            el: node,
            text: text.to_string(),
        });
    }

    fn patch_prop(&self, el: ElementHandle, key: &str, _prev: Option<&Value>, next: Option<&Value>) {
        let next = next.filter(|v| !v.is_nullish());
        let op = {
            let mut nodes = self.nodes.borrow_mut();
            let Some(node) = nodes.get_mut(&el) else {
                return;
            };
            match (event_name(key), next) {
                (Some(event), Some(Value::Function(callback))) => {
                    node.listeners.insert(event.clone(), callback.clone());
                    HostOp::AddListener { el, event }
                }
                (Some(event), _) => {
                    node.listeners.shift_remove(&event);
                    HostOp::RemoveListener { el, event }
                }
                (None, Some(value)) => {
                    node.attrs.insert(key.to_string(), value.to_display_string());
                    HostOp::SetAttr {
                        el,
                        key: key.to_string(),
                    }
                }
                (None, None) => {
                    node.attrs.shift_remove(key);
                    HostOp::RemoveAttr {
                        el,
                        key: key.to_string(),
                    }
                }
            }
        };
        self.record(op);
    }

    fn insert(&self, el: ElementHandle, parent: ElementHandle, anchor: Option<ElementHandle>) {
        self.detach(el);
        {
            let mut nodes = self.nodes.borrow_mut();
            if let Some(p) = nodes.get_mut(&parent) {
                let index = anchor
                    .and_then(|a| p.children.iter().position(|c| *c == a))
                    .unwrap_or(p.children.len());
                p.children.insert(index, el);
            }
            if let Some(node) = nodes.get_mut(&el) {
                node.parent = Some(parent);
            }
        }
        self.record(HostOp::Insert { el, parent, anchor });
    }

    fn remove(&self, el: ElementHandle) {
        self.detach(el);
        self.record(HostOp::Remove { el });
    }

    fn set_element_text(&self, el: ElementHandle, text: &str) {
        let old_children = {
            let mut nodes = self.nodes.borrow_mut();
            match nodes.get_mut(&el) {
                Some(node) => std::mem::take(&mut node.children),
                None => return,
            }
        };
        {
            let mut nodes = self.nodes.borrow_mut();
            for child in old_children {
                if let Some(child) = nodes.get_mut(&child) {
                    child.parent = None;
                }
            }
        }
        if !text.is_empty() {
            let node = self.alloc(NodeKind::Text(text.to_string()));
            let mut nodes = self.nodes.borrow_mut();
            if let Some(n) = nodes.get_mut(&node) {
                n.parent = Some(el);
            }
            if let Some(parent) = nodes.get_mut(&el) {
                parent.children.push(node);
            }
        }
        self.record(HostOp::SetElementText {
            el,
            text: text.to_string(),
        });
    }

    fn parent_node(&self, node: ElementHandle) -> Option<ElementHandle> {
        self.nodes.borrow().get(&node)?.parent
    }

    fn next_sibling(&self, node: ElementHandle) -> Option<ElementHandle> {
        let nodes = self.nodes.borrow();
        let parent = nodes.get(&node)?.parent?;
        let siblings = &nodes.get(&parent)?.children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }

    fn select(&self, selector: &str) -> Option<ElementHandle> {
        let id = selector.strip_prefix('#')?;
        self.nodes
            .borrow()
            .iter()
            .find(|(_, node)| node.attrs.get("id").is_some_and(|v| v == id))
            .map(|(handle, _)| *handle)
    }
}

fn write_node(nodes: &HashMap<ElementHandle, MemoryNode>, el: ElementHandle, out: &mut String) {
    let Some(node) = nodes.get(&el) else {
        return;
    };
    match &node.kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Element { tag } => {
            let _ = write!(out, "<{tag}");
            for (key, value) in &node.attrs {
                let _ = write!(out, " {key}=\"{value}\"");
            }
            out.push('>');
            for child in &node.children {
                write_node(nodes, *child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_before_anchor_and_move() {
        let host = MemoryPlatform::default();
        let root = host.create_root("app");
        let a = host.create_element("a");
        let b = host.create_element("b");
        host.insert(a, root, None);
        host.insert(b, root, Some(a));
        assert_eq!(host.inner_html(root), "<b></b><a></a>");

        // inserting an attached node moves it
        host.insert(b, root, None);
        assert_eq!(host.inner_html(root), "<a></a><b></b>");
        assert_eq!(host.next_sibling(a), Some(b));
        assert_eq!(host.parent_node(b), Some(root));
    }

    #[test]
    fn test_props_and_listeners() {
        let host = MemoryPlatform::default();
        let el = host.create_element("button");
        let clicks = Rc::new(Cell::new(0));
        let handler = Value::function({
            let clicks = clicks.clone();
            move |_| {
                clicks.set(clicks.get() + 1);
                Value::Undefined
            }
        });

        host.patch_prop(el, "title", None, Some(&Value::from("hi")));
        host.patch_prop(el, "onClick", None, Some(&handler));
        assert_eq!(host.attr(el, "title").as_deref(), Some("hi"));
        assert!(host.dispatch(el, "click", &[]));
        assert_eq!(clicks.get(), 1);

        host.patch_prop(el, "title", None, Some(&Value::Null));
        host.patch_prop(el, "onClick", Some(&handler), None);
        assert_eq!(host.attr(el, "title"), None);
        assert!(!host.dispatch(el, "click", &[]));
    }

    #[test]
    fn test_select_by_id() {
        let host = MemoryPlatform::default();
        let root = host.create_root("app");
        assert_eq!(host.select("#app"), Some(root));
        assert_eq!(host.select("#missing"), None);
        assert_eq!(host.select("app"), None);
    }

    #[test]
    fn test_set_element_text_replaces_children() {
        let host = MemoryPlatform::default();
        let root = host.create_root("app");
        let p = host.create_element("p");
        host.insert(p, root, None);
        host.set_element_text(root, "plain");
        assert_eq!(host.inner_html(root), "plain");
        assert_eq!(host.parent_node(p), None);
    }
}
