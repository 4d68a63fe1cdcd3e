//! Slots - vnode-producing functions a parent passes to a child.
//!
//! A component vnode's children become its slots:
//! - a [`Slots`] map gives named (optionally scoped) slots
//! - an array or text becomes the `default` slot

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::types::Value;
use crate::vnode::{Children, VNode, create_text_vnode, create_vnode, fragment};

/// Slot function; receives the slot props.
pub type SlotFn = Rc<dyn Fn(&Value) -> Vec<VNode>>;

/// Named slot functions.
#[derive(Clone, Default)]
pub struct Slots {
    slots: Rc<IndexMap<Rc<str>, SlotFn>>,
}

impl Slots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<Rc<str>>, slot: impl Fn(&Value) -> Vec<VNode> + 'static) -> Self {
        Rc::make_mut(&mut self.slots).insert(name.into(), Rc::new(slot));
        self
    }

    pub fn get(&self, name: &str) -> Option<SlotFn> {
        self.slots.get(name).cloned()
    }

    pub fn names(&self) -> Vec<Rc<str>> {
        self.slots.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Normalise component children into slots.
    pub(crate) fn from_children(children: &Children) -> Self {
        match children {
            Children::None => Slots::new(),
            Children::Slots(slots) => slots.clone(),
            Children::Array(items) => {
                let items = items.clone();
                Slots::new().with("default", move |_| items.iter().map(fresh_copy).collect())
            }
            Children::Text(text) => {
                let text = text.clone();
                Slots::new().with("default", move |_| vec![create_text_vnode(text.clone())])
            }
        }
    }
}

/// Unmounted copy of `vnode`, so a slot can render the same children on
/// every call without sharing mount state between renders.
fn fresh_copy(vnode: &VNode) -> VNode {
    let children = match vnode.children() {
        Children::Array(items) => Children::Array(items.iter().map(fresh_copy).collect()),
        other => other.clone(),
    };
    create_vnode(vnode.ty().clone(), vnode.props().cloned(), children)
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.keys()).finish()
    }
}

/// Render slot `name` with `props`, wrapped in a fragment. `None` when the
/// slot does not exist.
pub fn render_slots(slots: &Slots, name: &str, props: impl Into<Value>) -> Option<VNode> {
    let slot = slots.get(name)?;
    Some(fragment(slot(&props.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::h;
    use crate::vnode::VNodeType;

    #[test]
    fn test_named_and_scoped_slots() {
        let slots = Slots::new()
            .with("header", |_| vec![h("h1", None, "title")])
            .with("item", |props| vec![h("li", None, props.to_display_string())]);

        let header = render_slots(&slots, "header", Value::Undefined).expect("header slot");
        assert!(matches!(header.ty(), VNodeType::Fragment));
        assert_eq!(header.children().as_array().len(), 1);

        let item = render_slots(&slots, "item", "x").expect("item slot");
        match item.children().as_array()[0].children() {
            Children::Text(text) => assert_eq!(&**text, "x"),
            _ => panic!("expected text children"),
        }

        assert!(render_slots(&slots, "missing", Value::Undefined).is_none());
    }

    #[test]
    fn test_array_children_become_default_slot() {
        let slots = Slots::from_children(&Children::Array(vec![h("p", None, "a")]));
        assert_eq!(slots.names().len(), 1);

        let first = render_slots(&slots, "default", Value::Undefined).expect("default");
        let second = render_slots(&slots, "default", Value::Undefined).expect("default");
        assert!(!first.children().as_array()[0].ptr_eq(&second.children().as_array()[0]));
    }
}
