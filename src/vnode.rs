//! Virtual Node Model.
//!
//! A [`VNode`] describes one element, text node, fragment or component.
//! Its shape never changes after creation; only the mount bookkeeping does
//! (`el`, `anchor`, `component`), filled in by the renderer.
//!
//! # Example
//!
//! ```
//! use spark_vdom::{h, props, Children};
//!
//! let list = h(
//!     "ul",
//!     Some(props! { "id" => "list" }),
//!     vec![
//!         h("li", Some(props! { "key" => "a" }), "A"),
//!         h("li", Some(props! { "key" => "b" }), "B"),
//!     ],
//! );
//! assert!(matches!(list.children(), Children::Array(items) if items.len() == 2));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::component::{Component, ComponentInstance, Slots};
use crate::types::{ElementHandle, Key, Record};

bitflags! {
    /// Classification of a vnode and its children.
    ///
    /// The type bit and the children bit combine; `TEXT_CHILDREN` and
    /// `ARRAY_CHILDREN` never appear together.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShapeFlags: u8 {
        const ELEMENT            = 1 << 0;
        const STATEFUL_COMPONENT = 1 << 2;
        const TEXT_CHILDREN      = 1 << 3;
        const ARRAY_CHILDREN     = 1 << 4;
        const SLOT_CHILDREN      = 1 << 5;
    }
}

// =============================================================================
// Type & Children
// =============================================================================

/// What a vnode renders.
#[derive(Clone)]
pub enum VNodeType {
    Element(Rc<str>),
    Component(Rc<Component>),
    /// Renders only its children.
    Fragment,
    /// Renders a raw text node.
    Text,
}

impl VNodeType {
    /// Same tag, same component definition, or same marker.
    pub fn same(&self, other: &VNodeType) -> bool {
        match (self, other) {
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Component(a), VNodeType::Component(b)) => Rc::ptr_eq(a, b),
            (VNodeType::Fragment, VNodeType::Fragment) | (VNodeType::Text, VNodeType::Text) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "<{tag}>"),
            VNodeType::Component(def) => write!(f, "Component({})", def.name().unwrap_or("anonymous")),
            VNodeType::Fragment => f.write_str("Fragment"),
            VNodeType::Text => f.write_str("Text"),
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(tag.into())
    }
}

impl From<Rc<Component>> for VNodeType {
    fn from(component: Rc<Component>) -> Self {
        VNodeType::Component(component)
    }
}

impl From<&Rc<Component>> for VNodeType {
    fn from(component: &Rc<Component>) -> Self {
        VNodeType::Component(component.clone())
    }
}

/// Children of a vnode.
#[derive(Clone, Default)]
pub enum Children {
    #[default]
    None,
    Text(Rc<str>),
    Array(Vec<VNode>),
    /// Slot functions passed to a component.
    Slots(Slots),
}

impl Children {
    pub fn is_none(&self) -> bool {
        matches!(self, Children::None)
    }

    pub fn as_array(&self) -> &[VNode] {
        match self {
            Children::Array(items) => items,
            _ => &[],
        }
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(text.into())
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(text.into())
    }
}

impl From<Rc<str>> for Children {
    fn from(text: Rc<str>) -> Self {
        Children::Text(text)
    }
}

impl From<Vec<VNode>> for Children {
    fn from(items: Vec<VNode>) -> Self {
        Children::Array(items)
    }
}

impl From<VNode> for Children {
    fn from(item: VNode) -> Self {
        Children::Array(vec![item])
    }
}

impl From<Slots> for Children {
    fn from(slots: Slots) -> Self {
        Children::Slots(slots)
    }
}

// =============================================================================
// VNode
// =============================================================================

struct VNodeInner {
    ty: VNodeType,
    props: Option<Record>,
    children: Children,
    key: Option<Key>,
    shape_flags: ShapeFlags,
    el: Cell<Option<ElementHandle>>,
    anchor: Cell<Option<ElementHandle>>,
    component: RefCell<Option<Rc<ComponentInstance>>>,
}

/// Shared handle to a virtual node.
#[derive(Clone)]
pub struct VNode {
    inner: Rc<VNodeInner>,
}

impl VNode {
    pub fn ty(&self) -> &VNodeType {
        &self.inner.ty
    }

    pub fn props(&self) -> Option<&Record> {
        self.inner.props.as_ref()
    }

    pub fn children(&self) -> &Children {
        &self.inner.children
    }

    pub fn key(&self) -> Option<&Key> {
        self.inner.key.as_ref()
    }

    pub fn shape_flags(&self) -> ShapeFlags {
        self.inner.shape_flags
    }

    /// Host node this vnode is mounted as (the start anchor for fragments,
    /// the subtree's root node for components).
    pub fn el(&self) -> Option<ElementHandle> {
        self.inner.el.get()
    }

    pub(crate) fn set_el(&self, el: Option<ElementHandle>) {
        self.inner.el.set(el);
    }

    /// End anchor of a mounted fragment.
    pub fn anchor(&self) -> Option<ElementHandle> {
        self.inner.anchor.get()
    }

    pub(crate) fn set_anchor(&self, anchor: Option<ElementHandle>) {
        self.inner.anchor.set(anchor);
    }

    /// Instance of a mounted component vnode.
    pub fn component(&self) -> Option<Rc<ComponentInstance>> {
        self.inner.component.borrow().clone()
    }

    pub(crate) fn set_component(&self, instance: Option<Rc<ComponentInstance>>) {
        *self.inner.component.borrow_mut() = instance;
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("VNode");
        out.field("type", &self.inner.ty);
        if let Some(key) = &self.inner.key {
            out.field("key", key);
        }
        match &self.inner.children {
            Children::None => {}
            Children::Text(text) => {
                out.field("text", text);
            }
            Children::Array(items) => {
                out.field("children", items);
            }
            Children::Slots(slots) => {
                out.field("slots", &slots.names());
            }
        }
        out.finish()
    }
}

/// Same type and same key: the diff may patch one into the other.
pub fn is_same_vnode_type(a: &VNode, b: &VNode) -> bool {
    a.inner.ty.same(&b.inner.ty) && a.inner.key == b.inner.key
}

// =============================================================================
// Builders
// =============================================================================

/// Create a vnode. The type bit comes from `ty`, the children bit from
/// `children`; `key` is lifted out of `props.key`.
pub fn create_vnode(
    ty: impl Into<VNodeType>,
    props: Option<Record>,
    children: impl Into<Children>,
) -> VNode {
    let ty = ty.into();
    let children = match (&ty, children.into()) {
        // fragments own no element to hold text
        (VNodeType::Fragment, Children::Text(text)) => Children::Array(vec![create_text_vnode(text)]),
        (_, children) => children,
    };

    let mut shape_flags = match &ty {
        VNodeType::Element(_) => ShapeFlags::ELEMENT,
        VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
        VNodeType::Fragment | VNodeType::Text => ShapeFlags::empty(),
    };
    match &children {
        Children::None => {}
        Children::Text(_) => shape_flags |= ShapeFlags::TEXT_CHILDREN,
        Children::Array(_) => shape_flags |= ShapeFlags::ARRAY_CHILDREN,
        Children::Slots(_) => shape_flags |= ShapeFlags::SLOT_CHILDREN,
    }

    let key = props.as_ref().and_then(|p| Key::from_value(&p.get("key")));

    VNode {
        inner: Rc::new(VNodeInner {
            ty,
            props,
            children,
            key,
            shape_flags,
            el: Cell::new(None),
            anchor: Cell::new(None),
            component: RefCell::new(None),
        }),
    }
}

/// Shorthand for [`create_vnode`].
pub fn h(ty: impl Into<VNodeType>, props: Option<Record>, children: impl Into<Children>) -> VNode {
    create_vnode(ty, props, children)
}

/// Raw text node.
pub fn create_text_vnode(text: impl Into<Rc<str>>) -> VNode {
    create_vnode(VNodeType::Text, None, Children::Text(text.into()))
}

/// Fragment over `children`.
pub fn fragment(children: Vec<VNode>) -> VNode {
    create_vnode(VNodeType::Fragment, None, children)
}

/// Fragment with a key, for keyed lists of fragments.
pub fn keyed_fragment(key: impl Into<Key>, children: Vec<VNode>) -> VNode {
    let props = Record::new().with("key", key_value(key.into()));
    create_vnode(VNodeType::Fragment, Some(props), children)
}

fn key_value(key: Key) -> crate::types::Value {
    match key {
        Key::Str(s) => s.into(),
        Key::Int(n) => n.into(),
    }
}

/// Build a props [`Record`] from `key => value` pairs.
///
/// ```
/// use spark_vdom::{props, Value};
///
/// let p = props! { "id" => "app", "count" => 3 };
/// assert_eq!(p.get("count"), Value::from(3));
/// ```
#[macro_export]
macro_rules! props {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let record = $crate::Record::new();
        $( record.set($key, $value); )+
        record
    }};
}
