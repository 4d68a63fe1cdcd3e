//! Renderer / Reconciler.
//!
//! Turns vnode trees into host nodes through a [`Platform`] adapter and keeps
//! them in sync:
//!
//! ```text
//! patch(n1, n2)
//!   ├── Text       → create / set_text
//!   ├── Fragment   → children between two empty text anchors
//!   ├── Element    → mount_element / patch_element (props + children)
//!   └── Component  → mount_component / update_component
//! ```
//!
//! Children lists are reconciled with a keyed diff that uses the longest
//! increasing subsequence of matched positions to keep host moves minimal.

mod children;
mod component;
mod element;
pub mod lis;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::app::{App, AppContext};
use crate::component::{Component, Scope};
use crate::error::Result;
use crate::runtime::Runtime;
use crate::types::{ElementHandle, Value};
use crate::vnode::{Children, ShapeFlags, VNode, VNodeType, is_same_vnode_type};

pub use lis::longest_increasing_subsequence;

// =============================================================================
// Platform adapter
// =============================================================================

/// Host operations the renderer is built on.
///
/// Handles are opaque to the renderer. Methods take `&self`; adapters keep
/// their node storage behind interior mutability.
pub trait Platform {
    fn create_element(&self, tag: &str) -> ElementHandle;

    fn create_text(&self, text: &str) -> ElementHandle;

    /// Replace the content of a text node.
    fn set_text(&self, node: ElementHandle, text: &str);

    /// Apply one prop. `next` of `None`, `Null` or `Undefined` removes it.
    /// Props named `on` + uppercase letter are event listeners.
    fn patch_prop(&self, el: ElementHandle, key: &str, prev: Option<&Value>, next: Option<&Value>);

    /// Insert (or move) `el` into `parent` before `anchor`; `None` appends.
    fn insert(&self, el: ElementHandle, parent: ElementHandle, anchor: Option<ElementHandle>);

    /// Detach `el` from its parent.
    fn remove(&self, el: ElementHandle);

    /// Replace all children of `el` with text.
    fn set_element_text(&self, el: ElementHandle, text: &str);

    fn parent_node(&self, node: ElementHandle) -> Option<ElementHandle>;

    fn next_sibling(&self, node: ElementHandle) -> Option<ElementHandle>;

    /// Resolve a container selector.
    fn select(&self, selector: &str) -> Option<ElementHandle>;
}

impl<P: Platform + ?Sized> Platform for Rc<P> {
    fn create_element(&self, tag: &str) -> ElementHandle {
        (**self).create_element(tag)
    }

    fn create_text(&self, text: &str) -> ElementHandle {
        (**self).create_text(text)
    }

    fn set_text(&self, node: ElementHandle, text: &str) {
        (**self).set_text(node, text)
    }

    fn patch_prop(&self, el: ElementHandle, key: &str, prev: Option<&Value>, next: Option<&Value>) {
        (**self).patch_prop(el, key, prev, next)
    }

    fn insert(&self, el: ElementHandle, parent: ElementHandle, anchor: Option<ElementHandle>) {
        (**self).insert(el, parent, anchor)
    }

    fn remove(&self, el: ElementHandle) {
        (**self).remove(el)
    }

    fn set_element_text(&self, el: ElementHandle, text: &str) {
        (**self).set_element_text(el, text)
    }

    fn parent_node(&self, node: ElementHandle) -> Option<ElementHandle> {
        (**self).parent_node(node)
    }

    fn next_sibling(&self, node: ElementHandle) -> Option<ElementHandle> {
        (**self).next_sibling(node)
    }

    fn select(&self, selector: &str) -> Option<ElementHandle> {
        (**self).select(selector)
    }
}

// =============================================================================
// Renderer
// =============================================================================

pub(crate) struct RendererInner<P> {
    runtime: Runtime,
    host: P,
    /// Root vnode per container.
    roots: RefCell<HashMap<ElementHandle, VNode>>,
    /// App context for trees rendered through `render` directly.
    default_app: Rc<AppContext>,
}

/// Reconciler bound to one platform adapter.
pub struct Renderer<P: Platform + 'static> {
    inner: Rc<RendererInner<P>>,
}

impl<P: Platform + 'static> Clone for Renderer<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: Platform + 'static> Renderer<P> {
    pub fn new(runtime: &Runtime, host: P) -> Self {
        Self {
            inner: Rc::new(RendererInner {
                runtime: runtime.clone(),
                host,
                roots: RefCell::new(HashMap::new()),
                default_app: Rc::new(AppContext::default()),
            }),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn host(&self) -> &P {
        &self.inner.host
    }

    /// Application rooted at `root`.
    pub fn create_app(&self, root: Rc<Component>) -> App<P> {
        App::new(self.clone(), root)
    }

    /// Render `vnode` into `container`, patching against what was rendered
    /// there before. `None` unmounts.
    pub fn render(&self, vnode: Option<VNode>, container: ElementHandle) -> Result<()> {
        let app = self.inner.default_app.clone();
        self.render_in(vnode, container, &app)
    }

    pub(crate) fn render_in(
        &self,
        vnode: Option<VNode>,
        container: ElementHandle,
        app: &Rc<AppContext>,
    ) -> Result<()> {
        let previous = self.inner.roots.borrow().get(&container).cloned();
        match vnode {
            Some(vnode) => {
                let scope = Scope { parent: None, app };
                self.patch(previous.as_ref(), &vnode, container, None, scope)?;
                self.inner.roots.borrow_mut().insert(container, vnode);
            }
            None => {
                if let Some(previous) = previous {
                    debug!(%container, "unmounting root");
                    self.unmount(&previous, true);
                    self.inner.roots.borrow_mut().remove(&container);
                }
            }
        }
        Ok(())
    }

    /// Root vnode currently rendered into `container`.
    pub fn root(&self, container: ElementHandle) -> Option<VNode> {
        self.inner.roots.borrow().get(&container).cloned()
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<RendererInner<P>> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Rc<RendererInner<P>>) -> Self {
        Self { inner }
    }

    // =========================================================================
    // Patch
    // =========================================================================

    /// Bring the host tree for `n1` in line with `n2` (mount when `n1` is
    /// `None`).
    pub(crate) fn patch(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
        scope: Scope<'_>,
    ) -> Result<()> {
        let mut n1 = n1;
        let mut anchor = anchor;
        if let Some(old) = n1 {
            if old.ptr_eq(n2) {
                return Ok(());
            }
            if !is_same_vnode_type(old, n2) {
                anchor = self.next_host_node(old);
                self.unmount(old, true);
                n1 = None;
            }
        }

        match n2.ty() {
            VNodeType::Text => {
                self.process_text(n1, n2, container, anchor);
                Ok(())
            }
            VNodeType::Fragment => self.process_fragment(n1, n2, container, anchor, scope),
            VNodeType::Element(_) => match n1 {
                None => self.mount_element(n2, container, anchor, scope),
                Some(n1) => self.patch_element(n1, n2, scope),
            },
            VNodeType::Component(_) => match n1 {
                None => self.mount_component(n2, container, anchor, scope),
                Some(n1) => self.update_component(n1, n2),
            },
        }
    }

    fn process_text(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
    ) {
        let host = &self.inner.host;
        let text = text_of(n2);
        match n1 {
            None => {
                let el = host.create_text(text);
                n2.set_el(Some(el));
                host.insert(el, container, anchor);
            }
            Some(n1) => {
                n2.set_el(n1.el());
                if text_of(n1) != text {
                    if let Some(el) = n2.el() {
                        host.set_text(el, text);
                    }
                }
            }
        }
    }

    fn process_fragment(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
        scope: Scope<'_>,
    ) -> Result<()> {
        let host = &self.inner.host;
        match n1 {
            None => {
                let start = host.create_text("");
                let end = host.create_text("");
                n2.set_el(Some(start));
                n2.set_anchor(Some(end));
                host.insert(start, container, anchor);
                host.insert(end, container, anchor);
                self.mount_children(n2.children().as_array(), container, Some(end), scope)
            }
            Some(n1) => {
                n2.set_el(n1.el());
                n2.set_anchor(n1.anchor());
                self.patch_children(n1, n2, container, n2.anchor(), scope)
            }
        }
    }

    // =========================================================================
    // Unmount & move
    // =========================================================================

    /// Tear down `vnode`. With `remove` false only component effects are
    /// stopped; the host nodes go away with an ancestor.
    pub(crate) fn unmount(&self, vnode: &VNode, remove: bool) {
        let host = &self.inner.host;
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(instance) = vnode.component() {
                    self.unmount_component(&instance, remove);
                }
            }
            VNodeType::Fragment => {
                for child in vnode.children().as_array() {
                    self.unmount(child, remove);
                }
                if remove {
                    for marker in [vnode.el(), vnode.anchor()].into_iter().flatten() {
                        host.remove(marker);
                    }
                }
            }
            VNodeType::Element(_) => {
                for child in vnode.children().as_array() {
                    self.unmount(child, false);
                }
                if remove {
                    if let Some(el) = vnode.el() {
                        host.remove(el);
                    }
                }
            }
            VNodeType::Text => {
                if remove {
                    if let Some(el) = vnode.el() {
                        host.remove(el);
                    }
                }
            }
        }
    }

    fn unmount_children(&self, children: &[VNode]) {
        for child in children {
            self.unmount(child, true);
        }
    }

    /// Re-insert every host node `vnode` owns before `anchor`.
    fn move_vnode(&self, vnode: &VNode, container: ElementHandle, anchor: Option<ElementHandle>) {
        let host = &self.inner.host;
        if vnode.shape_flags().contains(ShapeFlags::STATEFUL_COMPONENT) {
            if let Some(subtree) = vnode.component().and_then(|i| i.subtree()) {
                self.move_vnode(&subtree, container, anchor);
            }
            return;
        }
        if let VNodeType::Fragment = vnode.ty() {
            if let Some(start) = vnode.el() {
                host.insert(start, container, anchor);
            }
            for child in vnode.children().as_array() {
                self.move_vnode(child, container, anchor);
            }
            if let Some(end) = vnode.anchor() {
                host.insert(end, container, anchor);
            }
            return;
        }
        if let Some(el) = vnode.el() {
            host.insert(el, container, anchor);
        }
    }

    /// Host node right after everything `vnode` owns.
    fn next_host_node(&self, vnode: &VNode) -> Option<ElementHandle> {
        if vnode.shape_flags().contains(ShapeFlags::STATEFUL_COMPONENT) {
            return vnode
                .component()
                .and_then(|instance| instance.subtree())
                .and_then(|subtree| self.next_host_node(&subtree));
        }
        vnode
            .anchor()
            .or(vnode.el())
            .and_then(|node| self.inner.host.next_sibling(node))
    }
}

fn text_of(vnode: &VNode) -> &str {
    match vnode.children() {
        Children::Text(text) => text,
        _ => "",
    }
}
