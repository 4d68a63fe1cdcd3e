//! Element mount and patch.

use crate::component::Scope;
use crate::error::Result;
use crate::renderer::{Platform, Renderer};
use crate::types::{ElementHandle, Record, Value};
use crate::vnode::{Children, VNode, VNodeType};

/// Props consumed by the renderer itself, never forwarded to the host.
fn is_reserved_prop(key: &str) -> bool {
    key == "key"
}

impl<P: Platform + 'static> Renderer<P> {
    pub(super) fn mount_element(
        &self,
        vnode: &VNode,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
        scope: Scope<'_>,
    ) -> Result<()> {
        let VNodeType::Element(tag) = vnode.ty() else {
            return Ok(());
        };
        let host = self.host();
        let el = host.create_element(tag);
        vnode.set_el(Some(el));

        if let Some(props) = vnode.props() {
            for (key, value) in props.entries() {
                if !is_reserved_prop(&key) {
                    host.patch_prop(el, &key, None, Some(&value));
                }
            }
        }

        match vnode.children() {
            Children::Text(text) => host.set_element_text(el, text),
            Children::Array(items) => self.mount_children(items, el, None, scope)?,
            Children::None | Children::Slots(_) => {}
        }

        host.insert(el, container, anchor);
        Ok(())
    }

    pub(super) fn mount_children(
        &self,
        children: &[VNode],
        container: ElementHandle,
        anchor: Option<ElementHandle>,
        scope: Scope<'_>,
    ) -> Result<()> {
        for child in children {
            self.patch(None, child, container, anchor, scope)?;
        }
        Ok(())
    }

    pub(super) fn patch_element(&self, n1: &VNode, n2: &VNode, scope: Scope<'_>) -> Result<()> {
        let el = n1.el();
        n2.set_el(el);
        let Some(el) = el else {
            return Ok(());
        };
        self.patch_children(n1, n2, el, None, scope)?;
        self.patch_props(el, n1.props(), n2.props());
        Ok(())
    }

    /// Forward changed and removed props to the host. Skipped entirely when
    /// both vnodes share the same props record.
    pub(super) fn patch_props(&self, el: ElementHandle, old: Option<&Record>, new: Option<&Record>) {
        if let (Some(old), Some(new)) = (old, new) {
            if old.ptr_eq(new) {
                return;
            }
        }
        let host = self.host();

        if let Some(new) = new {
            for (key, next) in new.entries() {
                if is_reserved_prop(&key) {
                    continue;
                }
                let prev: Option<Value> = old.filter(|o| o.contains_key(&key)).map(|o| o.get(&key));
                if prev.as_ref() != Some(&next) {
                    host.patch_prop(el, &key, prev.as_ref(), Some(&next));
                }
            }
        }

        if let Some(old) = old {
            for (key, prev) in old.entries() {
                if is_reserved_prop(&key) {
                    continue;
                }
                if !new.is_some_and(|n| n.contains_key(&key)) {
                    host.patch_prop(el, &key, Some(&prev), None);
                }
            }
        }
    }
}
