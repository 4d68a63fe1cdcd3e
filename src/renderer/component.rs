//! Component mount, update and unmount.
//!
//! Each instance owns one render effect. Its scheduler does not re-render;
//! it queues the instance's update job, so writes are batched until the
//! next flush.

use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use crate::component::{ComponentInstance, Scope};
use crate::error::Result;
use crate::reactivity::{EffectOptions, ReactiveEffect};
use crate::renderer::{Platform, Renderer};
use crate::scheduler::Job;
use crate::types::ElementHandle;
use crate::vnode::{Children, VNode, VNodeType};

impl<P: Platform + 'static> Renderer<P> {
    pub(super) fn mount_component(
        &self,
        vnode: &VNode,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
        scope: Scope<'_>,
    ) -> Result<()> {
        let VNodeType::Component(definition) = vnode.ty() else {
            return Ok(());
        };
        let instance = ComponentInstance::new(self.runtime(), definition.clone(), vnode, scope);
        vnode.set_component(Some(instance.clone()));
        debug!(uid = instance.uid(), component = instance.name(), "mounting component");

        instance.setup()?;
        self.setup_render_effect(&instance, container, anchor)
    }

    fn setup_render_effect(
        &self,
        instance: &Rc<ComponentInstance>,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
    ) -> Result<()> {
        let runtime = self.runtime().clone();
        let uid = instance.uid();

        let body = {
            let instance = Rc::downgrade(instance);
            let renderer = self.downgrade();
            move || -> Result<()> {
                let (Some(instance), Some(inner)) = (instance.upgrade(), renderer.upgrade()) else {
                    return Ok(());
                };
                Renderer::from_inner(inner).component_update_fn(&instance, container, anchor)
            }
        };

        let job = {
            let instance = Rc::downgrade(instance);
            Job::new(uid, move || run_job(&instance))
        };

        let scheduler = {
            let instance = Rc::downgrade(instance);
            move || {
                let job = instance.upgrade().and_then(|i| i.job());
                if let Some(job) = job {
                    runtime.queue_job(job);
                }
            }
        };

        let effect = ReactiveEffect::new(self.runtime(), body, EffectOptions::new().scheduler(scheduler));
        instance.set_update(effect.clone(), job);
        effect.run()
    }

    /// Body of the render effect: first mount, or re-render and patch.
    fn component_update_fn(
        &self,
        instance: &Rc<ComponentInstance>,
        container: ElementHandle,
        anchor: Option<ElementHandle>,
    ) -> Result<()> {
        if !instance.is_mounted() {
            let subtree = instance.render_subtree();
            self.patch(None, &subtree, container, anchor, instance.scope())?;
            instance.vnode().set_el(subtree.el());
            instance.set_subtree(subtree);
            instance.set_mounted(true);
            return Ok(());
        }

        // a parent-driven update carries the new vnode
        let vnode = match instance.take_next() {
            Some(next) => {
                next.set_el(instance.vnode().el());
                instance.adopt_vnode(next.clone());
                next
            }
            None => instance.vnode(),
        };

        let next_tree = instance.render_subtree();
        let prev_tree = instance.subtree();
        trace!(uid = instance.uid(), "re-rendering component");

        let (parent, anchor) = match &prev_tree {
            Some(prev) => (
                prev.el().and_then(|el| self.host().parent_node(el)).unwrap_or(container),
                self.next_host_node(prev),
            ),
            None => (container, anchor),
        };
        self.patch(prev_tree.as_ref(), &next_tree, parent, anchor, instance.scope())?;
        vnode.set_el(next_tree.el());
        update_ancestor_els(instance, next_tree.el());
        instance.set_subtree(next_tree);
        Ok(())
    }

    /// The parent re-rendered and produced `n2` for the instance behind `n1`.
    pub(super) fn update_component(&self, n1: &VNode, n2: &VNode) -> Result<()> {
        let Some(instance) = n1.component() else {
            return Ok(());
        };
        n2.set_component(Some(instance.clone()));

        if should_update_component(n1, n2) {
            instance.set_next(Some(n2.clone()));
            // the update runs now; a queued copy would render twice
            self.runtime().scheduler().invalidate_job(instance.uid());
            instance.run_update()
        } else {
            n2.set_el(n1.el());
            instance.set_vnode(n2.clone());
            Ok(())
        }
    }

    pub(super) fn unmount_component(&self, instance: &Rc<ComponentInstance>, remove: bool) {
        instance.stop();
        if let Some(subtree) = instance.subtree() {
            self.unmount(&subtree, remove);
        }
        debug!(uid = instance.uid(), component = instance.name(), "unmounted component");
    }
}

/// Ancestors whose subtree root is this component share its root host node.
fn update_ancestor_els(instance: &Rc<ComponentInstance>, el: Option<ElementHandle>) {
    let mut current = instance.clone();
    while let Some(parent) = current.parent() {
        let is_root = parent
            .subtree()
            .is_some_and(|subtree| subtree.ptr_eq(&current.vnode()));
        if !is_root {
            break;
        }
        parent.vnode().set_el(el);
        current = parent;
    }
}

fn run_job(instance: &Weak<ComponentInstance>) {
    let Some(instance) = instance.upgrade() else {
        return;
    };
    if let Err(err) = instance.run_update() {
        error!(uid = instance.uid(), %err, "component update failed");
    }
}

/// Children (slots) always force an update; otherwise props are compared
/// key by key.
fn should_update_component(n1: &VNode, n2: &VNode) -> bool {
    let has_children = |v: &VNode| !matches!(v.children(), Children::None);
    if has_children(n1) || has_children(n2) {
        return true;
    }
    match (n1.props(), n2.props()) {
        (None, None) => false,
        (Some(prev), Some(next)) => {
            if prev.ptr_eq(next) {
                return false;
            }
            prev.len() != next.len()
                || next
                    .entries()
                    .iter()
                    .any(|(key, value)| !prev.contains_key(key) || !prev.get(key).same_value(value))
        }
        (Some(props), None) | (None, Some(props)) => !props.is_empty(),
    }
}
