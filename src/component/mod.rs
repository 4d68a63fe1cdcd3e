//! Components - definitions, instances and the contexts user code sees.
//!
//! - [`Component`] - a definition: `setup`, `render`, `template`, `name`
//! - [`ComponentInstance`] - one mounted occurrence of a definition
//! - [`SetupContext`] - what `setup` receives besides its props
//! - [`RenderContext`] - the public instance a render function reads from
//!
//! # Example
//!
//! ```
//! use spark_vdom::{Component, Record, SetupResult, h};
//!
//! let counter = Component::builder()
//!     .name("Counter")
//!     .setup(|_props, ctx| {
//!         let count = ctx.runtime().new_ref(0);
//!         SetupResult::State(Record::new().with("count", count))
//!     })
//!     .render(|ctx| h("p", None, ctx.get("count").to_display_string()))
//!     .build();
//! assert_eq!(counter.name(), Some("Counter"));
//! ```

pub mod emit;
pub mod inject;
pub mod slots;

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::app::AppContext;
use crate::error::Result;
use crate::reactivity::{ProxyRefs, Reactive, ReactiveEffect, proxy_refs};
use crate::runtime::Runtime;
use crate::scheduler::{Job, JobId};
use crate::types::{ElementHandle, Record, Value};
use crate::vnode::{VNode, create_text_vnode};

pub use emit::{Emit, handler_name};
pub use inject::Provides;
pub use slots::{SlotFn, Slots, render_slots};

/// Setup function: `(props, ctx) -> state | render | nothing`.
pub type SetupFn = Rc<dyn Fn(&Reactive, &SetupContext) -> SetupResult>;

/// Render function: produces the component's subtree.
pub type RenderFn = Rc<dyn Fn(&RenderContext) -> VNode>;

/// What `setup` hands back.
#[derive(Clone, Default)]
pub enum SetupResult {
    #[default]
    None,
    /// State exposed to the render function (refs are unwrapped on access).
    State(Record),
    /// A render function that takes precedence over the definition's.
    Render(RenderFn),
}

impl From<Record> for SetupResult {
    fn from(state: Record) -> Self {
        SetupResult::State(state)
    }
}

// =============================================================================
// Component definition
// =============================================================================

/// A component definition.
pub struct Component {
    name: Option<Rc<str>>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
    template: Option<Rc<str>>,
    /// Render function compiled from `template`, once per definition.
    compiled: OnceCell<RenderFn>,
}

impl Component {
    pub fn builder() -> ComponentBuilder {
        ComponentBuilder::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn has_render(&self) -> bool {
        self.render.is_some()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("setup", &self.setup.is_some())
            .field("render", &self.render.is_some())
            .field("template", &self.template)
            .finish()
    }
}

/// Builder for [`Component`].
#[derive(Default)]
pub struct ComponentBuilder {
    name: Option<Rc<str>>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
    template: Option<Rc<str>>,
}

impl ComponentBuilder {
    pub fn name(mut self, name: impl Into<Rc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn setup(mut self, setup: impl Fn(&Reactive, &SetupContext) -> SetupResult + 'static) -> Self {
        self.setup = Some(Rc::new(setup));
        self
    }

    pub fn render(mut self, render: impl Fn(&RenderContext) -> VNode + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    /// Template compiled on first mount when no render function is given.
    pub fn template(mut self, template: impl Into<Rc<str>>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn build(self) -> Rc<Component> {
        Rc::new(Component {
            name: self.name,
            setup: self.setup,
            render: self.render,
            template: self.template,
            compiled: OnceCell::new(),
        })
    }
}

// =============================================================================
// Component instance
// =============================================================================

/// Parent component and app context a vnode is mounted under.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub(crate) parent: Option<&'a Rc<ComponentInstance>>,
    pub(crate) app: &'a Rc<AppContext>,
}

/// One mounted component.
pub struct ComponentInstance {
    uid: JobId,
    runtime: Runtime,
    definition: Rc<Component>,
    app: Rc<AppContext>,
    parent: Option<Weak<ComponentInstance>>,
    vnode: RefCell<VNode>,
    next: RefCell<Option<VNode>>,
    /// Raw props; identity is stable across updates.
    props: Record,
    props_proxy: Reactive,
    slots: RefCell<Slots>,
    setup_state: RefCell<Option<ProxyRefs>>,
    provides: RefCell<Provides>,
    subtree: RefCell<Option<VNode>>,
    is_mounted: Cell<bool>,
    render: RefCell<Option<RenderFn>>,
    update: RefCell<Option<ReactiveEffect<Result<()>>>>,
    job: RefCell<Option<Job>>,
}

impl ComponentInstance {
    pub(crate) fn new(
        runtime: &Runtime,
        definition: Rc<Component>,
        vnode: &VNode,
        scope: Scope<'_>,
    ) -> Rc<Self> {
        static UID: AtomicU64 = AtomicU64::new(1);

        let props: Record = vnode
            .props()
            .map(|p| p.entries().into_iter().collect())
            .unwrap_or_default();
        let provides = match scope.parent {
            Some(parent) => parent.provides(),
            None => scope.app.provides().clone(),
        };

        Rc::new(Self {
            uid: UID.fetch_add(1, Ordering::Relaxed),
            runtime: runtime.clone(),
            props_proxy: runtime.shallow_reactive(&props),
            props,
            definition,
            app: scope.app.clone(),
            parent: scope.parent.map(Rc::downgrade),
            vnode: RefCell::new(vnode.clone()),
            next: RefCell::new(None),
            slots: RefCell::new(Slots::from_children(vnode.children())),
            setup_state: RefCell::new(None),
            provides: RefCell::new(provides),
            subtree: RefCell::new(None),
            is_mounted: Cell::new(false),
            render: RefCell::new(None),
            update: RefCell::new(None),
            job: RefCell::new(None),
        })
    }

    pub fn uid(&self) -> JobId {
        self.uid
    }

    pub fn name(&self) -> Option<&str> {
        self.definition.name()
    }

    pub fn definition(&self) -> &Rc<Component> {
        &self.definition
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn parent(&self) -> Option<Rc<ComponentInstance>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn app(&self) -> &Rc<AppContext> {
        &self.app
    }

    pub(crate) fn scope<'a>(self: &'a Rc<Self>) -> Scope<'a> {
        Scope {
            parent: Some(self),
            app: &self.app,
        }
    }

    pub fn vnode(&self) -> VNode {
        self.vnode.borrow().clone()
    }

    pub(crate) fn set_vnode(&self, vnode: VNode) {
        *self.vnode.borrow_mut() = vnode;
    }

    pub(crate) fn set_next(&self, next: Option<VNode>) {
        *self.next.borrow_mut() = next;
    }

    pub(crate) fn take_next(&self) -> Option<VNode> {
        self.next.borrow_mut().take()
    }

    /// Shallow-reactive props (reads track).
    pub fn props(&self) -> &Reactive {
        &self.props_proxy
    }

    pub fn slots(&self) -> Slots {
        self.slots.borrow().clone()
    }

    pub fn setup_state(&self) -> Option<ProxyRefs> {
        self.setup_state.borrow().clone()
    }

    /// Provides visible to this instance's children.
    pub fn provides(&self) -> Provides {
        self.provides.borrow().clone()
    }

    /// Last rendered tree.
    pub fn subtree(&self) -> Option<VNode> {
        self.subtree.borrow().clone()
    }

    pub(crate) fn set_subtree(&self, subtree: VNode) {
        *self.subtree.borrow_mut() = Some(subtree);
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.is_mounted.set(mounted);
    }

    /// Root host node of the rendered subtree.
    pub fn el(&self) -> Option<ElementHandle> {
        self.vnode.borrow().el()
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Run `setup` and resolve the render function.
    pub(crate) fn setup(self: &Rc<Self>) -> Result<()> {
        if let Some(setup) = self.definition.setup.clone() {
            let result = {
                let _instance = InstanceGuard::enter(self);
                // reads in setup belong to no render effect
                let _untracked = self.runtime.tracker().enter(None);
                let props = self.runtime.shallow_readonly(&self.props_proxy);
                let ctx = SetupContext {
                    instance: self.clone(),
                };
                setup(&props, &ctx)
            };
            match result {
                SetupResult::None => {}
                SetupResult::State(state) => {
                    *self.setup_state.borrow_mut() = Some(proxy_refs(state));
                }
                SetupResult::Render(render) => {
                    *self.render.borrow_mut() = Some(render);
                }
            }
        }
        self.finish_setup()
    }

    fn finish_setup(&self) -> Result<()> {
        if self.render.borrow().is_some() {
            return Ok(());
        }
        let definition = &self.definition;
        let render = if let Some(render) = &definition.render {
            Some(render.clone())
        } else if let Some(compiled) = definition.compiled.get() {
            Some(compiled.clone())
        } else if let Some(template) = &definition.template {
            match self.runtime.compile(template) {
                Some(compiled) => {
                    let compiled = compiled?;
                    let _ = definition.compiled.set(compiled.clone());
                    Some(compiled)
                }
                None => {
                    warn!(component = self.name(), "no template compiler registered");
                    None
                }
            }
        } else {
            warn!(component = self.name(), "component is missing template or render function");
            None
        };
        *self.render.borrow_mut() = render;
        Ok(())
    }

    /// Call the render function with this instance as the current one.
    pub(crate) fn render_subtree(self: &Rc<Self>) -> VNode {
        let render = self.render.borrow().clone();
        let _instance = InstanceGuard::enter(self);
        match render {
            Some(render) => render(&RenderContext {
                instance: self.clone(),
            }),
            None => create_text_vnode(""),
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    pub(crate) fn set_update(&self, effect: ReactiveEffect<Result<()>>, job: Job) {
        *self.update.borrow_mut() = Some(effect);
        *self.job.borrow_mut() = Some(job);
    }

    /// The job queued by the render effect's scheduler.
    pub(crate) fn job(&self) -> Option<Job> {
        self.job.borrow().clone()
    }

    /// Re-run the render effect now. No-op once unmounted.
    pub(crate) fn run_update(&self) -> Result<()> {
        let effect = self.update.borrow().clone();
        match effect {
            Some(effect) if effect.is_active() => effect.run(),
            _ => Ok(()),
        }
    }

    /// Adopt a new vnode from the parent: props are updated in place (so
    /// readers are notified) and slots are replaced.
    pub(crate) fn adopt_vnode(&self, next: VNode) {
        let incoming = next.props().cloned().unwrap_or_default();
        for (key, value) in incoming.entries() {
            self.props_proxy.set(&key, value);
        }
        for key in self.props.keys() {
            if !incoming.contains_key(&key) {
                self.props_proxy.delete(&key);
            }
        }
        *self.slots.borrow_mut() = Slots::from_children(next.children());
        self.set_vnode(next);
    }

    /// Stop the render effect.
    pub(crate) fn stop(&self) {
        let effect = self.update.borrow().clone();
        if let Some(effect) = effect {
            effect.stop();
        }
        self.runtime.scheduler().invalidate_job(self.uid);
        self.is_mounted.set(false);
    }

    pub fn is_active(&self) -> bool {
        self.update
            .borrow()
            .as_ref()
            .is_some_and(|effect| effect.is_active())
    }

    // =========================================================================
    // Provide / inject
    // =========================================================================

    fn parent_provides(&self) -> Provides {
        match self.parent() {
            Some(parent) => parent.provides(),
            None => self.app.provides().clone(),
        }
    }

    /// Provide `value` to descendants under `key`.
    ///
    /// The first own `provide` gives this instance a layer of its own that
    /// still falls back to the parent's chain.
    pub fn provide(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) {
        let parent = self.parent_provides();
        let mut provides = self.provides.borrow_mut();
        if provides.ptr_eq(&parent) {
            *provides = Provides::child_of(&parent);
        }
        provides.set(key, value);
    }

    /// Look `key` up in the ancestors' chain.
    pub fn inject(&self, key: &str) -> Option<Value> {
        self.parent_provides().get(key)
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid)
            .field("name", &self.definition.name)
            .field("is_mounted", &self.is_mounted.get())
            .finish_non_exhaustive()
    }
}

/// Sets the runtime's current instance; restores the previous one on drop.
struct InstanceGuard {
    runtime: Runtime,
    previous: Option<Rc<ComponentInstance>>,
}

impl InstanceGuard {
    fn enter(instance: &Rc<ComponentInstance>) -> Self {
        let runtime = instance.runtime.clone();
        let previous = runtime.set_current_instance(Some(instance.clone()));
        Self { runtime, previous }
    }
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        self.runtime.set_current_instance(self.previous.take());
    }
}

// =============================================================================
// Setup context
// =============================================================================

/// Second argument of `setup`.
pub struct SetupContext {
    instance: Rc<ComponentInstance>,
}

impl SetupContext {
    pub fn runtime(&self) -> &Runtime {
        &self.instance.runtime
    }

    pub fn instance(&self) -> &Rc<ComponentInstance> {
        &self.instance
    }

    /// Call the parent's `on<Event>` handler.
    pub fn emit(&self, event: &str, args: &[Value]) {
        emit::emit(&self.instance, event, args);
    }

    /// Emit handle that can be moved into closures.
    pub fn emitter(&self) -> Emit {
        Emit::new(&self.instance)
    }

    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    pub fn provide(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) {
        self.instance.provide(key, value);
    }

    /// Injected value, or `Undefined` when no ancestor provides `key`.
    pub fn inject(&self, key: &str) -> Value {
        self.instance.inject(key).unwrap_or_default()
    }

    /// Injected value, or `default` when no ancestor provides `key`.
    pub fn inject_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.instance.inject(key).unwrap_or_else(|| default.into())
    }

    /// Injected value, or the result of `factory` when no ancestor provides `key`.
    pub fn inject_with(&self, key: &str, factory: impl FnOnce() -> Value) -> Value {
        self.instance.inject(key).unwrap_or_else(factory)
    }
}

// =============================================================================
// Render context
// =============================================================================

/// The public instance render functions read from.
///
/// `get` resolves setup state first, then props, then the app's global
/// properties.
#[derive(Clone)]
pub struct RenderContext {
    instance: Rc<ComponentInstance>,
}

impl RenderContext {
    pub fn get(&self, key: &str) -> Value {
        let instance = &self.instance;
        if let Some(state) = instance.setup_state() {
            if state.has(key) {
                return state.get(key);
            }
        }
        if instance.props.contains_key(key) {
            return instance.props_proxy.get(key);
        }
        let globals = instance.app.config().global_properties.clone();
        globals.get(key)
    }

    /// Write setup state. Props are readonly from here.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let instance = &self.instance;
        if let Some(state) = instance.setup_state() {
            if state.has(key) {
                return state.set(key, value);
            }
        }
        if instance.props.contains_key(key) {
            warn!(key, "attempting to mutate prop; props are readonly");
        } else {
            warn!(key, "write to unknown key on render context dropped");
        }
        false
    }

    /// `$el`: root host node of the previous render.
    pub fn el(&self) -> Option<ElementHandle> {
        self.instance.el()
    }

    /// `$slots`
    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    /// `$props`
    pub fn props(&self) -> &Reactive {
        self.instance.props()
    }

    pub fn emit(&self, event: &str, args: &[Value]) {
        emit::emit(&self.instance, event, args);
    }

    pub fn emitter(&self) -> Emit {
        Emit::new(&self.instance)
    }

    /// Render slot `name` with `props` as a fragment; `None` if missing.
    pub fn render_slot(&self, name: &str, props: impl Into<Value>) -> Option<VNode> {
        render_slots(&self.instance.slots(), name, props)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.instance.runtime
    }

    pub fn instance(&self) -> &Rc<ComponentInstance> {
        &self.instance
    }
}
