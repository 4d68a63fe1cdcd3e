//! App bootstrap.
//!
//! An [`App`] pairs a root component with a [`Renderer`] and an app-level
//! context (config and provides) shared by every component in its tree.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use tracing::debug;

use crate::component::{Component, ComponentInstance, Provides};
use crate::error::{Error, Result};
use crate::renderer::{Platform, Renderer};
use crate::types::{ElementHandle, Record, Value};
use crate::vnode::{Children, create_vnode};

/// Per-app configuration.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    /// Values every render context can read after setup state and props.
    pub global_properties: Record,
}

/// State shared by all components mounted under one app.
#[derive(Debug, Default)]
pub struct AppContext {
    config: RefCell<AppConfig>,
    provides: Provides,
}

impl AppContext {
    pub fn config(&self) -> Ref<'_, AppConfig> {
        self.config.borrow()
    }

    pub fn config_mut(&self) -> RefMut<'_, AppConfig> {
        self.config.borrow_mut()
    }

    /// Root of every provides chain in this app.
    pub fn provides(&self) -> &Provides {
        &self.provides
    }
}

/// A root component ready to be mounted.
///
/// The app owns its renderer; once it is dropped, mounted components stop
/// re-rendering.
pub struct App<P: Platform + 'static> {
    renderer: Renderer<P>,
    root: Rc<Component>,
    root_props: Option<Record>,
    context: Rc<AppContext>,
    container: Cell<Option<ElementHandle>>,
}

impl<P: Platform + 'static> App<P> {
    pub(crate) fn new(renderer: Renderer<P>, root: Rc<Component>) -> Self {
        Self {
            renderer,
            root,
            root_props: None,
            context: Rc::new(AppContext::default()),
            container: Cell::new(None),
        }
    }

    /// Props passed to the root component.
    pub fn with_props(mut self, props: Record) -> Self {
        self.root_props = Some(props);
        self
    }

    /// Mount into the container `selector` resolves to.
    pub fn mount(&self, selector: &str) -> Result<ElementHandle> {
        let container = self
            .renderer
            .host()
            .select(selector)
            .ok_or_else(|| Error::ContainerNotFound {
                selector: selector.to_string(),
            })?;
        self.mount_to(container)?;
        Ok(container)
    }

    /// Mount into a known container.
    pub fn mount_to(&self, container: ElementHandle) -> Result<()> {
        if self.container.get().is_some() {
            return Err(Error::AlreadyMounted);
        }
        debug!(%container, component = self.root.name(), "mounting app");
        let vnode = create_vnode(&self.root, self.root_props.clone(), Children::None);
        self.renderer.render_in(Some(vnode), container, &self.context)?;
        self.container.set(Some(container));
        Ok(())
    }

    /// Tear the tree down. No-op when not mounted.
    pub fn unmount(&self) -> Result<()> {
        let Some(container) = self.container.take() else {
            return Ok(());
        };
        debug!(%container, "unmounting app");
        self.renderer.render_in(None, container, &self.context)
    }

    /// Provide `value` to every component in the app.
    pub fn provide(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> &Self {
        self.context.provides().set(key, value);
        self
    }

    pub fn config(&self) -> Ref<'_, AppConfig> {
        self.context.config()
    }

    pub fn config_mut(&self) -> RefMut<'_, AppConfig> {
        self.context.config_mut()
    }

    pub fn is_mounted(&self) -> bool {
        self.container.get().is_some()
    }

    pub fn container(&self) -> Option<ElementHandle> {
        self.container.get()
    }

    /// Root component instance, once mounted.
    pub fn root_instance(&self) -> Option<Rc<ComponentInstance>> {
        let container = self.container.get()?;
        self.renderer.root(container)?.component()
    }

    pub fn renderer(&self) -> &Renderer<P> {
        &self.renderer
    }
}

/// Free-function form of [`Renderer::create_app`].
pub fn create_app<P: Platform + 'static>(renderer: &Renderer<P>, root: Rc<Component>) -> App<P> {
    renderer.create_app(root)
}
