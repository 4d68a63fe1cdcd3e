//! Provide / inject - values handed down the component tree.
//!
//! Each instance starts out sharing its parent's [`Provides`]. The first
//! `provide` call gives the instance a layer of its own whose lookups fall
//! back to the parent's chain, so a value provided two levels up is visible
//! without intermediate components re-providing it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::warn;

use crate::runtime::Runtime;
use crate::types::Value;

struct Layer {
    values: RefCell<IndexMap<Rc<str>, Value>>,
    parent: Option<Provides>,
}

/// A layered provides chain.
#[derive(Clone)]
pub struct Provides {
    layer: Rc<Layer>,
}

impl Provides {
    /// Chain with no parent (an app's provides).
    pub fn root() -> Self {
        Self {
            layer: Rc::new(Layer {
                values: RefCell::new(IndexMap::new()),
                parent: None,
            }),
        }
    }

    /// New layer on top of `parent`.
    pub fn child_of(parent: &Provides) -> Self {
        Self {
            layer: Rc::new(Layer {
                values: RefCell::new(IndexMap::new()),
                parent: Some(parent.clone()),
            }),
        }
    }

    /// Set `key` in this layer.
    pub fn set(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) {
        self.layer.values.borrow_mut().insert(key.into(), value.into());
    }

    /// Nearest value for `key`, walking towards the root.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut layer = Some(self);
        while let Some(current) = layer {
            if let Some(value) = current.layer.values.borrow().get(key) {
                return Some(value.clone());
            }
            layer = current.layer.parent.as_ref();
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn ptr_eq(&self, other: &Provides) -> bool {
        Rc::ptr_eq(&self.layer, &other.layer)
    }
}

impl Default for Provides {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for Provides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provides")
            .field("keys", &self.layer.values.borrow().keys().collect::<Vec<_>>())
            .field("parent", &self.layer.parent)
            .finish()
    }
}

impl Runtime {
    /// `provide` for the component whose setup is running.
    pub fn provide(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) {
        match self.current_instance() {
            Some(instance) => instance.provide(key, value),
            None => warn!("provide() called outside of component setup"),
        }
    }

    /// `inject` for the component whose setup is running; `Undefined` when
    /// nothing provides `key`.
    pub fn inject(&self, key: &str) -> Value {
        self.current_instance()
            .and_then(|instance| instance.inject(key))
            .unwrap_or_default()
    }
}
