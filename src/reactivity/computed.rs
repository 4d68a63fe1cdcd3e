//! Computed cells - cached derived values.
//!
//! The getter runs inside an effect whose scheduler only flips a dirty flag.
//! Reading a dirty cell recomputes; reading a clean one returns the cached
//! value without running the getter.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::reactivity::dep::Dep;
use crate::reactivity::effect::{EffectOptions, ReactiveEffect};
use crate::runtime::Runtime;
use crate::types::Value;

struct ComputedInner {
    runtime: Runtime,
    effect: ReactiveEffect<Value>,
    value: RefCell<Value>,
    dirty: Cell<bool>,
    dep: Dep,
}

/// A lazily recomputed derived value.
#[derive(Clone)]
pub struct Computed {
    inner: Rc<ComputedInner>,
}

impl Computed {
    /// Current value; recomputes first if a dependency changed.
    pub fn get(&self) -> Value {
        let inner = &self.inner;
        inner.runtime.tracker().track_dep(&inner.dep);
        if inner.dirty.get() {
            let value = inner.effect.run();
            *inner.value.borrow_mut() = value;
            inner.dirty.set(false);
        }
        inner.value.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.inner.dirty.get())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Create a computed cell. The getter does not run until the first read.
    pub fn computed(&self, getter: impl Fn() -> Value + 'static) -> Computed {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner>| {
            let weak = weak.clone();
            let scheduler = move || {
                let Some(inner) = weak.upgrade() else { return };
                if !inner.dirty.replace(true) {
                    inner.runtime.tracker().trigger_dep(&inner.dep);
                }
            };
            ComputedInner {
                runtime: self.clone(),
                effect: ReactiveEffect::new(self, getter, EffectOptions::new().scheduler(scheduler)),
                value: RefCell::new(Value::Undefined),
                dirty: Cell::new(true),
                dep: Dep::new(),
            }
        });
        Computed { inner }
    }
}
