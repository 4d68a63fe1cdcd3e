//! Ref cells and `proxy_refs`.
//!
//! A [`Ref`] boxes one value behind its own dep. Records stored in a ref are
//! handed out as reactive proxies; primitives as-is.
//!
//! [`ProxyRefs`] is the view component state is exposed through: reading a
//! slot that holds a ref returns the ref's value, and writing a plain value
//! into such a slot writes through to the ref.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use crate::reactivity::dep::Dep;
use crate::reactivity::reactive::{ProxyTarget, to_raw};
use crate::runtime::Runtime;
use crate::types::Value;

struct RefInner {
    runtime: Runtime,
    raw: RefCell<Value>,
    value: RefCell<Value>,
    dep: Dep,
}

/// Single-value reactive cell.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefInner>,
}

impl Ref {
    /// Current value; tracks the ref.
    pub fn get(&self) -> Value {
        self.inner.runtime.tracker().track_dep(&self.inner.dep);
        self.inner.value.borrow().clone()
    }

    /// Replace the value. Notifies only when it changed (SameValue on the raw
    /// form).
    pub fn set(&self, value: impl Into<Value>) {
        let raw = to_raw(&value.into());
        if self.inner.raw.borrow().same_value(&raw) {
            return;
        }
        *self.inner.value.borrow_mut() = convert(&self.inner.runtime, &raw);
        *self.inner.raw.borrow_mut() = raw;
        self.inner.runtime.tracker().trigger_dep(&self.inner.dep);
    }

    /// Read without tracking.
    pub fn peek(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.value.try_borrow() {
            Ok(value) => write!(f, "Ref({value:?})"),
            Err(_) => f.write_str("Ref(<borrowed>)"),
        }
    }
}

fn convert(runtime: &Runtime, value: &Value) -> Value {
    match value {
        Value::Object(record) => Value::Proxy(runtime.reactive(record)),
        other => other.clone(),
    }
}

impl Runtime {
    /// Create a ref cell.
    pub fn new_ref(&self, value: impl Into<Value>) -> Ref {
        let raw = to_raw(&value.into());
        Ref {
            inner: Rc::new(RefInner {
                runtime: self.clone(),
                value: RefCell::new(convert(self, &raw)),
                raw: RefCell::new(raw),
                dep: Dep::new(),
            }),
        }
    }
}

/// Refs and computed cells are both ref-like.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_) | Value::Computed(_))
}

/// The value inside a ref-like, or the value itself.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        Value::Computed(c) => c.get(),
        other => other.clone(),
    }
}

// =============================================================================
// ProxyRefs
// =============================================================================

/// Ref-unwrapping view over a record or proxy.
#[derive(Clone, Debug)]
pub struct ProxyRefs {
    target: ProxyTarget,
}

/// Wrap `target` so ref members are unwrapped on access.
pub fn proxy_refs(target: impl Into<ProxyTarget>) -> ProxyRefs {
    ProxyRefs {
        target: target.into(),
    }
}

impl ProxyRefs {
    fn read(&self, key: &str) -> Value {
        match &self.target {
            ProxyTarget::Record(record) => record.get(key),
            ProxyTarget::Proxy(proxy) => proxy.get(key),
        }
    }

    /// Read `key`, unwrapping refs.
    pub fn get(&self, key: &str) -> Value {
        unref(&self.read(key))
    }

    /// Write `key`. A plain value written over a ref goes into the ref.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        match self.read(key) {
            Value::Ref(old) if !is_ref(&value) => {
                old.set(value);
                true
            }
            Value::Computed(_) if !is_ref(&value) => {
                warn!(key, "write operation failed: computed value is readonly");
                true
            }
            _ => match &self.target {
                ProxyTarget::Record(record) => {
                    record.set(key, value);
                    true
                }
                ProxyTarget::Proxy(proxy) => proxy.set(key, value),
            },
        }
    }

    pub fn has(&self, key: &str) -> bool {
        match &self.target {
            ProxyTarget::Record(record) => record.contains_key(key),
            ProxyTarget::Proxy(proxy) => proxy.has(key),
        }
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        match &self.target {
            ProxyTarget::Record(record) => record.keys(),
            ProxyTarget::Proxy(proxy) => proxy.keys(),
        }
    }

    pub fn target(&self) -> &ProxyTarget {
        &self.target
    }
}
