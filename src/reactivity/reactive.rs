//! Reactive Proxy Layer - observable views over records.
//!
//! A [`Reactive`] is an explicit wrapper around a [`Record`] (or around
//! another proxy). Reads go through [`Reactive::get`] and track; writes go
//! through [`Reactive::set`] and trigger. Four modes exist:
//!
//! | constructor              | writes   | nested reads        |
//! |--------------------------|----------|---------------------|
//! | `Runtime::reactive`        | trigger  | wrapped reactive    |
//! | `Runtime::readonly`        | rejected | wrapped readonly    |
//! | `Runtime::shallow_reactive`| trigger  | returned as-is      |
//! | `Runtime::shallow_readonly`| rejected | returned as-is      |
//!
//! Proxies are memoised per `(target, mode)` in the runtime's identity map,
//! so wrapping the same record twice yields the same proxy.

use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use tracing::warn;

use crate::runtime::Runtime;
use crate::types::{Record, TargetId, Value};

/// Tracking key used by `keys()`; adding or deleting a key triggers it.
pub(crate) const ITERATE_KEY: &str = "\u{0}iterate";

bitflags! {
    /// Proxy mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ProxyFlags: u8 {
        const READONLY = 1 << 0;
        const SHALLOW  = 1 << 1;
    }
}

/// Reserved marker keys answered by the proxy itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveFlag {
    IsReactive,
    IsReadonly,
    Raw,
}

impl ReactiveFlag {
    pub const IS_REACTIVE: &'static str = "__v_isReactive";
    pub const IS_READONLY: &'static str = "__v_isReadonly";
    pub const RAW: &'static str = "__v_raw";

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            Self::IS_REACTIVE => Some(Self::IsReactive),
            Self::IS_READONLY => Some(Self::IsReadonly),
            Self::RAW => Some(Self::Raw),
            _ => None,
        }
    }
}

// =============================================================================
// Proxy target
// =============================================================================

/// What a proxy wraps: a raw record, or another proxy (readonly over reactive).
#[derive(Clone, Debug)]
pub enum ProxyTarget {
    Record(Record),
    Proxy(Reactive),
}

impl ProxyTarget {
    fn id(&self) -> TargetId {
        match self {
            ProxyTarget::Record(record) => record.id(),
            ProxyTarget::Proxy(proxy) => proxy.inner.id,
        }
    }
}

impl From<Record> for ProxyTarget {
    fn from(record: Record) -> Self {
        ProxyTarget::Record(record)
    }
}

impl From<&Record> for ProxyTarget {
    fn from(record: &Record) -> Self {
        ProxyTarget::Record(record.clone())
    }
}

impl From<Reactive> for ProxyTarget {
    fn from(proxy: Reactive) -> Self {
        ProxyTarget::Proxy(proxy)
    }
}

impl From<&Reactive> for ProxyTarget {
    fn from(proxy: &Reactive) -> Self {
        ProxyTarget::Proxy(proxy.clone())
    }
}

// =============================================================================
// Reactive
// =============================================================================

pub(crate) struct ProxyInner {
    id: TargetId,
    runtime: Runtime,
    target: ProxyTarget,
    flags: ProxyFlags,
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        let key = (self.target.id(), self.flags);
        if let Ok(mut proxies) = self.runtime.inner.proxies.try_borrow_mut() {
            if proxies.get(&key).is_some_and(|weak| weak.strong_count() == 0) {
                proxies.remove(&key);
            }
        }
    }
}

/// A proxy over a record.
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ProxyInner>,
}

impl Reactive {
    pub fn flags(&self) -> ProxyFlags {
        self.inner.flags
    }

    pub fn is_readonly(&self) -> bool {
        self.inner.flags.contains(ProxyFlags::READONLY)
    }

    pub fn is_shallow(&self) -> bool {
        self.inner.flags.contains(ProxyFlags::SHALLOW)
    }

    /// Mutable proxies are reactive; a readonly proxy is reactive only when
    /// it wraps a reactive proxy.
    pub fn is_reactive(&self) -> bool {
        if !self.is_readonly() {
            return true;
        }
        match &self.inner.target {
            ProxyTarget::Proxy(inner) => inner.is_reactive(),
            ProxyTarget::Record(_) => false,
        }
    }

    /// The directly wrapped target.
    pub fn target(&self) -> &ProxyTarget {
        &self.inner.target
    }

    /// The innermost raw record.
    pub fn to_raw(&self) -> Record {
        match &self.inner.target {
            ProxyTarget::Record(record) => record.clone(),
            ProxyTarget::Proxy(proxy) => proxy.to_raw(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read `key`, tracking it on mutable proxies.
    pub fn get(&self, key: &str) -> Value {
        if let Some(flag) = ReactiveFlag::from_key(key) {
            return match flag {
                ReactiveFlag::IsReactive => Value::Bool(self.is_reactive()),
                ReactiveFlag::IsReadonly => Value::Bool(self.is_readonly()),
                ReactiveFlag::Raw => match &self.inner.target {
                    ProxyTarget::Record(record) => Value::Object(record.clone()),
                    ProxyTarget::Proxy(proxy) => Value::Proxy(proxy.clone()),
                },
            };
        }

        let value = match &self.inner.target {
            ProxyTarget::Record(record) => {
                if !self.is_readonly() {
                    self.inner.runtime.tracker().track(record, key);
                }
                record.get(key)
            }
            ProxyTarget::Proxy(proxy) => proxy.get(key),
        };

        if self.is_shallow() {
            return value;
        }
        self.wrap_nested(value)
    }

    fn wrap_nested(&self, value: Value) -> Value {
        let runtime = &self.inner.runtime;
        match value {
            Value::Object(record) if self.is_readonly() => Value::Proxy(runtime.readonly(record)),
            Value::Object(record) => Value::Proxy(runtime.reactive(record)),
            Value::Proxy(proxy) if self.is_readonly() => Value::Proxy(runtime.readonly(proxy)),
            other => other,
        }
    }

    /// Write `key`. Triggers only when the value changed (SameValue).
    ///
    /// Readonly proxies drop the write with a warning; the return value is
    /// `true` either way.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        if self.is_readonly() {
            warn!(key, "set operation on key failed: target is readonly");
            return true;
        }
        let value = value.into();
        let value = if self.is_shallow() || is_readonly(&value) {
            value
        } else {
            to_raw(&value)
        };

        match &self.inner.target {
            ProxyTarget::Record(record) => {
                let had_key = record.contains_key(key);
                let old = record.set(key, value.clone());
                let tracker = self.inner.runtime.tracker();
                if !had_key {
                    tracker.trigger(record, key);
                    tracker.trigger(record, ITERATE_KEY);
                } else if !old.is_some_and(|old| old.same_value(&value)) {
                    tracker.trigger(record, key);
                }
                true
            }
            ProxyTarget::Proxy(proxy) => proxy.set(key, value),
        }
    }

    /// Remove `key`, triggering when it existed.
    pub fn delete(&self, key: &str) -> bool {
        if self.is_readonly() {
            warn!(key, "delete operation on key failed: target is readonly");
            return true;
        }
        match &self.inner.target {
            ProxyTarget::Record(record) => {
                if record.remove(key).is_some() {
                    let tracker = self.inner.runtime.tracker();
                    tracker.trigger(record, key);
                    tracker.trigger(record, ITERATE_KEY);
                }
                true
            }
            ProxyTarget::Proxy(proxy) => proxy.delete(key),
        }
    }

    /// Key presence; tracks like a read.
    pub fn has(&self, key: &str) -> bool {
        match &self.inner.target {
            ProxyTarget::Record(record) => {
                if !self.is_readonly() {
                    self.inner.runtime.tracker().track(record, key);
                }
                record.contains_key(key)
            }
            ProxyTarget::Proxy(proxy) => proxy.has(key),
        }
    }

    /// Keys in insertion order; tracks additions and deletions.
    pub fn keys(&self) -> Vec<Rc<str>> {
        match &self.inner.target {
            ProxyTarget::Record(record) => {
                if !self.is_readonly() {
                    self.inner.runtime.tracker().track(record, ITERATE_KEY);
                }
                record.keys()
            }
            ProxyTarget::Proxy(proxy) => proxy.keys(),
        }
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("flags", &self.inner.flags)
            .field("target", &self.inner.target.id())
            .finish()
    }
}

// =============================================================================
// Constructors
// =============================================================================

impl Runtime {
    /// Deep mutable proxy. An existing proxy is returned unchanged.
    pub fn reactive(&self, target: impl Into<ProxyTarget>) -> Reactive {
        match target.into() {
            ProxyTarget::Proxy(proxy) => proxy,
            target => self.create_proxy(target, ProxyFlags::empty()),
        }
    }

    /// Deep readonly proxy. A readonly proxy is returned unchanged; a
    /// reactive proxy gets wrapped.
    pub fn readonly(&self, target: impl Into<ProxyTarget>) -> Reactive {
        match target.into() {
            ProxyTarget::Proxy(proxy) if proxy.is_readonly() => proxy,
            target => self.create_proxy(target, ProxyFlags::READONLY),
        }
    }

    /// Mutable proxy that does not wrap nested records.
    pub fn shallow_reactive(&self, target: impl Into<ProxyTarget>) -> Reactive {
        match target.into() {
            ProxyTarget::Proxy(proxy) => proxy,
            target => self.create_proxy(target, ProxyFlags::SHALLOW),
        }
    }

    /// Readonly proxy that does not wrap nested records.
    pub fn shallow_readonly(&self, target: impl Into<ProxyTarget>) -> Reactive {
        match target.into() {
            ProxyTarget::Proxy(proxy) if proxy.is_readonly() => proxy,
            target => self.create_proxy(target, ProxyFlags::READONLY | ProxyFlags::SHALLOW),
        }
    }

    fn create_proxy(&self, target: ProxyTarget, flags: ProxyFlags) -> Reactive {
        let key = (target.id(), flags);
        let existing = self.inner.proxies.borrow().get(&key).and_then(Weak::upgrade);
        if let Some(inner) = existing {
            return Reactive { inner };
        }
        let inner = Rc::new(ProxyInner {
            id: TargetId::next(),
            runtime: self.clone(),
            target,
            flags,
        });
        self.inner.proxies.borrow_mut().insert(key, Rc::downgrade(&inner));
        Reactive { inner }
    }
}

// =============================================================================
// Probes
// =============================================================================

/// True for mutable proxies and readonly proxies over mutable ones.
pub fn is_reactive(value: &Value) -> bool {
    value.as_proxy().is_some_and(Reactive::is_reactive)
}

pub fn is_readonly(value: &Value) -> bool {
    value.as_proxy().is_some_and(Reactive::is_readonly)
}

pub fn is_shallow(value: &Value) -> bool {
    value.as_proxy().is_some_and(Reactive::is_shallow)
}

pub fn is_proxy(value: &Value) -> bool {
    matches!(value, Value::Proxy(_))
}

/// Unwrap proxies down to the raw record; other values pass through.
pub fn to_raw(value: &Value) -> Value {
    match value {
        Value::Proxy(proxy) => Value::Object(proxy.to_raw()),
        other => other.clone(),
    }
}
