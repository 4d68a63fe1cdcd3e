//! Core types for spark-vdom.
//!
//! These types define the foundation that everything builds on.
//! They flow through the reactive layer, live inside virtual nodes as props,
//! and are what the platform adapter receives when it patches a property.
//!
//! - [`Value`] - Dynamic value (the currency of props, state and templates)
//! - [`Record`] - Shared key/value map; the *subject* that proxies wrap
//! - [`Callback`] - Function value (event handlers, emitted listeners)
//! - [`Key`] - Sibling identity used by the keyed diff
//! - [`ElementHandle`] - Opaque host node handle handed out by a platform

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::reactivity::{Computed, Reactive, Ref};

// =============================================================================
// Target Identity
// =============================================================================

/// Unique identity of a trackable target (records and proxies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(u64);

impl TargetId {
    /// Allocate a fresh id.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

// =============================================================================
// Element Handle
// =============================================================================

/// Opaque handle to a node owned by the platform adapter.
///
/// The renderer never looks inside a handle; it only passes handles back to
/// the [`Platform`](crate::renderer::Platform) that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementHandle(pub u64);

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Callback
// =============================================================================

/// A function value.
///
/// Stored in props (`onClick`), emitted to by components and invoked by
/// platforms when an event fires. Cloning shares the same function, so two
/// clones are the same value for change detection.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&[Value]) -> Value>);

impl Callback {
    /// Wrap a closure.
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Wrap a closure that ignores its arguments and returns nothing.
    pub fn from_fn(f: impl Fn() + 'static) -> Self {
        Self::new(move |_| {
            f();
            Value::Undefined
        })
    }

    /// Invoke the function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

// =============================================================================
// Record - the subject
// =============================================================================

pub(crate) struct RecordInner {
    id: TargetId,
    fields: RefCell<IndexMap<Rc<str>, Value>>,
}

/// Shared, insertion-ordered key → [`Value`] map.
///
/// A record is a plain composite value. Reading or writing it directly never
/// tracks or triggers anything; wrap it with
/// [`Runtime::reactive`](crate::Runtime::reactive) (or one of the other proxy
/// constructors) to make it observable. Clones share the same storage.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RecordInner {
                id: TargetId::next(),
                fields: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Builder-style insert.
    pub fn with(self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Identity of this record.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Read a field (`Undefined` when absent).
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .fields
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Write a field, returning the previous value if there was one.
    pub fn set(&self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.inner
            .fields
            .borrow_mut()
            .insert(key.into(), value.into())
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.fields.borrow_mut().shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.fields.borrow().contains_key(key)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Snapshot of all fields in insertion order.
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.inner
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RecordInner> {
        Rc::downgrade(&self.inner)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // try_borrow: Debug may run while a field is being written
        match self.inner.fields.try_borrow() {
            Ok(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k, v)))
                .finish(),
            Err(_) => write!(f, "Record({:?}, <borrowed>)", self.inner.id),
        }
    }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let record = Record::new();
        for (key, value) in iter {
            record.set(key, value);
        }
        record
    }
}

// =============================================================================
// Value
// =============================================================================

/// Dynamic value.
///
/// Equality (`==`) follows the SameValue rule used for change detection:
/// - numbers: `NaN == NaN`, but `+0 != -0`
/// - strings: by content
/// - records, proxies, refs, computed cells, callbacks: by identity
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// A raw (non-reactive) record.
    Object(Record),
    /// A reactive or readonly proxy over a record.
    Proxy(Reactive),
    Ref(Ref),
    Computed(Computed),
    Function(Callback),
}

impl Value {
    /// Function value from a closure.
    pub fn function(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Value::Function(Callback::new(f))
    }

    /// `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Records and proxies are composite; everything else is a leaf.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Proxy(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Object(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Reactive> {
        match self {
            Value::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Function(callback) => Some(callback),
            _ => None,
        }
    }

    /// SameValue comparison.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Proxy(a), Value::Proxy(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            (Value::Computed(a), Value::Computed(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Render the value the way template interpolation shows it.
    ///
    /// Nullish values become the empty string, composite values a JSON-like
    /// text. Reading a proxy here goes through the proxy (and so tracks).
    pub fn to_display_string(&self) -> String {
        let mut out = String::new();
        write_display(self, &mut out, false);
        out
    }
}

/// Same as [`Value::to_display_string`].
pub fn to_display_string(value: &Value) -> String {
    value.to_display_string()
}

fn write_display(value: &Value, out: &mut String, nested: bool) {
    match value {
        Value::Undefined | Value::Null if !nested => {}
        Value::Undefined | Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::Str(s) if nested => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        Value::Str(s) => out.push_str(s),
        Value::Object(record) => {
            write_entries(record.entries(), out);
        }
        Value::Proxy(proxy) => {
            let entries = proxy
                .keys()
                .into_iter()
                .map(|key| {
                    let value = proxy.get(&key);
                    (key, value)
                })
                .collect();
            write_entries(entries, out);
        }
        Value::Ref(r) => write_display(&r.get(), out, nested),
        Value::Computed(c) => write_display(&c.get(), out, nested),
        Value::Function(_) => out.push_str("[function]"),
    }
}

fn write_entries(entries: Vec<(Rc<str>, Value)>, out: &mut String) {
    out.push('{');
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(key);
        out.push_str("\":");
        write_display(value, out, true);
    }
    out.push('}');
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        // -0 displays as 0
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(record) => write!(f, "Object({record:?})"),
            Value::Proxy(proxy) => write!(f, "{proxy:?}"),
            Value::Ref(r) => write!(f, "{r:?}"),
            Value::Computed(c) => write!(f, "{c:?}"),
            Value::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(value: Rc<str>) -> Self {
        Value::Str(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Object(value)
    }
}

impl From<Reactive> for Value {
    fn from(value: Reactive) -> Self {
        Value::Proxy(value)
    }
}

impl From<Ref> for Value {
    fn from(value: Ref) -> Self {
        Value::Ref(value)
    }
}

impl From<Computed> for Value {
    fn from(value: Computed) -> Self {
        Value::Computed(value)
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Value::Function(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Key
// =============================================================================

/// Sibling identity for the keyed diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl Key {
    /// Derive a key from a prop value. Only strings and integral numbers key.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Str(s) => Some(Key::Str(s.clone())),
            Value::Number(n) if n.is_finite() && *n == n.trunc() => Some(Key::Int(*n as i64)),
            Value::Number(n) => Some(Key::Str(format_number(*n).into())),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.into())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}
