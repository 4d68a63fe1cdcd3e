//! Component events.
//!
//! `emit("add-foo", args)` looks up the `onAddFoo` prop on the emitting
//! component and calls it if it is a function.

use std::rc::{Rc, Weak};

use crate::component::ComponentInstance;
use crate::types::Value;

/// `add-foo` → `onAddFoo`.
pub fn handler_name(event: &str) -> String {
    let camel = camelize(event);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn emit(instance: &ComponentInstance, event: &str, args: &[Value]) {
    // raw props: emitting is not a tracked read
    let handler = instance.props.get(&handler_name(event));
    if let Value::Function(callback) = handler {
        callback.call(args);
    }
}

/// Emit handle that does not keep the component alive.
#[derive(Clone)]
pub struct Emit {
    instance: Weak<ComponentInstance>,
}

impl Emit {
    pub(crate) fn new(instance: &Rc<ComponentInstance>) -> Self {
        Self {
            instance: Rc::downgrade(instance),
        }
    }

    /// Emit `event`; a no-op once the component is gone.
    pub fn call(&self, event: &str, args: &[Value]) {
        if let Some(instance) = self.instance.upgrade() {
            emit(&instance, event, args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_name() {
        assert_eq!(handler_name("add"), "onAdd");
        assert_eq!(handler_name("add-foo"), "onAddFoo");
        assert_eq!(handler_name("update-model-value"), "onUpdateModelValue");
        assert_eq!(handler_name(""), "on");
    }
}
