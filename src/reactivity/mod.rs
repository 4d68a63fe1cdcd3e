//! Reactivity - fine-grained dependency tracking.
//!
//! - [`dep`] - dependency sets and the tracker (`track` / `trigger`)
//! - [`effect`] - re-runnable computations with optional scheduler
//! - [`reactive`] - proxies over records (mutable, readonly, shallow)
//! - [`refs`] - single-value cells and `proxy_refs`
//! - [`computed`] - lazily recomputed derived values
//!
//! Everything is created through a [`Runtime`](crate::Runtime):
//!
//! ```
//! use spark_vdom::{Runtime, Value};
//!
//! let rt = Runtime::new();
//! let count = rt.new_ref(1);
//! let double = rt.computed({
//!     let count = count.clone();
//!     move || Value::from(count.get().as_f64().unwrap_or(0.0) * 2.0)
//! });
//! count.set(2);
//! assert_eq!(double.get(), Value::from(4));
//! ```

pub mod computed;
pub mod dep;
pub mod effect;
pub mod reactive;
pub mod refs;

pub use computed::Computed;
pub use dep::Dep;
pub use effect::{EffectId, EffectOptions, ReactiveEffect, Runner, stop};
pub use reactive::{
    ProxyFlags, ProxyTarget, Reactive, ReactiveFlag, is_proxy, is_reactive, is_readonly,
    is_shallow, to_raw,
};
pub use refs::{ProxyRefs, Ref, is_ref, proxy_refs, unref};
