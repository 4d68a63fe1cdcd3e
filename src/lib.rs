//! # spark-vdom
//!
//! Reactive virtual-DOM runtime for Rust.
//!
//! ## Architecture
//!
//! State lives in reactive proxies, refs and computed cells. Every read inside
//! a running effect is recorded; every write re-runs (or schedules) the
//! effects that read it. A component's render is one such effect, and its
//! scheduler batches re-renders into a single flush per tick:
//!
//! ```text
//! state write → trigger → render effect scheduler → job queue
//!            → flush (microtask) → render → patch(old tree, new tree) → Platform ops
//! ```
//!
//! All mutable state that would otherwise be global (the tracker, the job
//! queue, the proxy identity map, the compiler slot, the current instance)
//! belongs to an explicit [`Runtime`].
//!
//! ## Modules
//!
//! - [`types`] - `Value`, `Record`, `Key`, `ElementHandle`
//! - [`reactivity`] - proxies, effects, refs, computed
//! - [`scheduler`] - job queue, microtasks, `next_tick`
//! - [`vnode`] - virtual nodes and builders
//! - [`renderer`] - the `Platform` trait and the reconciler
//! - [`component`] - definitions, instances, props, slots, emit, provide/inject
//! - [`app`] - `create_app` / `mount`
//! - [`compiler`] - template → render function
//! - [`platform`] - the in-memory host adapter
//!
//! ## Example
//!
//! ```
//! use spark_vdom::{Component, Record, Renderer, Runtime, SetupResult, h};
//! use spark_vdom::platform::MemoryPlatform;
//!
//! let rt = Runtime::new();
//! let host = MemoryPlatform::new();
//! let root = host.create_root("app");
//!
//! let hello = Component::builder()
//!     .setup(|_props, ctx| {
//!         let msg = ctx.runtime().new_ref("hello");
//!         SetupResult::State(Record::new().with("msg", msg))
//!     })
//!     .render(|ctx| h("p", None, ctx.get("msg").to_display_string()))
//!     .build();
//!
//! let app = Renderer::new(&rt, host.clone()).create_app(hello);
//! app.mount("#app").unwrap();
//! assert_eq!(host.inner_html(root), "<p>hello</p>");
//! ```

pub mod app;
pub mod compiler;
pub mod component;
pub mod error;
pub mod platform;
pub mod reactivity;
pub mod renderer;
pub mod runtime;
pub mod scheduler;
pub mod types;
pub mod vnode;

pub use app::{App, AppConfig, AppContext, create_app};
pub use component::{
    Component, ComponentBuilder, ComponentInstance, Emit, Provides, RenderContext, RenderFn,
    SetupContext, SetupFn, SetupResult, SlotFn, Slots, handler_name, render_slots,
};
pub use error::{CompileError, Error, Result};
pub use reactivity::{
    Computed, EffectOptions, ProxyRefs, Reactive, ReactiveEffect, Ref, Runner, is_proxy,
    is_reactive, is_readonly, is_ref, is_shallow, proxy_refs, stop, to_raw, unref,
};
pub use renderer::{Platform, Renderer};
pub use runtime::{CompilerFn, Runtime};
pub use scheduler::{Job, JobId, NextTick, Scheduler};
pub use types::{Callback, ElementHandle, Key, Record, Value, to_display_string};
pub use vnode::{
    Children, ShapeFlags, VNode, VNodeType, create_text_vnode, create_vnode, fragment, h,
    is_same_vnode_type, keyed_fragment,
};
