//! Runtime - the explicit context every reactive object hangs off.
//!
//! A [`Runtime`] owns what would otherwise be process-wide mutable state:
//! - the dependency tracker and its active-computation slot
//! - the job scheduler and microtask queue
//! - the proxy identity map (record → proxy, per mode)
//! - the template compiler slot
//! - the current component instance slot (set during setup and render)
//!
//! Runtimes are cheap to clone (shared handle) and independent of each
//! other, so tests simply create a fresh one instead of resetting globals.
//!
//! # Example
//!
//! ```
//! use spark_vdom::{Record, Runtime};
//!
//! let rt = Runtime::new();
//! let state = rt.reactive(Record::new().with("count", 0));
//! let _runner = rt.effect({
//!     let state = state.clone();
//!     move || println!("count = {:?}", state.get("count"))
//! });
//! state.set("count", 1); // effect re-runs
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::compiler;
use crate::component::{ComponentInstance, RenderFn};
use crate::error::Result;
use crate::reactivity::dep::Tracker;
use crate::reactivity::reactive::{ProxyFlags, ProxyInner};
use crate::scheduler::{Job, NextTick, Scheduler};
use crate::types::TargetId;

/// Template compiler hook: template source → render function.
pub type CompilerFn = Rc<dyn Fn(&str) -> Result<RenderFn>>;

pub(crate) struct RuntimeInner {
    pub(crate) tracker: Tracker,
    pub(crate) scheduler: Scheduler,
    pub(crate) proxies: RefCell<HashMap<(TargetId, ProxyFlags), Weak<ProxyInner>>>,
    compiler: RefCell<Option<CompilerFn>>,
    current_instance: RefCell<Option<Rc<ComponentInstance>>>,
}

/// Shared handle to a reactive runtime.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the built-in template compiler registered.
    pub fn new() -> Self {
        let runtime = Self {
            inner: Rc::new(RuntimeInner {
                tracker: Tracker::new(),
                scheduler: Scheduler::new(),
                proxies: RefCell::new(HashMap::new()),
                compiler: RefCell::new(None),
                current_instance: RefCell::new(None),
            }),
        };
        runtime.register_compiler(Rc::new(|template: &str| compiler::compile_to_render(template)));
        runtime
    }

    pub(crate) fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    /// The job scheduler owned by this runtime.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Scheduling shortcuts
    // =========================================================================

    /// Enqueue a job for the next flush.
    pub fn queue_job(&self, job: Job) {
        self.inner.scheduler.queue_job(job);
    }

    /// Future resolving once the pending flush (if any) has run.
    pub fn next_tick(&self) -> NextTick {
        self.inner.scheduler.next_tick()
    }

    /// Run `callback` after the pending flush; the returned future resolves after it.
    pub fn next_tick_with(&self, callback: impl FnOnce() + 'static) -> NextTick {
        self.inner.scheduler.next_tick_with(callback)
    }

    /// Drain the microtask queue. Returns how many microtasks ran.
    pub fn run_microtasks(&self) -> usize {
        self.inner.scheduler.run_microtasks()
    }

    // =========================================================================
    // Compiler slot
    // =========================================================================

    /// Replace the template compiler used for components that only carry a
    /// `template`.
    pub fn register_compiler(&self, compiler: CompilerFn) {
        *self.inner.compiler.borrow_mut() = Some(compiler);
    }

    /// Compile a template with the registered compiler.
    pub(crate) fn compile(&self, template: &str) -> Option<Result<RenderFn>> {
        let compiler = self.inner.compiler.borrow().clone();
        compiler.map(|compile| compile(template))
    }

    // =========================================================================
    // Current instance slot
    // =========================================================================

    /// The component whose setup or render is currently executing.
    pub fn current_instance(&self) -> Option<Rc<ComponentInstance>> {
        self.inner.current_instance.borrow().clone()
    }

    /// Swap the current instance, returning the previous one.
    pub(crate) fn set_current_instance(
        &self,
        instance: Option<Rc<ComponentInstance>>,
    ) -> Option<Rc<ComponentInstance>> {
        std::mem::replace(&mut *self.inner.current_instance.borrow_mut(), instance)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("proxies", &self.inner.proxies.borrow().len())
            .finish_non_exhaustive()
    }
}
