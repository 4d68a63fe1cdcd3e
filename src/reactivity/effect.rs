//! Effect Engine - re-runnable computations.
//!
//! A [`ReactiveEffect`] wraps a body. Running it makes it the active
//! computation, so every tracked read inside registers it as a dependent.
//! When one of those deps triggers, the effect's scheduler is called if it
//! has one; otherwise the body re-runs synchronously.
//!
//! Each run starts by unlinking the effect from the deps of the previous run,
//! so its dependencies always reflect the latest execution.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::reactivity::dep::{Dep, Subscriber};
use crate::runtime::Runtime;

/// Unique identity of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(u64);

impl EffectId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Scheduler callback: replaces the synchronous re-run on trigger.
pub type SchedulerFn = Rc<dyn Fn()>;

/// Options for [`Runtime::effect_with`] and [`ReactiveEffect::new`].
#[derive(Default)]
pub struct EffectOptions {
    scheduler: Option<SchedulerFn>,
    on_stop: Option<Box<dyn FnOnce()>>,
    lazy: bool,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `scheduler` on trigger instead of re-running the body.
    pub fn scheduler(mut self, scheduler: impl Fn() + 'static) -> Self {
        self.scheduler = Some(Rc::new(scheduler));
        self
    }

    /// Called once, the first time the effect is stopped.
    pub fn on_stop(mut self, on_stop: impl FnOnce() + 'static) -> Self {
        self.on_stop = Some(Box::new(on_stop));
        self
    }

    /// Do not run the effect on creation.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }
}

// =============================================================================
// ReactiveEffect
// =============================================================================

struct EffectInner<T> {
    id: EffectId,
    runtime: Runtime,
    body: Box<dyn Fn() -> T>,
    scheduler: Option<SchedulerFn>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    deps: RefCell<Vec<Dep>>,
    active: Cell<bool>,
}

impl<T> EffectInner<T> {
    fn unlink_deps(&self) {
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for dep in deps {
            dep.remove(self.id);
        }
    }
}

impl<T: 'static> Subscriber for EffectInner<T> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn link(&self, dep: &Dep) {
        self.deps.borrow_mut().push(dep.clone());
    }

    fn notify(self: Rc<Self>) {
        match self.scheduler.clone() {
            Some(scheduler) => scheduler(),
            None => {
                let _ = ReactiveEffect { inner: self }.run();
            }
        }
    }
}

/// A re-runnable computation producing `T`.
///
/// Construction does not run the body. Handles are shared: clones refer to
/// the same computation.
pub struct ReactiveEffect<T: 'static> {
    inner: Rc<EffectInner<T>>,
}

impl<T: 'static> ReactiveEffect<T> {
    pub fn new(runtime: &Runtime, body: impl Fn() -> T + 'static, options: EffectOptions) -> Self {
        Self {
            inner: Rc::new(EffectInner {
                id: EffectId::next(),
                runtime: runtime.clone(),
                body: Box::new(body),
                scheduler: options.scheduler,
                on_stop: RefCell::new(options.on_stop),
                deps: RefCell::new(Vec::new()),
                active: Cell::new(true),
            }),
        }
    }

    /// Run the body as the active computation and return its result.
    ///
    /// A stopped effect still runs its body but tracks nothing.
    pub fn run(&self) -> T {
        if !self.inner.active.get() {
            return (self.inner.body)();
        }
        self.inner.unlink_deps();
        let subscriber: Rc<dyn Subscriber> = self.inner.clone();
        let _guard = self.inner.runtime.tracker().enter(Some(subscriber));
        (self.inner.body)()
    }

    /// Unlink from every dep and call `on_stop`. Idempotent.
    pub fn stop(&self) {
        if !self.inner.active.replace(false) {
            return;
        }
        self.inner.unlink_deps();
        let on_stop = self.inner.on_stop.borrow_mut().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }

    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of deps this effect is currently a member of.
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }
}

impl<T: 'static> Clone for ReactiveEffect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for ReactiveEffect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.inner.id)
            .field("active", &self.inner.active.get())
            .field("deps", &self.inner.deps.borrow().len())
            .finish()
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Handle returned by [`Runtime::effect`]. Dropping every handle to an effect
/// unsubscribes it.
#[derive(Clone, Debug)]
pub struct Runner {
    effect: ReactiveEffect<()>,
}

impl Runner {
    /// Run the effect manually.
    pub fn run(&self) {
        self.effect.run();
    }

    pub fn stop(&self) {
        self.effect.stop();
    }

    pub fn effect(&self) -> &ReactiveEffect<()> {
        &self.effect
    }
}

/// Stop the effect behind `runner`.
pub fn stop(runner: &Runner) {
    runner.stop();
}

impl Runtime {
    /// Create an effect and run it immediately.
    pub fn effect(&self, body: impl Fn() + 'static) -> Runner {
        self.effect_with(body, EffectOptions::default())
    }

    /// Create an effect with options; runs immediately unless `lazy`.
    pub fn effect_with(&self, body: impl Fn() + 'static, options: EffectOptions) -> Runner {
        let lazy = options.lazy;
        let effect = ReactiveEffect::new(self, body, options);
        if !lazy {
            effect.run();
        }
        Runner { effect }
    }
}
