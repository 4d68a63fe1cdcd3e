//! Dependency Tracker - who depends on which `(subject, key)` pair.
//!
//! The tracker owns two things:
//! - the target map: record id → key → [`Dep`]
//! - the active-computation slot: the computation currently collecting
//!   dependencies
//!
//! Deps hold their subscribers weakly; a computation stays subscribed for as
//! long as something (a `Runner`, a component, a computed cell) keeps it
//! alive. Entries for dropped records are pruned as the map grows.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::reactivity::effect::EffectId;
use crate::types::{Record, RecordInner, TargetId};

const PRUNE_FLOOR: usize = 64;

// =============================================================================
// Subscriber
// =============================================================================

/// A computation that can sit in a dep.
pub(crate) trait Subscriber {
    fn id(&self) -> EffectId;

    /// False once stopped; stopped computations never track.
    fn is_active(&self) -> bool;

    /// Record the back-link from the computation to `dep`.
    fn link(&self, dep: &Dep);

    /// Called on trigger: run the scheduler if there is one, else re-run.
    fn notify(self: Rc<Self>);
}

// =============================================================================
// Dep
// =============================================================================

struct DepInner {
    subscribers: RefCell<IndexMap<EffectId, Weak<dyn Subscriber>>>,
}

/// A dependency set: the computations to notify when one key changes.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl Dep {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub(crate) fn contains(&self, id: EffectId) -> bool {
        self.inner.subscribers.borrow().contains_key(&id)
    }

    fn add(&self, id: EffectId, subscriber: Weak<dyn Subscriber>) {
        self.inner.subscribers.borrow_mut().insert(id, subscriber);
    }

    pub(crate) fn remove(&self, id: EffectId) {
        self.inner.subscribers.borrow_mut().shift_remove(&id);
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .values()
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of live subscribers in subscription order; drops dead ones.
    fn live(&self) -> Vec<Rc<dyn Subscriber>> {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        subscribers.retain(|_, s| s.strong_count() > 0);
        subscribers.values().filter_map(Weak::upgrade).collect()
    }
}

// =============================================================================
// Tracker
// =============================================================================

struct TargetDeps {
    record: Weak<RecordInner>,
    deps: HashMap<Rc<str>, Dep>,
}

pub(crate) struct Tracker {
    targets: RefCell<HashMap<TargetId, TargetDeps>>,
    active: RefCell<Option<Rc<dyn Subscriber>>>,
    prune_at: Cell<usize>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        Self {
            targets: RefCell::new(HashMap::new()),
            active: RefCell::new(None),
            prune_at: Cell::new(PRUNE_FLOOR),
        }
    }

    /// Register the active computation as a dependent of `(record, key)`.
    pub(crate) fn track(&self, record: &Record, key: &str) {
        if !self.is_tracking() {
            return;
        }
        let dep = {
            let mut targets = self.targets.borrow_mut();
            let target = targets.entry(record.id()).or_insert_with(|| TargetDeps {
                record: record.downgrade(),
                deps: HashMap::new(),
            });
            target.deps.entry(Rc::from(key)).or_insert_with(Dep::new).clone()
        };
        self.track_dep(&dep);
        self.maybe_prune();
    }

    /// Notify every dependent of `(record, key)`.
    pub(crate) fn trigger(&self, record: &Record, key: &str) {
        let dep = self
            .targets
            .borrow()
            .get(&record.id())
            .and_then(|target| target.deps.get(key).cloned());
        if let Some(dep) = dep {
            self.trigger_dep(&dep);
        }
    }

    /// Register the active computation in `dep`.
    pub(crate) fn track_dep(&self, dep: &Dep) {
        let active = self.active.borrow().clone();
        let Some(subscriber) = active else { return };
        if !subscriber.is_active() {
            return;
        }
        let id = subscriber.id();
        if !dep.contains(id) {
            dep.add(id, Rc::downgrade(&subscriber));
            subscriber.link(dep);
        }
    }

    /// Notify every subscriber of `dep`.
    ///
    /// The computation currently running is skipped so that it cannot
    /// re-trigger itself through its own writes.
    pub(crate) fn trigger_dep(&self, dep: &Dep) {
        let active_id = self.active_id();
        for subscriber in dep.live() {
            if Some(subscriber.id()) == active_id {
                continue;
            }
            subscriber.notify();
        }
    }

    /// Dep for `(record, key)` if one was ever tracked.
    pub(crate) fn dep_for(&self, record: &Record, key: &str) -> Option<Dep> {
        self.targets
            .borrow()
            .get(&record.id())
            .and_then(|target| target.deps.get(key).cloned())
    }

    pub(crate) fn active_id(&self) -> Option<EffectId> {
        self.active.borrow().as_ref().map(|s| s.id())
    }

    fn is_tracking(&self) -> bool {
        self.active
            .borrow()
            .as_ref()
            .is_some_and(|subscriber| subscriber.is_active())
    }

    /// Make `subscriber` the active computation until the guard drops.
    pub(crate) fn enter(&self, subscriber: Option<Rc<dyn Subscriber>>) -> ActiveGuard<'_> {
        let previous = std::mem::replace(&mut *self.active.borrow_mut(), subscriber);
        ActiveGuard {
            tracker: self,
            previous: Some(previous),
        }
    }

    fn maybe_prune(&self) {
        let len = self.targets.borrow().len();
        if len < self.prune_at.get() {
            return;
        }
        let mut targets = self.targets.borrow_mut();
        targets.retain(|_, target| target.record.strong_count() > 0);
        self.prune_at.set((targets.len() * 2).max(PRUNE_FLOOR));
    }
}

/// Restores the previously active computation on drop (also on unwind).
pub(crate) struct ActiveGuard<'a> {
    tracker: &'a Tracker,
    previous: Option<Option<Rc<dyn Subscriber>>>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *self.tracker.active.borrow_mut() = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Runtime;
    use std::cell::Cell;

    #[test]
    fn test_trigger_without_dependents_is_noop() {
        let rt = Runtime::new();
        let record = Record::new().with("a", 1);
        rt.tracker().trigger(&record, "a");
        assert!(rt.tracker().dep_for(&record, "a").is_none());
    }

    #[test]
    fn test_track_outside_effect_creates_nothing() {
        let rt = Runtime::new();
        let record = Record::new();
        rt.tracker().track(&record, "a");
        assert!(rt.tracker().dep_for(&record, "a").is_none());
    }

    #[test]
    fn test_track_inside_effect_registers_dependent() {
        let rt = Runtime::new();
        let record = Record::new().with("a", 1);
        let runs = Rc::new(Cell::new(0));

        let runner = rt.effect({
            let rt = rt.clone();
            let record = record.clone();
            let runs = runs.clone();
            move || {
                rt.tracker().track(&record, "a");
                runs.set(runs.get() + 1);
            }
        });

        let dep = rt.tracker().dep_for(&record, "a").expect("dep created");
        assert_eq!(dep.len(), 1);

        rt.tracker().trigger(&record, "a");
        assert_eq!(runs.get(), 2);

        runner.stop();
        assert!(dep.is_empty());
        rt.tracker().trigger(&record, "a");
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_active_slot_restored_after_run() {
        let rt = Runtime::new();
        assert!(rt.tracker().active_id().is_none());
        let _runner = rt.effect(|| {});
        assert!(rt.tracker().active_id().is_none());
    }
}
