//! Job Scheduler - batched component updates on the microtask boundary.
//!
//! State writes do not re-render synchronously. A component's render effect
//! hands its update [`Job`] to [`Scheduler::queue_job`], which deduplicates
//! it and schedules one flush on the microtask queue. Several writes inside
//! one handler therefore produce one re-render that sees the final state.
//!
//! The microtask queue belongs to the scheduler. A host drains it with
//! [`Scheduler::run_microtasks`]; polling a [`NextTick`] future drains it
//! too, so `block_on(rt.next_tick())` behaves like awaiting on an event loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

use tracing::trace;

/// Identity used to deduplicate jobs.
pub type JobId = u64;

type Microtask = Box<dyn FnOnce()>;

// =============================================================================
// Job
// =============================================================================

/// A queued unit of work.
#[derive(Clone)]
pub struct Job {
    id: JobId,
    run: Rc<dyn Fn()>,
}

impl Job {
    pub fn new(id: JobId, run: impl Fn() + 'static) -> Self {
        Self {
            id,
            run: Rc::new(run),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn run(&self) {
        (self.run)();
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

#[derive(Default)]
struct SchedulerInner {
    queue: RefCell<VecDeque<Job>>,
    /// Jobs of the flush in progress that have not run yet.
    flushing: RefCell<VecDeque<Job>>,
    flush_pending: Cell<bool>,
    microtasks: RefCell<VecDeque<Microtask>>,
}

/// Job queue plus microtask queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `job` unless a job with the same id is already waiting, then make
    /// sure a flush is scheduled.
    pub fn queue_job(&self, job: Job) {
        let waiting = self.inner.queue.borrow().iter().any(|j| j.id == job.id)
            || self.inner.flushing.borrow().iter().any(|j| j.id == job.id);
        if !waiting {
            self.inner.queue.borrow_mut().push_back(job);
        }
        self.queue_flush();
    }

    fn queue_flush(&self) {
        if self.inner.flush_pending.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        self.queue_microtask(move || {
            if let Some(inner) = weak.upgrade() {
                Scheduler { inner }.flush_jobs();
            }
        });
    }

    /// Drop a waiting job (its work is being done synchronously).
    pub fn invalidate_job(&self, id: JobId) {
        self.inner.queue.borrow_mut().retain(|job| job.id != id);
        self.inner.flushing.borrow_mut().retain(|job| job.id != id);
    }

    /// Run every waiting job in FIFO order.
    ///
    /// The pending flag is cleared first and the queue is taken as a
    /// snapshot, so a job that re-queues itself runs in the next flush.
    pub fn flush_jobs(&self) {
        self.inner.flush_pending.set(false);
        let jobs = std::mem::take(&mut *self.inner.queue.borrow_mut());
        trace!(jobs = jobs.len(), "flushing jobs");
        *self.inner.flushing.borrow_mut() = jobs;
        loop {
            let job = self.inner.flushing.borrow_mut().pop_front();
            match job {
                Some(job) => job.run(),
                None => break,
            }
        }
    }

    /// Number of jobs waiting for the next flush.
    pub fn pending_jobs(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn is_flush_pending(&self) -> bool {
        self.inner.flush_pending.get()
    }

    // =========================================================================
    // Microtasks
    // =========================================================================

    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.inner.microtasks.borrow_mut().push_back(Box::new(task));
    }

    /// Run microtasks until the queue is empty, including ones queued while
    /// draining. Returns how many ran.
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.inner.microtasks.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Future that resolves after everything queued so far has run.
    pub fn next_tick(&self) -> NextTick {
        self.next_tick_with(|| {})
    }

    /// Run `callback` behind everything queued so far; the future resolves
    /// once it has run.
    pub fn next_tick_with(&self, callback: impl FnOnce() + 'static) -> NextTick {
        let state = Rc::new(TickState::default());
        self.queue_microtask({
            let state = state.clone();
            move || {
                callback();
                state.resolve();
            }
        });
        NextTick {
            state,
            scheduler: Rc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("queue", &self.inner.queue.borrow().len())
            .field("flush_pending", &self.inner.flush_pending.get())
            .field("microtasks", &self.inner.microtasks.borrow().len())
            .finish()
    }
}

// =============================================================================
// NextTick
// =============================================================================

#[derive(Default)]
struct TickState {
    done: Cell<bool>,
    waker: RefCell<Option<Waker>>,
}

impl TickState {
    fn resolve(&self) {
        self.done.set(true);
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Future returned by `next_tick`.
pub struct NextTick {
    state: Rc<TickState>,
    scheduler: Weak<SchedulerInner>,
}

impl NextTick {
    pub fn is_done(&self) -> bool {
        self.state.done.get()
    }
}

impl Future for NextTick {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if !self.state.done.get() {
            if let Some(inner) = self.scheduler.upgrade() {
                Scheduler { inner }.run_microtasks();
            }
        }
        if self.state.done.get() {
            Poll::Ready(())
        } else {
            *self.state.waker.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl fmt::Debug for NextTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextTick")
            .field("done", &self.state.done.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn recorder() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_jobs_deduplicated_and_batched() {
        let scheduler = Scheduler::new();
        let log = recorder();

        for _ in 0..3 {
            let log = log.clone();
            scheduler.queue_job(Job::new(1, move || log.borrow_mut().push("a")));
        }
        let log2 = log.clone();
        scheduler.queue_job(Job::new(2, move || log2.borrow_mut().push("b")));

        assert!(log.borrow().is_empty());
        assert_eq!(scheduler.pending_jobs(), 2);

        scheduler.run_microtasks();
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_self_requeue_lands_in_next_flush() {
        let scheduler = Scheduler::new();
        let runs = Rc::new(Cell::new(0));

        let runs2 = runs.clone();
        let sched2 = scheduler.clone();
        scheduler.queue_job(Job::new(7, move || {
            runs2.set(runs2.get() + 1);
            let runs3 = runs2.clone();
            sched2.queue_job(Job::new(7, move || runs3.set(runs3.get() + 10)));
        }));

        scheduler.flush_jobs();
        assert_eq!(runs.get(), 1);
        assert_eq!(scheduler.pending_jobs(), 1);
        assert!(scheduler.is_flush_pending());

        scheduler.run_microtasks();
        assert_eq!(runs.get(), 11);
    }

    #[test]
    fn test_invalidate_job() {
        let scheduler = Scheduler::new();
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();
        scheduler.queue_job(Job::new(3, move || r.set(r.get() + 1)));
        scheduler.invalidate_job(3);
        scheduler.run_microtasks();
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn test_next_tick_runs_after_flush() {
        let scheduler = Scheduler::new();
        let log = recorder();

        let l = log.clone();
        scheduler.queue_job(Job::new(1, move || l.borrow_mut().push("job")));
        let l = log.clone();
        let tick = scheduler.next_tick_with(move || l.borrow_mut().push("tick"));

        assert!(!tick.is_done());
        block_on(tick);
        assert_eq!(*log.borrow(), vec!["job", "tick"]);
    }

    #[test]
    fn test_next_tick_without_pending_work_resolves() {
        let scheduler = Scheduler::new();
        block_on(scheduler.next_tick());
        assert_eq!(scheduler.run_microtasks(), 0);
    }
}
