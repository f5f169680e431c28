//! Schedulers and workers.
//!
//! A [`Scheduler`] is a factory of [`Worker`]s; a worker accepts
//! *schedulables* — closures bound to a [`Subscriber`] for cancellation that
//! run once and may ask to run again by returning a [`Continuation`].
//!
//! One behavioral contract, six implementations:
//!
//! - [`ImmediateScheduler`]: runs inline on the calling thread, recursing on
//!   nested schedules.
//! - [`CurrentThreadScheduler`]: per-thread trampoline queue; the outermost
//!   `schedule` drains before returning, nested schedules enqueue.
//! - [`NewThreadScheduler`]: one dedicated OS thread per worker.
//! - [`ThreadPoolScheduler`]: N eagerly created threads, workers handed out
//!   round-robin.
//! - [`RunLoopScheduler`]: no thread of its own; the client pumps it.
//! - [`TestScheduler`]: virtual clock with a deterministic ledger of
//!   schedulings and executions.
//!
//! Ordering within one worker is by `(due time, submission order)`. A worker
//! checks the bound subscriber before every dispatch and drops schedulables
//! whose subscriber is disposed. A schedulable returning `Err` has the error
//! routed to its subscriber's `on_error` and is not rescheduled.

pub mod current_thread;
pub mod immediate;
pub mod new_thread;
pub mod run_loop;
pub mod test_scheduler;
pub mod thread_pool;

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::subscriber::Subscriber;

pub use current_thread::CurrentThreadScheduler;
pub use immediate::ImmediateScheduler;
pub use new_thread::NewThreadScheduler;
pub use run_loop::RunLoopScheduler;
pub use test_scheduler::TestScheduler;
pub use thread_pool::ThreadPoolScheduler;

/// Directive returned by a schedulable asking to run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
  /// Run again at (now at return time + delay).
  DelayFromNow(Duration),
  /// Run again at (the timepoint this execution was due to start + delay).
  DelayFromThisTimepoint(Duration),
  /// Run again at an absolute timepoint.
  DelayTo(Instant),
}

impl Continuation {
  /// Resolve the directive against the execution's planned start and the
  /// scheduler's current now.
  pub(crate) fn due(self, planned: Instant, now: Instant) -> Instant {
    match self {
      Continuation::DelayFromNow(delay) => now + delay,
      Continuation::DelayFromThisTimepoint(delay) => planned + delay,
      Continuation::DelayTo(at) => at,
    }
  }
}

/// Type-erased schedulable: the run closure plus the disposed probe of the
/// subscriber it is bound to.
pub(crate) struct Task {
  run: Box<dyn FnMut() -> Option<Continuation> + Send>,
  disposed: Box<dyn Fn() -> bool + Send + Sync>,
}

impl Task {
  pub(crate) fn new<Item, Err, F>(mut f: F, subscriber: Subscriber<Item, Err>) -> Self
  where
    Item: 'static,
    Err: 'static,
    F: FnMut(&Subscriber<Item, Err>) -> Result<Option<Continuation>, Err> + Send + 'static,
  {
    let probe = subscriber.clone();
    Task {
      run: Box::new(move || match f(&subscriber) {
        Ok(next) => next,
        Err(err) => {
          subscriber.on_error(err);
          None
        }
      }),
      disposed: Box::new(move || probe.is_disposed()),
    }
  }

  pub(crate) fn is_disposed(&self) -> bool {
    (self.disposed)()
  }

  pub(crate) fn invoke(&mut self) -> Option<Continuation> {
    (self.run)()
  }
}

/// Heap entry: min-ordered by due time, FIFO among equal due times.
pub(crate) struct Entry {
  pub(crate) due: Instant,
  pub(crate) seq: u64,
  pub(crate) task: Task,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.seq == other.seq
  }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
    Some(self.cmp(other))
  }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> CmpOrdering {
    // Reversed for BinaryHeap: earliest due first, then submission order.
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

/// Min-heap of schedulables with a monotone submission counter.
#[derive(Default)]
pub(crate) struct TaskQueue {
  heap: BinaryHeap<Entry>,
  next_seq: u64,
}

impl TaskQueue {
  pub(crate) fn push(&mut self, due: Instant, task: Task) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.heap.push(Entry { due, seq, task });
  }

  pub(crate) fn pop(&mut self) -> Option<Entry> {
    self.heap.pop()
  }

  pub(crate) fn next_due(&self) -> Option<Instant> {
    self.heap.peek().map(|e| e.due)
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.heap.is_empty()
  }

  pub(crate) fn len(&self) -> usize {
    self.heap.len()
  }

  pub(crate) fn clear(&mut self) {
    self.heap.clear();
  }
}

/// The engine behind a [`Worker`] handle.
pub(crate) trait WorkerCore: Send + Sync {
  fn now(&self) -> Instant;
  fn submit(&self, delay: Option<Duration>, task: Task);
  fn dispose(&self);
  fn is_disposed(&self) -> bool;
}

/// Handle onto a scheduling context. Cloning shares the underlying worker.
#[derive(Clone)]
pub struct Worker {
  core: Arc<dyn WorkerCore>,
}

impl Worker {
  pub(crate) fn from_core(core: Arc<dyn WorkerCore>) -> Self {
    Worker { core }
  }

  /// Submit a schedulable to run as soon as possible.
  ///
  /// The schedulable receives the subscriber it is bound to; returning
  /// `Ok(Some(_))` re-schedules it, returning `Err(e)` delivers `e` to the
  /// subscriber and drops it. A disposed subscriber cancels pending runs.
  pub fn schedule<Item, Err, F>(&self, f: F, subscriber: &Subscriber<Item, Err>)
  where
    Item: 'static,
    Err: 'static,
    F: FnMut(&Subscriber<Item, Err>) -> Result<Option<Continuation>, Err> + Send + 'static,
  {
    self.core.submit(None, Task::new(f, subscriber.clone()));
  }

  /// Submit a schedulable to run at (now + delay).
  pub fn schedule_after<Item, Err, F>(
    &self, delay: Duration, f: F, subscriber: &Subscriber<Item, Err>,
  ) where
    Item: 'static,
    Err: 'static,
    F: FnMut(&Subscriber<Item, Err>) -> Result<Option<Continuation>, Err> + Send + 'static,
  {
    self.core.submit(Some(delay), Task::new(f, subscriber.clone()));
  }

  /// The worker's clock (virtual for the test scheduler).
  pub fn now(&self) -> Instant {
    self.core.now()
  }

  /// Cancel every pending schedulable and refuse new ones.
  pub fn dispose(&self) {
    self.core.dispose();
  }

  pub fn is_disposed(&self) -> bool {
    self.core.is_disposed()
  }
}

/// Factory of workers.
pub trait Scheduler: Send + Sync {
  fn create_worker(&self) -> Worker;

  fn now(&self) -> Instant {
    Instant::now()
  }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  fn create_worker(&self) -> Worker {
    (**self).create_worker()
  }

  fn now(&self) -> Instant {
    (**self).now()
  }
}
