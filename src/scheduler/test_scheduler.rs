//! Virtual-time scheduler for deterministic tests.
//!
//! Time only moves when [`TestScheduler::time_advance`] is called. Every
//! submission's due time and every execution's timepoint are recorded in
//! order, so tests can assert on the exact scheduling behavior of an
//! operator instead of sleeping.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use rivulet::observable;
//! use rivulet::scheduler::TestScheduler;
//!
//! let scheduler = TestScheduler::new();
//! let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
//! let sink = seen.clone();
//!
//! observable::just::<_, ()>(42)
//!   .delay(Duration::from_millis(100), scheduler.clone())
//!   .subscribe(move |v| sink.lock().unwrap().push(v));
//!
//! assert!(seen.lock().unwrap().is_empty());
//! scheduler.time_advance(Duration::from_millis(100));
//! assert_eq!(*seen.lock().unwrap(), vec![42]);
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::scheduler::{Scheduler, Task, TaskQueue, Worker, WorkerCore};

struct TestState {
  origin: Instant,
  offset: Duration,
  queue: TaskQueue,
  schedulings: Vec<Instant>,
  executions: Vec<Instant>,
  drain_target: Duration,
  draining: bool,
}

/// Deterministic scheduler over a virtual clock.
///
/// Clones share the same clock and queue. Schedulables that are due at or
/// before the current virtual now run synchronously at submission; the rest
/// wait for [`time_advance`](Self::time_advance). Among due schedulables the
/// order is `(due time, submission order)`.
#[derive(Clone)]
pub struct TestScheduler {
  state: Arc<Mutex<TestState>>,
}

impl TestScheduler {
  pub fn new() -> Self {
    TestScheduler {
      state: Arc::new(Mutex::new(TestState {
        origin: Instant::now(),
        offset: Duration::ZERO,
        queue: TaskQueue::default(),
        schedulings: Vec::new(),
        executions: Vec::new(),
        drain_target: Duration::ZERO,
        draining: false,
      })),
    }
  }

  /// The current virtual timepoint.
  pub fn now(&self) -> Instant {
    let state = self.state.lock().unwrap();
    state.origin + state.offset
  }

  /// Move the virtual clock forward and fire everything due on the way, in
  /// `(due, submission)` order.
  ///
  /// Calling this from inside a running schedulable is allowed: the clock
  /// moves immediately and newly due work is folded into the active drain.
  pub fn time_advance(&self, duration: Duration) {
    {
      let mut state = self.state.lock().unwrap();
      let target = state.offset + duration;
      state.offset = target;
      if state.draining {
        state.drain_target = state.drain_target.max(target);
        return;
      }
      state.draining = true;
      state.drain_target = target;
    }
    self.drain();
  }

  /// Every submission's computed due timepoint, in submission order.
  pub fn get_schedulings(&self) -> Vec<Instant> {
    self.state.lock().unwrap().schedulings.clone()
  }

  /// Every execution's virtual timepoint, in execution order.
  pub fn get_executions(&self) -> Vec<Instant> {
    self.state.lock().unwrap().executions.clone()
  }

  pub fn pending_count(&self) -> usize {
    let state = self.state.lock().unwrap();
    state.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.state.lock().unwrap().queue.is_empty()
  }

  fn submit(&self, delay: Option<Duration>, task: Task) {
    {
      let mut state = self.state.lock().unwrap();
      let due = state.origin + state.offset + delay.unwrap_or_default();
      state.queue.push(due, task);
      state.schedulings.push(due);
      if state.draining {
        return;
      }
      state.draining = true;
      state.drain_target = state.offset;
    }
    self.drain();
  }

  fn drain(&self) {
    loop {
      let entry = {
        let mut state = self.state.lock().unwrap();
        let target = state.origin + state.drain_target;
        match state.queue.next_due() {
          Some(due) if due <= target => state.queue.pop(),
          _ => None,
        }
      };
      let Some(mut entry) = entry else {
        break;
      };
      if entry.task.is_disposed() {
        continue;
      }
      {
        let mut state = self.state.lock().unwrap();
        state.offset = state.offset.max(entry.due - state.origin);
        let now = state.origin + state.offset;
        state.executions.push(now);
      }
      // Run outside the lock: the schedulable may advance time or submit.
      if let Some(continuation) = entry.task.invoke() {
        let mut state = self.state.lock().unwrap();
        let due = continuation.due(entry.due, state.origin + state.offset);
        state.queue.push(due, entry.task);
        state.schedulings.push(due);
      }
    }
    let mut state = self.state.lock().unwrap();
    state.offset = state.offset.max(state.drain_target);
    state.draining = false;
  }
}

impl Default for TestScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl Scheduler for TestScheduler {
  fn create_worker(&self) -> Worker {
    Worker::from_core(Arc::new(TestCore { scheduler: self.clone() }))
  }

  fn now(&self) -> Instant {
    TestScheduler::now(self)
  }
}

struct TestCore {
  scheduler: TestScheduler,
}

impl WorkerCore for TestCore {
  fn now(&self) -> Instant {
    self.scheduler.now()
  }

  fn submit(&self, delay: Option<Duration>, task: Task) {
    self.scheduler.submit(delay, task);
  }

  fn dispose(&self) {
    let mut state = self.scheduler.state.lock().unwrap();
    state.queue.clear();
  }

  fn is_disposed(&self) -> bool {
    false
  }
}
