use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::scheduler::{Scheduler, Task, Worker, WorkerCore};

/// Runs schedulables synchronously on the calling thread.
///
/// Delays block the thread for the clock difference. Re-schedule directives
/// are honored inline, so a nested `schedule` inside a schedulable runs
/// before the outer schedulable's following statements — the execution has
/// the shape of a recursive call stack.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn create_worker(&self) -> Worker {
    Worker::from_core(Arc::new(ImmediateCore { disposed: AtomicBool::new(false) }))
  }
}

struct ImmediateCore {
  disposed: AtomicBool,
}

impl WorkerCore for ImmediateCore {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn submit(&self, delay: Option<std::time::Duration>, mut task: Task) {
    let mut due = Instant::now() + delay.unwrap_or_default();
    loop {
      if self.is_disposed() || task.is_disposed() {
        tracing::trace!("immediate worker dropped a disposed schedulable");
        return;
      }
      let now = Instant::now();
      if due > now {
        thread::sleep(due - now);
        // The subscriber may have been disposed from another thread while
        // this one slept.
        if task.is_disposed() {
          return;
        }
      }
      match task.invoke() {
        None => return,
        Some(continuation) => due = continuation.due(due, Instant::now()),
      }
    }
  }

  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}
