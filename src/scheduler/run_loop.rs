use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::scheduler::{Entry, Scheduler, Task, TaskQueue, Worker, WorkerCore};

/// A scheduler with no thread of its own: the client pumps it.
///
/// Schedulables accumulate in a queue ordered by `(due, submission)` and run
/// only from [`dispatch`](Self::dispatch) or
/// [`dispatch_if_ready`](Self::dispatch_if_ready) — typically called from a
/// GUI or game loop. Each call consumes at most one entry; an entry whose
/// subscriber is already disposed is consumed without running.
#[derive(Clone, Default)]
pub struct RunLoopScheduler {
  shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
  queue: Mutex<TaskQueue>,
  available: Condvar,
}

impl RunLoopScheduler {
  pub fn new() -> Self {
    Self::default()
  }

  /// Block until one due schedulable has been consumed.
  pub fn dispatch(&self) {
    let entry = loop {
      let mut queue = self.shared.queue.lock().unwrap();
      match queue.next_due() {
        None => {
          queue = self.shared.available.wait(queue).unwrap();
          drop(queue);
        }
        Some(due) => {
          let now = Instant::now();
          if due <= now {
            break queue.pop().unwrap();
          }
          let (guard, _) = self.shared.available.wait_timeout(queue, due - now).unwrap();
          drop(guard);
        }
      }
    };
    self.consume(entry);
  }

  /// Run at most one schedulable whose due time has passed; returns whether
  /// an entry was consumed.
  pub fn dispatch_if_ready(&self) -> bool {
    let entry = {
      let mut queue = self.shared.queue.lock().unwrap();
      match queue.next_due() {
        Some(due) if due <= Instant::now() => queue.pop().unwrap(),
        _ => return false,
      }
    };
    self.consume(entry);
    true
  }

  pub fn is_empty(&self) -> bool {
    self.shared.queue.lock().unwrap().is_empty()
  }

  /// True when the earliest queued schedulable is already due.
  pub fn is_any_ready_schedulable(&self) -> bool {
    let queue = self.shared.queue.lock().unwrap();
    matches!(queue.next_due(), Some(due) if due <= Instant::now())
  }

  fn consume(&self, mut entry: Entry) {
    if entry.task.is_disposed() {
      tracing::trace!("run_loop dropped a disposed schedulable");
      return;
    }
    if let Some(continuation) = entry.task.invoke() {
      let due = continuation.due(entry.due, Instant::now());
      let mut queue = self.shared.queue.lock().unwrap();
      queue.push(due, entry.task);
      self.shared.available.notify_all();
    }
  }
}

impl Scheduler for RunLoopScheduler {
  fn create_worker(&self) -> Worker {
    Worker::from_core(Arc::new(RunLoopCore { shared: self.shared.clone() }))
  }
}

struct RunLoopCore {
  shared: Arc<Shared>,
}

impl WorkerCore for RunLoopCore {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn submit(&self, delay: Option<Duration>, task: Task) {
    let due = Instant::now() + delay.unwrap_or_default();
    let mut queue = self.shared.queue.lock().unwrap();
    queue.push(due, task);
    self.shared.available.notify_all();
  }

  fn dispose(&self) {
    self.shared.queue.lock().unwrap().clear();
  }

  fn is_disposed(&self) -> bool {
    false
  }
}
