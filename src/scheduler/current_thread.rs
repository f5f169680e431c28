use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::scheduler::{Scheduler, Task, TaskQueue, Worker, WorkerCore};

/// Queue trampoline on the calling thread.
///
/// The first `schedule` on a thread installs a thread-local queue and drains
/// it before returning; `schedule` calls made from inside a running
/// schedulable enqueue to that same queue instead of recursing. The queue is
/// ordered by `(due time, submission order)` and torn down once drained, so
/// a fresh thread — e.g. inside a new-thread worker — always sees a fresh
/// queue.
#[derive(Clone, Copy, Default)]
pub struct CurrentThreadScheduler;

impl Scheduler for CurrentThreadScheduler {
  fn create_worker(&self) -> Worker {
    Worker::from_core(Arc::new(CurrentThreadCore { disposed: AtomicBool::new(false) }))
  }
}

thread_local! {
  static TRAMPOLINE: RefCell<Option<TaskQueue>> = const { RefCell::new(None) };
}

struct CurrentThreadCore {
  disposed: AtomicBool,
}

impl WorkerCore for CurrentThreadCore {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn submit(&self, delay: Option<Duration>, task: Task) {
    if self.is_disposed() {
      tracing::trace!("current_thread worker disposed; schedulable dropped");
      return;
    }
    let due = Instant::now() + delay.unwrap_or_default();
    let enqueued_into_active_drain = TRAMPOLINE.with(|q| {
      let mut slot = q.borrow_mut();
      match slot.as_mut() {
        Some(queue) => {
          queue.push(due, task);
          true
        }
        None => {
          let mut queue = TaskQueue::default();
          queue.push(due, task);
          *slot = Some(queue);
          false
        }
      }
    });
    if enqueued_into_active_drain {
      return;
    }

    tracing::trace!("current_thread trampoline installed");
    loop {
      let entry = TRAMPOLINE.with(|q| q.borrow_mut().as_mut().unwrap().pop());
      let Some(mut entry) = entry else {
        break;
      };
      if entry.task.is_disposed() {
        continue;
      }
      let now = Instant::now();
      if entry.due > now {
        thread::sleep(entry.due - now);
        if entry.task.is_disposed() {
          continue;
        }
      }
      if let Some(continuation) = entry.task.invoke() {
        let due = continuation.due(entry.due, Instant::now());
        TRAMPOLINE.with(|q| q.borrow_mut().as_mut().unwrap().push(due, entry.task));
      }
    }
    TRAMPOLINE.with(|q| *q.borrow_mut() = None);
    tracing::trace!("current_thread trampoline torn down");
  }

  fn dispose(&self) {
    self.disposed.store(true, Ordering::Release);
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}
