use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::scheduler::{Scheduler, Task, TaskQueue, Worker, WorkerCore};

/// One dedicated OS thread per worker.
///
/// The thread sleeps until the next due time or a new submission, executes,
/// and loops. When the last worker handle drops, the thread keeps draining
/// whatever is still queued and then exits; disposing the worker drops the
/// queue without further execution.
#[derive(Clone, Copy, Default)]
pub struct NewThreadScheduler;

impl Scheduler for NewThreadScheduler {
  fn create_worker(&self) -> Worker {
    Worker::from_core(Arc::new(NewThreadCore::spawn()))
  }
}

struct QueueState {
  queue: TaskQueue,
  retired: bool,
  disposed: bool,
}

pub(crate) struct Shared {
  state: Mutex<QueueState>,
  available: Condvar,
}

pub(crate) struct NewThreadCore {
  shared: Arc<Shared>,
}

impl NewThreadCore {
  pub(crate) fn spawn() -> Self {
    let shared = Arc::new(Shared {
      state: Mutex::new(QueueState {
        queue: TaskQueue::default(),
        retired: false,
        disposed: false,
      }),
      available: Condvar::new(),
    });
    let for_thread = shared.clone();
    thread::Builder::new()
      .name("rivulet-worker".into())
      .spawn(move || run(for_thread))
      .expect("failed to spawn worker thread");
    NewThreadCore { shared }
  }
}

impl Drop for NewThreadCore {
  fn drop(&mut self) {
    let mut state = self.shared.state.lock().unwrap();
    state.retired = true;
    self.shared.available.notify_all();
  }
}

impl WorkerCore for NewThreadCore {
  fn now(&self) -> Instant {
    Instant::now()
  }

  fn submit(&self, delay: Option<Duration>, task: Task) {
    let due = Instant::now() + delay.unwrap_or_default();
    let mut state = self.shared.state.lock().unwrap();
    if state.disposed {
      tracing::trace!("new_thread worker disposed; schedulable dropped");
      return;
    }
    state.queue.push(due, task);
    self.shared.available.notify_all();
  }

  fn dispose(&self) {
    let mut state = self.shared.state.lock().unwrap();
    state.disposed = true;
    state.queue.clear();
    self.shared.available.notify_all();
  }

  fn is_disposed(&self) -> bool {
    self.shared.state.lock().unwrap().disposed
  }
}

fn run(shared: Arc<Shared>) {
  tracing::debug!(thread = ?thread::current().id(), "worker thread started");
  loop {
    let entry = {
      let mut state = shared.state.lock().unwrap();
      loop {
        if state.disposed {
          tracing::debug!("worker thread disposed");
          return;
        }
        match state.queue.next_due() {
          None => {
            if state.retired {
              tracing::debug!("worker thread retired");
              return;
            }
            state = shared.available.wait(state).unwrap();
          }
          Some(due) => {
            let now = Instant::now();
            if due <= now {
              break state.queue.pop().unwrap();
            }
            let (next, _) = shared.available.wait_timeout(state, due - now).unwrap();
            state = next;
          }
        }
      }
    };

    let mut entry = entry;
    if entry.task.is_disposed() {
      continue;
    }
    if let Some(continuation) = entry.task.invoke() {
      let due = continuation.due(entry.due, Instant::now());
      let mut state = shared.state.lock().unwrap();
      if !state.disposed {
        state.queue.push(due, entry.task);
        shared.available.notify_all();
      }
    }
  }
}

// Used by the thread pool, which hands the same core to many callers and
// retires it only when the pool itself is dropped.
pub(crate) struct PooledWorker {
  core: Arc<NewThreadCore>,
  disposed: AtomicBool,
}

impl PooledWorker {
  pub(crate) fn new(core: Arc<NewThreadCore>) -> Self {
    PooledWorker { core, disposed: AtomicBool::new(false) }
  }
}

impl WorkerCore for PooledWorker {
  fn now(&self) -> Instant {
    self.core.now()
  }

  fn submit(&self, delay: Option<Duration>, task: Task) {
    if self.is_disposed() {
      return;
    }
    self.core.submit(delay, task);
  }

  fn dispose(&self) {
    // The pool thread is shared; only this handle goes dead.
    self.disposed.store(true, Ordering::Release);
  }

  fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};
  use std::thread::ThreadId;
  use std::time::Duration;

  use super::*;
  use crate::observer::LambdaObserver;
  use crate::scheduler::Continuation;
  use crate::subscriber::Subscriber;

  fn noop_subscriber() -> Subscriber<i32, &'static str> {
    Subscriber::new(LambdaObserver::new(|_| {}, |_| {}, || {}))
  }

  fn wait_for<T>(probe: impl Fn() -> Option<T>) -> T {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
      if let Some(v) = probe() {
        return v;
      }
      assert!(Instant::now() < deadline, "timed out waiting for worker");
      thread::sleep(Duration::from_millis(1));
    }
  }

  #[test]
  fn runs_off_the_calling_thread() {
    let worker = NewThreadScheduler.create_worker();
    let subscriber = noop_subscriber();
    let seen: Arc<Mutex<Option<ThreadId>>> = Arc::new(Mutex::new(None));
    let s = seen.clone();
    worker.schedule(
      move |_| {
        *s.lock().unwrap() = Some(thread::current().id());
        Ok(None)
      },
      &subscriber,
    );
    let id = wait_for(|| *seen.lock().unwrap());
    assert_ne!(id, thread::current().id());
  }

  #[test]
  fn due_time_then_submission_order() {
    let worker = NewThreadScheduler.create_worker();
    let subscriber = noop_subscriber();
    let order = Arc::new(Mutex::new(Vec::new()));

    // All three land in the queue before the earliest due time passes.
    for (delay_ms, label) in [(50u64, 3), (20, 1), (20, 2)] {
      let o = order.clone();
      worker.schedule_after(
        Duration::from_millis(delay_ms),
        move |_| {
          o.lock().unwrap().push(label);
          Ok(None)
        },
        &subscriber,
      );
    }

    wait_for(|| (order.lock().unwrap().len() == 3).then_some(()));
    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
  }

  #[test]
  fn keeps_draining_after_worker_handle_drops() {
    let subscriber = noop_subscriber();
    let done = Arc::new(Mutex::new(false));
    {
      let worker = NewThreadScheduler.create_worker();
      let d = done.clone();
      worker.schedule_after(
        Duration::from_millis(30),
        move |_| {
          *d.lock().unwrap() = true;
          Ok(None)
        },
        &subscriber,
      );
      // `worker` drops here while the task is still pending.
    }
    wait_for(|| (*done.lock().unwrap()).then_some(()));
  }

  #[test]
  fn dispose_cancels_pending_schedulables() {
    let worker = NewThreadScheduler.create_worker();
    let subscriber = noop_subscriber();
    let ran = Arc::new(Mutex::new(false));
    let r = ran.clone();
    worker.schedule_after(
      Duration::from_millis(50),
      move |_| {
        *r.lock().unwrap() = true;
        Ok(None)
      },
      &subscriber,
    );
    worker.dispose();
    thread::sleep(Duration::from_millis(80));
    assert!(!*ran.lock().unwrap());
  }

  #[test]
  fn recursive_schedule_enqueues_to_the_same_worker() {
    let worker = NewThreadScheduler.create_worker();
    let subscriber = noop_subscriber();
    let calls = Arc::new(Mutex::new(0));

    let w = worker.clone();
    let c = calls.clone();
    worker.schedule(
      move |sub| {
        let c = c.clone();
        w.schedule(
          move |_| {
            let mut calls = c.lock().unwrap();
            *calls += 1;
            if *calls <= 1 {
              Ok(Some(Continuation::DelayFromNow(Duration::from_nanos(1))))
            } else {
              Ok(None)
            }
          },
          sub,
        );
        Ok(None)
      },
      &subscriber,
    );

    wait_for(|| (*calls.lock().unwrap() == 2).then_some(()));
  }
}
