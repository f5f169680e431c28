use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::scheduler::new_thread::{NewThreadCore, PooledWorker};
use crate::scheduler::{Scheduler, Worker};

/// A fixed set of worker threads created eagerly.
///
/// `create_worker` hands out the underlying threads round-robin, so the
/// i-th and (i + n)-th workers share a thread. Disposing one handed-out
/// worker does not stop the shared thread; dropping the scheduler retires
/// all of them once their queues drain.
pub struct ThreadPoolScheduler {
  threads: Vec<Arc<NewThreadCore>>,
  next: AtomicUsize,
}

impl ThreadPoolScheduler {
  pub fn new(size: usize) -> Self {
    assert!(size > 0, "thread pool needs at least one thread");
    tracing::debug!(size, "thread pool created");
    ThreadPoolScheduler {
      threads: (0..size).map(|_| Arc::new(NewThreadCore::spawn())).collect(),
      next: AtomicUsize::new(0),
    }
  }

  pub fn size(&self) -> usize {
    self.threads.len()
  }
}

impl Scheduler for ThreadPoolScheduler {
  fn create_worker(&self) -> Worker {
    let index = self.next.fetch_add(1, Ordering::Relaxed) % self.threads.len();
    Worker::from_core(Arc::new(PooledWorker::new(self.threads[index].clone())))
  }
}

impl Clone for ThreadPoolScheduler {
  fn clone(&self) -> Self {
    ThreadPoolScheduler {
      threads: self.threads.clone(),
      next: AtomicUsize::new(self.next.load(Ordering::Relaxed)),
    }
  }
}
