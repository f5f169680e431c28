use std::sync::Arc;

use crate::observable::Observable;
use crate::scheduler::Scheduler;
use crate::subscriber::Subscriber;

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Perform the subscription itself — and therefore a synchronous source's
  /// emissions — on a worker of `scheduler`.
  pub fn subscribe_on(self, scheduler: impl Scheduler + 'static) -> Observable<Item, Err> {
    let scheduler = Arc::new(scheduler);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let worker = scheduler.create_worker();
      let source = self.clone();
      let mut slot = Some(downstream.clone());
      worker.schedule(
        move |_| {
          if let Some(downstream) = slot.take() {
            source.subscribe_with(downstream);
          }
          Ok(None)
        },
        &downstream,
      );
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};
  use std::thread;

  use crate::observable::from_iter;
  use crate::scheduler::NewThreadScheduler;

  #[test]
  fn subscription_runs_on_the_worker_thread() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let threads = Arc::new(Mutex::new(Vec::new()));
    let (l, t) = (log.clone(), threads.clone());

    from_iter::<_, ()>(1..=10)
      .subscribe_on(NewThreadScheduler)
      .as_blocking()
      .subscribe_all(
        move |v| {
          t.lock().unwrap().push(thread::current().id());
          l.lock().unwrap().push(v);
        },
        |_| {},
        || {},
      );

    assert_eq!(*log.lock().unwrap(), (1..=10).collect::<Vec<_>>());
    assert!(threads.lock().unwrap().iter().all(|id| *id != thread::current().id()));
  }

  #[test]
  fn works_with_a_virtual_scheduler() {
    let scheduler = crate::scheduler::TestScheduler::new();
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let e = emitted.clone();

    from_iter::<_, ()>(0..3)
      .subscribe_on(scheduler.clone())
      .subscribe(move |v| e.lock().unwrap().push(v));

    // Immediate submissions on the virtual scheduler run at submit time.
    assert_eq!(*emitted.lock().unwrap(), vec![0, 1, 2]);
  }
}
