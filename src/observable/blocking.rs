use std::fmt::Debug;
use std::sync::{Arc, Condvar, Mutex};

use crate::observable::Observable;
use crate::observer::{LambdaObserver, Observer};
use crate::subscriber::Subscriber;

/// Terminator wrapper: subscribing blocks the calling thread until the
/// observer is disposed (a terminal arrived or the subscription was torn
/// down from elsewhere).
///
/// Subscription still happens on the calling thread, so a pipeline on the
/// current-thread scheduler drains inside the subscribe call; pipelines on
/// other schedulers park this thread on a condvar until they finish.
pub struct BlockingObservable<Item, Err> {
  source: Observable<Item, Err>,
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  pub fn as_blocking(self) -> BlockingObservable<Item, Err> {
    BlockingObservable { source: self }
  }
}

impl<Item: 'static, Err: 'static> BlockingObservable<Item, Err> {
  pub fn subscribe(&self, next: impl Fn(Item) + Send + Sync + 'static)
  where
    Err: Debug,
  {
    self.subscribe_observer(LambdaObserver::new(
      next,
      |err: Err| tracing::error!(?err, "unhandled stream error"),
      || {},
    ));
  }

  pub fn subscribe_all(
    &self, next: impl Fn(Item) + Send + Sync + 'static,
    error: impl Fn(Err) + Send + Sync + 'static, complete: impl Fn() + Send + Sync + 'static,
  ) {
    self.subscribe_observer(LambdaObserver::new(next, error, complete));
  }

  pub fn subscribe_observer(&self, observer: impl Observer<Item, Err> + 'static) {
    let subscriber = Subscriber::new(observer);
    let parked = Arc::new((Mutex::new(false), Condvar::new()));
    let signal = parked.clone();
    subscriber.disposable().add_callback(move || {
      let (done, wake) = &*signal;
      *done.lock().unwrap() = true;
      wake.notify_all();
    });

    self.source.subscribe_with(subscriber);

    let (done, wake) = &*parked;
    let mut done = done.lock().unwrap();
    while !*done {
      done = wake.wait(done).unwrap();
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};
  use std::time::{Duration, Instant};

  use super::*;
  use crate::observable::from_iter;
  use crate::scheduler::NewThreadScheduler;

  #[test]
  fn returns_after_synchronous_completion() {
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let e = emitted.clone();
    from_iter::<_, ()>(0..3).as_blocking().subscribe(move |v| e.lock().unwrap().push(v));
    assert_eq!(*emitted.lock().unwrap(), vec![0, 1, 2]);
  }

  #[test]
  fn blocks_until_the_off_thread_pipeline_finishes() {
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let e = emitted.clone();
    let started = Instant::now();
    from_iter::<_, ()>(0..5)
      .delay(Duration::from_millis(30), NewThreadScheduler)
      .as_blocking()
      .subscribe(move |v| e.lock().unwrap().push(v));
    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(*emitted.lock().unwrap(), vec![0, 1, 2, 3, 4]);
  }
}
