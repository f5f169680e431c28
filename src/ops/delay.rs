use std::sync::Arc;
use std::time::Duration;

use crate::disposable::Disposable;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::{Scheduler, Worker};
use crate::subscriber::Subscriber;

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Shift every signal — values and the terminal alike — `delay` into the
  /// future, delivered on a worker of `scheduler`.
  ///
  /// Each signal is scheduled `delay` from its own arrival
  /// (`DelayFromNow`), and the worker's `(due, submission)` ordering keeps
  /// the delayed signals in their original order.
  pub fn delay(self, delay: Duration, scheduler: impl Scheduler + 'static) -> Observable<Item, Err> {
    let scheduler = Arc::new(scheduler);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      // The upstream terminal must not tear down the downstream before the
      // delayed signals run, so this stage gets a child disposable of its
      // own rather than sharing the downstream composite.
      let upstream = Disposable::new();
      downstream.disposable().add(upstream.clone());
      let observer = DelayObserver {
        downstream: downstream.clone(),
        worker: scheduler.create_worker(),
        delay,
      };
      self.subscribe_with(Subscriber::with_upstream(observer, upstream));
    })
  }
}

struct DelayObserver<Item, Err> {
  downstream: Subscriber<Item, Err>,
  worker: Worker,
  delay: Duration,
}

impl<Item: Send + 'static, Err: Send + 'static> Observer<Item, Err> for DelayObserver<Item, Err> {
  fn on_next(&self, value: Item) {
    let mut value = Some(value);
    self.worker.schedule_after(
      self.delay,
      move |sub| {
        if let Some(value) = value.take() {
          sub.on_next(value);
        }
        Ok(None)
      },
      &self.downstream,
    );
  }

  fn on_error(&self, err: Err) {
    let mut err = Some(err);
    self.worker.schedule_after(
      self.delay,
      move |sub| {
        if let Some(err) = err.take() {
          sub.on_error(err);
        }
        Ok(None)
      },
      &self.downstream,
    );
  }

  fn on_completed(&self) {
    self.worker.schedule_after(
      self.delay,
      |sub| {
        sub.on_completed();
        Ok(None)
      },
      &self.downstream,
    );
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::create;
  use crate::scheduler::TestScheduler;
  use crate::subject::PublishSubject;

  #[test]
  fn values_and_terminal_shift_by_the_delay() {
    let scheduler = TestScheduler::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());

    create::<_, (), _>(|subscriber| {
      subscriber.on_next(1);
      subscriber.on_next(2);
      subscriber.on_completed();
    })
    .delay(Duration::from_secs(3), scheduler.clone())
    .subscribe_all(
      move |v| l1.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || l2.lock().unwrap().push("completed".into()),
    );

    assert!(log.lock().unwrap().is_empty());
    scheduler.time_advance(Duration::from_secs(3));
    assert_eq!(*log.lock().unwrap(), vec!["next 1", "next 2", "completed"]);
  }

  #[test]
  fn signal_spacing_is_preserved() {
    let scheduler = TestScheduler::new();
    let source = PublishSubject::<i32, &'static str>::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());

    source
      .observable()
      .delay(Duration::from_secs(3), scheduler.clone())
      .subscribe_all(
        move |v| l1.lock().unwrap().push(format!("next {v}")),
        move |e| l2.lock().unwrap().push(format!("error {e}")),
        || {},
      );

    // 0@0s, 1@1s, 2@2s, error@3s.
    source.on_next(0);
    scheduler.time_advance(Duration::from_secs(1));
    source.on_next(1);
    scheduler.time_advance(Duration::from_secs(1));
    source.on_next(2);
    scheduler.time_advance(Duration::from_secs(1));
    source.on_error("bang");

    assert_eq!(*log.lock().unwrap(), vec!["next 0"]);
    scheduler.time_advance(Duration::from_secs(1));
    assert_eq!(*log.lock().unwrap(), vec!["next 0", "next 1"]);
    scheduler.time_advance(Duration::from_secs(1));
    assert_eq!(*log.lock().unwrap(), vec!["next 0", "next 1", "next 2"]);
    scheduler.time_advance(Duration::from_secs(1));
    assert_eq!(*log.lock().unwrap(), vec!["next 0", "next 1", "next 2", "error bang"]);
  }

  #[test]
  fn disposing_cancels_pending_signals() {
    let scheduler = TestScheduler::new();
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let e = emitted.clone();

    let d = create::<_, (), _>(|subscriber| {
      subscriber.on_next(42);
      subscriber.on_completed();
    })
    .delay(Duration::from_secs(1), scheduler.clone())
    .subscribe(move |v| e.lock().unwrap().push(v));

    d.dispose();
    scheduler.time_advance(Duration::from_secs(2));
    assert!(emitted.lock().unwrap().is_empty());
  }
}
