use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::disposable::Disposable;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::{Scheduler, Worker};
use crate::subscriber::Subscriber;

enum Signal<Item, Err> {
  Next(Item),
  Error(Err),
  Completed,
}

struct ObserveOnState<Item, Err> {
  downstream: Subscriber<Item, Err>,
  queue: Mutex<VecDeque<Signal<Item, Err>>>,
  draining: AtomicBool,
  worker: Worker,
}

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Re-emit every signal on a worker of `scheduler`.
  ///
  /// Incoming signals are queued and a drain task is scheduled; the drain
  /// runs the queued signals in arrival order on the worker, so downstream
  /// order equals upstream order and the single-threaded worker keeps the
  /// downstream observer from being entered concurrently.
  pub fn observe_on(self, scheduler: impl Scheduler + 'static) -> Observable<Item, Err> {
    let scheduler = Arc::new(scheduler);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let upstream = Disposable::new();
      downstream.disposable().add(upstream.clone());
      let observer = ObserveOnObserver {
        state: Arc::new(ObserveOnState {
          downstream: downstream.clone(),
          queue: Mutex::new(VecDeque::new()),
          draining: AtomicBool::new(false),
          worker: scheduler.create_worker(),
        }),
      };
      self.subscribe_with(Subscriber::with_upstream(observer, upstream));
    })
  }
}

struct ObserveOnObserver<Item, Err> {
  state: Arc<ObserveOnState<Item, Err>>,
}

impl<Item: Send + 'static, Err: Send + 'static> ObserveOnObserver<Item, Err> {
  fn push(&self, signal: Signal<Item, Err>) {
    let state = &self.state;
    state.queue.lock().unwrap().push_back(signal);
    if state.draining.swap(true, Ordering::AcqRel) {
      // A drain task is already scheduled or running; it will see the entry.
      return;
    }
    let drain = state.clone();
    state.worker.schedule(
      move |sub| {
        loop {
          let signal = drain.queue.lock().unwrap().pop_front();
          match signal {
            Some(Signal::Next(value)) => sub.on_next(value),
            Some(Signal::Error(err)) => sub.on_error(err),
            Some(Signal::Completed) => sub.on_completed(),
            None => {
              drain.draining.store(false, Ordering::Release);
              // Entries pushed between the empty pop and the release are
              // reclaimed here instead of racing a fresh drain task.
              if drain.queue.lock().unwrap().is_empty()
                || drain.draining.swap(true, Ordering::AcqRel)
              {
                return Ok(None);
              }
            }
          }
        }
      },
      &state.downstream,
    );
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observer<Item, Err>
  for ObserveOnObserver<Item, Err>
{
  fn on_next(&self, value: Item) {
    self.push(Signal::Next(value));
  }

  fn on_error(&self, err: Err) {
    self.push(Signal::Error(err));
  }

  fn on_completed(&self) {
    self.push(Signal::Completed);
  }
}
