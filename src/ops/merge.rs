use std::sync::{Arc, Mutex};

use crate::disposable::{Disposable, RefCountDisposable};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::{CurrentThreadScheduler, Scheduler};
use crate::subscriber::Subscriber;

struct MergeState<Item, Err> {
  downstream: Subscriber<Item, Err>,
  lifetime: RefCountDisposable,
  // Both legs may emit concurrently; the downstream observer must never be
  // entered concurrently.
  gate: Mutex<()>,
}

struct MergeObserver<Item, Err> {
  state: Arc<MergeState<Item, Err>>,
  slot: Disposable,
}

impl<Item: Send + 'static, Err: Send + 'static> Observer<Item, Err> for MergeObserver<Item, Err> {
  fn on_next(&self, value: Item) {
    let _guard = self.state.gate.lock().unwrap();
    self.state.downstream.on_next(value);
  }

  fn on_error(&self, err: Err) {
    let _guard = self.state.gate.lock().unwrap();
    self.state.downstream.on_error(err);
  }

  fn on_completed(&self) {
    self.slot.dispose();
    if self.state.lifetime.is_disposed() {
      let _guard = self.state.gate.lock().unwrap();
      self.state.downstream.on_completed();
    }
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Interleave this observable with another; completes once both complete,
  /// errors as soon as either errors.
  ///
  /// Both legs are attached from one trampoline step, so a leg scheduling
  /// onto the current-thread queue enqueues behind that step instead of
  /// draining the queue before the other leg is subscribed.
  pub fn merge_with(self, other: Observable<Item, Err>) -> Observable<Item, Err> {
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let legs = [self.clone(), other.clone()];
      let mut slot = Some(downstream.clone());
      CurrentThreadScheduler.create_worker().schedule(
        move |_| {
          let Some(downstream) = slot.take() else {
            return Ok(None);
          };
          let lifetime = RefCountDisposable::new();
          downstream.set_upstream(lifetime.disposable());
          let state =
            Arc::new(MergeState { downstream, lifetime: lifetime.clone(), gate: Mutex::new(()) });
          for leg in &legs {
            let leg_slot = lifetime.add_ref();
            let upstream = Disposable::new();
            leg_slot.add(upstream.clone());
            let observer = MergeObserver { state: state.clone(), slot: leg_slot };
            leg.subscribe_with(Subscriber::with_upstream(observer, upstream));
          }
          Ok(None)
        },
        &downstream,
      );
    })
  }
}
