use crate::disposable::Disposable;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::scheduler::{CurrentThreadScheduler, Scheduler};
use crate::subscriber::Subscriber;

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Mirror the source until `trigger` signals anything — a value or either
  /// terminal — then complete the downstream and dispose the source.
  /// Source terminals pass through normally and dispose the trigger.
  ///
  /// Both legs are attached from one trampoline step, so a trigger that
  /// itself schedules onto the current-thread queue (an `interval` on
  /// [`CurrentThreadScheduler`]) enqueues behind that step instead of
  /// draining the queue before the source is subscribed.
  pub fn take_until<U: Send + 'static>(self, trigger: Observable<U, Err>) -> Observable<Item, Err> {
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let source = self.clone();
      let trigger = trigger.clone();
      let mut slot = Some(downstream.clone());
      CurrentThreadScheduler.create_worker().schedule(
        move |_| {
          let Some(downstream) = slot.take() else {
            return Ok(None);
          };
          // The trigger subscription is a child of the shared composite: a
          // source terminal tears it down along with everything else.
          let trigger_slot = Disposable::new();
          downstream.disposable().add(trigger_slot.clone());
          let trigger_observer = TriggerObserver { downstream: downstream.clone() };
          trigger.subscribe_with(Subscriber::with_upstream(trigger_observer, trigger_slot));

          if downstream.is_disposed() {
            return Ok(None);
          }
          let source_observer = ForwardObserver { downstream: downstream.clone() };
          source
            .subscribe_with(Subscriber::with_upstream(source_observer, downstream.disposable()));
          Ok(None)
        },
        &downstream,
      );
    })
  }
}

struct ForwardObserver<Item, Err> {
  downstream: Subscriber<Item, Err>,
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for ForwardObserver<Item, Err> {
  fn on_next(&self, value: Item) {
    self.downstream.on_next(value);
  }

  fn on_error(&self, err: Err) {
    self.downstream.on_error(err);
  }

  fn on_completed(&self) {
    self.downstream.on_completed();
  }
}

struct TriggerObserver<Item, Err> {
  downstream: Subscriber<Item, Err>,
}

impl<U, Item: 'static, Err: 'static> Observer<U, Err> for TriggerObserver<Item, Err> {
  fn on_next(&self, _value: U) {
    self.downstream.on_completed();
  }

  fn on_error(&self, _err: Err) {
    self.downstream.on_completed();
  }

  fn on_completed(&self) {
    self.downstream.on_completed();
  }
}
