use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::ops::repeating::{ResubscribePolicy, ResubscribeState};
use crate::subscriber::Subscriber;

struct RetryWhenPolicy<U, Err> {
  notifier: Arc<dyn Fn(&Err) -> Observable<U, Err> + Send + Sync>,
  last_error: Mutex<Option<Err>>,
}

impl<Item, Err, U> ResubscribePolicy<Item, Err> for RetryWhenPolicy<U, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  U: 'static,
{
  fn source_completed(state: &Arc<ResubscribeState<Item, Err, Self>>) {
    state.downstream.on_completed();
  }

  fn source_error(state: &Arc<ResubscribeState<Item, Err, Self>>, err: Err) {
    let round = (state.policy.notifier)(&err);
    *state.policy.last_error.lock().unwrap() = Some(err);
    ResubscribeState::subscribe_notifier(state, round, |state| {
      // A round that ends without asking for a retry gives up with the
      // error that started it.
      match state.policy.last_error.lock().unwrap().take() {
        Some(err) => state.downstream.on_error(err),
        None => state.downstream.on_completed(),
      }
    });
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// On source error, subscribe the observable returned by `notifier` for
  /// that error: each of its emissions re-subscribes the source, completing
  /// without an emission gives up with the original error, and its own
  /// error propagates.
  pub fn retry_when<U: 'static>(
    self, notifier: impl Fn(&Err) -> Observable<U, Err> + Send + Sync + 'static,
  ) -> Observable<Item, Err> {
    let notifier: Arc<dyn Fn(&Err) -> Observable<U, Err> + Send + Sync> = Arc::new(notifier);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      ResubscribeState::start(
        self.clone(),
        downstream,
        RetryWhenPolicy { notifier: notifier.clone(), last_error: Mutex::new(None) },
      );
    })
  }
}
