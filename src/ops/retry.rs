use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observable::Observable;
use crate::ops::repeating::{ResubscribePolicy, ResubscribeState};
use crate::subscriber::Subscriber;

struct RetryPolicy {
  remaining: AtomicUsize,
}

impl<Item, Err> ResubscribePolicy<Item, Err> for RetryPolicy
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn source_completed(state: &Arc<ResubscribeState<Item, Err, Self>>) {
    state.downstream.on_completed();
  }

  fn source_error(state: &Arc<ResubscribeState<Item, Err, Self>>, err: Err) {
    let retried = state
      .policy
      .remaining
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
      .is_ok();
    if retried {
      ResubscribeState::launch(state);
    } else {
      state.downstream.on_error(err);
    }
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Re-subscribe on error up to `count` times; once exhausted, propagate
  /// the last error. `retry(2)` makes at most three attempts.
  pub fn retry(self, count: usize) -> Observable<Item, Err> {
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      ResubscribeState::start(
        self.clone(),
        downstream,
        RetryPolicy { remaining: AtomicUsize::new(count) },
      );
    })
  }
}
