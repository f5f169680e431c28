use std::sync::Arc;

use crate::observable::Observable;
use crate::ops::repeating::{ResubscribePolicy, ResubscribeState};
use crate::subscriber::Subscriber;

struct RepeatWhenPolicy<U, Err> {
  notifier: Arc<dyn Fn() -> Observable<U, Err> + Send + Sync>,
}

impl<Item, Err, U> ResubscribePolicy<Item, Err> for RepeatWhenPolicy<U, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
  U: 'static,
{
  fn source_completed(state: &Arc<ResubscribeState<Item, Err, Self>>) {
    let round = (state.policy.notifier)();
    ResubscribeState::subscribe_notifier(state, round, |state| state.downstream.on_completed());
  }

  fn source_error(state: &Arc<ResubscribeState<Item, Err, Self>>, err: Err) {
    state.downstream.on_error(err);
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// On source completion, subscribe the observable returned by `notifier`:
  /// each of its emissions re-subscribes the source, completing without an
  /// emission propagates the completion, and its error propagates as an
  /// error.
  ///
  /// A notifier that wants to fail returns a
  /// [`throw`](crate::observable::throw) observable.
  pub fn repeat_when<U: 'static>(
    self, notifier: impl Fn() -> Observable<U, Err> + Send + Sync + 'static,
  ) -> Observable<Item, Err> {
    let notifier: Arc<dyn Fn() -> Observable<U, Err> + Send + Sync> = Arc::new(notifier);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      ResubscribeState::start(
        self.clone(),
        downstream,
        RepeatWhenPolicy { notifier: notifier.clone() },
      );
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  use crate::observable::{create, empty, just, throw};

  fn counting_source() -> (crate::observable::Observable<usize, &'static str>, Arc<AtomicUsize>) {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let s = subscriptions.clone();
    let source = create(move |subscriber| {
      let n = s.fetch_add(1, Ordering::SeqCst) + 1;
      subscriber.on_next(n);
      subscriber.on_completed();
    });
    (source, subscriptions)
  }

  #[test]
  fn empty_notifier_passes_completion_through() {
    let (source, subscriptions) = counting_source();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());

    source.repeat_when(|| empty::<i32, _>()).subscribe_all(
      move |v| l1.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || l2.lock().unwrap().push("completed".into()),
    );

    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    assert_eq!(*log.lock().unwrap(), vec!["next 1", "completed"]);
  }

  #[test]
  fn notifier_emission_resubscribes() {
    let (source, subscriptions) = counting_source();
    let rounds = Arc::new(AtomicUsize::new(0));
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let e = emitted.clone();

    let r = rounds.clone();
    source
      .repeat_when(move || -> crate::observable::Observable<i32, &'static str> {
        if r.fetch_add(1, Ordering::SeqCst) == 0 { just(1) } else { empty() }
      })
      .subscribe(move |v| e.lock().unwrap().push(v));

    assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
    assert_eq!(*emitted.lock().unwrap(), vec![1, 2]);
  }

  #[test]
  fn notifier_resubscribes_multiple_times() {
    let (source, subscriptions) = counting_source();
    let rounds = Arc::new(AtomicUsize::new(0));
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let e = emitted.clone();

    let r = rounds.clone();
    source
      .repeat_when(move || -> crate::observable::Observable<i32, &'static str> {
        if r.fetch_add(1, Ordering::SeqCst) >= 3 { empty() } else { just(1) }
      })
      .subscribe(move |v| e.lock().unwrap().push(v));

    assert_eq!(subscriptions.load(Ordering::SeqCst), 4);
    assert_eq!(*emitted.lock().unwrap(), vec![1, 2, 3, 4]);
  }

  #[test]
  fn failing_notifier_propagates_its_error() {
    let (source, subscriptions) = counting_source();
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();

    source
      .repeat_when(|| throw::<i32, _>("notifier failed"))
      .subscribe_all(|_| {}, move |e| *s.lock().unwrap() = Some(e), || {});

    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    assert_eq!(*seen.lock().unwrap(), Some("notifier failed"));
  }

  #[test]
  fn source_error_passes_through() {
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    throw::<i32, _>("source failed")
      .repeat_when(|| just::<_, &'static str>(1))
      .subscribe_all(|_| {}, move |e| *s.lock().unwrap() = Some(e), || {});
    assert_eq!(*seen.lock().unwrap(), Some("source failed"));
  }

  #[test]
  fn half_a_million_repeats_do_not_overflow_the_stack() {
    let count = 500_000usize;
    let remaining = Arc::new(AtomicUsize::new(count));
    let values = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(Mutex::new(false));

    let v = values.clone();
    let c = completed.clone();
    let r = remaining.clone();
    create::<_, (), _>(|subscriber| {
      subscriber.on_next(1);
      subscriber.on_completed();
    })
    .repeat_when(move || -> crate::observable::Observable<i32, ()> {
      if r.fetch_sub(1, Ordering::SeqCst) > 1 { just(1) } else { empty() }
    })
    .subscribe_all(
      move |_| {
        v.fetch_add(1, Ordering::SeqCst);
      },
      |_| {},
      move || *c.lock().unwrap() = true,
    );

    assert_eq!(values.load(Ordering::SeqCst), count);
    assert!(*completed.lock().unwrap());
  }
}
