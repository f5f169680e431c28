//! The lazy producer and its leaf sources.

pub mod blocking;
pub mod create;
pub mod from_iter;
pub mod interval;
pub mod just;
pub mod trivial;

use std::fmt::Debug;
use std::sync::Arc;

use crate::disposable::Disposable;
use crate::observer::{LambdaObserver, Observer};
use crate::subscriber::Subscriber;

pub use blocking::BlockingObservable;
pub use create::create;
pub use from_iter::from_iter;
pub use interval::interval;
pub use just::just;
pub use trivial::{concat, empty, never, throw};

/// A lazy producer of a sequence of `Item` values ending in at most one
/// terminal (completion or an opaque `Err`).
///
/// An observable is a value, not a stream state: it carries only a subscribe
/// function, may be subscribed any number of times, and each subscription
/// runs the producer afresh unless the observable was made hot explicitly
/// (see [`publish`](Observable::publish)).
///
/// Emission happens on the subscribing thread unless an operator interposed
/// a scheduler (`delay`, `observe_on`, `subscribe_on`).
pub struct Observable<Item, Err> {
  on_subscribe: Arc<dyn Fn(Subscriber<Item, Err>) + Send + Sync>,
}

impl<Item, Err> Clone for Observable<Item, Err> {
  fn clone(&self) -> Self {
    Observable { on_subscribe: self.on_subscribe.clone() }
  }
}

impl<Item: 'static, Err: 'static> Observable<Item, Err> {
  /// Wrap a subscribe function.
  ///
  /// The function receives the downstream [`Subscriber`]; it should attach
  /// any producer-side teardown via `set_upstream` and respect
  /// `is_disposed` between emissions.
  pub fn new(on_subscribe: impl Fn(Subscriber<Item, Err>) + Send + Sync + 'static) -> Self {
    Observable { on_subscribe: Arc::new(on_subscribe) }
  }

  /// Subscribe with a prepared subscriber; returns its disposable.
  pub fn subscribe_with(&self, subscriber: Subscriber<Item, Err>) -> Disposable {
    let handle = subscriber.disposable();
    (self.on_subscribe)(subscriber);
    handle
  }

  /// Subscribe with an observer; returns the subscription's disposable.
  pub fn subscribe_observer(&self, observer: impl Observer<Item, Err> + 'static) -> Disposable {
    self.subscribe_with(Subscriber::new(observer))
  }

  /// Subscribe with a value callback.
  ///
  /// A stream error arriving here has no handler; it is logged and the
  /// subscription ends. Use [`subscribe_all`](Observable::subscribe_all)
  /// to receive it.
  pub fn subscribe(&self, next: impl Fn(Item) + Send + Sync + 'static) -> Disposable
  where
    Err: Debug,
  {
    self.subscribe_observer(LambdaObserver::new(
      next,
      |err: Err| tracing::error!(?err, "unhandled stream error"),
      || {},
    ))
  }

  /// Subscribe with callbacks for all three signals.
  pub fn subscribe_all(
    &self, next: impl Fn(Item) + Send + Sync + 'static,
    error: impl Fn(Err) + Send + Sync + 'static, complete: impl Fn() + Send + Sync + 'static,
  ) -> Disposable {
    self.subscribe_observer(LambdaObserver::new(next, error, complete))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[test]
  fn resubscribable_runs_producer_afresh() {
    let runs = Arc::new(Mutex::new(0));
    let r = runs.clone();
    let source: Observable<i32, ()> = Observable::new(move |subscriber| {
      *r.lock().unwrap() += 1;
      subscriber.on_next(1);
      subscriber.on_completed();
    });

    source.subscribe(|_| {});
    source.subscribe(|_| {});
    assert_eq!(*runs.lock().unwrap(), 2);
  }

  #[test]
  fn subscribe_returns_the_subscription_disposable() {
    let source: Observable<i32, ()> = Observable::new(|_subscriber| {});
    let d = source.subscribe(|_| {});
    assert!(!d.is_disposed());
    d.dispose();
    assert!(d.is_disposed());
  }

  #[test]
  fn producer_teardown_runs_on_terminal() {
    let torn_down = Arc::new(Mutex::new(false));
    let t = torn_down.clone();
    let source: Observable<i32, ()> = Observable::new(move |subscriber| {
      let t = t.clone();
      let producer = Disposable::new();
      producer.add_callback(move || *t.lock().unwrap() = true);
      subscriber.set_upstream(producer);
      subscriber.on_next(1);
      subscriber.on_completed();
    });
    source.subscribe(|_| {});
    assert!(*torn_down.lock().unwrap());
  }
}
