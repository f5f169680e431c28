use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::disposable::Disposable;
use crate::observer::Observer;

/// The stateful end of a subscription: an [`Observer`] plus the terminal
/// latch and the upstream disposable.
///
/// A subscriber delivers at most one terminal signal. After a terminal, or
/// after its disposable has been disposed externally, every call is a no-op.
/// Terminals dispose the upstream composite, so producers and scheduled work
/// hanging off [`set_upstream`](Self::set_upstream) are torn down by the
/// stream ending as well as by explicit cancellation.
pub struct Subscriber<Item, Err> {
  observer: Arc<dyn Observer<Item, Err>>,
  upstream: Disposable,
  stopped: Arc<AtomicBool>,
}

impl<Item, Err> Clone for Subscriber<Item, Err> {
  fn clone(&self) -> Self {
    Subscriber {
      observer: self.observer.clone(),
      upstream: self.upstream.clone(),
      stopped: self.stopped.clone(),
    }
  }
}

impl<Item: 'static, Err: 'static> Subscriber<Item, Err> {
  /// Wrap an observer with a fresh disposable.
  pub fn new(observer: impl Observer<Item, Err> + 'static) -> Self {
    Self::with_upstream(observer, Disposable::new())
  }

  /// Wrap an observer over an existing disposable.
  ///
  /// Operators use this to decide teardown topology: pass-through stages
  /// share the downstream composite, stages that outlive the upstream
  /// terminal (delay, observe_on) get a child of their own.
  pub fn with_upstream(observer: impl Observer<Item, Err> + 'static, upstream: Disposable) -> Self {
    Subscriber {
      observer: Arc::new(observer),
      upstream,
      stopped: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn on_next(&self, value: Item) {
    if self.is_disposed() {
      return;
    }
    self.observer.on_next(value);
  }

  pub fn on_error(&self, err: Err) {
    if self.finish() {
      self.observer.on_error(err);
      self.upstream.dispose();
    }
  }

  pub fn on_completed(&self) {
    if self.finish() {
      self.observer.on_completed();
      self.upstream.dispose();
    }
  }

  fn finish(&self) -> bool {
    !self.upstream.is_disposed() && !self.stopped.swap(true, Ordering::AcqRel)
  }

  /// Attach the producer-side disposable, so disposing this subscriber
  /// forcibly disposes the producer. On an already disposed subscriber the
  /// producer side is disposed immediately.
  pub fn set_upstream(&self, d: Disposable) {
    self.upstream.add(d);
  }

  /// True once a terminal has been delivered or the subscription disposed.
  pub fn is_disposed(&self) -> bool {
    self.stopped.load(Ordering::Acquire) || self.upstream.is_disposed()
  }

  pub fn dispose(&self) {
    self.upstream.dispose();
  }

  /// The upstream composite this subscriber tears down on terminal.
  pub fn disposable(&self) -> Disposable {
    self.upstream.clone()
  }
}
