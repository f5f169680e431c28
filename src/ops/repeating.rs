//! Shared resubscription machinery for `repeat_when`, `retry_when` and
//! `retry`.
//!
//! Resubscription requests go through an iterative pump: a request made
//! while an attempt is on the stack only bumps a counter, and the frame
//! already inside [`ResubscribeState::pump`] picks it up after the current
//! attempt unwinds. Hundreds of thousands of back-to-back resubscriptions
//! therefore run in constant stack.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::disposable::Disposable;
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;

/// Reaction to the source's terminal signals.
pub(crate) trait ResubscribePolicy<Item, Err>: Send + Sync + Sized + 'static {
  fn source_completed(state: &Arc<ResubscribeState<Item, Err, Self>>);
  fn source_error(state: &Arc<ResubscribeState<Item, Err, Self>>, err: Err);
}

pub(crate) struct ResubscribeState<Item, Err, P> {
  source: Observable<Item, Err>,
  pub(crate) downstream: Subscriber<Item, Err>,
  /// Child of the downstream composite holding the current attempt and any
  /// in-flight notifier subscription.
  lifetime: Disposable,
  current: Mutex<Option<Disposable>>,
  pumping: AtomicBool,
  pending: AtomicUsize,
  pub(crate) policy: P,
}

impl<Item, Err, P> ResubscribeState<Item, Err, P>
where
  Item: Send + 'static,
  Err: Send + 'static,
  P: ResubscribePolicy<Item, Err>,
{
  /// Wire the state under `downstream` and make the first subscription.
  pub(crate) fn start(source: Observable<Item, Err>, downstream: Subscriber<Item, Err>, policy: P) {
    let lifetime = Disposable::new();
    downstream.set_upstream(lifetime.clone());
    let state = Arc::new(ResubscribeState {
      source,
      downstream,
      lifetime,
      current: Mutex::new(None),
      pumping: AtomicBool::new(false),
      pending: AtomicUsize::new(0),
      policy,
    });
    Self::launch(&state);
  }

  /// Request one (re)subscription of the source.
  pub(crate) fn launch(this: &Arc<Self>) {
    this.pending.fetch_add(1, Ordering::AcqRel);
    Self::pump(this);
  }

  fn pump(this: &Arc<Self>) {
    if this.pumping.swap(true, Ordering::AcqRel) {
      return;
    }
    loop {
      while this.pending.load(Ordering::Acquire) > 0 {
        this.pending.fetch_sub(1, Ordering::AcqRel);
        if !this.lifetime.is_disposed() && !this.downstream.is_disposed() {
          Self::attempt(this);
        }
      }
      this.pumping.store(false, Ordering::Release);
      // A request may have slipped in between the drain and the release.
      if this.pending.load(Ordering::Acquire) == 0 {
        return;
      }
      if this.pumping.swap(true, Ordering::AcqRel) {
        return;
      }
    }
  }

  fn attempt(this: &Arc<Self>) {
    let upstream = Disposable::new();
    {
      let mut current = this.current.lock().unwrap();
      if let Some(previous) = current.take() {
        this.lifetime.remove(&previous);
      }
      this.lifetime.add(upstream.clone());
      *current = Some(upstream.clone());
    }
    let observer = SourceObserver { state: this.clone() };
    this.source.subscribe_with(Subscriber::with_upstream(observer, upstream));
  }

  /// Subscribe a notifier round. Each emission requests one resubscription;
  /// completing without having emitted invokes `exhausted`; an error
  /// forwards downstream.
  pub(crate) fn subscribe_notifier<U: 'static>(
    this: &Arc<Self>, notifier: Observable<U, Err>,
    exhausted: impl Fn(&Arc<Self>) + Send + Sync + 'static,
  ) {
    let upstream = Disposable::new();
    this.lifetime.add(upstream.clone());
    let observer = NotifierObserver {
      state: this.clone(),
      fired: AtomicBool::new(false),
      exhausted: Box::new(exhausted),
    };
    notifier.subscribe_with(Subscriber::with_upstream(observer, upstream));
  }
}

struct SourceObserver<Item, Err, P> {
  state: Arc<ResubscribeState<Item, Err, P>>,
}

impl<Item, Err, P> Observer<Item, Err> for SourceObserver<Item, Err, P>
where
  Item: Send + 'static,
  Err: Send + 'static,
  P: ResubscribePolicy<Item, Err>,
{
  fn on_next(&self, value: Item) {
    self.state.downstream.on_next(value);
  }

  fn on_error(&self, err: Err) {
    P::source_error(&self.state, err);
  }

  fn on_completed(&self) {
    P::source_completed(&self.state);
  }
}

struct NotifierObserver<Item, Err, P> {
  state: Arc<ResubscribeState<Item, Err, P>>,
  fired: AtomicBool,
  exhausted: Box<dyn Fn(&Arc<ResubscribeState<Item, Err, P>>) + Send + Sync>,
}

impl<U, Item, Err, P> Observer<U, Err> for NotifierObserver<Item, Err, P>
where
  Item: Send + 'static,
  Err: Send + 'static,
  P: ResubscribePolicy<Item, Err>,
{
  fn on_next(&self, _value: U) {
    self.fired.store(true, Ordering::Release);
    ResubscribeState::launch(&self.state);
  }

  fn on_error(&self, err: Err) {
    self.state.downstream.on_error(err);
  }

  fn on_completed(&self) {
    if !self.fired.load(Ordering::Acquire) {
      (self.exhausted)(&self.state);
    }
  }
}
