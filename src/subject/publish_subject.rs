use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;

struct SubjectState<Item, Err> {
  subscribers: Mutex<Vec<Subscriber<Item, Err>>>,
  disposed: AtomicBool,
}

/// Multicasts every pushed signal to the subscribers present at push time.
///
/// Late subscribers receive only future signals. Broadcasting snapshots the
/// subscriber list before iterating, so callbacks may subscribe or
/// unsubscribe without deadlocking the emission. A terminal disposes the
/// subject; a disposed subject refuses subscription (the subscription comes
/// back already disposed) and swallows further pushes.
///
/// Signals pushed from multiple producer threads need
/// [`SerializedSubject`](crate::subject::SerializedSubject).
pub struct PublishSubject<Item, Err> {
  state: Arc<SubjectState<Item, Err>>,
}

impl<Item, Err> Clone for PublishSubject<Item, Err> {
  fn clone(&self) -> Self {
    PublishSubject { state: self.state.clone() }
  }
}

impl<Item, Err> PublishSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  pub fn new() -> Self {
    PublishSubject {
      state: Arc::new(SubjectState {
        subscribers: Mutex::new(Vec::new()),
        disposed: AtomicBool::new(false),
      }),
    }
  }

  /// The observable end.
  pub fn observable(&self) -> Observable<Item, Err> {
    let state = self.state.clone();
    Observable::new(move |subscriber| {
      if state.disposed.load(Ordering::Acquire) {
        subscriber.dispose();
        return;
      }
      let mut subscribers = state.subscribers.lock().unwrap();
      if state.disposed.load(Ordering::Acquire) {
        drop(subscribers);
        subscriber.dispose();
        return;
      }
      subscribers.retain(|s| !s.is_disposed());
      subscribers.push(subscriber);
    })
  }

  pub fn on_next(&self, value: Item) {
    if self.state.disposed.load(Ordering::Acquire) {
      return;
    }
    for subscriber in self.snapshot() {
      subscriber.on_next(value.clone());
    }
  }

  pub fn on_error(&self, err: Err) {
    if self.state.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    for subscriber in self.drain() {
      subscriber.on_error(err.clone());
    }
  }

  pub fn on_completed(&self) {
    if self.state.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    for subscriber in self.drain() {
      subscriber.on_completed();
    }
  }

  /// Dispose the subject and every current subscription without a terminal.
  pub fn dispose(&self) {
    if self.state.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    for subscriber in self.drain() {
      subscriber.dispose();
    }
  }

  pub fn is_disposed(&self) -> bool {
    self.state.disposed.load(Ordering::Acquire)
  }

  /// Number of live subscriptions.
  pub fn subscriber_count(&self) -> usize {
    let mut subscribers = self.state.subscribers.lock().unwrap();
    subscribers.retain(|s| !s.is_disposed());
    subscribers.len()
  }

  fn snapshot(&self) -> Vec<Subscriber<Item, Err>> {
    let mut subscribers = self.state.subscribers.lock().unwrap();
    subscribers.retain(|s| !s.is_disposed());
    subscribers.clone()
  }

  fn drain(&self) -> Vec<Subscriber<Item, Err>> {
    std::mem::take(&mut *self.state.subscribers.lock().unwrap())
  }
}

impl<Item, Err> Default for PublishSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<Item, Err> Observer<Item, Err> for PublishSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn on_next(&self, value: Item) {
    PublishSubject::on_next(self, value);
  }

  fn on_error(&self, err: Err) {
    PublishSubject::on_error(self, err);
  }

  fn on_completed(&self) {
    PublishSubject::on_completed(self);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[test]
  fn multicasts_to_all_current_subscribers() {
    let subject = PublishSubject::<i32, ()>::new();
    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));

    let f = first.clone();
    subject.observable().subscribe(move |v| f.lock().unwrap().push(v));
    subject.on_next(1);

    let s = second.clone();
    subject.observable().subscribe(move |v| s.lock().unwrap().push(v));
    subject.on_next(2);

    assert_eq!(*first.lock().unwrap(), vec![1, 2]);
    // Late subscribers see only future signals.
    assert_eq!(*second.lock().unwrap(), vec![2]);
  }

  #[test]
  fn unsubscribed_observer_stops_receiving() {
    let subject = PublishSubject::<i32, ()>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let d = subject.observable().subscribe(move |v| s.lock().unwrap().push(v));

    subject.on_next(1);
    d.dispose();
    subject.on_next(2);
    assert_eq!(*seen.lock().unwrap(), vec![1]);
  }

  #[test]
  fn terminal_reaches_subscribers_once() {
    let subject = PublishSubject::<i32, &'static str>::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let l = log.clone();
    subject
      .observable()
      .subscribe_all(|_| {}, move |e| l.lock().unwrap().push(e), || {});

    subject.on_error("stop");
    subject.on_error("again");
    subject.on_completed();
    assert_eq!(*log.lock().unwrap(), vec!["stop"]);
    assert!(subject.is_disposed());
  }

  #[test]
  fn disposed_subject_refuses_subscription() {
    let subject = PublishSubject::<i32, ()>::new();
    subject.dispose();
    let d = subject.observable().subscribe(|_| panic!("no signals expected"));
    assert!(d.is_disposed());
    subject.on_next(1);
  }

  #[test]
  fn subscribing_during_emission_is_tolerated() {
    let subject = PublishSubject::<i32, ()>::new();
    let late = Arc::new(Mutex::new(Vec::new()));

    let inner_subject = subject.clone();
    let l = late.clone();
    subject.observable().subscribe(move |v| {
      if v == 1 {
        let l = l.clone();
        inner_subject.observable().subscribe(move |v| l.lock().unwrap().push(v));
      }
    });

    subject.on_next(1);
    subject.on_next(2);
    assert_eq!(*late.lock().unwrap(), vec![2]);
  }
}
