use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::disposable::Disposable;
use crate::observable::Observable;
use crate::subject::PublishSubject;
use crate::subscriber::Subscriber;

struct ConnectableState<Item, Err> {
  source: Observable<Item, Err>,
  subject: PublishSubject<Item, Err>,
  connection: Mutex<Option<Disposable>>,
}

/// A cold observable wrapped behind a subject: subscribers attach to the
/// subject, and the single subscription to the underlying source is made by
/// [`connect`](ConnectableObservable::connect) — or managed automatically by
/// [`ref_count`](ConnectableObservable::ref_count).
pub struct ConnectableObservable<Item, Err> {
  state: Arc<ConnectableState<Item, Err>>,
}

impl<Item, Err> Clone for ConnectableObservable<Item, Err> {
  fn clone(&self) -> Self {
    ConnectableObservable { state: self.state.clone() }
  }
}

impl<Item, Err> ConnectableObservable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn new(source: Observable<Item, Err>) -> Self {
    ConnectableObservable {
      state: Arc::new(ConnectableState {
        source,
        subject: PublishSubject::new(),
        connection: Mutex::new(None),
      }),
    }
  }

  /// The multicast end; each call is another subscription to the subject.
  pub fn observable(&self) -> Observable<Item, Err> {
    self.state.subject.observable()
  }

  /// Subscribe the subject to the underlying source. Idempotent while the
  /// connection is live; returns the connection's disposable.
  pub fn connect(&self) -> Disposable {
    let subscriber = Subscriber::new(self.state.subject.clone());
    let d = subscriber.disposable();
    {
      // The slot is filled before subscribing, and the lock is released
      // first: a synchronously terminating source disposes the connection
      // through the slot from inside `subscribe_with`.
      let mut connection = self.state.connection.lock().unwrap();
      if let Some(existing) = connection.as_ref() {
        if !existing.is_disposed() {
          return existing.clone();
        }
      }
      *connection = Some(d.clone());
    }
    self.state.source.subscribe_with(subscriber);
    d
  }

  /// Connection management by subscriber count: the first subscription
  /// connects to the underlying source, the last unsubscription disposes
  /// the connection.
  pub fn ref_count(self) -> Observable<Item, Err> {
    let subscribers = Arc::new(AtomicUsize::new(0));
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      if self.state.subject.is_disposed() {
        downstream.dispose();
        return;
      }
      let first = subscribers.fetch_add(1, Ordering::AcqRel) == 0;
      {
        let subscribers = subscribers.clone();
        let connectable = self.clone();
        downstream.disposable().add_callback(move || {
          if subscribers.fetch_sub(1, Ordering::AcqRel) == 1 {
            let connection = connectable.state.connection.lock().unwrap().clone();
            if let Some(connection) = connection {
              connection.dispose();
            }
          }
        });
      }
      self.observable().subscribe_with(downstream);
      if first {
        self.connect();
      }
    })
  }
}

impl<Item, Err> Observable<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Make this cold observable hot behind a subject; see
  /// [`ConnectableObservable`].
  pub fn publish(self) -> ConnectableObservable<Item, Err> {
    ConnectableObservable::new(self)
  }
}
