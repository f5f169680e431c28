use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subject::PublishSubject;

/// A [`PublishSubject`] whose outgoing signals are serialized through a
/// lock, so producers on different threads deliver atomically per observer.
///
/// The serialization is for cross-thread producers; pushing into the same
/// serialized subject from inside one of its own callbacks deadlocks.
pub struct SerializedSubject<Item, Err> {
  inner: PublishSubject<Item, Err>,
  gate: Arc<Mutex<()>>,
}

impl<Item, Err> Clone for SerializedSubject<Item, Err> {
  fn clone(&self) -> Self {
    SerializedSubject { inner: self.inner.clone(), gate: self.gate.clone() }
  }
}

impl<Item, Err> SerializedSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  pub fn new() -> Self {
    SerializedSubject { inner: PublishSubject::new(), gate: Arc::new(Mutex::new(())) }
  }

  pub fn observable(&self) -> Observable<Item, Err> {
    self.inner.observable()
  }

  pub fn on_next(&self, value: Item) {
    let _guard = self.gate.lock().unwrap();
    self.inner.on_next(value);
  }

  pub fn on_error(&self, err: Err) {
    let _guard = self.gate.lock().unwrap();
    self.inner.on_error(err);
  }

  pub fn on_completed(&self) {
    let _guard = self.gate.lock().unwrap();
    self.inner.on_completed();
  }

  pub fn dispose(&self) {
    let _guard = self.gate.lock().unwrap();
    self.inner.dispose();
  }

  pub fn is_disposed(&self) -> bool {
    self.inner.is_disposed()
  }

  pub fn subscriber_count(&self) -> usize {
    self.inner.subscriber_count()
  }
}

impl<Item, Err> Default for SerializedSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<Item, Err> Observer<Item, Err> for SerializedSubject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn on_next(&self, value: Item) {
    SerializedSubject::on_next(self, value);
  }

  fn on_error(&self, err: Err) {
    SerializedSubject::on_error(self, err);
  }

  fn on_completed(&self) {
    SerializedSubject::on_completed(self);
  }
}
