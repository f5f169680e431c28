use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Forward only the values satisfying `predicate`.
  pub fn filter<F>(self, predicate: F) -> Observable<Item, Err>
  where
    F: Fn(&Item) -> bool + Send + Sync + 'static,
  {
    let predicate = Arc::new(predicate);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let observer = FilterObserver { downstream: downstream.clone(), predicate: predicate.clone() };
      self.subscribe_with(Subscriber::with_upstream(observer, downstream.disposable()));
    })
  }
}

struct FilterObserver<Item, Err, F> {
  downstream: Subscriber<Item, Err>,
  predicate: Arc<F>,
}

impl<Item, Err, F> Observer<Item, Err> for FilterObserver<Item, Err, F>
where
  Item: 'static,
  Err: 'static,
  F: Fn(&Item) -> bool + Send + Sync,
{
  fn on_next(&self, value: Item) {
    if (self.predicate)(&value) {
      self.downstream.on_next(value);
    }
  }

  fn on_error(&self, err: Err) {
    self.downstream.on_error(err);
  }

  fn on_completed(&self) {
    self.downstream.on_completed();
  }
}
