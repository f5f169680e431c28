use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Run a side effect on each value without changing the stream.
  pub fn tap<F>(self, f: F) -> Observable<Item, Err>
  where
    F: Fn(&Item) + Send + Sync + 'static,
  {
    let f = Arc::new(f);
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let observer = TapObserver { downstream: downstream.clone(), f: f.clone() };
      self.subscribe_with(Subscriber::with_upstream(observer, downstream.disposable()));
    })
  }
}

struct TapObserver<Item, Err, F> {
  downstream: Subscriber<Item, Err>,
  f: Arc<F>,
}

impl<Item, Err, F> Observer<Item, Err> for TapObserver<Item, Err, F>
where
  Item: 'static,
  Err: 'static,
  F: Fn(&Item) + Send + Sync,
{
  fn on_next(&self, value: Item) {
    (self.f)(&value);
    self.downstream.on_next(value);
  }

  fn on_error(&self, err: Err) {
    self.downstream.on_error(err);
  }

  fn on_completed(&self) {
    self.downstream.on_completed();
  }
}
