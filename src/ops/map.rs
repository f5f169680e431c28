use std::sync::Arc;

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Transform each value with `f`.
  pub fn map<Out, F>(self, f: F) -> Observable<Out, Err>
  where
    Out: Send + 'static,
    F: Fn(Item) -> Out + Send + Sync + 'static,
  {
    let f = Arc::new(f);
    Observable::new(move |downstream: Subscriber<Out, Err>| {
      let observer = MapObserver { downstream: downstream.clone(), f: f.clone() };
      self.subscribe_with(Subscriber::with_upstream(observer, downstream.disposable()));
    })
  }
}

struct MapObserver<Out, Err, F> {
  downstream: Subscriber<Out, Err>,
  f: Arc<F>,
}

impl<Item, Out, Err, F> Observer<Item, Err> for MapObserver<Out, Err, F>
where
  Out: 'static,
  Err: 'static,
  F: Fn(Item) -> Out + Send + Sync,
{
  fn on_next(&self, value: Item) {
    self.downstream.on_next((self.f)(value));
  }

  fn on_error(&self, err: Err) {
    self.downstream.on_error(err);
  }

  fn on_completed(&self) {
    self.downstream.on_completed();
  }
}
