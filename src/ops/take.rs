use std::sync::atomic::{AtomicUsize, Ordering};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Forward the first `count` values, then complete and dispose upstream.
  pub fn take(self, count: usize) -> Observable<Item, Err> {
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      if count == 0 {
        downstream.on_completed();
        return;
      }
      let observer =
        TakeObserver { downstream: downstream.clone(), remaining: AtomicUsize::new(count) };
      self.subscribe_with(Subscriber::with_upstream(observer, downstream.disposable()));
    })
  }
}

struct TakeObserver<Item, Err> {
  downstream: Subscriber<Item, Err>,
  remaining: AtomicUsize,
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> for TakeObserver<Item, Err> {
  fn on_next(&self, value: Item) {
    let claimed = self
      .remaining
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    match claimed {
      Ok(1) => {
        self.downstream.on_next(value);
        self.downstream.on_completed();
      }
      Ok(_) => self.downstream.on_next(value),
      Err(_) => {}
    }
  }

  fn on_error(&self, err: Err) {
    self.downstream.on_error(err);
  }

  fn on_completed(&self) {
    self.downstream.on_completed();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::observable::from_iter;

  #[test]
  fn completes_after_count_values() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());
    from_iter::<_, ()>(0..).take(3).subscribe_all(
      move |v| l1.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || l2.lock().unwrap().push("completed".into()),
    );
    assert_eq!(*log.lock().unwrap(), vec!["next 0", "next 1", "next 2", "completed"]);
  }

  #[test]
  fn take_zero_completes_immediately() {
    let completed = Arc::new(Mutex::new(false));
    let c = completed.clone();
    from_iter::<_, ()>(0..5).take(0).subscribe_all(
      |_| panic!("no values expected"),
      |_| {},
      move || *c.lock().unwrap() = true,
    );
    assert!(*completed.lock().unwrap());
  }
}
