use crate::observable::Observable;

/// Observable that completes without emitting.
pub fn empty<Item, Err>() -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  Observable::new(|subscriber| subscriber.on_completed())
}

/// Observable that never signals.
pub fn never<Item, Err>() -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  Observable::new(|_subscriber| {})
}

/// Observable that errors immediately.
pub fn throw<Item, Err>(err: Err) -> Observable<Item, Err>
where
  Item: 'static,
  Err: Clone + Send + Sync + 'static,
{
  Observable::new(move |subscriber| subscriber.on_error(err.clone()))
}

/// Subscribe the given observables one after another: each starts only once
/// the previous completed.
pub fn concat<Item, Err>(
  sources: impl IntoIterator<Item = Observable<Item, Err>>,
) -> Observable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  let sources: Vec<_> = sources.into_iter().collect();
  crate::observable::from_iter(sources).concat_all()
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::observable::just;

  #[test]
  fn empty_completes_without_values() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());
    empty::<i32, ()>().subscribe_all(
      move |_| l1.lock().unwrap().push("next"),
      |_| {},
      move || l2.lock().unwrap().push("completed"),
    );
    assert_eq!(*log.lock().unwrap(), vec!["completed"]);
  }

  #[test]
  fn never_stays_silent() {
    let log: Arc<Mutex<Vec<&str>>> = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    never::<i32, ()>().subscribe_all(
      move |_| l1.lock().unwrap().push("next"),
      move |_| l2.lock().unwrap().push("error"),
      move || l3.lock().unwrap().push("completed"),
    );
    assert!(log.lock().unwrap().is_empty());
  }

  #[test]
  fn throw_errors_immediately() {
    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    throw::<i32, _>("bad").subscribe_all(|_| {}, move |e| *s.lock().unwrap() = Some(e), || {});
    assert_eq!(*seen.lock().unwrap(), Some("bad"));
  }

  #[test]
  fn concat_source_chains_in_order() {
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let e = emitted.clone();
    concat::<_, ()>([just(1), just(2), just(3)]).subscribe(move |v| e.lock().unwrap().push(v));
    assert_eq!(*emitted.lock().unwrap(), vec![1, 2, 3]);
  }
}
