use crate::observable::Observable;

/// Observable emitting one value and completing.
pub fn just<Item, Err>(value: Item) -> Observable<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: 'static,
{
  Observable::new(move |subscriber| {
    subscriber.on_next(value.clone());
    subscriber.on_completed();
  })
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;

  #[test]
  fn emits_once_and_completes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (l1, l2) = (log.clone(), log.clone());
    just::<_, ()>(7).subscribe_all(
      move |v| l1.lock().unwrap().push(format!("next {v}")),
      |_| {},
      move || l2.lock().unwrap().push("completed".into()),
    );
    assert_eq!(*log.lock().unwrap(), vec!["next 7", "completed"]);
  }
}
