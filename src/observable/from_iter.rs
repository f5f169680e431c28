use crate::observable::Observable;

/// Observable emitting each element of an iterable, then completing.
///
/// The iterable is cloned per subscription; emission stops early once the
/// subscriber is disposed (a downstream `take` or an external dispose).
pub fn from_iter<I, Err>(iterable: I) -> Observable<I::Item, Err>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: 'static,
  Err: 'static,
{
  Observable::new(move |subscriber| {
    for value in iterable.clone() {
      if subscriber.is_disposed() {
        return;
      }
      subscriber.on_next(value);
    }
    subscriber.on_completed();
  })
}
