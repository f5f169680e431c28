use crate::observable::Observable;
use crate::subscriber::Subscriber;

/// Observable from a producer function invoked once per subscription.
///
/// The producer receives the subscriber directly; it can emit synchronously,
/// hand the subscriber to another thread, and attach teardown via
/// `set_upstream`.
pub fn create<Item, Err, F>(producer: F) -> Observable<Item, Err>
where
  Item: 'static,
  Err: 'static,
  F: Fn(Subscriber<Item, Err>) + Send + Sync + 'static,
{
  Observable::new(producer)
}
