use thiserror::Error;

/// Contract-violation errors raised at the API boundary.
///
/// These never travel through a stream: a stream error is an opaque `Err`
/// value delivered via `on_error`, while the errors below indicate misuse of
/// the library surface itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bounded disposable holds {capacity} children and cannot accept more")]
pub struct MoreDisposablesThanExpected {
  pub capacity: usize,
}
