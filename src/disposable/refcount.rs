//! Reference-counted disposable used by flattening operators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::disposable::Disposable;

struct RefCountState {
  inner: Disposable,
  count: AtomicUsize,
}

/// A disposable whose inner composite fires only once every handle returned
/// by [`add_ref`](RefCountDisposable::add_ref) has been disposed.
///
/// `concat`, `merge_with` and `ref_count` root their per-subscription
/// lifetime here: each active leg holds one reference, children added via
/// [`add`](RefCountDisposable::add) die when the whole lifetime ends, and
/// disposing the inner directly tears down every outstanding handle.
#[derive(Clone)]
pub struct RefCountDisposable {
  state: Arc<RefCountState>,
}

impl RefCountDisposable {
  pub fn new() -> Self {
    RefCountDisposable {
      state: Arc::new(RefCountState { inner: Disposable::new(), count: AtomicUsize::new(0) }),
    }
  }

  /// Take a new reference on the inner disposable.
  ///
  /// The returned handle is itself a composite; disposing it releases the
  /// reference, and releasing the last one disposes the inner. Once the
  /// inner is disposed the returned handle is already disposed.
  pub fn add_ref(&self) -> Disposable {
    if self.state.inner.is_disposed() {
      return Disposable::disposed();
    }
    self.state.count.fetch_add(1, Ordering::AcqRel);
    let sub = Disposable::new();
    let state = self.state.clone();
    sub.add_callback(move || {
      if state.count.fetch_sub(1, Ordering::AcqRel) == 1 {
        state.inner.dispose();
      }
    });
    // Registering the handle as a child means disposing the inner directly
    // also disposes every outstanding handle.
    self.state.inner.add(sub.clone());
    sub
  }

  /// Add a child to the inner composite; it is disposed when the count
  /// reaches zero or the inner is disposed directly.
  pub fn add(&self, child: Disposable) {
    self.state.inner.add(child);
  }

  pub fn dispose(&self) {
    self.state.inner.dispose();
  }

  pub fn is_disposed(&self) -> bool {
    self.state.inner.is_disposed()
  }

  /// A plain handle on the inner composite, for `set_upstream` wiring.
  pub fn disposable(&self) -> Disposable {
    self.state.inner.clone()
  }
}

impl Default for RefCountDisposable {
  fn default() -> Self {
    Self::new()
  }
}
