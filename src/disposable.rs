//! Composable cancellation tokens.
//!
//! A [`Disposable`] is a cheap cloneable handle over one bit of state
//! (live / disposed) plus a set of children. Disposing a parent disposes
//! every transitive child exactly once; children may be other disposables or
//! one-shot callbacks. Operators compose their teardown by hanging producer
//! subscriptions and scheduled work off the subscriber's disposable.

pub mod refcount;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use crate::error::MoreDisposablesThanExpected;

pub use refcount::RefCountDisposable;

enum Child {
  Disposable(Disposable),
  Callback(Box<dyn FnOnce() + Send>),
}

impl Child {
  fn dispose(self) {
    match self {
      Child::Disposable(d) => d.dispose(),
      Child::Callback(f) => f(),
    }
  }

  fn is_spent(&self) -> bool {
    match self {
      Child::Disposable(d) => d.is_disposed(),
      Child::Callback(_) => false,
    }
  }
}

struct Children {
  entries: SmallVec<[Child; 2]>,
  capacity: Option<usize>,
}

struct Inner {
  disposed: AtomicBool,
  children: Mutex<Children>,
}

/// A cancellation token with composite membership.
///
/// Cloning yields another handle to the same token. `dispose` is idempotent
/// and transitions live → disposed, disposing all children; adding a child to
/// an already disposed parent disposes the child immediately.
#[derive(Clone)]
pub struct Disposable {
  inner: Arc<Inner>,
}

impl Disposable {
  /// A live token backed by a dynamically sized child container.
  pub fn new() -> Self {
    Self::with_capacity(None)
  }

  /// A live token that refuses to hold more than `capacity` children.
  ///
  /// Overflow is reported by [`try_add`](Self::try_add) as
  /// [`MoreDisposablesThanExpected`]; already held children and the parent
  /// stay live.
  pub fn bounded(capacity: usize) -> Self {
    Self::with_capacity(Some(capacity))
  }

  /// An already-disposed token.
  pub fn disposed() -> Self {
    let d = Self::new();
    d.inner.disposed.store(true, Ordering::Release);
    d
  }

  fn with_capacity(capacity: Option<usize>) -> Self {
    Disposable {
      inner: Arc::new(Inner {
        disposed: AtomicBool::new(false),
        children: Mutex::new(Children { entries: SmallVec::new(), capacity }),
      }),
    }
  }

  pub fn is_disposed(&self) -> bool {
    self.inner.disposed.load(Ordering::Acquire)
  }

  /// Dispose this token and every transitive child exactly once.
  ///
  /// Children are drained under the lock but disposed outside it, so cycles
  /// terminate: the second visit of a node sees the flag already set.
  pub fn dispose(&self) {
    if self.inner.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let drained = {
      let mut children = self.inner.children.lock().unwrap();
      std::mem::take(&mut children.entries)
    };
    for child in drained {
      child.dispose();
    }
  }

  /// Add a child, disposing it immediately if this token is already disposed.
  ///
  /// Self-edges are ignored and a child already present (same underlying
  /// token) is held once. Panics on overflow of a [`bounded`](Self::bounded)
  /// container; use [`try_add`](Self::try_add) to observe that failure.
  pub fn add(&self, child: Disposable) {
    if let Err(err) = self.try_add(child) {
      panic!("{err}");
    }
  }

  /// Fallible [`add`](Self::add); the only error source is overflow of a
  /// bounded container.
  pub fn try_add(&self, child: Disposable) -> Result<(), MoreDisposablesThanExpected> {
    if Arc::ptr_eq(&self.inner, &child.inner) {
      return Ok(());
    }
    if self.is_disposed() {
      child.dispose();
      return Ok(());
    }
    let mut children = self.inner.children.lock().unwrap();
    // A concurrent dispose may have drained between the check and the lock.
    if self.inner.disposed.load(Ordering::Acquire) {
      drop(children);
      child.dispose();
      return Ok(());
    }
    children.entries.retain(|c| !c.is_spent());
    let held = children.entries.iter().any(|c| match c {
      Child::Disposable(d) => Arc::ptr_eq(&d.inner, &child.inner),
      Child::Callback(_) => false,
    });
    if held {
      return Ok(());
    }
    Self::check_capacity(&children)?;
    children.entries.push(Child::Disposable(child));
    Ok(())
  }

  /// Add a one-shot callback invoked exactly once on dispose.
  ///
  /// Invoked immediately when the token is already disposed.
  pub fn add_callback(&self, f: impl FnOnce() + Send + 'static) {
    if let Err(err) = self.try_add_callback(f) {
      panic!("{err}");
    }
  }

  pub fn try_add_callback(
    &self, f: impl FnOnce() + Send + 'static,
  ) -> Result<(), MoreDisposablesThanExpected> {
    if self.is_disposed() {
      f();
      return Ok(());
    }
    let mut children = self.inner.children.lock().unwrap();
    if self.inner.disposed.load(Ordering::Acquire) {
      drop(children);
      f();
      return Ok(());
    }
    children.entries.retain(|c| !c.is_spent());
    Self::check_capacity(&children)?;
    children.entries.push(Child::Callback(Box::new(f)));
    Ok(())
  }

  fn check_capacity(children: &Children) -> Result<(), MoreDisposablesThanExpected> {
    match children.capacity {
      Some(capacity) if children.entries.len() >= capacity => {
        Err(MoreDisposablesThanExpected { capacity })
      }
      _ => Ok(()),
    }
  }

  /// Detach a child without disposing it. Returns whether it was held.
  pub fn remove(&self, child: &Disposable) -> bool {
    let mut children = self.inner.children.lock().unwrap();
    let before = children.entries.len();
    children.entries.retain(|c| match c {
      Child::Disposable(d) => !Arc::ptr_eq(&d.inner, &child.inner),
      Child::Callback(_) => true,
    });
    children.entries.len() != before
  }

  /// Dispose and drop all children while leaving this token live.
  pub fn clear(&self) {
    let drained = {
      let mut children = self.inner.children.lock().unwrap();
      std::mem::take(&mut children.entries)
    };
    for child in drained {
      child.dispose();
    }
  }
}

impl Default for Disposable {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for Disposable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Disposable")
      .field("disposed", &self.is_disposed())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use super::*;

  #[test]
  fn dispose_marks_disposed() {
    let d = Disposable::new();
    assert!(!d.is_disposed());
    d.dispose();
    assert!(d.is_disposed());
  }

  #[test]
  fn dispose_on_clone_marks_both() {
    let d = Disposable::new();
    let copy = d.clone();
    copy.dispose();
    assert!(copy.is_disposed());
    assert!(d.is_disposed());
  }

  #[test]
  fn dispose_parent_disposes_child() {
    let d = Disposable::new();
    let other = Disposable::new();
    d.add(other.clone());
    d.dispose();
    assert!(other.is_disposed());
    assert!(d.is_disposed());
  }

  #[test]
  fn clear_disposes_children_but_keeps_parent_live() {
    let d = Disposable::new();
    let other = Disposable::new();
    d.add(other.clone());
    d.clear();
    assert!(other.is_disposed());
    assert!(!d.is_disposed());

    let other = Disposable::new();
    d.add(other.clone());
    d.clear();
    assert!(other.is_disposed());
    assert!(!d.is_disposed());
  }

  #[test]
  fn remove_detaches_without_disposing() {
    let d = Disposable::new();
    let other = Disposable::new();
    d.add(other.clone());
    assert!(d.remove(&other));
    d.dispose();
    assert!(!other.is_disposed());
    assert!(d.is_disposed());
  }

  #[test]
  fn dispose_child_leaves_parent_live() {
    let d = Disposable::new();
    let other = Disposable::new();
    d.add(other.clone());
    other.dispose();
    assert!(other.is_disposed());
    assert!(!d.is_disposed());
  }

  #[test]
  fn add_to_disposed_parent_disposes_child() {
    let d = Disposable::new();
    d.dispose();
    let other = Disposable::new();
    d.add(other.clone());
    assert!(other.is_disposed());
  }

  #[test]
  fn add_same_child_twice_disposes_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = Disposable::new();
    let child = Disposable::new();
    let c = counter.clone();
    child.add_callback(move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    d.add(child.clone());
    d.add(child.clone());
    d.dispose();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn callback_runs_exactly_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = Disposable::new();
    let c = counter.clone();
    d.add_callback(move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    d.dispose();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    d.dispose();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn callback_on_disposed_parent_runs_immediately() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = Disposable::new();
    d.dispose();
    let c = counter.clone();
    d.add_callback(move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn add_self_is_no_op() {
    let d = Disposable::new();
    d.add(d.clone());
    assert!(!d.is_disposed());
    d.dispose();
    assert!(d.is_disposed());
  }

  #[test]
  fn cycle_terminates() {
    let a = Disposable::new();
    let b = Disposable::new();
    a.add(b.clone());
    b.add(a.clone());
    a.dispose();
    assert!(a.is_disposed());
    assert!(b.is_disposed());
  }

  #[test]
  fn bounded_overflow_is_observable_and_keeps_state() {
    let d = Disposable::bounded(1);
    let first = Disposable::new();
    let second = Disposable::new();
    d.try_add(first.clone()).unwrap();
    let err = d.try_add(second.clone()).unwrap_err();
    assert_eq!(err.capacity, 1);
    assert!(!first.is_disposed());
    assert!(!second.is_disposed());
    assert!(!d.is_disposed());

    d.dispose();
    assert!(first.is_disposed());
    assert!(!second.is_disposed());
  }

  #[test]
  fn disposed_children_are_pruned_on_add() {
    let d = Disposable::bounded(1);
    let first = Disposable::new();
    d.try_add(first.clone()).unwrap();
    first.dispose();
    // The spent slot is reclaimed, so the bounded container accepts another.
    let second = Disposable::new();
    d.try_add(second.clone()).unwrap();
    d.dispose();
    assert!(second.is_disposed());
  }
}
