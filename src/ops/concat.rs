//! Sequential flattening without overlap and without stack growth.
//!
//! Per subscription a shared node holds the downstream subscriber, a FIFO of
//! pending inner observables, an atomic stage and a refcount disposable
//! rooted at the downstream. Inner observables that complete synchronously
//! are detected by a failed `Draining → Processing` exchange, which sends
//! the subscribing frame back into the iterative drain loop instead of
//! recursing — arbitrarily long chains of synchronous inners run in
//! constant stack.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crossbeam_utils::atomic::AtomicCell;

use crate::disposable::{Disposable, RefCountDisposable};
use crate::observable::Observable;
use crate::observer::Observer;
use crate::subscriber::Subscriber;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ConcatStage {
  Idle,
  Draining,
  CompletedWhileDraining,
  Processing,
}

struct ConcatState<Item, Err> {
  downstream: Subscriber<Item, Err>,
  queue: Mutex<VecDeque<Observable<Item, Err>>>,
  stage: AtomicCell<ConcatStage>,
  lifetime: RefCountDisposable,
}

impl<Item: Send + 'static, Err: Send + 'static> ConcatState<Item, Err> {
  fn handle_observable(this: &Arc<Self>, observable: Observable<Item, Err>, slot: Disposable) {
    if Self::subscribe_inner(this, observable, &slot) {
      return;
    }
    Self::drain(this, slot);
  }

  /// Subscribe one inner observable into `slot`. Returns true when the inner
  /// is still running (it will drive the drain itself on completion); false
  /// when it already completed on this stack.
  fn subscribe_inner(
    this: &Arc<Self>, observable: Observable<Item, Err>, slot: &Disposable,
  ) -> bool {
    this.stage.store(ConcatStage::Draining);
    let upstream = Disposable::new();
    slot.add(upstream.clone());
    let observer = ConcatInnerObserver { state: this.clone(), slot: slot.clone() };
    observable.subscribe_with(Subscriber::with_upstream(observer, upstream));
    this
      .stage
      .compare_exchange(ConcatStage::Draining, ConcatStage::Processing)
      .is_ok()
  }

  fn drain(this: &Arc<Self>, slot: Disposable) {
    loop {
      if this.lifetime.is_disposed() {
        return;
      }
      let next = this.queue.lock().unwrap().pop_front();
      match next {
        None => {
          this.stage.store(ConcatStage::Idle);
          slot.dispose();
          if this.lifetime.is_disposed() {
            this.downstream.on_completed();
          }
          return;
        }
        Some(observable) => {
          if Self::subscribe_inner(this, observable, &slot) {
            return;
          }
        }
      }
    }
  }
}

struct ConcatObserver<Item, Err> {
  state: Arc<ConcatState<Item, Err>>,
  slot: Disposable,
}

impl<Item: Send + 'static, Err: Send + 'static> Observer<Observable<Item, Err>, Err>
  for ConcatObserver<Item, Err>
{
  fn on_next(&self, inner: Observable<Item, Err>) {
    if self
      .state
      .stage
      .compare_exchange(ConcatStage::Idle, ConcatStage::Draining)
      .is_ok()
    {
      let slot = self.state.lifetime.add_ref();
      ConcatState::handle_observable(&self.state, inner, slot);
      return;
    }
    self.state.queue.lock().unwrap().push_back(inner);
    // The active drain may have gone idle between the failed exchange and
    // the push; reclaim it so the queued inner is not stranded.
    if self
      .state
      .stage
      .compare_exchange(ConcatStage::Idle, ConcatStage::Draining)
      .is_ok()
    {
      let slot = self.state.lifetime.add_ref();
      ConcatState::drain(&self.state, slot);
    }
  }

  fn on_error(&self, err: Err) {
    self.state.downstream.on_error(err);
  }

  fn on_completed(&self) {
    self.slot.dispose();
    if self.state.lifetime.is_disposed() {
      self.state.downstream.on_completed();
    }
  }
}

struct ConcatInnerObserver<Item, Err> {
  state: Arc<ConcatState<Item, Err>>,
  slot: Disposable,
}

impl<Item: Send + 'static, Err: Send + 'static> Observer<Item, Err>
  for ConcatInnerObserver<Item, Err>
{
  fn on_next(&self, value: Item) {
    self.state.downstream.on_next(value);
  }

  fn on_error(&self, err: Err) {
    self.state.downstream.on_error(err);
  }

  fn on_completed(&self) {
    // Release this inner's subscription but keep the slot for the next one.
    self.slot.clear();
    if self
      .state
      .stage
      .compare_exchange(ConcatStage::Draining, ConcatStage::CompletedWhileDraining)
      .is_ok()
    {
      // subscribe_inner is still on the stack; its failed exchange loops.
      return;
    }
    // Stage was Processing: the subscribing frame is long gone, drain here.
    ConcatState::drain(&self.state, self.slot.clone());
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observable<Observable<Item, Err>, Err> {
  /// Subscribe to each inner observable in order, starting the next only
  /// after the previous completed. Errors on either level forward
  /// immediately and dispose everything.
  pub fn concat_all(self) -> Observable<Item, Err> {
    Observable::new(move |downstream: Subscriber<Item, Err>| {
      let lifetime = RefCountDisposable::new();
      downstream.set_upstream(lifetime.disposable());
      let state = Arc::new(ConcatState {
        downstream,
        queue: Mutex::new(VecDeque::new()),
        stage: AtomicCell::new(ConcatStage::Idle),
        lifetime: lifetime.clone(),
      });
      let slot = lifetime.add_ref();
      let upstream = Disposable::new();
      slot.add(upstream.clone());
      let observer = ConcatObserver { state, slot };
      self.subscribe_with(Subscriber::with_upstream(observer, upstream));
    })
  }
}

impl<Item: Send + 'static, Err: Send + 'static> Observable<Item, Err> {
  /// Emit everything from this observable, then everything from `next`.
  pub fn concat_with(self, next: Observable<Item, Err>) -> Observable<Item, Err> {
    crate::observable::from_iter([self, next]).concat_all()
  }
}
