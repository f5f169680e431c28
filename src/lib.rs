//! Reactive streams for Rust.
//!
//! `rivulet` composes asynchronous, possibly infinite sequences of values
//! with chainable operators, pluggable concurrency via schedulers, and
//! cooperative teardown via disposables. Build a pipeline of producers,
//! operators and a consumer, subscribe once, and receive a lazy sequence of
//! value / error / completion signals routed according to the scheduling
//! discipline you chose.
//!
//! ```rust
//! use rivulet::prelude::*;
//!
//! let evens = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
//! let sink = evens.clone();
//!
//! observable::from_iter::<_, ()>(0..)
//!   .filter(|v| v % 2 == 0)
//!   .take(3)
//!   .subscribe(move |v| sink.lock().unwrap().push(v));
//!
//! assert_eq!(*evens.lock().unwrap(), vec![0, 2, 4]);
//! ```
//!
//! The four load-bearing pieces:
//!
//! - [`Observable`](observable::Observable) / [`Observer`](observer::Observer) /
//!   [`Subscriber`](subscriber::Subscriber): the algebraic shape of a stream.
//! - [`Disposable`](disposable::Disposable): composable cancellation,
//!   including the reference-counted variant flattening operators use.
//! - [`scheduler`]: immediate, current-thread trampoline, new-thread,
//!   thread-pool, run-loop and a deterministic virtual-time scheduler.
//! - [`subject`]: hot multicast, with a serialized variant for concurrent
//!   producers.

pub mod bridge;
pub mod disposable;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod scheduler;
pub mod subject;
pub mod subscriber;

pub mod prelude {
  pub use crate::bridge::{ReaderBridge, WriteOutcome, WriteSink, WriterBridge};
  pub use crate::disposable::{Disposable, RefCountDisposable};
  pub use crate::error::MoreDisposablesThanExpected;
  pub use crate::observable::{self, BlockingObservable, Observable};
  pub use crate::observer::{LambdaObserver, Observer};
  pub use crate::ops::ConnectableObservable;
  pub use crate::scheduler::{
    Continuation, CurrentThreadScheduler, ImmediateScheduler, NewThreadScheduler,
    RunLoopScheduler, Scheduler, TestScheduler, ThreadPoolScheduler, Worker,
  };
  pub use crate::subject::{PublishSubject, SerializedSubject};
  pub use crate::subscriber::Subscriber;
}
