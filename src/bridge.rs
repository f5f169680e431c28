//! Abstract writer/reader contracts for embedding layers.
//!
//! Stream transports (an RPC stream, a socket) bridge into the reactive
//! surface through two halves. A [`WriterBridge`] exposes an observer end:
//! values pushed into it are handed to a host [`WriteSink`] with at most one
//! write in flight, further values queue, and the terminal finishes the
//! sink once the backlog drains. A [`ReaderBridge`] exposes an observable
//! end: the host pushes each inbound frame and maps stream end onto the
//! terminal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::observable::Observable;
use crate::observer::Observer;
use crate::subject::{PublishSubject, SerializedSubject};
use crate::subscriber::Subscriber;

/// How a writer stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  /// The observer end completed and all queued writes were flushed.
  Completed,
  /// The observer end errored; queued writes were flushed first.
  Aborted,
}

/// Host side of a [`WriterBridge`]: starts asynchronous writes and finishes
/// the stream.
///
/// `start_write` must eventually be answered by one
/// [`write_done`](WriterBridge::write_done) call; the bridge guarantees it
/// never starts a second write before that.
pub trait WriteSink<Item>: Send + Sync {
  fn start_write(&self, value: &Item);
  fn finish_writes(&self, outcome: WriteOutcome);
}

struct WriterState<Item> {
  sink: Arc<dyn WriteSink<Item>>,
  backlog: Mutex<Backlog<Item>>,
}

struct Backlog<Item> {
  queue: VecDeque<Item>,
  finished: Option<WriteOutcome>,
}

/// Observer end over a [`WriteSink`] with an at-most-one-in-flight write
/// discipline.
pub struct WriterBridge<Item, Err> {
  subject: SerializedSubject<Item, Err>,
  state: Arc<WriterState<Item>>,
}

impl<Item, Err> WriterBridge<Item, Err>
where
  Item: Clone + Send + Sync + 'static,
  Err: Clone + Send + Sync + 'static,
{
  pub fn new(sink: impl WriteSink<Item> + 'static) -> Self {
    let state = Arc::new(WriterState {
      sink: Arc::new(sink),
      backlog: Mutex::new(Backlog { queue: VecDeque::new(), finished: None }),
    });
    let subject = SerializedSubject::new();
    subject
      .observable()
      .subscribe_with(Subscriber::new(WriterObserver { state: state.clone() }));
    WriterBridge { subject, state }
  }

  /// The observer end values are pushed into; hand it to a pipeline or a
  /// subject producer. Producers on several threads are serialized.
  pub fn observer(&self) -> SerializedSubject<Item, Err> {
    self.subject.clone()
  }

  /// Acknowledge the write started by the last `start_write`. Starts the
  /// next queued write, or finishes the stream when the terminal already
  /// arrived and the backlog is empty.
  pub fn write_done(&self) {
    let mut backlog = self.state.backlog.lock().unwrap();
    backlog.queue.pop_front();
    if let Some(front) = backlog.queue.front() {
      self.state.sink.start_write(front);
    } else if let Some(outcome) = backlog.finished {
      self.state.sink.finish_writes(outcome);
    }
  }
}

struct WriterObserver<Item> {
  state: Arc<WriterState<Item>>,
}

impl<Item> WriterObserver<Item> {
  fn finish(&self, outcome: WriteOutcome) {
    let mut backlog = self.state.backlog.lock().unwrap();
    backlog.finished = Some(outcome);
    if backlog.queue.is_empty() {
      self.state.sink.finish_writes(outcome);
    }
  }
}

impl<Item, Err> Observer<Item, Err> for WriterObserver<Item>
where
  Item: Send + Sync + 'static,
{
  fn on_next(&self, value: Item) {
    let mut backlog = self.state.backlog.lock().unwrap();
    backlog.queue.push_back(value);
    if backlog.queue.len() == 1 {
      self.state.sink.start_write(backlog.queue.front().unwrap());
    }
  }

  fn on_error(&self, _err: Err) {
    self.finish(WriteOutcome::Aborted);
  }

  fn on_completed(&self) {
    self.finish(WriteOutcome::Completed);
  }
}

/// Observable end fed by a host transport: every inbound frame becomes
/// `on_next`, stream end becomes the terminal.
pub struct ReaderBridge<Item, Err> {
  subject: PublishSubject<Item, Err>,
}

impl<Item, Err> ReaderBridge<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  pub fn new() -> Self {
    ReaderBridge { subject: PublishSubject::new() }
  }

  pub fn observable(&self) -> Observable<Item, Err> {
    self.subject.observable()
  }

  /// Push one inbound frame.
  pub fn push(&self, frame: Item) {
    self.subject.on_next(frame);
  }

  /// Signal stream end: an error payload maps to `on_error`, none to
  /// `on_completed`.
  pub fn finish(&self, err: Option<Err>) {
    match err {
      Some(err) => self.subject.on_error(err),
      None => self.subject.on_completed(),
    }
  }
}

impl<Item, Err> Default for ReaderBridge<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
