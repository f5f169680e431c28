use std::time::Duration;

use crate::observable::Observable;
use crate::scheduler::{Continuation, Scheduler};

/// Observable counting up from 0, one emission per period, first at
/// (subscribe time + period).
///
/// Periods are anchored to the planned timepoint of each tick
/// (`DelayFromThisTimepoint`), so the sequence does not drift when a tick's
/// execution is late.
pub fn interval<Err>(period: Duration, scheduler: impl Scheduler + 'static) -> Observable<usize, Err>
where
  Err: 'static,
{
  Observable::new(move |subscriber| {
    let worker = scheduler.create_worker();
    let mut count = 0usize;
    worker.schedule_after(
      period,
      move |sub| {
        sub.on_next(count);
        count += 1;
        Ok(Some(Continuation::DelayFromThisTimepoint(period)))
      },
      &subscriber,
    );
  })
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use super::*;
  use crate::scheduler::TestScheduler;

  #[test]
  fn ticks_once_per_period() {
    let scheduler = TestScheduler::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    let d = interval::<()>(Duration::from_secs(1), scheduler.clone())
      .subscribe(move |v| s.lock().unwrap().push(v));

    scheduler.time_advance(Duration::from_millis(500));
    assert!(seen.lock().unwrap().is_empty());

    scheduler.time_advance(Duration::from_millis(500));
    assert_eq!(*seen.lock().unwrap(), vec![0]);

    scheduler.time_advance(Duration::from_secs(2));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);

    d.dispose();
    scheduler.time_advance(Duration::from_secs(2));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
  }
}
