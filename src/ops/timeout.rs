use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{MultiSubscription, SerialSubscription},
};

/// Fails the stream with [`RxError::Timeout`] when the source stays silent
/// for too long. `first_timeout` guards the wait for the first value;
/// afterwards `timeout_selector` maps each value to the observable whose
/// first notification marks the deadline for the next one. Every source
/// value re-arms the watchdog.
#[derive(Clone)]
pub struct TimeoutWithMapperOp<S, First, F> {
  pub(crate) source: S,
  pub(crate) first_timeout: Option<First>,
  pub(crate) timeout_selector: F,
}

struct TimeoutState {
  id: usize,
}

fn arm_watchdog<D, Item>(
  watchdog: &SerialSubscription,
  shared: &SharedObserver<Item, D::Err>,
  state: &MutRc<TimeoutState>,
  duration: D,
  id: usize,
) where
  D: Observable,
  D::Err: From<RxError>,
  Item: 'static,
{
  let duration_sub = duration.actual_subscribe(Box::new(WatchdogObserver {
    shared: shared.clone(),
    state: state.clone(),
    id,
  }));
  watchdog.set(duration_sub);
}

impl<S, First, F, D> Observable for TimeoutWithMapperOp<S, First, F>
where
  S: Observable,
  S::Err: From<RxError>,
  First: Observable<Err = S::Err>,
  F: FnMut(&S::Item) -> D + 'static,
  D: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(TimeoutState { id: 0 });
    let watchdog = SerialSubscription::default();
    if let Some(first) = self.first_timeout {
      arm_watchdog(&watchdog, &shared, &state, first, 0);
    }
    let sub = MultiSubscription::default();
    sub.add(watchdog.clone());
    sub.add(self.source.actual_subscribe(Box::new(TimeoutSourceObserver {
      shared,
      state,
      watchdog,
      timeout_selector: self.timeout_selector,
    })));
    sub
  }
}

struct TimeoutSourceObserver<Item, Err, F> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<TimeoutState>,
  watchdog: SerialSubscription,
  timeout_selector: F,
}

impl<Item, Err, F, D> Observer<Item, Err>
  for TimeoutSourceObserver<Item, Err, F>
where
  Item: 'static,
  Err: From<RxError> + 'static,
  F: FnMut(&Item) -> D,
  D: Observable<Err = Err>,
{
  fn next(&mut self, value: Item) {
    let id = {
      let mut state = self.state.rc_deref_mut();
      state.id += 1;
      state.id
    };
    let duration = (self.timeout_selector)(&value);
    self.shared.next(value);
    arm_watchdog(&self.watchdog, &self.shared, &self.state, duration, id);
  }

  fn error(&mut self, err: Err) {
    self.state.rc_deref_mut().id += 1;
    self.shared.error(err);
  }

  fn complete(&mut self) {
    self.state.rc_deref_mut().id += 1;
    self.shared.complete();
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct WatchdogObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<TimeoutState>,
  id: usize,
}

impl<Item, Err> WatchdogObserver<Item, Err>
where
  Err: From<RxError>,
{
  fn trip(&mut self) {
    if self.state.rc_deref().id == self.id {
      self.shared.error(RxError::Timeout.into());
    }
  }
}

impl<Item, Err, Tick> Observer<Tick, Err> for WatchdogObserver<Item, Err>
where
  Err: From<RxError>,
{
  fn next(&mut self, _tick: Tick) { self.trip() }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) { self.trip() }

  fn is_closed(&self) -> bool {
    self.state.rc_deref().id != self.id || self.shared.is_closed()
  }
}

#[cfg(test)]
mod test {
  use crate::{
    error::RxError,
    prelude::*,
    scheduler::test_scheduler::{complete, error, next, TestScheduler},
  };

  #[test]
  fn silence_past_the_deadline_errors_the_stream() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(210, 1),
      next(400, 2),
      complete::<i32, RxError>(500),
    ]);
    let deadline =
      scheduler.create_cold_observable(vec![next::<i32, RxError>(50, 0)]);
    let src = source.clone();
    let observed = scheduler.start(move || {
      src.timeout_with_mapper(move |_: &i32| deadline.clone())
    });
    assert_eq!(
      observed.messages(),
      vec![next(210, 1), error(260, RxError::Timeout)]
    );
  }

  #[test]
  fn values_keep_re_arming_the_watchdog() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(210, 1),
      next(240, 2),
      next(270, 3),
      complete::<i32, RxError>(300),
    ]);
    let deadline =
      scheduler.create_cold_observable(vec![next::<i32, RxError>(50, 0)]);
    let src = source.clone();
    let observed = scheduler.start(move || {
      src.timeout_with_mapper(move |_: &i32| deadline.clone())
    });
    assert_eq!(
      observed.messages(),
      vec![next(210, 1), next(240, 2), next(270, 3), complete(300)]
    );
  }

  #[test]
  fn first_timeout_guards_the_opening_silence() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(400, 1),
      complete::<i32, RxError>(500),
    ]);
    let first =
      scheduler.create_cold_observable(vec![next::<i32, RxError>(30, 0)]);
    let deadline =
      scheduler.create_cold_observable(vec![next::<i32, RxError>(500, 0)]);
    let src = source.clone();
    let observed = scheduler.start(move || {
      src.timeout_with_first(first, move |_: &i32| deadline.clone())
    });
    assert_eq!(observed.messages(), vec![error(230, RxError::Timeout)]);
  }
}
