use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::MultiSubscription,
};

/// Time-shifts each value by its own duration: the value is emitted when
/// the observable returned by `delay_selector` for it first fires or
/// completes. Values may overtake each other. The stream completes once
/// the source is done and every in-flight value has been released.
#[derive(Clone)]
pub struct DelayWithSelectorOp<S, F> {
  pub(crate) source: S,
  pub(crate) delay_selector: F,
}

struct DelayState {
  in_flight: usize,
  source_done: bool,
}

impl<S, F, D> Observable for DelayWithSelectorOp<S, F>
where
  S: Observable,
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
    let state = MutRc::own(DelayState { in_flight: 0, source_done: false });
    let sub = MultiSubscription::default();
    sub.add(self.source.actual_subscribe(Box::new(DelaySourceObserver {
      shared,
      state,
      delay_selector: self.delay_selector,
      sub: sub.clone(),
    })));
    sub
  }
}

struct DelaySourceObserver<Item, Err, F> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<DelayState>,
  delay_selector: F,
  sub: MultiSubscription,
}

impl<Item, Err, F, D> Observer<Item, Err> for DelaySourceObserver<Item, Err, F>
where
  Item: 'static,
  Err: 'static,
  F: FnMut(&Item) -> D,
  D: Observable<Err = Err>,
{
  fn next(&mut self, value: Item) {
    let duration = (self.delay_selector)(&value);
    self.state.rc_deref_mut().in_flight += 1;
    // The duration may fire synchronously, in which case its subscription
    // must not be retained; the released flag tells the two ends apart.
    let released = MutRc::own(false);
    let key_slot = MutRc::own(None);
    let duration_sub = duration.actual_subscribe(Box::new(ReleaseObserver {
      shared: self.shared.clone(),
      state: self.state.clone(),
      value: Some(value),
      sub: self.sub.clone(),
      key_slot: key_slot.clone(),
      released: released.clone(),
    }));
    if !*released.rc_deref() {
      let key = self.sub.add(duration_sub);
      *key_slot.rc_deref_mut() = Some(key);
    }
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    let drained = {
      let mut state = self.state.rc_deref_mut();
      state.source_done = true;
      state.in_flight == 0
    };
    if drained {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct ReleaseObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<DelayState>,
  value: Option<Item>,
  sub: MultiSubscription,
  key_slot: MutRc<Option<usize>>,
  released: MutRc<bool>,
}

impl<Item, Err> ReleaseObserver<Item, Err> {
  fn release(&mut self) {
    let Some(value) = self.value.take() else { return };
    *self.released.rc_deref_mut() = true;
    if let Some(key) = self.key_slot.rc_deref_mut().take() {
      self.sub.remove(key);
    }
    self.shared.next(value);
    let drained = {
      let mut state = self.state.rc_deref_mut();
      state.in_flight -= 1;
      state.source_done && state.in_flight == 0
    };
    if drained {
      self.shared.complete();
    }
  }
}

impl<Item, Err, Tick> Observer<Tick, Err> for ReleaseObserver<Item, Err> {
  fn next(&mut self, _tick: Tick) { self.release() }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) { self.release() }

  fn is_closed(&self) -> bool {
    self.value.is_none() || self.shared.is_closed()
  }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, next, TestScheduler},
  };

  #[test]
  fn each_value_rides_its_own_delay() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(210, 1),
      next(240, 2),
      complete::<i32, ()>(300),
    ]);
    let slow =
      scheduler.create_cold_observable(vec![next::<i32, ()>(100, 0)]);
    let fast =
      scheduler.create_cold_observable(vec![next::<i32, ()>(30, 0)]);
    let src = source.clone();
    let observed = scheduler.start(move || {
      src.delay_with_selector(move |v: &i32| {
        if *v == 1 {
          slow.clone()
        } else {
          fast.clone()
        }
      })
    });
    assert_eq!(
      observed.messages(),
      vec![next(270, 2), next(310, 1), complete(310)]
    );
  }

  #[test]
  fn completion_waits_for_no_one_when_nothing_is_in_flight() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(210, 1),
      complete::<i32, ()>(400),
    ]);
    let silence =
      scheduler.create_cold_observable(vec![next::<i32, ()>(20, 0)]);
    let src = source.clone();
    let observed = scheduler.start(move || {
      src.delay_with_selector(move |_: &i32| silence.clone())
    });
    assert_eq!(observed.messages(), vec![next(230, 1), complete(400)]);
  }
}
