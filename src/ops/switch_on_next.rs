use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{MultiSubscription, SerialSubscription},
};

/// Flattens a stream of streams by always mirroring the most recent inner
/// one. Each new inner unsubscribes its predecessor. Completes once the
/// outer is done and the latest inner has completed.
#[derive(Clone)]
pub struct SwitchOnNextOp<S> {
  pub(crate) source: S,
}

struct SwitchState {
  generation: usize,
  outer_done: bool,
  inner_active: bool,
}

impl<S, Inner> Observable for SwitchOnNextOp<S>
where
  S: Observable<Item = Inner>,
  Inner: Observable<Err = S::Err>,
{
  type Item = Inner::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(SwitchState {
      generation: 0,
      outer_done: false,
      inner_active: false,
    });
    let current = SerialSubscription::default();
    let sub = MultiSubscription::default();
    sub.add(current.clone());
    sub.add(self.source.actual_subscribe(Box::new(SwitchOuterObserver {
      shared,
      state,
      current,
    })));
    sub
  }
}

struct SwitchOuterObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<SwitchState>,
  current: SerialSubscription,
}

impl<Inner, Err> Observer<Inner, Err> for SwitchOuterObserver<Inner::Item, Err>
where
  Inner: Observable<Err = Err>,
  Err: 'static,
{
  fn next(&mut self, inner: Inner) {
    let generation = {
      let mut state = self.state.rc_deref_mut();
      state.generation += 1;
      state.inner_active = true;
      state.generation
    };
    let inner_sub = inner.actual_subscribe(Box::new(SwitchInnerObserver {
      shared: self.shared.clone(),
      state: self.state.clone(),
      generation,
    }));
    self.current.set(inner_sub);
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    let inner_active = {
      let mut state = self.state.rc_deref_mut();
      state.outer_done = true;
      state.inner_active
    };
    if !inner_active {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct SwitchInnerObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<SwitchState>,
  generation: usize,
}

impl<Item, Err> SwitchInnerObserver<Item, Err> {
  fn is_current(&self) -> bool {
    self.state.rc_deref().generation == self.generation
  }
}

impl<Item, Err> Observer<Item, Err> for SwitchInnerObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.is_current() {
      self.shared.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if self.is_current() {
      self.shared.error(err);
    }
  }

  fn complete(&mut self) {
    let finished = {
      let mut state = self.state.rc_deref_mut();
      if state.generation != self.generation {
        return;
      }
      state.inner_active = false;
      state.outer_done
    };
    if finished {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool {
    !self.is_current() || self.shared.is_closed()
  }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, next, TestScheduler},
  };

  #[test]
  fn later_inner_preempts_the_earlier_one() {
    let scheduler = TestScheduler::new();
    let first = scheduler.create_cold_observable(vec![
      next(10, 1),
      next(60, 2),
      next(110, 3),
      complete::<i32, ()>(160),
    ]);
    let second = scheduler.create_cold_observable(vec![
      next(10, 4),
      next(40, 5),
      complete::<i32, ()>(60),
    ]);
    let outer = scheduler.create_hot_observable(vec![
      next(300, first.clone()),
      next(350, second.clone()),
      complete(400),
    ]);
    let source = outer.clone();
    let observed = scheduler.start(move || source.switch_on_next());
    assert_eq!(
      observed.messages(),
      vec![next(310, 1), next(360, 4), next(390, 5), complete(410)]
    );
    assert_eq!(
      first.subscriptions(),
      vec![crate::scheduler::test_scheduler::subscription(300, 350)]
    );
  }

  #[test]
  fn outer_completion_waits_for_the_running_inner() {
    let scheduler = TestScheduler::new();
    let inner = scheduler.create_cold_observable(vec![
      next(50, 9),
      complete::<i32, ()>(100),
    ]);
    let outer = scheduler.create_hot_observable(vec![
      next(250, inner.clone()),
      complete(260),
    ]);
    let source = outer.clone();
    let observed = scheduler.start(move || source.switch_on_next());
    assert_eq!(observed.messages(), vec![next(300, 9), complete(350)]);
  }
}
