use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::MultiSubscription,
};

/// Correlates values from two sources whose lifetimes overlap. Each value
/// stays "live" until the duration observable selected for it fires or
/// completes; an arriving value pairs with every live value of the other
/// side through `result_selector`. The join completes when a side finishes
/// and either the other side is done too or the finishing side has no live
/// values left.
#[derive(Clone)]
pub struct JoinOp<A, B, FL, FR, F> {
  pub(crate) left: A,
  pub(crate) right: B,
  pub(crate) left_duration: FL,
  pub(crate) right_duration: FR,
  pub(crate) result_selector: F,
}

#[derive(Clone, Copy, PartialEq)]
enum Side {
  Left,
  Right,
}

struct JoinState<L, R, F> {
  left: Vec<(usize, L)>,
  right: Vec<(usize, R)>,
  next_id: usize,
  left_done: bool,
  right_done: bool,
  result_selector: F,
}

impl<A, B, FL, FR, F, DL, DR, Out> Observable for JoinOp<A, B, FL, FR, F>
where
  A: Observable,
  B: Observable<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
  FL: FnMut(&A::Item) -> DL + 'static,
  FR: FnMut(&B::Item) -> DR + 'static,
  DL: Observable<Err = A::Err>,
  DR: Observable<Err = A::Err>,
  F: FnMut(A::Item, B::Item) -> Out + 'static,
  Out: 'static,
{
  type Item = Out;
  type Err = A::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(JoinState {
      left: Vec::new(),
      right: Vec::new(),
      next_id: 0,
      left_done: false,
      right_done: false,
      result_selector: self.result_selector,
    });
    let sub = MultiSubscription::default();
    sub.add(self.left.actual_subscribe(Box::new(JoinLeftObserver {
      shared: shared.clone(),
      state: state.clone(),
      duration_selector: self.left_duration,
      sub: sub.clone(),
    })));
    sub.add(self.right.actual_subscribe(Box::new(JoinRightObserver {
      shared,
      state,
      duration_selector: self.right_duration,
      sub: sub.clone(),
    })));
    sub
  }
}

fn watch_lifetime<D, L, R, F, Out>(
  duration: D,
  state: &MutRc<JoinState<L, R, F>>,
  shared: &SharedObserver<Out, D::Err>,
  sub: &MultiSubscription,
  side: Side,
  id: usize,
) where
  D: Observable,
  L: 'static,
  R: 'static,
  F: 'static,
  Out: 'static,
{
  let expired = MutRc::own(false);
  let key_slot = MutRc::own(None);
  let duration_sub = duration.actual_subscribe(Box::new(ExpireObserver {
    shared: shared.clone(),
    state: state.clone(),
    sub: sub.clone(),
    key_slot: key_slot.clone(),
    expired: expired.clone(),
    side,
    id,
  }));
  if !*expired.rc_deref() {
    let key = sub.add(duration_sub);
    *key_slot.rc_deref_mut() = Some(key);
  }
}

fn finish_side<L, R, F, Out, Err>(
  state: &MutRc<JoinState<L, R, F>>,
  shared: &mut SharedObserver<Out, Err>,
  side: Side,
) {
  let done = {
    let mut state = state.rc_deref_mut();
    match side {
      Side::Left => {
        state.left_done = true;
        state.right_done || state.left.is_empty()
      }
      Side::Right => {
        state.right_done = true;
        state.left_done || state.right.is_empty()
      }
    }
  };
  if done {
    shared.complete();
  }
}

struct JoinLeftObserver<L, R, F, FL, Out, Err> {
  shared: SharedObserver<Out, Err>,
  state: MutRc<JoinState<L, R, F>>,
  duration_selector: FL,
  sub: MultiSubscription,
}

impl<L, R, F, FL, DL, Out, Err> Observer<L, Err>
  for JoinLeftObserver<L, R, F, FL, Out, Err>
where
  L: Clone + 'static,
  R: Clone + 'static,
  F: FnMut(L, R) -> Out + 'static,
  FL: FnMut(&L) -> DL,
  DL: Observable<Err = Err>,
  Out: 'static,
  Err: 'static,
{
  fn next(&mut self, value: L) {
    let id = {
      let mut state = self.state.rc_deref_mut();
      let id = state.next_id;
      state.next_id += 1;
      state.left.push((id, value.clone()));
      id
    };
    let duration = (self.duration_selector)(&value);
    watch_lifetime(duration, &self.state, &self.shared, &self.sub, Side::Left, id);
    let outs: Vec<Out> = {
      let mut state = self.state.rc_deref_mut();
      let rights: Vec<R> =
        state.right.iter().map(|(_, r)| r.clone()).collect();
      rights
        .into_iter()
        .map(|r| (state.result_selector)(value.clone(), r))
        .collect()
    };
    for out in outs {
      self.shared.next(out);
    }
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    finish_side(&self.state, &mut self.shared, Side::Left)
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct JoinRightObserver<L, R, F, FR, Out, Err> {
  shared: SharedObserver<Out, Err>,
  state: MutRc<JoinState<L, R, F>>,
  duration_selector: FR,
  sub: MultiSubscription,
}

impl<L, R, F, FR, DR, Out, Err> Observer<R, Err>
  for JoinRightObserver<L, R, F, FR, Out, Err>
where
  L: Clone + 'static,
  R: Clone + 'static,
  F: FnMut(L, R) -> Out + 'static,
  FR: FnMut(&R) -> DR,
  DR: Observable<Err = Err>,
  Out: 'static,
  Err: 'static,
{
  fn next(&mut self, value: R) {
    let id = {
      let mut state = self.state.rc_deref_mut();
      let id = state.next_id;
      state.next_id += 1;
      state.right.push((id, value.clone()));
      id
    };
    let duration = (self.duration_selector)(&value);
    watch_lifetime(duration, &self.state, &self.shared, &self.sub, Side::Right, id);
    let outs: Vec<Out> = {
      let mut state = self.state.rc_deref_mut();
      let lefts: Vec<L> = state.left.iter().map(|(_, l)| l.clone()).collect();
      lefts
        .into_iter()
        .map(|l| (state.result_selector)(l, value.clone()))
        .collect()
    };
    for out in outs {
      self.shared.next(out);
    }
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    finish_side(&self.state, &mut self.shared, Side::Right)
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct ExpireObserver<L, R, F, Out, Err> {
  shared: SharedObserver<Out, Err>,
  state: MutRc<JoinState<L, R, F>>,
  sub: MultiSubscription,
  key_slot: MutRc<Option<usize>>,
  expired: MutRc<bool>,
  side: Side,
  id: usize,
}

impl<L, R, F, Out, Err> ExpireObserver<L, R, F, Out, Err> {
  fn expire(&mut self) {
    if std::mem::replace(&mut *self.expired.rc_deref_mut(), true) {
      return;
    }
    {
      let mut state = self.state.rc_deref_mut();
      match self.side {
        Side::Left => state.left.retain(|(id, _)| *id != self.id),
        Side::Right => state.right.retain(|(id, _)| *id != self.id),
      }
    }
    if let Some(key) = self.key_slot.rc_deref_mut().take() {
      self.sub.remove(key);
    }
  }
}

impl<L, R, F, Out, Err, Tick> Observer<Tick, Err>
  for ExpireObserver<L, R, F, Out, Err>
{
  fn next(&mut self, _tick: Tick) { self.expire() }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) { self.expire() }

  fn is_closed(&self) -> bool {
    *self.expired.rc_deref() || self.shared.is_closed()
  }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, next, TestScheduler},
  };

  #[test]
  fn pairs_values_whose_lifetimes_overlap() {
    let scheduler = TestScheduler::new();
    let left = scheduler.create_hot_observable(vec![
      next(210, 1),
      next(280, 2),
      complete::<i32, ()>(400),
    ]);
    let right = scheduler.create_hot_observable(vec![
      next(240, 10),
      next(300, 20),
      complete::<i32, ()>(410),
    ]);
    let left_life =
      scheduler.create_cold_observable(vec![next::<i32, ()>(100, 0)]);
    let right_life =
      scheduler.create_cold_observable(vec![next::<i32, ()>(50, 0)]);
    let (l, r) = (left.clone(), right.clone());
    let observed = scheduler.start(move || {
      l.join(
        r,
        move |_: &i32| left_life.clone(),
        move |_: &i32| right_life.clone(),
        |l, r| (l, r),
      )
    });
    assert_eq!(
      observed.messages(),
      vec![
        next(240, (1, 10)),
        next(280, (2, 10)),
        next(300, (1, 20)),
        next(300, (2, 20)),
        complete(400),
      ]
    );
  }

  #[test]
  fn expired_values_no_longer_pair() {
    let scheduler = TestScheduler::new();
    let left = scheduler.create_hot_observable(vec![
      next(210, 1),
      complete::<i32, ()>(500),
    ]);
    let right = scheduler.create_hot_observable(vec![
      next(320, 10),
      complete::<i32, ()>(510),
    ]);
    let left_life =
      scheduler.create_cold_observable(vec![next::<i32, ()>(50, 0)]);
    let right_life =
      scheduler.create_cold_observable(vec![next::<i32, ()>(50, 0)]);
    let (l, r) = (left.clone(), right.clone());
    let observed = scheduler.start(move || {
      l.join(
        r,
        move |_: &i32| left_life.clone(),
        move |_: &i32| right_life.clone(),
        |l, r| (l, r),
      )
    });
    assert_eq!(observed.messages(), vec![complete(500)]);
  }
}
