use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDerefMut},
  subscription::MultiSubscription,
};

/// Pairs the freshest value of each side through `binary_op` every time
/// either side emits, once both have emitted at least once. Completes when
/// both sides have completed, or as soon as one side emits while the other
/// is already done without ever producing a value (no pair can form from
/// then on); fails on the first error from either.
#[derive(Clone)]
pub struct CombineLatestOp<A, B, F> {
  pub(crate) left: A,
  pub(crate) right: B,
  pub(crate) binary_op: F,
}

struct CombineState<L, R, F> {
  left: Option<L>,
  right: Option<R>,
  left_done: bool,
  right_done: bool,
  binary_op: F,
}

impl<A, B, F, Out> Observable for CombineLatestOp<A, B, F>
where
  A: Observable,
  B: Observable<Err = A::Err>,
  A::Item: Clone,
  B::Item: Clone,
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
    let state = MutRc::own(CombineState {
      left: None,
      right: None,
      left_done: false,
      right_done: false,
      binary_op: self.binary_op,
    });
    let sub = MultiSubscription::default();
    sub.add(self.left.actual_subscribe(Box::new(LeftObserver {
      shared: shared.clone(),
      state: state.clone(),
    })));
    sub.add(
      self
        .right
        .actual_subscribe(Box::new(RightObserver { shared, state })),
    );
    sub
  }
}

fn complete_one<L, R, F, Out, Err>(
  state: &MutRc<CombineState<L, R, F>>,
  shared: &mut SharedObserver<Out, Err>,
  left: bool,
) {
  let all_done = {
    let mut state = state.rc_deref_mut();
    if left {
      state.left_done = true;
    } else {
      state.right_done = true;
    }
    state.left_done && state.right_done
  };
  if all_done {
    shared.complete();
  }
}

struct LeftObserver<L, R, F, Out, Err> {
  shared: SharedObserver<Out, Err>,
  state: MutRc<CombineState<L, R, F>>,
}

impl<L, R, F, Out, Err> Observer<L, Err> for LeftObserver<L, R, F, Out, Err>
where
  L: Clone,
  R: Clone,
  F: FnMut(L, R) -> Out,
{
  fn next(&mut self, value: L) {
    let (combined, starved) = {
      let mut state = self.state.rc_deref_mut();
      state.left = Some(value.clone());
      match &state.right {
        Some(right) => {
          let right = right.clone();
          (Some((state.binary_op)(value, right)), false)
        }
        // The right side finished without a value: no pair can ever form.
        None => (None, state.right_done),
      }
    };
    if let Some(out) = combined {
      self.shared.next(out);
    } else if starved {
      self.shared.complete();
    }
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    complete_one(&self.state, &mut self.shared, true)
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct RightObserver<L, R, F, Out, Err> {
  shared: SharedObserver<Out, Err>,
  state: MutRc<CombineState<L, R, F>>,
}

impl<L, R, F, Out, Err> Observer<R, Err> for RightObserver<L, R, F, Out, Err>
where
  L: Clone,
  R: Clone,
  F: FnMut(L, R) -> Out,
{
  fn next(&mut self, value: R) {
    let (combined, starved) = {
      let mut state = self.state.rc_deref_mut();
      state.right = Some(value.clone());
      match &state.left {
        Some(left) => {
          let left = left.clone();
          (Some((state.binary_op)(left, value)), false)
        }
        None => (None, state.left_done),
      }
    };
    if let Some(out) = combined {
      self.shared.next(out);
    } else if starved {
      self.shared.complete();
    }
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    complete_one(&self.state, &mut self.shared, false)
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, next, TestScheduler},
  };

  #[test]
  fn pairs_latest_values_from_both_sides() {
    let scheduler = TestScheduler::new();
    let left = scheduler.create_hot_observable(vec![
      next(220, 1),
      next(300, 2),
      complete::<i32, ()>(500),
    ]);
    let right = scheduler.create_hot_observable(vec![
      next(250, 10),
      next(320, 20),
      complete::<i32, ()>(400),
    ]);
    let (l, r) = (left.clone(), right.clone());
    let observed =
      scheduler.start(move || l.combine_latest(r, |a, b| a + b));
    assert_eq!(
      observed.messages(),
      vec![next(250, 11), next(300, 12), next(320, 22), complete(500)]
    );
  }

  #[test]
  fn nothing_pairs_until_both_sides_spoke() {
    let scheduler = TestScheduler::new();
    let left = scheduler.create_hot_observable(vec![
      next(210, 1),
      next(280, 2),
      complete::<i32, ()>(300),
    ]);
    let right =
      scheduler.create_hot_observable(vec![complete::<i32, ()>(350)]);
    let (l, r) = (left.clone(), right.clone());
    let observed =
      scheduler.start(move || l.combine_latest(r, |a, b| a * b));
    assert_eq!(observed.messages(), vec![complete(350)]);
  }

  #[test]
  fn value_against_an_already_empty_left_ends_the_pairing() {
    let scheduler = TestScheduler::new();
    let left =
      scheduler.create_hot_observable(vec![complete::<i32, ()>(210)]);
    let right = scheduler.create_hot_observable(vec![
      next(215, 2),
      complete::<i32, ()>(220),
    ]);
    let (l, r) = (left.clone(), right.clone());
    let observed =
      scheduler.start(move || l.combine_latest(r, |a, b| a + b));
    // The left finished without a value, so the right's first value at 215
    // already proves no pair will ever form.
    assert_eq!(observed.messages(), vec![complete(215)]);
  }

  #[test]
  fn value_against_an_already_empty_right_ends_the_pairing() {
    let scheduler = TestScheduler::new();
    let left = scheduler.create_hot_observable(vec![
      next(215, 2),
      complete::<i32, ()>(220),
    ]);
    let right =
      scheduler.create_hot_observable(vec![complete::<i32, ()>(210)]);
    let (l, r) = (left.clone(), right.clone());
    let observed =
      scheduler.start(move || l.combine_latest(r, |a, b| a + b));
    assert_eq!(observed.messages(), vec![complete(215)]);
  }
}
