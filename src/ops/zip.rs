use std::collections::VecDeque;

use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::MultiSubscription,
};

/// Pairs the two sides index by index. A value waits in its side's queue
/// until the opposite side produces its partner. Completes as soon as one
/// side is done and its queue is empty, since no further pair can form.
#[derive(Clone)]
pub struct ZipOp<A, B> {
  pub(crate) left: A,
  pub(crate) right: B,
}

struct ZipState<L, R> {
  left: VecDeque<L>,
  right: VecDeque<R>,
  left_done: bool,
  right_done: bool,
}

impl<L, R> ZipState<L, R> {
  fn starved(&self) -> bool {
    (self.left_done && self.left.is_empty())
      || (self.right_done && self.right.is_empty())
  }
}

impl<A, B> Observable for ZipOp<A, B>
where
  A: Observable,
  B: Observable<Err = A::Err>,
{
  type Item = (A::Item, B::Item);
  type Err = A::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(ZipState {
      left: VecDeque::new(),
      right: VecDeque::new(),
      left_done: false,
      right_done: false,
    });
    let sub = MultiSubscription::default();
    sub.add(self.left.actual_subscribe(Box::new(LeftZipObserver {
      shared: shared.clone(),
      state: state.clone(),
    })));
    sub.add(
      self
        .right
        .actual_subscribe(Box::new(RightZipObserver { shared, state })),
    );
    sub
  }
}

fn drain_pairs<L, R, Err>(
  state: &MutRc<ZipState<L, R>>,
  shared: &mut SharedObserver<(L, R), Err>,
) {
  loop {
    let pair = {
      let mut state = state.rc_deref_mut();
      if state.left.is_empty() || state.right.is_empty() {
        None
      } else {
        let l = state.left.pop_front().unwrap();
        let r = state.right.pop_front().unwrap();
        Some((l, r))
      }
    };
    match pair {
      Some(pair) => shared.next(pair),
      None => break,
    }
  }
  if state.rc_deref().starved() {
    shared.complete();
  }
}

struct LeftZipObserver<L, R, Err> {
  shared: SharedObserver<(L, R), Err>,
  state: MutRc<ZipState<L, R>>,
}

impl<L, R, Err> Observer<L, Err> for LeftZipObserver<L, R, Err>
where
  L: 'static,
  R: 'static,
{
  fn next(&mut self, value: L) {
    self.state.rc_deref_mut().left.push_back(value);
    drain_pairs(&self.state, &mut self.shared);
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    self.state.rc_deref_mut().left_done = true;
    if self.state.rc_deref().starved() {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct RightZipObserver<L, R, Err> {
  shared: SharedObserver<(L, R), Err>,
  state: MutRc<ZipState<L, R>>,
}

impl<L, R, Err> Observer<R, Err> for RightZipObserver<L, R, Err>
where
  L: 'static,
  R: 'static,
{
  fn next(&mut self, value: R) {
    self.state.rc_deref_mut().right.push_back(value);
    drain_pairs(&self.state, &mut self.shared);
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    self.state.rc_deref_mut().right_done = true;
    if self.state.rc_deref().starved() {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}
