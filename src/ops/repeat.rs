use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{MultiSubscription, SerialSubscription},
};

/// Plays the source `count` times end to end, resubscribing a clone on each
/// `complete`. `repeat(0)` completes without touching the source.
#[derive(Clone)]
pub struct RepeatOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

struct RepeatState<S: Observable> {
  source: S,
  remaining: usize,
  downstream: SharedObserver<S::Item, S::Err>,
  current: SerialSubscription,
}

impl<S> Observable for RepeatOp<S>
where
  S: Observable + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let mut downstream = SharedObserver::new(observer);
    if self.count == 0 {
      downstream.complete();
      return MultiSubscription::default();
    }
    let current = SerialSubscription::default();
    let state = MutRc::own(RepeatState {
      source: self.source,
      remaining: self.count - 1,
      downstream,
      current: current.clone(),
    });
    subscribe_round(&state);
    let sub = MultiSubscription::default();
    sub.add(current);
    sub
  }
}

fn subscribe_round<S>(state: &MutRc<RepeatState<S>>)
where
  S: Observable + Clone + 'static,
{
  let (source, current) = {
    let state = state.rc_deref();
    (state.source.clone(), state.current.clone())
  };
  let inner = source
    .actual_subscribe(Box::new(RepeatObserver { state: state.clone() }));
  current.set(inner);
}

struct RepeatObserver<S: Observable> {
  state: MutRc<RepeatState<S>>,
}

impl<S> Observer<S::Item, S::Err> for RepeatObserver<S>
where
  S: Observable + Clone + 'static,
{
  fn next(&mut self, value: S::Item) {
    let mut downstream = self.state.rc_deref().downstream.clone();
    downstream.next(value);
  }

  fn error(&mut self, err: S::Err) {
    let mut downstream = self.state.rc_deref().downstream.clone();
    downstream.error(err);
  }

  fn complete(&mut self) {
    let remaining = self.state.rc_deref().remaining;
    if remaining == 0 {
      let mut downstream = self.state.rc_deref().downstream.clone();
      downstream.complete();
    } else {
      self.state.rc_deref_mut().remaining = remaining - 1;
      subscribe_round(&self.state);
    }
  }

  fn is_closed(&self) -> bool { self.state.rc_deref().downstream.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{cell::Cell, cell::RefCell, rc::Rc};

  #[test]
  fn plays_the_source_count_times() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(1..=2)
      .repeat(3)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![1, 2, 1, 2, 1, 2]);
  }

  #[test]
  fn repeat_zero_just_completes() {
    let completed = Rc::new(Cell::new(false));
    let c = completed.clone();
    observable::from_iter::<_, ()>(1..=2)
      .repeat(0)
      .subscribe_complete(|_| panic!("no values"), move || c.set(true));
    assert!(completed.get());
  }
}
