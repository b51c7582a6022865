use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::MultiSubscription,
};

/// Race: the first of the two sources to produce any notification (value or
/// terminal) wins and is mirrored; the loser is unsubscribed on the spot
/// and none of its notifications ever surface.
#[derive(Clone)]
pub struct AmbOp<A, B> {
  pub(crate) left: A,
  pub(crate) right: B,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
  Left,
  Right,
}

struct AmbState {
  winner: Option<Side>,
  left_key: Option<usize>,
  right_key: Option<usize>,
}

impl<A, B> Observable for AmbOp<A, B>
where
  A: Observable,
  B: Observable<Item = A::Item, Err = A::Err>,
{
  type Item = A::Item;
  type Err = A::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(AmbState {
      winner: None,
      left_key: None,
      right_key: None,
    });
    let sub = MultiSubscription::default();

    let left_sub = self.left.actual_subscribe(Box::new(AmbObserver {
      shared: shared.clone(),
      state: state.clone(),
      sub: sub.clone(),
      side: Side::Left,
    }));
    if state.rc_deref().winner == Some(Side::Left) {
      // Decided during subscribe; the right source is never touched.
      sub.add(left_sub);
      return sub;
    }
    let left_key = sub.add(left_sub);
    state.rc_deref_mut().left_key = Some(left_key);

    let right_sub = self.right.actual_subscribe(Box::new(AmbObserver {
      shared,
      state: state.clone(),
      sub: sub.clone(),
      side: Side::Right,
    }));
    let right_key = sub.add(right_sub);
    state.rc_deref_mut().right_key = Some(right_key);
    if state.rc_deref().winner == Some(Side::Left) {
      sub.remove(right_key);
    }
    sub
  }
}

struct AmbObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<AmbState>,
  sub: MultiSubscription,
  side: Side,
}

impl<Item, Err> AmbObserver<Item, Err> {
  /// First notification decides the race. Returns whether this side owns
  /// the stream; unsubscribes the loser when the decision falls here.
  fn claim(&self) -> bool {
    let (won, loser_key) = {
      let mut state = self.state.rc_deref_mut();
      match state.winner {
        None => {
          state.winner = Some(self.side);
          let loser = match self.side {
            Side::Left => state.right_key.take(),
            Side::Right => state.left_key.take(),
          };
          (true, loser)
        }
        Some(winner) => (winner == self.side, None),
      }
    };
    if let Some(key) = loser_key {
      self.sub.remove(key);
    }
    won
  }
}

impl<Item, Err> Observer<Item, Err> for AmbObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.claim() {
      self.shared.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if self.claim() {
      self.shared.error(err);
    }
  }

  fn complete(&mut self) {
    if self.claim() {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool {
    let lost = {
      let state = self.state.rc_deref();
      state.winner.map_or(false, |winner| winner != self.side)
    };
    lost || self.shared.is_closed()
  }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, next, subscription, TestScheduler},
  };

  #[test]
  fn first_to_fire_wins() {
    let scheduler = TestScheduler::new();
    let fast = scheduler.create_hot_observable(vec![
      next(240, 'f'),
      complete::<char, ()>(320),
    ]);
    let slow = scheduler.create_hot_observable(vec![
      next(290, 's'),
      complete::<char, ()>(500),
    ]);
    let (f, s) = (fast.clone(), slow.clone());
    let observed = scheduler.start(move || f.amb(s));
    assert_eq!(observed.messages(), vec![next(240, 'f'), complete(320)]);
    // Loser unsubscribed at the decision tick, not at the end.
    assert_eq!(slow.subscriptions(), vec![subscription(200, 240)]);
  }

  #[test]
  fn a_loser_value_never_surfaces() {
    let scheduler = TestScheduler::new();
    let winner = scheduler.create_hot_observable(vec![
      next(210, 1),
      next(300, 2),
      complete::<i32, ()>(350),
    ]);
    let loser = scheduler.create_hot_observable(vec![
      next(220, 99),
      complete::<i32, ()>(230),
    ]);
    let (w, l) = (winner.clone(), loser.clone());
    let observed = scheduler.start(move || w.amb(l));
    assert_eq!(
      observed.messages(),
      vec![next(210, 1), next(300, 2), complete(350)]
    );
  }

  #[test]
  fn completion_also_decides() {
    let scheduler = TestScheduler::new();
    let quick_done =
      scheduler.create_hot_observable(vec![complete::<i32, ()>(230)]);
    let other = scheduler.create_hot_observable(vec![
      next(250, 1),
      complete::<i32, ()>(400),
    ]);
    let (q, o) = (quick_done.clone(), other.clone());
    let observed = scheduler.start(move || q.amb(o));
    assert_eq!(observed.messages(), vec![complete(230)]);
  }
}
