use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{MultiSubscription, SubscriptionLike},
};
use std::collections::VecDeque;

/// Flattens a stream of streams, running at most `concurrent` inner
/// subscriptions at a time. Inners arriving over the limit wait in FIFO
/// order for a running one to complete; `concurrent == 1` is concatenation.
/// The outer completing only ends the output once every inner (running or
/// queued) has finished.
#[derive(Clone)]
pub struct MergeAllOp<S> {
  pub(crate) source: S,
  pub(crate) concurrent: usize,
}

struct MergeAllState<Inner: Observable> {
  shared: SharedObserver<Inner::Item, Inner::Err>,
  active: usize,
  queue: VecDeque<Inner>,
  outer_done: bool,
  concurrent: usize,
  sub: MultiSubscription,
}

impl<S, Inner> Observable for MergeAllOp<S>
where
  S: Observable<Item = Inner>,
  Inner: Observable<Err = S::Err> + 'static,
{
  type Item = Inner::Item;
  type Err = Inner::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let sub = MultiSubscription::default();
    let state = MutRc::own(MergeAllState::<Inner> {
      shared: SharedObserver::new(observer),
      active: 0,
      queue: VecDeque::new(),
      outer_done: false,
      concurrent: self.concurrent.max(1),
      sub: sub.clone(),
    });
    let outer = self
      .source
      .actual_subscribe(Box::new(OuterObserver { state }));
    sub.add(outer);
    sub
  }
}

fn subscribe_inner<Inner>(state: &MutRc<MergeAllState<Inner>>, inner: Inner)
where
  Inner: Observable + 'static,
{
  // The inner may complete synchronously, before its subscription can be
  // registered; the `done` flag catches that and tears the spent
  // subscription down instead of keying it.
  let key_slot: MutRc<Option<usize>> = MutRc::default();
  let done: MutRc<bool> = MutRc::default();
  let mut inner_sub = inner.actual_subscribe(Box::new(InnerObserver {
    state: state.clone(),
    key_slot: key_slot.clone(),
    done: done.clone(),
  }));
  if *done.rc_deref() {
    inner_sub.unsubscribe();
  } else {
    let sub = state.rc_deref().sub.clone();
    let key = sub.add(inner_sub);
    *key_slot.rc_deref_mut() = Some(key);
  }
}

struct OuterObserver<Inner: Observable> {
  state: MutRc<MergeAllState<Inner>>,
}

impl<Inner> Observer<Inner, Inner::Err> for OuterObserver<Inner>
where
  Inner: Observable + 'static,
{
  fn next(&mut self, inner: Inner) {
    let start = {
      let mut state = self.state.rc_deref_mut();
      if state.active < state.concurrent {
        state.active += 1;
        Some(inner)
      } else {
        state.queue.push_back(inner);
        None
      }
    };
    if let Some(inner) = start {
      subscribe_inner(&self.state, inner);
    }
  }

  fn error(&mut self, err: Inner::Err) {
    let mut shared = self.state.rc_deref().shared.clone();
    shared.error(err);
  }

  fn complete(&mut self) {
    let all_done = {
      let mut state = self.state.rc_deref_mut();
      state.outer_done = true;
      state.active == 0 && state.queue.is_empty()
    };
    if all_done {
      let mut shared = self.state.rc_deref().shared.clone();
      shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.state.rc_deref().shared.is_closed() }
}

struct InnerObserver<Inner: Observable> {
  state: MutRc<MergeAllState<Inner>>,
  key_slot: MutRc<Option<usize>>,
  done: MutRc<bool>,
}

impl<Inner> Observer<Inner::Item, Inner::Err> for InnerObserver<Inner>
where
  Inner: Observable + 'static,
{
  fn next(&mut self, value: Inner::Item) {
    let mut shared = self.state.rc_deref().shared.clone();
    shared.next(value);
  }

  fn error(&mut self, err: Inner::Err) {
    *self.done.rc_deref_mut() = true;
    let mut shared = self.state.rc_deref().shared.clone();
    shared.error(err);
  }

  fn complete(&mut self) {
    *self.done.rc_deref_mut() = true;
    let key = self.key_slot.rc_deref_mut().take();
    if let Some(key) = key {
      // Drops this inner's subscription now, so its unsubscribe is
      // recorded at completion time rather than at the end of the output.
      let sub = self.state.rc_deref().sub.clone();
      sub.remove(key);
    }
    let (dequeued, finished) = {
      let mut state = self.state.rc_deref_mut();
      state.active -= 1;
      match state.queue.pop_front() {
        Some(inner) => {
          state.active += 1;
          (Some(inner), false)
        }
        None => (None, state.outer_done && state.active == 0),
      }
    };
    if let Some(inner) = dequeued {
      subscribe_inner(&self.state, inner);
    } else if finished {
      let mut shared = self.state.rc_deref().shared.clone();
      shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.state.rc_deref().shared.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, next, subscription, TestScheduler},
  };

  #[test]
  fn bounded_concurrency_queues_the_overflow() {
    let scheduler = TestScheduler::new();
    let c1 = scheduler.create_cold_observable(vec![
      next(50, 1),
      next(100, 2),
      next(120, 3),
      complete::<i32, ()>(140),
    ]);
    let c2 = scheduler.create_cold_observable(vec![
      next(20, 4),
      next(70, 5),
      complete::<i32, ()>(200),
    ]);
    let c3 = scheduler.create_cold_observable(vec![
      next(10, 6),
      next(90, 7),
      next(110, 8),
      complete::<i32, ()>(130),
    ]);
    let c4 = scheduler.create_cold_observable(vec![
      next(210, 9),
      next(240, 10),
      complete::<i32, ()>(300),
    ]);
    let outer = scheduler.create_hot_observable(vec![
      next(210, c1),
      next(260, c2),
      next(270, c3),
      next(320, c4),
      complete(400),
    ]);
    let o = outer.clone();
    let observed = scheduler.start(move || o.merge_all(2));
    assert_eq!(
      observed.messages(),
      vec![
        next(260, 1),
        next(280, 4),
        next(310, 2),
        next(330, 3),
        next(330, 5),
        next(360, 6),
        next(440, 7),
        next(460, 8),
        next(670, 9),
        next(700, 10),
        complete(760)
      ]
    );
    assert_eq!(outer.subscriptions(), vec![subscription(200, 760)]);
  }

  #[test]
  fn concat_is_concurrency_one() {
    let scheduler = TestScheduler::new();
    let c1 = scheduler.create_cold_observable(vec![
      next(10, 1),
      complete::<i32, ()>(30),
    ]);
    let c2 = scheduler.create_cold_observable(vec![
      next(10, 2),
      complete::<i32, ()>(20),
    ]);
    let outer = scheduler
      .create_hot_observable(vec![next(210, c1), next(215, c2), complete(220)]);
    let o = outer.clone();
    let observed = scheduler.start(move || o.merge_all(1));
    // The second inner waits for the first to finish at 240.
    assert_eq!(
      observed.messages(),
      vec![next(220, 1), next(250, 2), complete(260)]
    );
  }
}
