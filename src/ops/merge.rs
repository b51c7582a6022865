use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDerefMut},
  subscription::MultiSubscription,
};

/// Interleaves two streams of the same type; completes once both have
/// completed, fails as soon as either fails.
#[derive(Clone)]
pub struct MergeOp<A, B> {
  pub(crate) left: A,
  pub(crate) right: B,
}

impl<A, B> Observable for MergeOp<A, B>
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
    let pending = MutRc::own(2usize);
    let sub = MultiSubscription::default();
    sub.add(self.left.actual_subscribe(Box::new(MergeObserver {
      shared: shared.clone(),
      pending: pending.clone(),
    })));
    sub.add(
      self
        .right
        .actual_subscribe(Box::new(MergeObserver { shared, pending })),
    );
    sub
  }
}

struct MergeObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  pending: MutRc<usize>,
}

impl<Item, Err> Observer<Item, Err> for MergeObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.shared.next(value) }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    let all_done = {
      let mut pending = self.pending.rc_deref_mut();
      *pending -= 1;
      *pending == 0
    };
    if all_done {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}
