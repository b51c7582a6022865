use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{MultiSubscription, SubscriptionLike},
};

/// Drops source values until the notifier produces its first value, then
/// mirrors the source. While the gate is still shut the source's `complete`
/// is swallowed along with its values; only errors, from either side, pass
/// through. The notifier's subscription ends at its first value; a notifier
/// `complete` without a value keeps the gate shut forever.
#[derive(Clone)]
pub struct SkipUntilOp<S, N> {
  pub(crate) source: S,
  pub(crate) notifier: N,
}

impl<S, N> Observable for SkipUntilOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let open = MutRc::own(false);
    let sub = MultiSubscription::default();
    // The notifier may fire synchronously, before its subscription can be
    // registered; the `done` flag catches that and tears the spent
    // subscription down instead of keying it.
    let key_slot: MutRc<Option<usize>> = MutRc::default();
    let done: MutRc<bool> = MutRc::default();
    let mut gate_sub = self.notifier.actual_subscribe(Box::new(GateObserver {
      shared: shared.clone(),
      open: open.clone(),
      sub: sub.clone(),
      key_slot: key_slot.clone(),
      done: done.clone(),
    }));
    if *done.rc_deref() {
      gate_sub.unsubscribe();
    } else {
      let key = sub.add(gate_sub);
      *key_slot.rc_deref_mut() = Some(key);
    }
    sub.add(
      self
        .source
        .actual_subscribe(Box::new(GatedSourceObserver { shared, open })),
    );
    sub
  }
}

struct GatedSourceObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  open: MutRc<bool>,
}

impl<Item, Err> Observer<Item, Err> for GatedSourceObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    if *self.open.rc_deref() {
      self.shared.next(value);
    }
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {
    if *self.open.rc_deref() {
      self.shared.complete();
    }
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct GateObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  open: MutRc<bool>,
  sub: MultiSubscription,
  key_slot: MutRc<Option<usize>>,
  done: MutRc<bool>,
}

impl<Item, Err> GateObserver<Item, Err> {
  fn release(&mut self) {
    *self.done.rc_deref_mut() = true;
    let key = self.key_slot.rc_deref_mut().take();
    if let Some(key) = key {
      self.sub.remove(key);
    }
  }
}

impl<Item, Err, NItem> Observer<NItem, Err> for GateObserver<Item, Err> {
  fn next(&mut self, _: NItem) {
    *self.open.rc_deref_mut() = true;
    self.release();
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) { self.release() }

  fn is_closed(&self) -> bool {
    *self.done.rc_deref() || self.shared.is_closed()
  }
}
