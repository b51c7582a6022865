use crate::{
  observable::Observable, observer::BoxObserver, subscription::MultiSubscription,
};

/// Call `factory` once per subscription, subscribing to the observable it
/// returns. Each subscriber gets a fresh stream.
pub fn defer<F, O>(factory: F) -> DeferObservable<F>
where
  F: FnOnce() -> O,
  O: Observable,
{
  DeferObservable { factory }
}

#[derive(Clone)]
pub struct DeferObservable<F> {
  factory: F,
}

impl<F, O> Observable for DeferObservable<F>
where
  F: FnOnce() -> O,
  O: Observable,
{
  type Item = O::Item;
  type Err = O::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    (self.factory)().actual_subscribe(observer)
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{cell::Cell, rc::Rc};

  #[test]
  fn factory_runs_per_subscription() {
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let source = observable::defer(move || {
      c.set(c.get() + 1);
      observable::of::<_, ()>(1)
    });
    assert_eq!(calls.get(), 0);
    source.clone().subscribe(|_| {});
    source.subscribe(|_| {});
    assert_eq!(calls.get(), 2);
  }
}
