use crate::{
  observable::Observable, observer::BoxObserver, subscription::MultiSubscription,
};
use std::marker::PhantomData;

/// Build an observable from a raw subscribe function.
///
/// The function receives the downstream observer and returns the subscription
/// that tears down whatever it set up (`MultiSubscription::default()` when
/// there is nothing to tear down).
pub fn create<F, Item, Err>(subscribe: F) -> ObservableFn<F, Item, Err>
where
  F: FnOnce(BoxObserver<Item, Err>) -> MultiSubscription,
{
  ObservableFn { subscribe, _marker: PhantomData }
}

#[derive(Clone)]
pub struct ObservableFn<F, Item, Err> {
  subscribe: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

impl<F, Item, Err> Observable for ObservableFn<F, Item, Err>
where
  F: FnOnce(BoxObserver<Item, Err>) -> MultiSubscription,
  Item: 'static,
  Err: 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    (self.subscribe)(observer)
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn emits_then_completes() {
    let seen = std::rc::Rc::new(std::cell::Cell::new(0));
    let completed = std::rc::Rc::new(std::cell::Cell::new(false));
    let s = seen.clone();
    let c = completed.clone();
    observable::create(|mut observer: BoxObserver<i32, ()>| {
      observer.next(1);
      observer.next(2);
      observer.complete();
      MultiSubscription::default()
    })
    .subscribe_complete(move |v| s.set(s.get() + v), move || c.set(true));
    assert_eq!(seen.get(), 3);
    assert!(completed.get());
  }

  #[test]
  fn teardown_runs_on_unsubscribe() {
    let torn = std::rc::Rc::new(std::cell::Cell::new(false));
    let t = torn.clone();
    let mut subscription =
      observable::create(move |_observer: BoxObserver<i32, ()>| {
        let sub = MultiSubscription::default();
        sub.add(SingleSubscription::new(move || t.set(true)));
        sub
      })
      .subscribe(|_| {});
    subscription.unsubscribe();
    assert!(torn.get());
  }
}
