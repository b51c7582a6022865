use crate::{
  observable::Observable, observer::BoxObserver, subscription::MultiSubscription,
};

/// Object-safe shim: `Observable::actual_subscribe` consumes `self`, so the
/// erased form takes `Box<Self>` instead.
pub trait BoxedObservable<Item, Err> {
  fn box_subscribe(
    self: Box<Self>,
    observer: BoxObserver<Item, Err>,
  ) -> MultiSubscription;
}

impl<T> BoxedObservable<T::Item, T::Err> for T
where
  T: Observable,
{
  fn box_subscribe(
    self: Box<Self>,
    observer: BoxObserver<T::Item, T::Err>,
  ) -> MultiSubscription {
    (*self).actual_subscribe(observer)
  }
}

/// A type-erased observable, for storing heterogeneous sources in one
/// collection or naming an operator chain without spelling out its type.
pub struct BoxObservable<Item, Err>(Box<dyn BoxedObservable<Item, Err>>);

impl<Item, Err> BoxObservable<Item, Err> {
  pub fn new(source: impl Observable<Item = Item, Err = Err> + 'static) -> Self {
    Self(Box::new(source))
  }
}

impl<Item, Err> Observable for BoxObservable<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.0.box_subscribe(observer)
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn erased_sources_share_a_type() {
    let sources: Vec<BoxObservable<i32, ()>> = vec![
      observable::of(1).box_it(),
      observable::from_iter(2..=3).map(|v| v * 10).box_it(),
      observable::empty().box_it(),
    ];
    let seen = Rc::new(RefCell::new(Vec::new()));
    for source in sources {
      let s = seen.clone();
      source.subscribe(move |v| s.borrow_mut().push(v));
    }
    assert_eq!(*seen.borrow(), vec![1, 20, 30]);
  }
}
