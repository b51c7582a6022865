use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

#[derive(Clone)]
pub struct MapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<S, F, B> Observable for MapOp<S, F>
where
  S: Observable,
  F: FnMut(S::Item) -> B + 'static,
  B: 'static,
{
  type Item = B;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self
      .source
      .actual_subscribe(Box::new(MapObserver { observer, func: self.func }))
  }
}

pub struct MapObserver<O, F> {
  observer: O,
  func: F,
}

impl<O, F, Item, B, Err> Observer<Item, Err> for MapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> B,
{
  fn next(&mut self, value: Item) { self.observer.next((self.func)(value)) }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn maps_every_value() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(1..=3)
      .map(|v| v * 10)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![10, 20, 30]);
  }

  #[test]
  fn map_chains_fuse() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(1..=3)
      .map(|v| v + 1)
      .map(|v| v * 2)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![4, 6, 8]);
  }
}
