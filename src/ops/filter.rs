use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

#[derive(Clone)]
pub struct FilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) pred: F,
}

impl<S, F> Observable for FilterOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) -> bool + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self
      .source
      .actual_subscribe(Box::new(FilterObserver { observer, pred: self.pred }))
  }
}

pub struct FilterObserver<O, F> {
  observer: O,
  pred: F,
}

impl<O, F, Item, Err> Observer<Item, Err> for FilterObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.pred)(&value) {
      self.observer.next(value);
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn keeps_only_matching_values() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(1..=6)
      .filter(|v| v % 2 == 0)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![2, 4, 6]);
  }

  #[test]
  fn filter_then_map_equals_map_of_filtered() {
    let a = Rc::new(RefCell::new(Vec::new()));
    let b = Rc::new(RefCell::new(Vec::new()));
    let sink = a.clone();
    observable::from_iter::<_, ()>(1..=10)
      .filter(|v| v % 3 == 0)
      .map(|v| v * 2)
      .subscribe(move |v| sink.borrow_mut().push(v));
    let sink = b.clone();
    observable::from_iter::<_, ()>((1..=10).filter(|v| v % 3 == 0).map(|v| v * 2))
      .subscribe(move |v: i32| sink.borrow_mut().push(v));
    assert_eq!(*a.borrow(), *b.borrow());
  }
}
