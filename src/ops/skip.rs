use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

#[derive(Clone)]
pub struct SkipOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S> Observable for SkipOp<S>
where
  S: Observable,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.source.actual_subscribe(Box::new(SkipObserver {
      observer,
      remaining: self.count,
    }))
  }
}

pub struct SkipObserver<O> {
  observer: O,
  remaining: usize,
}

impl<O, Item, Err> Observer<Item, Err> for SkipObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      self.observer.next(value);
    } else {
      self.remaining -= 1;
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
  fn drops_the_prefix() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(0..6)
      .skip(4)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![4, 5]);
  }

  #[test]
  fn skipping_more_than_available_completes_empty() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(0..3)
      .skip(10)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert!(seen.borrow().is_empty());
  }
}
