use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

/// Running fold: emits the accumulator after every upstream value.
#[derive(Clone)]
pub struct ScanOp<S, F, Acc> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) initial: Acc,
}

impl<S, F, Acc> Observable for ScanOp<S, F, Acc>
where
  S: Observable,
  F: FnMut(Acc, S::Item) -> Acc + 'static,
  Acc: Clone + 'static,
{
  type Item = Acc;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.source.actual_subscribe(Box::new(ScanObserver {
      observer,
      func: self.func,
      acc: self.initial,
    }))
  }
}

pub struct ScanObserver<O, F, Acc> {
  observer: O,
  func: F,
  acc: Acc,
}

impl<O, F, Item, Acc, Err> Observer<Item, Err> for ScanObserver<O, F, Acc>
where
  O: Observer<Acc, Err>,
  F: FnMut(Acc, Item) -> Acc,
  Acc: Clone,
{
  fn next(&mut self, value: Item) {
    self.acc = (self.func)(self.acc.clone(), value);
    self.observer.next(self.acc.clone());
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
  fn emits_every_partial_fold() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(1..=4)
      .scan_initial(0, |acc, v| acc + v)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![1, 3, 6, 10]);
  }

  #[test]
  fn scan_defaults_the_seed() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(vec![2, 3])
      .scan(|acc: i32, v| acc + v)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![2, 5]);
  }
}
