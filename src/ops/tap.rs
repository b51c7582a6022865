use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

/// Runs a side effect on every value without altering the stream.
#[derive(Clone)]
pub struct TapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<S, F> Observable for TapOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self
      .source
      .actual_subscribe(Box::new(TapObserver { observer, func: self.func }))
  }
}

pub struct TapObserver<O, F> {
  observer: O,
  func: F,
}

impl<O, F, Item, Err> Observer<Item, Err> for TapObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item),
{
  fn next(&mut self, value: Item) {
    (self.func)(&value);
    self.observer.next(value);
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
  fn observes_without_altering() {
    let tapped = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (t, s) = (tapped.clone(), seen.clone());
    observable::from_iter::<_, ()>(1..=3)
      .tap(move |v| t.borrow_mut().push(*v))
      .map(|v| v * 2)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*tapped.borrow(), vec![1, 2, 3]);
    assert_eq!(*seen.borrow(), vec![2, 4, 6]);
  }
}
