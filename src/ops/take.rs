use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

#[derive(Clone)]
pub struct TakeOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S> Observable for TakeOp<S>
where
  S: Observable,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let mut observer = Some(observer);
    // take(0) never looks at the source.
    if self.count == 0 {
      observer.complete();
      return MultiSubscription::default();
    }
    self.source.actual_subscribe(Box::new(TakeObserver {
      observer,
      remaining: self.count,
    }))
  }
}

pub struct TakeObserver<O> {
  observer: Option<O>,
  remaining: usize,
}

impl<O, Item, Err> Observer<Item, Err> for TakeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.observer.is_none() {
      return;
    }
    self.remaining -= 1;
    self.observer.next(value);
    if self.remaining == 0 {
      self.observer.complete();
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_none() }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{cell::Cell, cell::RefCell, rc::Rc};

  #[test]
  fn completes_after_count_values() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let completed = Rc::new(Cell::new(false));
    let (s, c) = (seen.clone(), completed.clone());
    observable::from_iter::<_, ()>(0..100)
      .take(3)
      .subscribe_complete(move |v| s.borrow_mut().push(v), move || c.set(true));
    assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    assert!(completed.get());
  }

  #[test]
  fn take_zero_never_subscribes_values() {
    let completed = Rc::new(Cell::new(false));
    let c = completed.clone();
    observable::from_iter::<_, ()>(0..3)
      .take(0)
      .subscribe_complete(|_| panic!("no values"), move || c.set(true));
    assert!(completed.get());
  }
}
