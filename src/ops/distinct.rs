use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};
use std::collections::HashSet;
use std::hash::Hash;

/// Suppresses values already seen anywhere earlier in the stream.
#[derive(Clone)]
pub struct DistinctOp<S> {
  pub(crate) source: S,
}

impl<S> Observable for DistinctOp<S>
where
  S: Observable,
  S::Item: Clone + Eq + Hash,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.source.actual_subscribe(Box::new(DistinctObserver {
      observer,
      seen: HashSet::new(),
    }))
  }
}

pub struct DistinctObserver<O, Item> {
  observer: O,
  seen: HashSet<Item>,
}

impl<O, Item, Err> Observer<Item, Err> for DistinctObserver<O, Item>
where
  O: Observer<Item, Err>,
  Item: Clone + Eq + Hash,
{
  fn next(&mut self, value: Item) {
    if self.seen.insert(value.clone()) {
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
  fn suppresses_duplicates() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(vec![1, 2, 1, 3, 2, 4])
      .distinct()
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
  }
}
