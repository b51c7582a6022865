use crate::{
  observable::Observable, observer::BoxObserver, subscription::MultiSubscription,
};
use std::marker::PhantomData;

/// Emit every item of an iterator synchronously, then complete.
///
/// Emission polls `is_closed` between items, so a downstream `take` stops the
/// iterator early instead of draining it.
pub fn from_iter<I, Err>(iter: I) -> IterObservable<I, Err>
where
  I: IntoIterator,
{
  IterObservable { iter, _marker: PhantomData }
}

/// Emit a single value, then complete.
pub fn of<Item, Err>(value: Item) -> IterObservable<std::iter::Once<Item>, Err> {
  from_iter(std::iter::once(value))
}

#[derive(Clone)]
pub struct IterObservable<I, Err> {
  iter: I,
  _marker: PhantomData<fn() -> Err>,
}

impl<I, Err> Observable for IterObservable<I, Err>
where
  I: IntoIterator,
  I::Item: 'static,
  Err: 'static,
{
  type Item = I::Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    mut observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    for value in self.iter {
      if observer.is_closed() {
        break;
      }
      observer.next(value);
    }
    if !observer.is_closed() {
      observer.complete();
    }
    MultiSubscription::default()
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn drains_the_iterator() {
    let collected = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let completed = std::rc::Rc::new(std::cell::Cell::new(false));
    let seen = collected.clone();
    let c = completed.clone();
    observable::from_iter::<_, ()>(1..=4)
      .subscribe_complete(move |v| seen.borrow_mut().push(v), move || c.set(true));
    assert_eq!(*collected.borrow(), vec![1, 2, 3, 4]);
    assert!(completed.get());
  }

  #[test]
  fn of_emits_once() {
    let hits = std::rc::Rc::new(std::cell::Cell::new(0));
    let h = hits.clone();
    observable::of::<_, ()>(7).subscribe(move |v| {
      assert_eq!(v, 7);
      h.set(h.get() + 1);
    });
    assert_eq!(hits.get(), 1);
  }
}
