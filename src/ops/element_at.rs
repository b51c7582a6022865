use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

/// Emits the zero-based `index`-th value then completes. Running off the end
/// of the source is an `ArgumentOutOfRange` error.
#[derive(Clone)]
pub struct ElementAtOp<S> {
  pub(crate) source: S,
  pub(crate) index: usize,
}

impl<S> Observable for ElementAtOp<S>
where
  S: Observable,
  S::Err: From<RxError>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.source.actual_subscribe(Box::new(ElementAtObserver {
      observer: Some(observer),
      remaining: self.index,
    }))
  }
}

pub struct ElementAtObserver<O> {
  observer: Option<O>,
  remaining: usize,
}

impl<O, Item, Err> Observer<Item, Err> for ElementAtObserver<O>
where
  O: Observer<Item, Err>,
  Err: From<RxError>,
{
  fn next(&mut self, value: Item) {
    if self.observer.is_none() {
      return;
    }
    if self.remaining == 0 {
      self.observer.next(value);
      self.observer.complete();
    } else {
      self.remaining -= 1;
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) {
    if let Some(mut observer) = self.observer.take() {
      observer.error(RxError::ArgumentOutOfRange.into());
    }
  }

  fn is_closed(&self) -> bool { self.observer.is_none() }
}

/// `element_at` that completes with a fallback instead of erroring when the
/// source is too short.
#[derive(Clone)]
pub struct ElementAtOrDefaultOp<S, Item> {
  pub(crate) source: S,
  pub(crate) index: usize,
  pub(crate) default: Item,
}

impl<S, Item> Observable for ElementAtOrDefaultOp<S, Item>
where
  S: Observable<Item = Item>,
  Item: 'static,
{
  type Item = Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.source.actual_subscribe(Box::new(ElementAtOrDefaultObserver {
      observer: Some(observer),
      remaining: self.index,
      default: Some(self.default),
    }))
  }
}

pub struct ElementAtOrDefaultObserver<O, Item> {
  observer: Option<O>,
  remaining: usize,
  default: Option<Item>,
}

impl<O, Item, Err> Observer<Item, Err> for ElementAtOrDefaultObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.observer.is_none() {
      return;
    }
    if self.remaining == 0 {
      self.observer.next(value);
      self.observer.complete();
    } else {
      self.remaining -= 1;
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) {
    if let (Some(mut observer), Some(default)) =
      (self.observer.take(), self.default.take())
    {
      observer.next(default);
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool { self.observer.is_none() }
}

#[cfg(test)]
mod test {
  use crate::{error::RxError, prelude::*};
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn picks_the_indexed_value() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, RxError>(10..20)
      .element_at(3)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![13]);
  }

  #[test]
  fn short_source_errors() {
    let seen = Rc::new(RefCell::new(None));
    let s = seen.clone();
    observable::from_iter::<_, RxError>(0..2)
      .element_at(5)
      .subscribe_err(|_| panic!(), move |e| *s.borrow_mut() = Some(e));
    assert_eq!(*seen.borrow(), Some(RxError::ArgumentOutOfRange));
  }

  #[test]
  fn or_default_substitutes() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, ()>(0..2)
      .element_at_or_default(5, 99)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![99]);
  }
}
