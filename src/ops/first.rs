use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

/// Emits the first value, completes, and the downstream detach tears the
/// upstream down. Completing without a value is an `EmptySequence` error.
#[derive(Clone)]
pub struct FirstOp<S> {
  pub(crate) source: S,
}

impl<S> Observable for FirstOp<S>
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
    self
      .source
      .actual_subscribe(Box::new(FirstObserver { observer: Some(observer) }))
  }
}

pub struct FirstObserver<O> {
  observer: Option<O>,
}

impl<O, Item, Err> Observer<Item, Err> for FirstObserver<O>
where
  O: Observer<Item, Err>,
  Err: From<RxError>,
{
  fn next(&mut self, value: Item) {
    if let Some(mut observer) = self.observer.take() {
      observer.next(value);
      observer.complete();
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut observer) = self.observer.take() {
      observer.error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(mut observer) = self.observer.take() {
      observer.error(RxError::EmptySequence.into());
    }
  }

  fn is_closed(&self) -> bool { self.observer.is_none() }
}

/// `first` with a fallback for the empty source.
#[derive(Clone)]
pub struct FirstOrOp<S, Item> {
  pub(crate) source: S,
  pub(crate) default: Item,
}

impl<S, Item> Observable for FirstOrOp<S, Item>
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
    self.source.actual_subscribe(Box::new(FirstOrObserver {
      observer: Some(observer),
      default: Some(self.default),
    }))
  }
}

pub struct FirstOrObserver<O, Item> {
  observer: Option<O>,
  default: Option<Item>,
}

impl<O, Item, Err> Observer<Item, Err> for FirstOrObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(mut observer) = self.observer.take() {
      observer.next(value);
      observer.complete();
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut observer) = self.observer.take() {
      observer.error(err);
    }
  }

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
  fn stops_after_one_value() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::from_iter::<_, RxError>(5..100)
      .first()
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![5]);
  }

  #[test]
  fn empty_source_errors() {
    let seen = Rc::new(RefCell::new(None));
    let s = seen.clone();
    observable::empty::<i32, RxError>()
      .first()
      .subscribe_err(|_| panic!(), move |e| *s.borrow_mut() = Some(e));
    assert_eq!(*seen.borrow(), Some(RxError::EmptySequence));
  }

  #[test]
  fn first_or_falls_back() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    observable::empty::<i32, ()>()
      .first_or(-1)
      .subscribe(move |v| s.borrow_mut().push(v));
    assert_eq!(*seen.borrow(), vec![-1]);
  }
}
