use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};

/// Remembers the latest value and surfaces it on `complete`; a source that
/// completes without emitting becomes an `EmptySequence` error.
#[derive(Clone)]
pub struct LastOp<S> {
  pub(crate) source: S,
}

impl<S> Observable for LastOp<S>
where
  S: Observable,
  S::Item: Clone,
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
      .actual_subscribe(Box::new(LastObserver { observer, last: None }))
  }
}

pub struct LastObserver<O, Item> {
  observer: O,
  last: Option<Item>,
}

impl<O, Item, Err> Observer<Item, Err> for LastObserver<O, Item>
where
  O: Observer<Item, Err>,
  Err: From<RxError>,
{
  fn next(&mut self, value: Item) { self.last = Some(value) }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) {
    match self.last.take() {
      Some(value) => {
        self.observer.next(value);
        self.observer.complete();
      }
      None => self.observer.error(RxError::EmptySequence.into()),
    }
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

/// `last` with a fallback instead of the empty-sequence error.
#[derive(Clone)]
pub struct LastOrOp<S, Item> {
  pub(crate) source: S,
  pub(crate) default: Item,
}

impl<S, Item> Observable for LastOrOp<S, Item>
where
  S: Observable<Item = Item>,
  Item: Clone + 'static,
{
  type Item = Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.source.actual_subscribe(Box::new(LastOrObserver {
      observer,
      last: self.default,
    }))
  }
}

pub struct LastOrObserver<O, Item> {
  observer: O,
  last: Item,
}

impl<O, Item, Err> Observer<Item, Err> for LastOrObserver<O, Item>
where
  O: Observer<Item, Err>,
  Item: Clone,
{
  fn next(&mut self, value: Item) { self.last = value }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) {
    self.observer.next(self.last.clone());
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
