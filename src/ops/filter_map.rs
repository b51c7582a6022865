use crate::{
  observable::Observable, observer::{BoxObserver, Observer},
  subscription::MultiSubscription,
};
use std::marker::PhantomData;

/// Map and filter in one pass: `None` drops the value.
#[derive(Clone)]
pub struct FilterMapOp<S, F, B> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) _marker: PhantomData<fn() -> B>,
}

impl<S, F, B> Observable for FilterMapOp<S, F, B>
where
  S: Observable,
  F: FnMut(S::Item) -> Option<B> + 'static,
  B: 'static,
{
  type Item = B;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self
      .source
      .actual_subscribe(Box::new(FilterMapObserver {
        observer,
        func: self.func,
      }))
  }
}

pub struct FilterMapObserver<O, F> {
  observer: O,
  func: F,
}

impl<O, F, Item, B, Err> Observer<Item, Err> for FilterMapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> Option<B>,
{
  fn next(&mut self, value: Item) {
    if let Some(mapped) = (self.func)(value) {
      self.observer.next(mapped);
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
