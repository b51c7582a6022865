//! The degenerate sources: `empty`, `never`, `throw`.

use crate::{
  observable::Observable, observer::BoxObserver, subscription::MultiSubscription,
};
use std::marker::PhantomData;

/// Completes immediately without emitting.
pub fn empty<Item, Err>() -> EmptyObservable<Item, Err> {
  EmptyObservable(PhantomData)
}

/// Emits nothing and never terminates.
pub fn never<Item, Err>() -> NeverObservable<Item, Err> {
  NeverObservable(PhantomData)
}

/// Errors immediately with `err`.
pub fn throw<Item, Err>(err: Err) -> ThrowObservable<Item, Err> {
  ThrowObservable { err, _marker: PhantomData }
}

#[derive(Clone)]
pub struct EmptyObservable<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item: 'static, Err: 'static> Observable for EmptyObservable<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    mut observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    observer.complete();
    MultiSubscription::default()
  }
}

#[derive(Clone)]
pub struct NeverObservable<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item: 'static, Err: 'static> Observable for NeverObservable<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    _observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    MultiSubscription::default()
  }
}

#[derive(Clone)]
pub struct ThrowObservable<Item, Err> {
  err: Err,
  _marker: PhantomData<fn() -> Item>,
}

impl<Item: 'static, Err: 'static> Observable for ThrowObservable<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    mut observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    observer.error(self.err);
    MultiSubscription::default()
  }
}
