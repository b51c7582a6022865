//! Observer trait and the wrappers that make the observer contract safe.

use crate::{
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{SerialSubscription, SubscriptionLike},
};

/// The consumer side of a stream.
///
/// All three notification methods take `&mut self` so the trait stays
/// object-safe: operators erase their downstream to a [`BoxObserver`] at the
/// subscribe seam without leaking concrete observer types upstream. The
/// termination grammar (`next* (complete | error)?`) is enforced by
/// [`AutoDetachObserver`] at the subscription boundary, not by every
/// implementor.
pub trait Observer<Item, Err> {
  fn next(&mut self, value: Item);

  fn error(&mut self, err: Err);

  fn complete(&mut self);

  /// `true` once this observer will not accept further notifications.
  /// Synchronous sources (like `from_iter`) poll this to stop emitting
  /// early when a downstream operator has already terminated.
  fn is_closed(&self) -> bool { false }
}

pub type BoxObserver<Item, Err> = Box<dyn Observer<Item, Err>>;

impl<Item, Err> Observer<Item, Err> for BoxObserver<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }
  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }
  #[inline]
  fn complete(&mut self) { (**self).complete() }
  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

/// `None` swallows every event; `Some` delegates. Operator state machines
/// `take()` the inner observer out of an `Option` to get one-shot terminal
/// delivery.
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(observer) = self {
      observer.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut observer) = self.take() {
      observer.error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(mut observer) = self.take() {
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool {
    match self {
      Some(observer) => observer.is_closed(),
      None => true,
    }
  }
}

/// Shared-ownership observer: several internal observers of one operator can
/// point at the same downstream.
impl<T, Item, Err> Observer<Item, Err> for MutRc<T>
where
  T: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.rc_deref_mut().next(value) }

  fn error(&mut self, err: Err) { self.rc_deref_mut().error(err) }

  fn complete(&mut self) { self.rc_deref_mut().complete() }

  fn is_closed(&self) -> bool { self.rc_deref().is_closed() }
}

/// Upgrades any observer to honor the termination grammar and releases the
/// attached subscription on the terminal notification.
///
/// After the first `complete` or `error`, every further notification is
/// silently dropped and the attached upstream subscription is unsubscribed,
/// which is what guarantees sources stop producing for this consumer.
pub struct AutoDetachObserver<O> {
  observer: Option<O>,
  attachment: SerialSubscription,
}

impl<O> AutoDetachObserver<O> {
  pub fn new(observer: O) -> Self {
    Self { observer: Some(observer), attachment: SerialSubscription::default() }
  }

  /// Attach the upstream subscription to release on terminal. If the
  /// observer already terminated (the source completed synchronously during
  /// subscribe), the incoming subscription is unsubscribed immediately.
  pub fn attach(&mut self, subscription: impl SubscriptionLike + 'static) {
    self.attachment.set(subscription);
  }
}

impl<O, Item, Err> Observer<Item, Err> for AutoDetachObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(observer) = self.observer.as_mut() {
      observer.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut observer) = self.observer.take() {
      observer.error(err);
      self.attachment.unsubscribe();
    }
  }

  fn complete(&mut self) {
    if let Some(mut observer) = self.observer.take() {
      observer.complete();
      self.attachment.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.observer.is_none() }
}

/// Closure adapter built by the `subscribe*` methods.
pub struct FnObserver<N, E, C> {
  next: N,
  error: Option<E>,
  complete: Option<C>,
}

impl<N, E, C> FnObserver<N, E, C> {
  pub(crate) fn new(next: N, error: Option<E>, complete: Option<C>) -> Self {
    Self { next, error, complete }
  }
}

impl<N, E, C, Item, Err> Observer<Item, Err> for FnObserver<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(&mut self, err: Err) {
    if let Some(error) = self.error.take() {
      error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(complete) = self.complete.take() {
      complete();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{cell::Cell, rc::Rc};

  struct Collect(Rc<Cell<(usize, usize, usize)>>);

  impl Observer<i32, &'static str> for Collect {
    fn next(&mut self, _: i32) {
      let (n, e, c) = self.0.get();
      self.0.set((n + 1, e, c));
    }
    fn error(&mut self, _: &'static str) {
      let (n, e, c) = self.0.get();
      self.0.set((n, e + 1, c));
    }
    fn complete(&mut self) {
      let (n, e, c) = self.0.get();
      self.0.set((n, e, c + 1));
    }
  }

  #[test]
  fn auto_detach_enforces_grammar() {
    let hits = Rc::new(Cell::new((0, 0, 0)));
    let mut observer = AutoDetachObserver::new(Collect(hits.clone()));
    observer.next(1);
    observer.complete();
    observer.next(2);
    observer.complete();
    observer.error("late");
    assert_eq!(hits.get(), (1, 0, 1));
    assert!(Observer::<i32, &str>::is_closed(&observer));
  }

  #[test]
  fn auto_detach_releases_attachment_on_terminal() {
    let released = Rc::new(Cell::new(false));
    let r = released.clone();
    let mut observer = AutoDetachObserver::new(Collect(Rc::new(Cell::new((0, 0, 0)))));
    observer.attach(crate::subscription::SingleSubscription::new(move || {
      r.set(true)
    }));
    Observer::<i32, &str>::error(&mut observer, "boom");
    assert!(released.get());
  }

  #[test]
  fn late_attach_after_terminal_is_unsubscribed() {
    let released = Rc::new(Cell::new(false));
    let r = released.clone();
    let mut observer = AutoDetachObserver::new(Collect(Rc::new(Cell::new((0, 0, 0)))));
    Observer::<i32, &str>::complete(&mut observer);
    observer.attach(crate::subscription::SingleSubscription::new(move || {
      r.set(true)
    }));
    assert!(released.get());
  }
}
