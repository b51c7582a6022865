//! Subjects: observer and observable in one handle.
//!
//! A subject multicasts whatever is pushed into it to every current
//! subscriber. The variants differ in what they hand a late subscriber:
//! nothing ([`Subject`]), the latest value ([`BehaviorSubject`]), a trimmed
//! replay buffer ([`ReplaySubject`]) or the final value ([`AsyncSubject`]).

use crate::{
  error::RxError,
  observable::Observable,
  observer::{BoxObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{MultiSubscription, SingleSubscription},
};

mod async_subject;
mod behavior;
mod replay;

pub use async_subject::AsyncSubject;
pub use behavior::BehaviorSubject;
pub use replay::{ReplaySubject, ScheduledObserver};

/// Where a subject is in its lifecycle. Terminals are sticky so late
/// subscribers can be handed the stored outcome.
pub(crate) enum SubjectState<Err> {
  Active,
  Completed,
  Errored(Err),
  Disposed,
}

impl<Err> SubjectState<Err> {
  pub(crate) fn is_active(&self) -> bool {
    matches!(self, SubjectState::Active)
  }

  pub(crate) fn assert_not_disposed(&self) {
    if matches!(self, SubjectState::Disposed) {
      panic!("{}", RxError::SubjectDisposed);
    }
  }
}

/// ID-keyed observer slots. Broadcast snapshots the ids first, then
/// takes each observer out of its slot for the call, so an observer may
/// unsubscribe itself (or a sibling) mid-notification, and observers added
/// during a broadcast miss the in-flight notification.
pub(crate) struct Subscribers<Item, Err> {
  slots: Vec<(usize, Option<BoxObserver<Item, Err>>)>,
  next_id: usize,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { slots: Vec::new(), next_id: 0 } }
}

impl<Item, Err> Subscribers<Item, Err> {
  pub(crate) fn add(&mut self, observer: BoxObserver<Item, Err>) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.slots.push((id, Some(observer)));
    id
  }

  pub(crate) fn remove(&mut self, id: usize) -> Option<BoxObserver<Item, Err>> {
    self
      .slots
      .iter()
      .position(|(i, _)| *i == id)
      .and_then(|at| self.slots.remove(at).1)
  }

  pub(crate) fn ids(&self) -> Vec<usize> {
    self.slots.iter().map(|(id, _)| *id).collect()
  }

  pub(crate) fn take(&mut self, id: usize) -> Option<BoxObserver<Item, Err>> {
    self
      .slots
      .iter_mut()
      .find(|(i, _)| *i == id)
      .and_then(|(_, slot)| slot.take())
  }

  /// No-op if the slot was removed while the observer was out.
  pub(crate) fn restore(&mut self, id: usize, observer: BoxObserver<Item, Err>) {
    if let Some((_, slot)) = self.slots.iter_mut().find(|(i, _)| *i == id) {
      *slot = Some(observer);
    }
  }

  pub(crate) fn drain(&mut self) -> Vec<BoxObserver<Item, Err>> {
    std::mem::take(&mut self.slots)
      .into_iter()
      .filter_map(|(_, slot)| slot)
      .collect()
  }
}

pub(crate) struct SubjectCore<Item, Err> {
  pub(crate) subscribers: Subscribers<Item, Err>,
  pub(crate) state: SubjectState<Err>,
}

impl<Item, Err> Default for SubjectCore<Item, Err> {
  fn default() -> Self {
    Self { subscribers: Subscribers::default(), state: SubjectState::Active }
  }
}

impl<Item, Err> SubjectCore<Item, Err> {
  /// Deliver one value to every current subscriber, one slot at a time,
  /// never holding a borrow across the observer call.
  pub(crate) fn broadcast(core: &MutRc<Self>, value: &Item)
  where
    Item: Clone,
  {
    let ids = core.rc_deref().subscribers.ids();
    for id in ids {
      let taken = core.rc_deref_mut().subscribers.take(id);
      if let Some(mut observer) = taken {
        observer.next(value.clone());
        core.rc_deref_mut().subscribers.restore(id, observer);
      }
    }
  }

  /// Flip to a terminal state and deliver it to every subscriber, clearing
  /// the subscriber list. Idempotent past the first terminal.
  pub(crate) fn terminate(
    core: &MutRc<Self>,
    terminal: SubjectState<Err>,
  ) where
    Err: Clone,
  {
    let observers = {
      let mut inner = core.rc_deref_mut();
      inner.state.assert_not_disposed();
      if !inner.state.is_active() {
        return;
      }
      inner.state = terminal;
      inner.subscribers.drain()
    };
    let outcome = match &core.rc_deref().state {
      SubjectState::Errored(err) => Some(err.clone()),
      _ => None,
    };
    for mut observer in observers {
      match &outcome {
        Some(err) => observer.error(err.clone()),
        None => observer.complete(),
      }
    }
  }
}

/// Plain multicast bridge: push in on the observer side, fan out to every
/// subscriber on the observable side. Stores its terminal for late
/// subscribers. Clones share the one subscriber list.
pub struct Subject<Item, Err> {
  pub(crate) core: MutRc<SubjectCore<Item, Err>>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self { Self { core: MutRc::default() } }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// Tear the subject down. Any use afterwards (including subscribing)
  /// panics: that is caller error, not a stream failure.
  pub fn dispose(&mut self) {
    let dropped = {
      let mut core = self.core.rc_deref_mut();
      core.state = SubjectState::Disposed;
      core.subscribers.drain()
    };
    drop(dropped);
  }

  pub fn is_active(&self) -> bool { self.core.rc_deref().state.is_active() }
}

impl<Item, Err> Observer<Item, Err> for Subject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    {
      let core = self.core.rc_deref();
      core.state.assert_not_disposed();
      if !core.state.is_active() {
        return;
      }
    }
    SubjectCore::broadcast(&self.core, &value);
  }

  fn error(&mut self, err: Err) {
    SubjectCore::terminate(&self.core, SubjectState::Errored(err));
  }

  fn complete(&mut self) {
    SubjectCore::terminate(&self.core, SubjectState::Completed);
  }

  fn is_closed(&self) -> bool { !self.core.rc_deref().state.is_active() }
}

impl<Item, Err> Observable for Subject<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    mut observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let stored = {
      let core = self.core.rc_deref();
      core.state.assert_not_disposed();
      match &core.state {
        SubjectState::Completed => Some(None),
        SubjectState::Errored(err) => Some(Some(err.clone())),
        _ => None,
      }
    };
    if let Some(terminal) = stored {
      match terminal {
        Some(err) => observer.error(err),
        None => observer.complete(),
      }
      return MultiSubscription::default();
    }
    let id = self.core.rc_deref_mut().subscribers.add(observer);
    let core = self.core;
    let sub = MultiSubscription::default();
    sub.add(SingleSubscription::new(move || {
      let dropped = core.rc_deref_mut().subscribers.remove(id);
      drop(dropped);
    }));
    sub
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn multicasts_to_all_subscribers() {
    let mut subject = Subject::<i32, ()>::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (a, b) = (seen.clone(), seen.clone());
    subject.clone().subscribe(move |v| a.borrow_mut().push(('a', v)));
    subject.clone().subscribe(move |v| b.borrow_mut().push(('b', v)));
    subject.next(1);
    assert_eq!(*seen.borrow(), vec![('a', 1), ('b', 1)]);
  }

  #[test]
  fn late_subscriber_gets_stored_terminal() {
    let mut subject = Subject::<i32, &str>::new();
    subject.error("boom");
    let seen = Rc::new(RefCell::new(None));
    let s = seen.clone();
    subject.clone().subscribe_err(|_| panic!(), move |e| *s.borrow_mut() = Some(e));
    assert_eq!(*seen.borrow(), Some("boom"));
  }

  #[test]
  fn next_after_complete_is_dropped() {
    let mut subject = Subject::<i32, ()>::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    subject.clone().subscribe(move |v| s.borrow_mut().push(v));
    subject.next(1);
    subject.complete();
    subject.next(2);
    assert_eq!(*seen.borrow(), vec![1]);
  }

  #[test]
  fn unsubscribe_detaches_one_subscriber() {
    let mut subject = Subject::<i32, ()>::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (a, b) = (seen.clone(), seen.clone());
    let mut first = subject.clone().subscribe(move |v| a.borrow_mut().push(('a', v)));
    subject.clone().subscribe(move |v| b.borrow_mut().push(('b', v)));
    first.unsubscribe();
    subject.next(1);
    assert_eq!(*seen.borrow(), vec![('b', 1)]);
  }

  #[test]
  #[should_panic(expected = "dispose")]
  fn next_after_dispose_panics() {
    let mut subject = Subject::<i32, ()>::new();
    subject.dispose();
    subject.next(1);
  }

  #[test]
  #[should_panic(expected = "dispose")]
  fn subscribe_after_dispose_panics() {
    let mut subject = Subject::<i32, ()>::new();
    subject.dispose();
    subject.clone().subscribe(|_| {});
  }
}
