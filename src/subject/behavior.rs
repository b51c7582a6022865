use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  subject::{SubjectCore, SubjectState},
  subscription::{MultiSubscription, SingleSubscription},
};

/// A subject seeded with a value: every new subscriber first receives the
/// latest value, then the live flow. After a terminal, only the terminal is
/// delivered.
pub struct BehaviorSubject<Item, Err> {
  core: MutRc<SubjectCore<Item, Err>>,
  value: MutRc<Item>,
}

impl<Item, Err> Clone for BehaviorSubject<Item, Err> {
  fn clone(&self) -> Self {
    Self { core: self.core.clone(), value: self.value.clone() }
  }
}

impl<Item, Err> BehaviorSubject<Item, Err> {
  pub fn new(seed: Item) -> Self {
    Self { core: MutRc::default(), value: MutRc::own(seed) }
  }

  pub fn value(&self) -> Item
  where
    Item: Clone,
  {
    self.value.rc_deref().clone()
  }

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
}

impl<Item, Err> Observer<Item, Err> for BehaviorSubject<Item, Err>
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
    *self.value.rc_deref_mut() = value.clone();
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

impl<Item, Err> Observable for BehaviorSubject<Item, Err>
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
    let current = self.value.rc_deref().clone();
    observer.next(current);
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
