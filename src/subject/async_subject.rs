use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  subject::{SubjectState, Subscribers},
  subscription::{MultiSubscription, SingleSubscription},
};

struct AsyncCore<Item, Err> {
  subscribers: Subscribers<Item, Err>,
  state: SubjectState<Err>,
  last: Option<Item>,
}

impl<Item, Err> Default for AsyncCore<Item, Err> {
  fn default() -> Self {
    Self {
      subscribers: Subscribers::default(),
      state: SubjectState::Active,
      last: None,
    }
  }
}

/// Remembers the last value pushed and emits it only on `complete`, to
/// current and late subscribers alike. An `error` discards the value and
/// broadcasts the error instead.
pub struct AsyncSubject<Item, Err> {
  core: MutRc<AsyncCore<Item, Err>>,
}

impl<Item, Err> Clone for AsyncSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> Default for AsyncSubject<Item, Err> {
  fn default() -> Self { Self { core: MutRc::default() } }
}

impl<Item, Err> AsyncSubject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// Tear the subject down: the latched value is dropped too. Any use
  /// afterwards (including subscribing) panics.
  pub fn dispose(&mut self) {
    let dropped = {
      let mut core = self.core.rc_deref_mut();
      core.state = SubjectState::Disposed;
      core.last = None;
      core.subscribers.drain()
    };
    drop(dropped);
  }
}

impl<Item, Err> Observer<Item, Err> for AsyncSubject<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let mut core = self.core.rc_deref_mut();
    core.state.assert_not_disposed();
    if core.state.is_active() {
      core.last = Some(value);
    }
  }

  fn error(&mut self, err: Err) {
    let observers = {
      let mut core = self.core.rc_deref_mut();
      core.state.assert_not_disposed();
      if !core.state.is_active() {
        return;
      }
      core.state = SubjectState::Errored(err.clone());
      core.last = None;
      core.subscribers.drain()
    };
    for mut observer in observers {
      observer.error(err.clone());
    }
  }

  fn complete(&mut self) {
    let (observers, last) = {
      let mut core = self.core.rc_deref_mut();
      core.state.assert_not_disposed();
      if !core.state.is_active() {
        return;
      }
      core.state = SubjectState::Completed;
      (core.subscribers.drain(), core.last.clone())
    };
    for mut observer in observers {
      if let Some(value) = last.clone() {
        observer.next(value);
      }
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool { !self.core.rc_deref().state.is_active() }
}

impl<Item, Err> Observable for AsyncSubject<Item, Err>
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
    enum Late<Item, Err> {
      Value(Option<Item>),
      Failed(Err),
      Live,
    }
    let late = {
      let core = self.core.rc_deref();
      core.state.assert_not_disposed();
      match &core.state {
        SubjectState::Completed => Late::Value(core.last.clone()),
        SubjectState::Errored(err) => Late::Failed(err.clone()),
        _ => Late::Live,
      }
    };
    match late {
      Late::Value(last) => {
        if let Some(value) = last {
          observer.next(value);
        }
        observer.complete();
        MultiSubscription::default()
      }
      Late::Failed(err) => {
        observer.error(err);
        MultiSubscription::default()
      }
      Late::Live => {
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
  }
}
