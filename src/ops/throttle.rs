use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDerefMut},
  subscription::{MultiSubscription, SerialSubscription},
};

/// Debounces the source through a per-value silence window. Each value is
/// held until the observable returned by `duration_selector` for it fires
/// or completes; a newer value cancels the wait and starts its own. Source
/// completion flushes the held value before the terminal.
#[derive(Clone)]
pub struct ThrottleWithSelectorOp<S, F> {
  pub(crate) source: S,
  pub(crate) duration_selector: F,
}

struct ThrottleState<Item> {
  pending: Option<Item>,
  id: usize,
}

impl<S, F, D> Observable for ThrottleWithSelectorOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) -> D + 'static,
  D: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(ThrottleState { pending: None, id: 0 });
    let window = SerialSubscription::default();
    let sub = MultiSubscription::default();
    sub.add(window.clone());
    sub.add(self.source.actual_subscribe(Box::new(ThrottleObserver {
      shared,
      state,
      window,
      duration_selector: self.duration_selector,
    })));
    sub
  }
}

struct ThrottleObserver<Item, Err, F> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<ThrottleState<Item>>,
  window: SerialSubscription,
  duration_selector: F,
}

impl<Item, Err, F, D> Observer<Item, Err> for ThrottleObserver<Item, Err, F>
where
  Item: 'static,
  Err: 'static,
  F: FnMut(&Item) -> D,
  D: Observable<Err = Err>,
{
  fn next(&mut self, value: Item) {
    let duration = (self.duration_selector)(&value);
    let id = {
      let mut state = self.state.rc_deref_mut();
      state.id += 1;
      state.pending = Some(value);
      state.id
    };
    let duration_sub = duration.actual_subscribe(Box::new(WindowObserver {
      shared: self.shared.clone(),
      state: self.state.clone(),
      id,
    }));
    self.window.set(duration_sub);
  }

  fn error(&mut self, err: Err) {
    self.state.rc_deref_mut().pending = None;
    self.shared.error(err);
  }

  fn complete(&mut self) {
    let held = self.state.rc_deref_mut().pending.take();
    if let Some(value) = held {
      self.shared.next(value);
    }
    self.shared.complete();
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct WindowObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<ThrottleState<Item>>,
  id: usize,
}

impl<Item, Err> WindowObserver<Item, Err> {
  fn release(&mut self) {
    let held = {
      let mut state = self.state.rc_deref_mut();
      if state.id == self.id {
        state.pending.take()
      } else {
        None
      }
    };
    if let Some(value) = held {
      self.shared.next(value);
    }
  }
}

impl<Item, Err, Tick> Observer<Tick, Err> for WindowObserver<Item, Err> {
  fn next(&mut self, _tick: Tick) { self.release() }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) { self.release() }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}
