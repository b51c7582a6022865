use std::collections::VecDeque;

use crate::{
  notification::Notification,
  observable::Observable,
  observer::{BoxObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::{MultiSubscription, SubscriptionLike},
};

struct ControlledCore<Item, Err> {
  queue: VecDeque<Item>,
  requested: usize,
  observer: Option<BoxObserver<Item, Err>>,
  terminal: Option<Notification<(), Err>>,
  draining: bool,
}

/// Single-consumer valve between a push source and a pulling observer.
/// Values queue up here; [`request`](ControlledSubject::request) releases
/// them downstream. A terminal waits until the queue has drained.
pub(crate) struct ControlledSubject<Item, Err> {
  core: MutRc<ControlledCore<Item, Err>>,
}

impl<Item, Err> Clone for ControlledSubject<Item, Err> {
  fn clone(&self) -> Self { Self { core: self.core.clone() } }
}

impl<Item, Err> Default for ControlledSubject<Item, Err> {
  fn default() -> Self {
    Self {
      core: MutRc::own(ControlledCore {
        queue: VecDeque::new(),
        requested: 0,
        observer: None,
        terminal: None,
        draining: false,
      }),
    }
  }
}

impl<Item, Err> ControlledSubject<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  /// Grant the downstream `count` more values, replacing any outstanding
  /// grant. Queued values are delivered on the spot.
  pub(crate) fn request(&self, count: usize) {
    self.core.rc_deref_mut().requested = count;
    self.drain();
  }

  // One drain loop runs at a time. request() from inside a delivery only
  // bumps the budget; the running loop picks the new budget up.
  fn drain(&self) {
    {
      let mut core = self.core.rc_deref_mut();
      if core.draining {
        return;
      }
      core.draining = true;
    }
    loop {
      let (value, mut observer) = {
        let mut core = self.core.rc_deref_mut();
        if core.requested == 0 || core.queue.is_empty() {
          break;
        }
        let Some(observer) = core.observer.take() else { break };
        core.requested -= 1;
        (core.queue.pop_front().unwrap(), observer)
      };
      observer.next(value);
      let mut core = self.core.rc_deref_mut();
      if core.observer.is_none() {
        core.observer = Some(observer);
      }
    }
    let outcome = {
      let mut core = self.core.rc_deref_mut();
      core.draining = false;
      if core.queue.is_empty() && core.terminal.is_some() {
        core.terminal.take().map(|t| (t, core.observer.take()))
      } else {
        None
      }
    };
    if let Some((terminal, Some(mut observer))) = outcome {
      match terminal {
        Notification::Complete => observer.complete(),
        Notification::Error(err) => observer.error(err),
        Notification::Next(()) => unreachable!(),
      }
    }
  }

  fn attach(&self, observer: BoxObserver<Item, Err>) {
    self.core.rc_deref_mut().observer = Some(observer);
    self.drain();
  }

  fn detach(&self) {
    let mut core = self.core.rc_deref_mut();
    core.observer = None;
    core.queue.clear();
    core.requested = 0;
  }
}

impl<Item, Err> Observer<Item, Err> for ControlledSubject<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  fn next(&mut self, value: Item) {
    self.core.rc_deref_mut().queue.push_back(value);
    self.drain();
  }

  fn error(&mut self, err: Err) {
    self.core.rc_deref_mut().terminal = Some(Notification::Error(err));
    self.drain();
  }

  fn complete(&mut self) {
    self.core.rc_deref_mut().terminal = Some(Notification::Complete);
    self.drain();
  }

  fn is_closed(&self) -> bool { self.core.rc_deref().terminal.is_some() }
}

/// A push source wrapped behind a request valve. Nothing flows until
/// [`request`](ControlledObservable::request) grants a budget.
pub struct ControlledObservable<S: Observable> {
  source: S,
  subject: ControlledSubject<S::Item, S::Err>,
}

impl<S> Clone for ControlledObservable<S>
where
  S: Observable + Clone,
{
  fn clone(&self) -> Self {
    Self { source: self.source.clone(), subject: self.subject.clone() }
  }
}

impl<S> ControlledObservable<S>
where
  S: Observable,
{
  pub(crate) fn new(source: S) -> Self {
    Self { source, subject: ControlledSubject::default() }
  }

  pub fn request(&self, count: usize) { self.subject.request(count) }

  /// A valve that stays usable after the observable itself has been
  /// consumed by `subscribe`.
  pub fn request_handle(&self) -> RequestHandle<S::Item, S::Err> {
    RequestHandle { subject: self.subject.clone() }
  }

  /// Re-request `window_size` values every time a full window has been
  /// consumed, turning the manual valve into a steady drip.
  pub fn windowed(self, window_size: usize) -> WindowedObservable<S> {
    WindowedObservable { source: self, window_size: window_size.max(1) }
  }
}

impl<S> Observable for ControlledObservable<S>
where
  S: Observable,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.subject.attach(observer);
    let sub = MultiSubscription::default();
    sub.add(self.source.actual_subscribe(Box::new(self.subject.clone())));
    let subject = self.subject;
    sub.add(DetachOnUnsubscribe { subject, closed: false });
    sub
  }
}

struct DetachOnUnsubscribe<Item, Err> {
  subject: ControlledSubject<Item, Err>,
  closed: bool,
}

impl<Item, Err> SubscriptionLike for DetachOnUnsubscribe<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  fn unsubscribe(&mut self) {
    if !self.closed {
      self.closed = true;
      self.subject.detach();
    }
  }

  fn is_closed(&self) -> bool { self.closed }
}

/// Requests values on behalf of a [`ControlledObservable`] that has
/// already been handed to `subscribe`.
pub struct RequestHandle<Item, Err> {
  subject: ControlledSubject<Item, Err>,
}

impl<Item, Err> Clone for RequestHandle<Item, Err> {
  fn clone(&self) -> Self { Self { subject: self.subject.clone() } }
}

impl<Item, Err> RequestHandle<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  pub fn request(&self, count: usize) { self.subject.request(count) }
}

/// A controlled source that refills its own grant in fixed-size windows.
pub struct WindowedObservable<S: Observable> {
  source: ControlledObservable<S>,
  window_size: usize,
}

impl<S> Observable for WindowedObservable<S>
where
  S: Observable,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let subject = self.source.subject.clone();
    let window_size = self.window_size;
    let sub = self.source.actual_subscribe(Box::new(WindowedObserver {
      observer,
      subject: subject.clone(),
      window_size,
      received: 0,
    }));
    subject.request(window_size);
    sub
  }
}

struct WindowedObserver<Item, Err> {
  observer: BoxObserver<Item, Err>,
  subject: ControlledSubject<Item, Err>,
  window_size: usize,
  received: usize,
}

impl<Item, Err> Observer<Item, Err> for WindowedObserver<Item, Err>
where
  Item: 'static,
  Err: 'static,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value);
    self.received += 1;
    if self.received == self.window_size {
      self.received = 0;
      self.subject.request(self.window_size);
    }
  }

  fn error(&mut self, err: Err) { self.observer.error(err) }

  fn complete(&mut self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
