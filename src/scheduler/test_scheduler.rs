//! Deterministic test harness: record timelines in, assert timelines out.
//!
//! A [`TestScheduler`] owns a virtual clock, builds hot and cold observables
//! from `(tick, notification)` message lists, and drives a whole subscription
//! lifecycle through [`TestScheduler::start`], returning the recorded
//! timeline for assertion.

use crate::{
  notification::Notification,
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  scheduler::{Action, Scheduler, TaskHandle, VirtualTime, VirtualTimeScheduler},
  subscription::{MultiSubscription, SingleSubscription, SubscriptionLike},
};
use std::rc::Rc;

/// Unsubscribe tick of a subscription that was never disposed.
pub const INFINITE: VirtualTime = VirtualTime::MAX;

/// A notification stamped with the tick it was (or should be) delivered at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recorded<Item, Err> {
  pub time: VirtualTime,
  pub notification: Notification<Item, Err>,
}

pub fn next<Item, Err>(time: VirtualTime, value: Item) -> Recorded<Item, Err> {
  Recorded { time, notification: Notification::Next(value) }
}

pub fn complete<Item, Err>(time: VirtualTime) -> Recorded<Item, Err> {
  Recorded { time, notification: Notification::Complete }
}

pub fn error<Item, Err>(time: VirtualTime, err: Err) -> Recorded<Item, Err> {
  Recorded { time, notification: Notification::Error(err) }
}

/// The `[subscribe, unsubscribe)` window of one subscription to a testable
/// observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionRecord {
  pub subscribe: VirtualTime,
  pub unsubscribe: VirtualTime,
}

pub fn subscription(
  subscribe: VirtualTime,
  unsubscribe: VirtualTime,
) -> SubscriptionRecord {
  SubscriptionRecord { subscribe, unsubscribe }
}

#[derive(Clone, Default)]
pub struct TestScheduler {
  inner: VirtualTimeScheduler,
}

impl TestScheduler {
  /// Tick at which [`start`](Self::start) calls the observable factory.
  pub const CREATED: VirtualTime = 100;
  /// Tick at which [`start`](Self::start) subscribes.
  pub const SUBSCRIBED: VirtualTime = 200;
  /// Tick at which [`start`](Self::start) disposes the subscription.
  pub const DISPOSED: VirtualTime = 1000;

  pub fn new() -> Self { Self::default() }

  pub fn advance_to(&self, due: VirtualTime) { self.inner.advance_to(due) }

  pub fn advance_by(&self, delta: VirtualTime) { self.inner.advance_by(delta) }

  pub fn run(&self) { self.inner.run() }

  pub fn create_observer<Item, Err>(&self) -> TestObserver<Item, Err> {
    TestObserver { scheduler: self.clone(), messages: MutRc::own(Vec::new()) }
  }

  /// An observable that plays `messages` at their absolute ticks whether or
  /// not anyone is subscribed. Subscribers share the one timeline.
  pub fn create_hot_observable<Item, Err>(
    &self,
    messages: Vec<Recorded<Item, Err>>,
  ) -> HotObservable<Item, Err>
  where
    Item: Clone + 'static,
    Err: Clone + 'static,
  {
    let core = MutRc::own(TestableCore::default());
    for message in messages {
      let core = core.clone();
      let notification = message.notification;
      self.schedule_absolute(
        message.time,
        Box::new(move || deliver_to_all(&core, notification)),
      );
    }
    HotObservable { scheduler: self.clone(), core }
  }

  /// An observable that plays `messages` at ticks relative to each
  /// subscription. Every subscriber gets its own playback.
  pub fn create_cold_observable<Item, Err>(
    &self,
    messages: Vec<Recorded<Item, Err>>,
  ) -> ColdObservable<Item, Err>
  where
    Item: Clone + 'static,
    Err: Clone + 'static,
  {
    ColdObservable {
      scheduler: self.clone(),
      messages: Rc::new(messages),
      subscriptions: MutRc::own(Vec::new()),
    }
  }

  /// Create at `created`, subscribe at `subscribed`, dispose at `disposed`,
  /// then run the clock dry and hand back the recorded timeline.
  pub fn start_at<O, F>(
    &self,
    created: VirtualTime,
    subscribed: VirtualTime,
    disposed: VirtualTime,
    create: F,
  ) -> TestObserver<O::Item, O::Err>
  where
    O: Observable + 'static,
    F: FnOnce() -> O + 'static,
  {
    let observer = self.create_observer::<O::Item, O::Err>();
    let source: MutRc<Option<O>> = MutRc::default();
    let subscription: MutRc<Option<MultiSubscription>> = MutRc::default();

    {
      let source = source.clone();
      self.schedule_absolute(
        created,
        Box::new(move || *source.rc_deref_mut() = Some(create())),
      );
    }
    {
      let subscription = subscription.clone();
      let observer = observer.clone();
      self.schedule_absolute(
        subscribed,
        Box::new(move || {
          if let Some(source) = source.rc_deref_mut().take() {
            *subscription.rc_deref_mut() =
              Some(source.subscribe_observer(observer));
          }
        }),
      );
    }
    self.schedule_absolute(
      disposed,
      Box::new(move || {
        if let Some(mut subscription) = subscription.rc_deref_mut().take() {
          subscription.unsubscribe();
        }
      }),
    );
    self.run();
    observer
  }

  pub fn start<O, F>(&self, create: F) -> TestObserver<O::Item, O::Err>
  where
    O: Observable + 'static,
    F: FnOnce() -> O + 'static,
  {
    self.start_at(Self::CREATED, Self::SUBSCRIBED, Self::DISPOSED, create)
  }
}

impl Scheduler for TestScheduler {
  fn now(&self) -> VirtualTime { self.inner.now() }

  fn schedule_relative(&self, delay: VirtualTime, action: Action) -> TaskHandle {
    let due = self.now() + delay;
    self.schedule_absolute(due, action)
  }

  /// Due ticks at or before the current clock land one tick in the future,
  /// never on the current tick: work scheduled while tick `t` executes must
  /// observe `t + 1`, or draining the queue would loop forever at `t`.
  fn schedule_absolute(&self, due: VirtualTime, action: Action) -> TaskHandle {
    let now = self.now();
    let due = if due <= now { now + 1 } else { due };
    self.inner.schedule_absolute(due, action)
  }
}

/// Records every notification it receives against the scheduler clock.
pub struct TestObserver<Item, Err> {
  scheduler: TestScheduler,
  messages: MutRc<Vec<Recorded<Item, Err>>>,
}

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self {
    Self { scheduler: self.scheduler.clone(), messages: self.messages.clone() }
  }
}

impl<Item, Err> TestObserver<Item, Err>
where
  Item: Clone,
  Err: Clone,
{
  pub fn messages(&self) -> Vec<Recorded<Item, Err>> {
    self.messages.rc_deref().clone()
  }
}

impl<Item, Err> Observer<Item, Err> for TestObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    self.messages.rc_deref_mut().push(next(self.scheduler.now(), value));
  }

  fn error(&mut self, err: Err) {
    self.messages.rc_deref_mut().push(error(self.scheduler.now(), err));
  }

  fn complete(&mut self) {
    self.messages.rc_deref_mut().push(complete(self.scheduler.now()));
  }
}

struct TestableCore<Item, Err> {
  observers: Vec<(usize, Option<BoxObserver<Item, Err>>)>,
  next_id: usize,
  subscriptions: Vec<SubscriptionRecord>,
}

impl<Item, Err> Default for TestableCore<Item, Err> {
  fn default() -> Self {
    Self { observers: Vec::new(), next_id: 0, subscriptions: Vec::new() }
  }
}

/// Deliver one notification to every currently attached observer, taking
/// each out of its slot for the call so delivery can re-enter the core
/// (an observer may unsubscribe itself or a sibling mid-notification).
fn deliver_to_all<Item: Clone, Err: Clone>(
  core: &MutRc<TestableCore<Item, Err>>,
  notification: Notification<Item, Err>,
) {
  let ids: Vec<usize> =
    core.rc_deref().observers.iter().map(|(id, _)| *id).collect();
  for id in ids {
    let taken = {
      let mut core = core.rc_deref_mut();
      core
        .observers
        .iter_mut()
        .find(|(i, _)| *i == id)
        .and_then(|(_, slot)| slot.take())
    };
    if let Some(mut observer) = taken {
      notification.clone().accept(&mut observer);
      let mut core = core.rc_deref_mut();
      // The entry is gone if the observer unsubscribed during delivery.
      if let Some((_, slot)) =
        core.observers.iter_mut().find(|(i, _)| *i == id)
      {
        *slot = Some(observer);
      }
    }
  }
}

pub struct HotObservable<Item, Err> {
  scheduler: TestScheduler,
  core: MutRc<TestableCore<Item, Err>>,
}

impl<Item, Err> Clone for HotObservable<Item, Err> {
  fn clone(&self) -> Self {
    Self { scheduler: self.scheduler.clone(), core: self.core.clone() }
  }
}

impl<Item, Err> HotObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
    self.core.rc_deref().subscriptions.clone()
  }
}

impl<Item, Err> Observable for HotObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let at = self.scheduler.now();
    let (id, index) = {
      let mut core = self.core.rc_deref_mut();
      let id = core.next_id;
      core.next_id += 1;
      core.observers.push((id, Some(observer)));
      core.subscriptions.push(subscription(at, INFINITE));
      (id, core.subscriptions.len() - 1)
    };
    let sub = MultiSubscription::default();
    let core = self.core;
    let scheduler = self.scheduler;
    sub.add(SingleSubscription::new(move || {
      let removed = {
        let mut core = core.rc_deref_mut();
        core.subscriptions[index].unsubscribe = scheduler.now();
        core
          .observers
          .iter()
          .position(|(i, _)| *i == id)
          .map(|at| core.observers.remove(at))
      };
      drop(removed);
    }));
    sub
  }
}

pub struct ColdObservable<Item, Err> {
  scheduler: TestScheduler,
  messages: Rc<Vec<Recorded<Item, Err>>>,
  subscriptions: MutRc<Vec<SubscriptionRecord>>,
}

impl<Item, Err> Clone for ColdObservable<Item, Err> {
  fn clone(&self) -> Self {
    Self {
      scheduler: self.scheduler.clone(),
      messages: self.messages.clone(),
      subscriptions: self.subscriptions.clone(),
    }
  }
}

impl<Item, Err> ColdObservable<Item, Err> {
  pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
    self.subscriptions.rc_deref().clone()
  }
}

impl<Item, Err> Observable for ColdObservable<Item, Err>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let at = self.scheduler.now();
    let index = {
      let mut records = self.subscriptions.rc_deref_mut();
      records.push(subscription(at, INFINITE));
      records.len() - 1
    };
    let slot = MutRc::own(Some(observer));
    let sub = MultiSubscription::default();
    for message in self.messages.iter() {
      let slot = slot.clone();
      let guard = sub.clone();
      let notification = message.notification.clone();
      let handle = self.scheduler.schedule_relative(
        message.time,
        Box::new(move || {
          if guard.is_closed() {
            return;
          }
          let taken = slot.rc_deref_mut().take();
          if let Some(mut observer) = taken {
            notification.accept(&mut observer);
            if !guard.is_closed() {
              *slot.rc_deref_mut() = Some(observer);
            }
          }
        }),
      );
      sub.add(handle);
    }
    let records = self.subscriptions;
    let scheduler = self.scheduler;
    sub.add(SingleSubscription::new(move || {
      let dropped = slot.rc_deref_mut().take();
      drop(dropped);
      records.rc_deref_mut()[index].unsubscribe = scheduler.now();
    }));
    sub
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn hot_plays_regardless_of_subscribers() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(150, 1),
      next(250, 2),
      complete::<i32, ()>(400),
    ]);
    let recorder = source.clone();
    let observed = scheduler.start(move || recorder);
    // The tick-150 value fired before the subscription at 200.
    assert_eq!(observed.messages(), vec![next(250, 2), complete(400)]);
    assert_eq!(source.subscriptions(), vec![subscription(200, 400)]);
  }

  #[test]
  fn cold_plays_relative_to_each_subscription() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_cold_observable(vec![
      next(150, 1),
      complete::<i32, ()>(300),
    ]);
    let recorder = source.clone();
    let observed = scheduler.start(move || recorder);
    assert_eq!(observed.messages(), vec![next(350, 1), complete(500)]);
    assert_eq!(source.subscriptions(), vec![subscription(200, 500)]);
  }

  #[test]
  fn dispose_tick_cuts_the_stream() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(300, 1),
      next(1200, 2),
      complete::<i32, ()>(1300),
    ]);
    let recorder = source.clone();
    let observed = scheduler.start(move || recorder);
    assert_eq!(observed.messages(), vec![next(300, 1)]);
    assert_eq!(
      source.subscriptions(),
      vec![subscription(200, TestScheduler::DISPOSED)]
    );
  }

  #[test]
  fn past_due_work_lands_one_tick_later() {
    let scheduler = TestScheduler::new();
    let seen = MutRc::own(Vec::new());
    let s = seen.clone();
    let inner = scheduler.clone();
    scheduler.schedule_absolute(
      10,
      Box::new(move || {
        let s = s.clone();
        let at = inner.clone();
        inner.schedule_absolute(
          5,
          Box::new(move || s.rc_deref_mut().push(at.now())),
        );
      }),
    );
    scheduler.run();
    assert_eq!(*seen.rc_deref(), vec![11]);
  }
}
