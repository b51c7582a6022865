use crate::{
  notification::Notification,
  observable::Observable,
  observer::{BoxObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
  scheduler::{Scheduler, VirtualTime},
  subject::SubjectState,
  subscription::{MultiSubscription, SingleSubscription},
};
use std::collections::VecDeque;

struct ScheduledCore<Item, Err> {
  queue: VecDeque<Notification<Item, Err>>,
  observer: Option<BoxObserver<Item, Err>>,
  draining: bool,
}

/// Decouples delivery from the call that produced the notification: events
/// are queued and drained one per scheduled action, so a burst pushed at
/// tick `t` reaches the subscriber at `t + 1`, `t + 2`, ...
///
/// This is what keeps a replayed backlog ordered with respect to live
/// values that arrive while the backlog is still draining.
pub struct ScheduledObserver<Item, Err, S> {
  core: MutRc<ScheduledCore<Item, Err>>,
  scheduler: S,
}

impl<Item, Err, S: Clone> Clone for ScheduledObserver<Item, Err, S> {
  fn clone(&self) -> Self {
    Self { core: self.core.clone(), scheduler: self.scheduler.clone() }
  }
}

impl<Item, Err, S> ScheduledObserver<Item, Err, S>
where
  Item: 'static,
  Err: 'static,
  S: Scheduler + 'static,
{
  pub fn new(observer: BoxObserver<Item, Err>, scheduler: S) -> Self {
    Self {
      core: MutRc::own(ScheduledCore {
        queue: VecDeque::new(),
        observer: Some(observer),
        draining: false,
      }),
      scheduler,
    }
  }

  fn enqueue(&self, notification: Notification<Item, Err>) {
    {
      let mut core = self.core.rc_deref_mut();
      if core.observer.is_none() {
        return;
      }
      core.queue.push_back(notification);
    }
    self.ensure_active();
  }

  fn ensure_active(&self) {
    {
      let mut core = self.core.rc_deref_mut();
      if core.draining || core.queue.is_empty() {
        return;
      }
      core.draining = true;
    }
    schedule_drain(&self.core, &self.scheduler);
  }

  /// Drop the pending queue and the wrapped observer. Nothing queued will
  /// be delivered after this.
  fn shutdown(&self) {
    let dropped = {
      let mut core = self.core.rc_deref_mut();
      core.queue.clear();
      core.observer.take()
    };
    drop(dropped);
  }
}

impl<Item, Err, S> Observer<Item, Err> for ScheduledObserver<Item, Err, S>
where
  Item: 'static,
  Err: 'static,
  S: Scheduler + 'static,
{
  fn next(&mut self, value: Item) { self.enqueue(Notification::Next(value)) }

  fn error(&mut self, err: Err) { self.enqueue(Notification::Error(err)) }

  fn complete(&mut self) { self.enqueue(Notification::Complete) }

  fn is_closed(&self) -> bool { self.core.rc_deref().observer.is_none() }
}

fn schedule_drain<Item, Err, S>(
  core: &MutRc<ScheduledCore<Item, Err>>,
  scheduler: &S,
) where
  Item: 'static,
  Err: 'static,
  S: Scheduler + 'static,
{
  let core = core.clone();
  let chain = scheduler.clone();
  scheduler.schedule(Box::new(move || {
    let head = core.rc_deref_mut().queue.pop_front();
    let Some(notification) = head else {
      core.rc_deref_mut().draining = false;
      return;
    };
    let taken = core.rc_deref_mut().observer.take();
    if let Some(mut observer) = taken {
      let terminal = notification.is_terminal();
      notification.accept(&mut observer);
      if !terminal {
        let mut inner = core.rc_deref_mut();
        if inner.observer.is_none() {
          inner.observer = Some(observer);
        }
      }
    }
    if core.rc_deref().queue.is_empty() {
      core.rc_deref_mut().draining = false;
    } else {
      schedule_drain(&core, &chain);
    }
  }));
}

struct ReplayCore<Item, Err, S> {
  buffer: VecDeque<(VirtualTime, Item)>,
  subscribers: Vec<(usize, ScheduledObserver<Item, Err, S>)>,
  next_id: usize,
  state: SubjectState<Err>,
}

/// A subject that hands every new subscriber the tail of what it already
/// emitted: at most `buffer_size` values, each no more than `window` ticks
/// old at replay time. Values exactly `window` ticks old still qualify.
pub struct ReplaySubject<Item, Err, S> {
  core: MutRc<ReplayCore<Item, Err, S>>,
  scheduler: S,
  buffer_size: usize,
  window: VirtualTime,
}

impl<Item, Err, S: Clone> Clone for ReplaySubject<Item, Err, S> {
  fn clone(&self) -> Self {
    Self {
      core: self.core.clone(),
      scheduler: self.scheduler.clone(),
      buffer_size: self.buffer_size,
      window: self.window,
    }
  }
}

impl<Item, Err, S> ReplaySubject<Item, Err, S>
where
  S: Scheduler,
{
  pub fn new(buffer_size: usize, window: VirtualTime, scheduler: S) -> Self {
    Self {
      core: MutRc::own(ReplayCore {
        buffer: VecDeque::new(),
        subscribers: Vec::new(),
        next_id: 0,
        state: SubjectState::Active,
      }),
      scheduler,
      buffer_size,
      window,
    }
  }

  /// Count-bounded only.
  pub fn with_buffer(buffer_size: usize, scheduler: S) -> Self {
    Self::new(buffer_size, VirtualTime::MAX, scheduler)
  }

  /// Unbounded replay of everything ever emitted.
  pub fn unbounded(scheduler: S) -> Self {
    Self::new(usize::MAX, VirtualTime::MAX, scheduler)
  }

  /// Tear the subject down: the buffer is dropped and nothing still queued
  /// for replay will be delivered. Any use afterwards (including
  /// subscribing) panics.
  pub fn dispose(&mut self)
  where
    Item: 'static,
    Err: 'static,
    S: Scheduler + 'static,
  {
    let dropped = {
      let mut core = self.core.rc_deref_mut();
      core.state = SubjectState::Disposed;
      core.buffer.clear();
      std::mem::take(&mut core.subscribers)
    };
    for (_, target) in dropped {
      target.shutdown();
    }
  }

  fn trim(&self, buffer: &mut VecDeque<(VirtualTime, Item)>, now: VirtualTime) {
    while buffer.len() > self.buffer_size {
      buffer.pop_front();
    }
    while buffer.front().map_or(false, |(stamp, _)| now - *stamp > self.window) {
      buffer.pop_front();
    }
  }
}

impl<Item, Err, S> Observer<Item, Err> for ReplaySubject<Item, Err, S>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
  S: Scheduler + 'static,
{
  fn next(&mut self, value: Item) {
    let targets: Vec<ScheduledObserver<Item, Err, S>> = {
      let mut core = self.core.rc_deref_mut();
      core.state.assert_not_disposed();
      if !core.state.is_active() {
        return;
      }
      let now = self.scheduler.now();
      core.buffer.push_back((now, value.clone()));
      self.trim(&mut core.buffer, now);
      core.subscribers.iter().map(|(_, so)| so.clone()).collect()
    };
    for mut target in targets {
      target.next(value.clone());
    }
  }

  fn error(&mut self, err: Err) {
    let targets = {
      let mut core = self.core.rc_deref_mut();
      core.state.assert_not_disposed();
      if !core.state.is_active() {
        return;
      }
      core.state = SubjectState::Errored(err.clone());
      std::mem::take(&mut core.subscribers)
    };
    for (_, mut target) in targets {
      target.error(err.clone());
    }
  }

  fn complete(&mut self) {
    let targets = {
      let mut core = self.core.rc_deref_mut();
      core.state.assert_not_disposed();
      if !core.state.is_active() {
        return;
      }
      core.state = SubjectState::Completed;
      std::mem::take(&mut core.subscribers)
    };
    for (_, mut target) in targets {
      target.complete();
    }
  }

  fn is_closed(&self) -> bool { !self.core.rc_deref().state.is_active() }
}

impl<Item, Err, S> Observable for ReplaySubject<Item, Err, S>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
  S: Scheduler + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let mut target = ScheduledObserver::new(observer, self.scheduler.clone());
    let now = self.scheduler.now();
    let (backlog, outcome) = {
      let mut core = self.core.rc_deref_mut();
      core.state.assert_not_disposed();
      self.trim(&mut core.buffer, now);
      let backlog: Vec<Item> =
        core.buffer.iter().map(|(_, v)| v.clone()).collect();
      let outcome = match &core.state {
        SubjectState::Errored(err) => Some(Some(err.clone())),
        SubjectState::Completed => Some(None),
        _ => None,
      };
      (backlog, outcome)
    };
    for value in backlog {
      target.next(value);
    }
    let sub = MultiSubscription::default();
    match outcome {
      Some(Some(err)) => target.error(err),
      Some(None) => target.complete(),
      None => {
        let id = {
          let mut core = self.core.rc_deref_mut();
          let id = core.next_id;
          core.next_id += 1;
          core.subscribers.push((id, target.clone()));
          id
        };
        let core = self.core;
        let detach = target.clone();
        sub.add(SingleSubscription::new(move || {
          let removed = {
            let mut core = core.rc_deref_mut();
            core
              .subscribers
              .iter()
              .position(|(i, _)| *i == id)
              .map(|at| core.subscribers.remove(at))
          };
          drop(removed);
          detach.shutdown();
        }));
        return sub;
      }
    }
    // Terminated source: disposing only cancels the queued replay.
    sub.add(SingleSubscription::new(move || target.shutdown()));
    sub
  }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{next, TestScheduler},
  };

  #[test]
  fn replays_survivors_one_tick_apart() {
    let scheduler = TestScheduler::new();
    let subject = ReplaySubject::<i32, (), _>::new(3, 100, scheduler.clone());
    for (at, value) in [(100, 1), (200, 2), (250, 3)] {
      let mut feed = subject.clone();
      scheduler.schedule_absolute(at, Box::new(move || feed.next(value)));
    }
    let observed = scheduler.create_observer::<i32, ()>();
    {
      let subject = subject.clone();
      let observed = observed.clone();
      scheduler.schedule_absolute(
        320,
        Box::new(move || {
          subject.subscribe_observer(observed);
        }),
      );
    }
    {
      let mut feed = subject;
      scheduler.schedule_absolute(400, Box::new(move || feed.next(4)));
    }
    scheduler.run();
    // Tick 200 is 120 ticks old at subscribe; only the 250 value survives.
    assert_eq!(observed.messages(), vec![next(321, 3), next(401, 4)]);
  }

  #[test]
  fn count_bound_keeps_the_tail() {
    let scheduler = TestScheduler::new();
    let subject = ReplaySubject::<i32, (), _>::with_buffer(2, scheduler.clone());
    for (at, value) in [(10, 1), (20, 2), (30, 3)] {
      let mut feed = subject.clone();
      scheduler.schedule_absolute(at, Box::new(move || feed.next(value)));
    }
    let observed = scheduler.create_observer::<i32, ()>();
    {
      let observed = observed.clone();
      scheduler.schedule_absolute(
        50,
        Box::new(move || {
          subject.subscribe_observer(observed);
        }),
      );
    }
    scheduler.run();
    assert_eq!(observed.messages(), vec![next(51, 2), next(52, 3)]);
  }

  #[test]
  fn late_subscriber_gets_replay_then_terminal() {
    let scheduler = TestScheduler::new();
    let mut subject =
      ReplaySubject::<i32, (), _>::with_buffer(5, scheduler.clone());
    subject.next(7);
    subject.complete();
    let observed = scheduler.create_observer::<i32, ()>();
    subject.clone().subscribe_observer(observed.clone());
    scheduler.run();
    use crate::scheduler::test_scheduler::complete;
    assert_eq!(observed.messages(), vec![next(1, 7), complete(2)]);
  }

  #[test]
  #[should_panic(expected = "dispose")]
  fn next_after_dispose_panics() {
    let scheduler = TestScheduler::new();
    let mut subject = ReplaySubject::<i32, (), _>::unbounded(scheduler);
    subject.next(1);
    subject.dispose();
    subject.next(2);
  }
}
