//! Time as data: schedulers order actions on a virtual clock.
//!
//! Every time-based operator talks to a [`Scheduler`] instead of the wall
//! clock, so the same operator code runs identically under the deterministic
//! [`TestScheduler`](test_scheduler::TestScheduler).

use crate::{
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::SubscriptionLike,
};
use std::{cell::Cell, cmp::Ordering, collections::BinaryHeap, rc::Rc};

pub mod test_scheduler;

/// Integer tick count. All scheduling arithmetic is exact.
pub type VirtualTime = u64;

pub type Action = Box<dyn FnOnce()>;

pub trait Scheduler: Clone {
  fn now(&self) -> VirtualTime;

  /// Run `action` as soon as possible.
  fn schedule(&self, action: Action) -> TaskHandle {
    self.schedule_relative(0, action)
  }

  fn schedule_relative(&self, delay: VirtualTime, action: Action) -> TaskHandle;

  fn schedule_absolute(&self, due: VirtualTime, action: Action) -> TaskHandle;
}

/// Cancellation token for one scheduled action. Unsubscribing before the due
/// tick prevents the action from running; after it ran, unsubscribing is a
/// no-op.
#[derive(Clone, Default)]
pub struct TaskHandle {
  cancelled: Rc<Cell<bool>>,
}

impl TaskHandle {
  fn cancelled(&self) -> bool { self.cancelled.get() }
}

impl SubscriptionLike for TaskHandle {
  fn unsubscribe(&mut self) { self.cancelled.set(true); }

  fn is_closed(&self) -> bool { self.cancelled.get() }
}

struct ScheduledTask {
  due: VirtualTime,
  id: u64,
  handle: TaskHandle,
  action: Action,
}

// BinaryHeap is a max-heap; reversing the comparison yields earliest-due
// first, with insertion order breaking ties between equal due times.
impl Ord for ScheduledTask {
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.id.cmp(&self.id))
  }
}

impl PartialOrd for ScheduledTask {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for ScheduledTask {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.id == other.id
  }
}

impl Eq for ScheduledTask {}

#[derive(Default)]
struct VirtualCore {
  clock: VirtualTime,
  next_id: u64,
  queue: BinaryHeap<ScheduledTask>,
}

/// A scheduler whose clock only moves when told to. Scheduled actions run in
/// `(due, insertion order)` order while the clock is advanced, each seeing
/// `now()` equal to its own due tick.
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler {
  core: MutRc<VirtualCore>,
}

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// Run every due action, advancing the clock up to `due`.
  pub fn advance_to(&self, due: VirtualTime) {
    loop {
      // Pop one task per iteration and run it outside the borrow: actions
      // schedule further actions on this same scheduler.
      let task = {
        let mut core = self.core.rc_deref_mut();
        match core.queue.peek() {
          Some(head) if head.due <= due => core.queue.pop(),
          _ => None,
        }
      };
      let Some(task) = task else { break };
      if task.handle.cancelled() {
        continue;
      }
      {
        let mut core = self.core.rc_deref_mut();
        if task.due > core.clock {
          core.clock = task.due;
        }
      }
      (task.action)();
    }
    let mut core = self.core.rc_deref_mut();
    if due > core.clock {
      core.clock = due;
    }
  }

  pub fn advance_by(&self, delta: VirtualTime) {
    let due = self.now() + delta;
    self.advance_to(due);
  }

  /// Drain the queue completely, including actions scheduled while draining.
  pub fn run(&self) { self.advance_to(VirtualTime::MAX); }

  fn enqueue(&self, due: VirtualTime, action: Action) -> TaskHandle {
    let handle = TaskHandle::default();
    let mut core = self.core.rc_deref_mut();
    let id = core.next_id;
    core.next_id += 1;
    core.queue.push(ScheduledTask {
      due,
      id,
      handle: handle.clone(),
      action,
    });
    handle
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> VirtualTime { self.core.rc_deref().clock }

  fn schedule_relative(&self, delay: VirtualTime, action: Action) -> TaskHandle {
    let due = self.now() + delay;
    self.schedule_absolute(due, action)
  }

  fn schedule_absolute(&self, due: VirtualTime, action: Action) -> TaskHandle {
    self.enqueue(due, action)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{cell::RefCell, rc::Rc};

  #[test]
  fn runs_in_due_then_insertion_order() {
    let scheduler = VirtualTimeScheduler::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for (due, tag) in [(20, 'b'), (10, 'a'), (20, 'c')] {
      let order = order.clone();
      scheduler
        .schedule_absolute(due, Box::new(move || order.borrow_mut().push(tag)));
    }
    scheduler.run();
    assert_eq!(*order.borrow(), vec!['a', 'b', 'c']);
    assert_eq!(scheduler.now(), VirtualTime::MAX);
  }

  #[test]
  fn actions_see_their_own_due_tick() {
    let scheduler = VirtualTimeScheduler::new();
    let seen = Rc::new(Cell::new(0));
    let s = scheduler.clone();
    let at = seen.clone();
    scheduler.schedule_absolute(30, Box::new(move || at.set(s.now())));
    scheduler.advance_to(100);
    assert_eq!(seen.get(), 30);
    assert_eq!(scheduler.now(), 100);
  }

  #[test]
  fn recursive_scheduling_runs_in_the_same_drain() {
    let scheduler = VirtualTimeScheduler::new();
    let hits = Rc::new(Cell::new(0));
    let s = scheduler.clone();
    let h = hits.clone();
    scheduler.schedule_absolute(
      10,
      Box::new(move || {
        let h = h.clone();
        s.schedule_relative(5, Box::new(move || h.set(h.get() + 1)));
      }),
    );
    scheduler.advance_to(15);
    assert_eq!(hits.get(), 1);
  }

  #[test]
  fn cancelled_task_does_not_run() {
    let scheduler = VirtualTimeScheduler::new();
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    let mut handle =
      scheduler.schedule_absolute(10, Box::new(move || h.set(h.get() + 1)));
    handle.unsubscribe();
    scheduler.run();
    assert_eq!(hits.get(), 0);
    assert!(handle.is_closed());
  }

  #[test]
  fn advance_by_is_relative_to_now() {
    let scheduler = VirtualTimeScheduler::new();
    scheduler.advance_to(50);
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    scheduler.schedule_absolute(70, Box::new(move || h.set(h.get() + 1)));
    scheduler.advance_by(10);
    assert_eq!(hits.get(), 0);
    scheduler.advance_by(10);
    assert_eq!(hits.get(), 1);
  }
}
