use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDerefMut},
  scheduler::{Scheduler, VirtualTime},
  subscription::{MultiSubscription, SerialSubscription},
};

/// Collects values into a `Vec` that is emitted whenever it reaches `count`
/// elements or `time_span` ticks elapse, whichever comes first. Either kind
/// of flush restarts the clock. Timer flushes emit empty buffers too, and
/// completion flushes whatever is pending before the terminal.
#[derive(Clone)]
pub struct BufferWithTimeOrCountOp<S, SD> {
  pub(crate) source: S,
  pub(crate) time_span: VirtualTime,
  pub(crate) count: usize,
  pub(crate) scheduler: SD,
}

fn arm_timer<Item, Err, SD>(
  state: MutRc<Vec<Item>>,
  shared: SharedObserver<Vec<Item>, Err>,
  timer: SerialSubscription,
  scheduler: SD,
  time_span: VirtualTime,
) where
  Item: 'static,
  Err: 'static,
  SD: Scheduler + 'static,
{
  let handle = {
    let state = state.clone();
    let mut shared = shared.clone();
    let timer = timer.clone();
    let scheduler_again = scheduler.clone();
    scheduler.schedule_relative(
      time_span,
      Box::new(move || {
        let out = std::mem::take(&mut *state.rc_deref_mut());
        shared.next(out);
        arm_timer(state, shared, timer, scheduler_again, time_span);
      }),
    )
  };
  timer.set(handle);
}

impl<S, SD> Observable for BufferWithTimeOrCountOp<S, SD>
where
  S: Observable,
  SD: Scheduler + 'static,
{
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(Vec::new());
    let timer = SerialSubscription::default();
    arm_timer(
      state.clone(),
      shared.clone(),
      timer.clone(),
      self.scheduler.clone(),
      self.time_span,
    );
    let sub = MultiSubscription::default();
    sub.add(timer.clone());
    sub.add(self.source.actual_subscribe(Box::new(BufferObserver {
      shared,
      state,
      timer,
      scheduler: self.scheduler,
      time_span: self.time_span,
      count: self.count.max(1),
    })));
    sub
  }
}

struct BufferObserver<Item, Err, SD> {
  shared: SharedObserver<Vec<Item>, Err>,
  state: MutRc<Vec<Item>>,
  timer: SerialSubscription,
  scheduler: SD,
  time_span: VirtualTime,
  count: usize,
}

impl<Item, Err, SD> Observer<Item, Err> for BufferObserver<Item, Err, SD>
where
  Item: 'static,
  Err: 'static,
  SD: Scheduler + 'static,
{
  fn next(&mut self, value: Item) {
    let full = {
      let mut buffer = self.state.rc_deref_mut();
      buffer.push(value);
      buffer.len() >= self.count
    };
    if full {
      let out = std::mem::take(&mut *self.state.rc_deref_mut());
      self.shared.next(out);
      arm_timer(
        self.state.clone(),
        self.shared.clone(),
        self.timer.clone(),
        self.scheduler.clone(),
        self.time_span,
      );
    }
  }

  fn error(&mut self, err: Err) {
    self.state.rc_deref_mut().clear();
    self.shared.error(err);
  }

  fn complete(&mut self) {
    let out = std::mem::take(&mut *self.state.rc_deref_mut());
    self.shared.next(out);
    self.shared.complete();
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, error, next, TestScheduler},
  };

  #[test]
  fn flushes_on_count_or_elapsed_span() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(205, 1),
      next(210, 2),
      next(240, 3),
      next(280, 4),
      next(320, 5),
      next(350, 6),
      next(370, 7),
      next(420, 8),
      next(470, 9),
      complete::<i32, ()>(600),
    ]);
    let clock = scheduler.clone();
    let src = source.clone();
    let observed = scheduler
      .start(move || src.buffer_with_time_or_count(70, 3, clock));
    assert_eq!(
      observed.messages(),
      vec![
        next(240, vec![1, 2, 3]),
        next(310, vec![4]),
        next(370, vec![5, 6, 7]),
        next(440, vec![8]),
        next(510, vec![9]),
        next(580, vec![]),
        next(600, vec![]),
        complete(600),
      ]
    );
  }

  #[test]
  fn error_discards_the_pending_buffer() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(210, 1),
      error::<i32, &str>(230, "boom"),
    ]);
    let clock = scheduler.clone();
    let src = source.clone();
    let observed = scheduler
      .start(move || src.buffer_with_time_or_count(100, 10, clock));
    assert_eq!(observed.messages(), vec![error(230, "boom")]);
  }
}
