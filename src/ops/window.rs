use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  scheduler::{Scheduler, VirtualTime},
  subject::Subject,
  subscription::{MultiSubscription, SerialSubscription},
};

/// Splits the source into consecutive windows, each closed after `count`
/// values or `time_span` ticks, whichever comes first. The first window
/// opens at subscribe time, and closing one window immediately opens the
/// next. Terminals flow into the open window before the outer stream.
#[derive(Clone)]
pub struct WindowWithTimeOrCountOp<S, SD> {
  pub(crate) source: S,
  pub(crate) time_span: VirtualTime,
  pub(crate) count: usize,
  pub(crate) scheduler: SD,
}

struct WindowState<Item, Err> {
  current: Subject<Item, Err>,
  filled: usize,
}

fn rotate<Item, Err>(
  state: &MutRc<WindowState<Item, Err>>,
  shared: &mut SharedObserver<Subject<Item, Err>, Err>,
) where
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  let mut closing = {
    let mut state = state.rc_deref_mut();
    state.filled = 0;
    std::mem::replace(&mut state.current, Subject::new())
  };
  closing.complete();
  let opened = state.rc_deref().current.clone();
  shared.next(opened);
}

fn arm_timer<Item, Err, SD>(
  state: MutRc<WindowState<Item, Err>>,
  shared: SharedObserver<Subject<Item, Err>, Err>,
  timer: SerialSubscription,
  scheduler: SD,
  time_span: VirtualTime,
) where
  Item: Clone + 'static,
  Err: Clone + 'static,
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
        rotate(&state, &mut shared);
        arm_timer(state, shared, timer, scheduler_again, time_span);
      }),
    )
  };
  timer.set(handle);
}

impl<S, SD> Observable for WindowWithTimeOrCountOp<S, SD>
where
  S: Observable,
  S::Item: Clone,
  S::Err: Clone,
  SD: Scheduler + 'static,
{
  type Item = Subject<S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let mut shared = SharedObserver::new(observer);
    let state = MutRc::own(WindowState {
      current: Subject::new(),
      filled: 0,
    });
    let first = state.rc_deref().current.clone();
    shared.next(first);
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
    sub.add(self.source.actual_subscribe(Box::new(WindowObserver {
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

struct WindowObserver<Item, Err, SD> {
  shared: SharedObserver<Subject<Item, Err>, Err>,
  state: MutRc<WindowState<Item, Err>>,
  timer: SerialSubscription,
  scheduler: SD,
  time_span: VirtualTime,
  count: usize,
}

impl<Item, Err, SD> Observer<Item, Err> for WindowObserver<Item, Err, SD>
where
  Item: Clone + 'static,
  Err: Clone + 'static,
  SD: Scheduler + 'static,
{
  fn next(&mut self, value: Item) {
    let (mut window, full) = {
      let mut state = self.state.rc_deref_mut();
      state.filled += 1;
      (state.current.clone(), state.filled >= self.count)
    };
    window.next(value);
    if full {
      rotate(&self.state, &mut self.shared);
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
    let mut window = self.state.rc_deref().current.clone();
    window.error(err.clone());
    self.shared.error(err);
  }

  fn complete(&mut self) {
    let mut window = self.state.rc_deref().current.clone();
    window.complete();
    self.shared.complete();
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}
