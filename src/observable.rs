//! The producer side of a stream.

use std::marker::PhantomData;

use crate::{
  backpressure::{ControlledObservable, PausableBufferedOp},
  observer::{AutoDetachObserver, BoxObserver, FnObserver, Observer},
  ops::{
    amb::AmbOp, box_it::BoxObservable, buffer::BufferWithTimeOrCountOp,
    combine_latest::CombineLatestOp, delay::DelayWithSelectorOp,
    distinct::DistinctOp, element_at::{ElementAtOp, ElementAtOrDefaultOp},
    filter::FilterOp, filter_map::FilterMapOp, first::{FirstOp, FirstOrOp},
    group_by::GroupByOp, join::JoinOp, last::{LastOp, LastOrOp}, map::MapOp,
    merge::MergeOp, merge_all::MergeAllOp, repeat::RepeatOp, scan::ScanOp,
    skip::SkipOp, skip_until::SkipUntilOp, switch_on_next::SwitchOnNextOp,
    take::TakeOp, take_until::TakeUntilOp, tap::TapOp,
    throttle::ThrottleWithSelectorOp, timeout::TimeoutWithMapperOp,
    window::WindowWithTimeOrCountOp, zip::ZipOp, AverageOp, CountOp,
    MinMaxOp, ReduceOp, SumOp,
  },
  rc::{MutRc, RcDerefMut},
  scheduler::{Scheduler, VirtualTime},
  subscription::MultiSubscription,
};

pub mod create;
pub mod defer;
pub mod from_iter;
pub mod trivial;

pub use create::{create, ObservableFn};
pub use defer::{defer, DeferObservable};
pub use from_iter::{from_iter, of, IterObservable};
pub use trivial::{empty, never, throw, EmptyObservable, NeverObservable, ThrowObservable};

/// A push-based stream of `Item` values ending in at most one terminal.
///
/// `actual_subscribe` consumes the observable: operator chains are plain
/// value compositions, and subscribing a chain twice means cloning it first.
/// The observer arrives boxed so implementors stay object-friendly; the
/// returned [`MultiSubscription`] severs everything the chain set up.
pub trait Observable: Sized {
  type Item: 'static;
  type Err: 'static;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription;
}

impl<T: Observable> ObservableExt for T {}

pub trait ObservableExt: Observable {
  /// Subscribe with a full observer. The observer is wrapped so the
  /// termination grammar holds and the upstream subscription is released on
  /// the terminal notification.
  fn subscribe_observer<O>(self, observer: O) -> MultiSubscription
  where
    O: Observer<Self::Item, Self::Err> + 'static,
  {
    let auto = MutRc::own(AutoDetachObserver::new(observer));
    let subscription = self.actual_subscribe(Box::new(auto.clone()));
    // Attaching after subscribe handles synchronous sources: if the stream
    // already terminated, the attachment slot is closed and unsubscribes the
    // incoming subscription on the spot.
    auto.rc_deref_mut().attach(subscription.clone());
    subscription
  }

  fn subscribe<N>(self, next: N) -> MultiSubscription
  where
    N: FnMut(Self::Item) + 'static,
  {
    self.subscribe_observer(FnObserver::new(
      next,
      None::<fn(Self::Err)>,
      None::<fn()>,
    ))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> MultiSubscription
  where
    N: FnMut(Self::Item) + 'static,
    E: FnOnce(Self::Err) + 'static,
  {
    self.subscribe_observer(FnObserver::new(next, Some(error), None::<fn()>))
  }

  fn subscribe_complete<N, C>(self, next: N, complete: C) -> MultiSubscription
  where
    N: FnMut(Self::Item) + 'static,
    C: FnOnce() + 'static,
  {
    self.subscribe_observer(FnObserver::new(next, None::<fn(Self::Err)>, Some(complete)))
  }

  fn subscribe_all<N, E, C>(
    self,
    next: N,
    error: E,
    complete: C,
  ) -> MultiSubscription
  where
    N: FnMut(Self::Item) + 'static,
    E: FnOnce(Self::Err) + 'static,
    C: FnOnce() + 'static,
  {
    self.subscribe_observer(FnObserver::new(next, Some(error), Some(complete)))
  }

  fn map<F, B>(self, func: F) -> MapOp<Self, F>
  where
    F: FnMut(Self::Item) -> B,
  {
    MapOp { source: self, func }
  }

  fn filter<F>(self, pred: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Self::Item) -> bool,
  {
    FilterOp { source: self, pred }
  }

  /// `map` and `filter` in one pass: `None` drops the value.
  fn filter_map<F, B>(self, func: F) -> FilterMapOp<Self, F, B>
  where
    F: FnMut(Self::Item) -> Option<B>,
  {
    FilterMapOp { source: self, func, _marker: PhantomData }
  }

  fn scan_initial<F, Acc>(self, initial: Acc, func: F) -> ScanOp<Self, F, Acc>
  where
    F: FnMut(Acc, Self::Item) -> Acc,
  {
    ScanOp { source: self, func, initial }
  }

  fn scan<F, Acc>(self, func: F) -> ScanOp<Self, F, Acc>
  where
    F: FnMut(Acc, Self::Item) -> Acc,
    Acc: Default,
  {
    self.scan_initial(Acc::default(), func)
  }

  /// Fold the whole stream, emitting only the final accumulator. An empty
  /// source emits `initial`.
  fn reduce_initial<F, Acc>(
    self,
    initial: Acc,
    func: F,
  ) -> ReduceOp<Self, F, Acc>
  where
    F: FnMut(Acc, Self::Item) -> Acc,
    Acc: Clone,
  {
    LastOrOp {
      source: ScanOp { source: self, func, initial: initial.clone() },
      default: initial,
    }
  }

  fn reduce<F, Acc>(self, func: F) -> ReduceOp<Self, F, Acc>
  where
    F: FnMut(Acc, Self::Item) -> Acc,
    Acc: Default + Clone,
  {
    self.reduce_initial(Acc::default(), func)
  }

  fn sum(self) -> SumOp<Self, Self::Item>
  where
    Self::Item: std::ops::Add<Output = Self::Item> + Default + Clone,
  {
    let add: fn(Self::Item, Self::Item) -> Self::Item = |acc, v| acc + v;
    self.reduce_initial(Default::default(), add)
  }

  fn count(self) -> CountOp<Self, Self::Item> {
    let tally: fn(usize, Self::Item) -> usize = |acc, _| acc + 1;
    self.reduce_initial(0, tally)
  }

  /// Smallest value of the stream; completes empty when the source does.
  fn min(self) -> MinMaxOp<Self, Self::Item>
  where
    Self::Item: PartialOrd + Clone,
  {
    let pick: fn(Option<Self::Item>, Self::Item) -> Option<Self::Item> =
      |acc, v| match acc {
        Some(best) if best <= v => Some(best),
        _ => Some(v),
      };
    let keep: fn(Option<Self::Item>) -> Option<Self::Item> = |best| best;
    self.reduce_initial(None, pick).filter_map(keep)
  }

  fn max(self) -> MinMaxOp<Self, Self::Item>
  where
    Self::Item: PartialOrd + Clone,
  {
    let pick: fn(Option<Self::Item>, Self::Item) -> Option<Self::Item> =
      |acc, v| match acc {
        Some(best) if best >= v => Some(best),
        _ => Some(v),
      };
    let keep: fn(Option<Self::Item>) -> Option<Self::Item> = |best| best;
    self.reduce_initial(None, pick).filter_map(keep)
  }

  fn average(self) -> AverageOp<Self, Self::Item>
  where
    Self::Item: Into<f64>,
  {
    let widen: fn(Self::Item) -> f64 = |v| v.into();
    let accumulate: fn((f64, usize), f64) -> (f64, usize) =
      |(sum, n), v| (sum + v, n + 1);
    let divide: fn((f64, usize)) -> Option<f64> =
      |(sum, n)| if n == 0 { None } else { Some(sum / n as f64) };
    self
      .map(widen)
      .reduce_initial((0.0, 0), accumulate)
      .filter_map(divide)
  }

  fn first(self) -> FirstOp<Self> { FirstOp { source: self } }

  fn first_or(self, default: Self::Item) -> FirstOrOp<Self, Self::Item> {
    FirstOrOp { source: self, default }
  }

  fn last(self) -> LastOp<Self> { LastOp { source: self } }

  fn last_or(self, default: Self::Item) -> LastOrOp<Self, Self::Item> {
    LastOrOp { source: self, default }
  }

  fn take(self, count: usize) -> TakeOp<Self> {
    TakeOp { source: self, count }
  }

  fn skip(self, count: usize) -> SkipOp<Self> {
    SkipOp { source: self, count }
  }

  fn element_at(self, index: usize) -> ElementAtOp<Self> {
    ElementAtOp { source: self, index }
  }

  fn element_at_or_default(
    self,
    index: usize,
    default: Self::Item,
  ) -> ElementAtOrDefaultOp<Self, Self::Item> {
    ElementAtOrDefaultOp { source: self, index, default }
  }

  fn distinct(self) -> DistinctOp<Self> { DistinctOp { source: self } }

  fn tap<F>(self, func: F) -> TapOp<Self, F>
  where
    F: FnMut(&Self::Item),
  {
    TapOp { source: self, func }
  }

  /// Resubscribe the source `count` times in sequence. `repeat(0)` is
  /// `empty()`.
  fn repeat(self, count: usize) -> RepeatOp<Self>
  where
    Self: Clone,
  {
    RepeatOp { source: self, count }
  }

  fn box_it(self) -> BoxObservable<Self::Item, Self::Err>
  where
    Self: 'static,
  {
    BoxObservable::new(self)
  }

  /// Mirror the source until `notifier` produces anything.
  fn take_until<N>(self, notifier: N) -> TakeUntilOp<Self, N>
  where
    N: Observable<Err = Self::Err>,
  {
    TakeUntilOp { source: self, notifier }
  }

  /// Swallow values until `notifier` produces its first one.
  fn skip_until<N>(self, notifier: N) -> SkipUntilOp<Self, N>
  where
    N: Observable<Err = Self::Err>,
  {
    SkipUntilOp { source: self, notifier }
  }

  /// Race two sources; the first to notify wins and the loser is dropped.
  fn amb<B>(self, right: B) -> AmbOp<Self, B>
  where
    B: Observable<Item = Self::Item, Err = Self::Err>,
  {
    AmbOp { left: self, right }
  }

  fn merge<B>(self, right: B) -> MergeOp<Self, B>
  where
    B: Observable<Item = Self::Item, Err = Self::Err>,
  {
    MergeOp { left: self, right }
  }

  /// Flatten a stream of streams, running at most `concurrent` inner
  /// subscriptions at once; the rest wait in arrival order.
  /// `merge_all(1)` is sequential concatenation.
  fn merge_all(self, concurrent: usize) -> MergeAllOp<Self> {
    MergeAllOp { source: self, concurrent }
  }

  fn switch_on_next(self) -> SwitchOnNextOp<Self> {
    SwitchOnNextOp { source: self }
  }

  fn combine_latest<B, F, Out>(
    self,
    right: B,
    binary_op: F,
  ) -> CombineLatestOp<Self, B, F>
  where
    B: Observable<Err = Self::Err>,
    F: FnMut(Self::Item, B::Item) -> Out,
  {
    CombineLatestOp { left: self, right, binary_op }
  }

  fn zip<B>(self, right: B) -> ZipOp<Self, B>
  where
    B: Observable<Err = Self::Err>,
  {
    ZipOp { left: self, right }
  }

  fn join<B, FL, FR, F, DL, DR, Out>(
    self,
    right: B,
    left_duration: FL,
    right_duration: FR,
    result_selector: F,
  ) -> JoinOp<Self, B, FL, FR, F>
  where
    B: Observable<Err = Self::Err>,
    FL: FnMut(&Self::Item) -> DL,
    FR: FnMut(&B::Item) -> DR,
    DL: Observable<Err = Self::Err>,
    DR: Observable<Err = Self::Err>,
    F: FnMut(Self::Item, B::Item) -> Out,
  {
    JoinOp {
      left: self,
      right,
      left_duration,
      right_duration,
      result_selector,
    }
  }

  fn group_by<KeySelector, Key>(
    self,
    key_selector: KeySelector,
  ) -> GroupByOp<Self, KeySelector>
  where
    KeySelector: FnMut(&Self::Item) -> Key,
  {
    GroupByOp { source: self, key_selector }
  }

  fn buffer_with_time_or_count<SD>(
    self,
    time_span: VirtualTime,
    count: usize,
    scheduler: SD,
  ) -> BufferWithTimeOrCountOp<Self, SD>
  where
    SD: Scheduler,
  {
    BufferWithTimeOrCountOp { source: self, time_span, count, scheduler }
  }

  fn window_with_time_or_count<SD>(
    self,
    time_span: VirtualTime,
    count: usize,
    scheduler: SD,
  ) -> WindowWithTimeOrCountOp<Self, SD>
  where
    SD: Scheduler,
  {
    WindowWithTimeOrCountOp { source: self, time_span, count, scheduler }
  }

  fn throttle_with_selector<F, D>(
    self,
    duration_selector: F,
  ) -> ThrottleWithSelectorOp<Self, F>
  where
    F: FnMut(&Self::Item) -> D,
    D: Observable<Err = Self::Err>,
  {
    ThrottleWithSelectorOp { source: self, duration_selector }
  }

  fn delay_with_selector<F, D>(
    self,
    delay_selector: F,
  ) -> DelayWithSelectorOp<Self, F>
  where
    F: FnMut(&Self::Item) -> D,
    D: Observable<Err = Self::Err>,
  {
    DelayWithSelectorOp { source: self, delay_selector }
  }

  fn timeout_with_mapper<F, D>(
    self,
    timeout_selector: F,
  ) -> TimeoutWithMapperOp<Self, D, F>
  where
    F: FnMut(&Self::Item) -> D,
    D: Observable<Err = Self::Err>,
  {
    TimeoutWithMapperOp { source: self, first_timeout: None, timeout_selector }
  }

  fn timeout_with_first<First, F, D>(
    self,
    first_timeout: First,
    timeout_selector: F,
  ) -> TimeoutWithMapperOp<Self, First, F>
  where
    First: Observable<Err = Self::Err>,
    F: FnMut(&Self::Item) -> D,
    D: Observable<Err = Self::Err>,
  {
    TimeoutWithMapperOp {
      source: self,
      first_timeout: Some(first_timeout),
      timeout_selector,
    }
  }

  /// Put a request valve between this source and its consumer.
  fn controlled(self) -> ControlledObservable<Self> {
    ControlledObservable::new(self)
  }

  /// Gate the stream on `pauser`, buffering while the gate is shut.
  fn pausable_buffered<P>(self, pauser: P) -> PausableBufferedOp<Self, P>
  where
    P: Observable<Item = bool, Err = Self::Err>,
  {
    PausableBufferedOp { source: self, pauser }
  }
}
