use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  subscription::MultiSubscription,
};

/// Mirrors the source until the notifier produces anything: a notifier value
/// completes the stream, a notifier error fails it, and a notifier
/// `complete` is ignored (a notifier that never fires never cuts the
/// source off).
#[derive(Clone)]
pub struct TakeUntilOp<S, N> {
  pub(crate) source: S,
  pub(crate) notifier: N,
}

impl<S, N> Observable for TakeUntilOp<S, N>
where
  S: Observable,
  N: Observable<Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let sub = MultiSubscription::default();
    // Notifier first: a notifier that fires synchronously on subscribe must
    // preempt the source before the source emits anything.
    sub.add(self.notifier.actual_subscribe(Box::new(NotifierObserver {
      shared: shared.clone(),
    })));
    sub.add(
      self
        .source
        .actual_subscribe(Box::new(SourceObserver { shared })),
    );
    sub
  }
}

struct SourceObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
}

impl<Item, Err> Observer<Item, Err> for SourceObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.shared.next(value) }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) { self.shared.complete() }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct NotifierObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
}

impl<Item, Err, NItem> Observer<NItem, Err> for NotifierObserver<Item, Err> {
  fn next(&mut self, _: NItem) { self.shared.complete() }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  fn complete(&mut self) {}

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    scheduler::test_scheduler::{complete, next, subscription, TestScheduler},
  };

  #[test]
  fn notifier_value_preempts_the_source() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(210, 1),
      next(250, 2),
      next(310, 3),
      complete::<i32, ()>(400),
    ]);
    let notifier = scheduler
      .create_hot_observable(vec![next(270, 0), complete::<i32, ()>(280)]);
    let (s, n) = (source.clone(), notifier.clone());
    let observed = scheduler.start(move || s.take_until(n));
    assert_eq!(
      observed.messages(),
      vec![next(210, 1), next(250, 2), complete(270)]
    );
    // Both upstreams are severed at the preemption tick.
    assert_eq!(source.subscriptions(), vec![subscription(200, 270)]);
    assert_eq!(notifier.subscriptions(), vec![subscription(200, 270)]);
  }

  #[test]
  fn silent_notifier_leaves_the_source_alone() {
    let scheduler = TestScheduler::new();
    let source = scheduler.create_hot_observable(vec![
      next(210, 1),
      complete::<i32, ()>(300),
    ]);
    let notifier =
      scheduler.create_hot_observable(vec![complete::<i32, ()>(250)]);
    let (s, n) = (source.clone(), notifier.clone());
    let observed = scheduler.start(move || s.take_until(n));
    assert_eq!(observed.messages(), vec![next(210, 1), complete(300)]);
  }

  #[test]
  fn notifier_error_fails_the_stream() {
    let scheduler = TestScheduler::new();
    let source = scheduler
      .create_hot_observable(vec![next(210, 1), complete::<i32, &str>(400)]);
    let notifier = scheduler
      .create_hot_observable(vec![crate::scheduler::test_scheduler::error::<
        i32,
        &str,
      >(260, "boom")]);
    let (s, n) = (source.clone(), notifier.clone());
    let observed = scheduler.start(move || s.take_until(n));
    assert_eq!(
      observed.messages(),
      vec![
        next(210, 1),
        crate::scheduler::test_scheduler::error(260, "boom")
      ]
    );
  }
}
