use std::collections::VecDeque;

use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  rc::{MutRc, RcDeref, RcDerefMut},
  subscription::MultiSubscription,
};

/// Gates the source on a boolean side channel. `true` from the pauser
/// opens the gate and flushes everything buffered while it was shut;
/// `false` shuts it again. The gate starts shut, so values buffer until
/// the pauser first opens it. Source terminals flush the buffer and pass
/// regardless of the gate.
#[derive(Clone)]
pub struct PausableBufferedOp<S, P> {
  pub(crate) source: S,
  pub(crate) pauser: P,
}

struct GateState<Item> {
  flowing: bool,
  buffer: VecDeque<Item>,
}

fn flush<Item, Err>(
  state: &MutRc<GateState<Item>>,
  shared: &mut SharedObserver<Item, Err>,
) {
  loop {
    let value = state.rc_deref_mut().buffer.pop_front();
    match value {
      Some(value) => shared.next(value),
      None => break,
    }
  }
}

impl<S, P> Observable for PausableBufferedOp<S, P>
where
  S: Observable,
  P: Observable<Item = bool, Err = S::Err>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    let shared = SharedObserver::new(observer);
    let state = MutRc::own(GateState { flowing: false, buffer: VecDeque::new() });
    let sub = MultiSubscription::default();
    sub.add(self.pauser.actual_subscribe(Box::new(GateObserver {
      shared: shared.clone(),
      state: state.clone(),
    })));
    sub.add(
      self
        .source
        .actual_subscribe(Box::new(GatedSourceObserver { shared, state })),
    );
    sub
  }
}

struct GateObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<GateState<Item>>,
}

impl<Item, Err> Observer<bool, Err> for GateObserver<Item, Err>
where
  Item: 'static,
{
  fn next(&mut self, open: bool) {
    let opened = {
      let mut state = self.state.rc_deref_mut();
      let opened = open && !state.flowing;
      state.flowing = open;
      opened
    };
    if opened {
      flush(&self.state, &mut self.shared);
    }
  }

  fn error(&mut self, err: Err) { self.shared.error(err) }

  // A finished pauser can never reopen the gate; the stream stays in
  // whatever state it was left in.
  fn complete(&mut self) {}

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

struct GatedSourceObserver<Item, Err> {
  shared: SharedObserver<Item, Err>,
  state: MutRc<GateState<Item>>,
}

impl<Item, Err> Observer<Item, Err> for GatedSourceObserver<Item, Err>
where
  Item: 'static,
{
  fn next(&mut self, value: Item) {
    let flowing = self.state.rc_deref().flowing;
    if flowing {
      self.shared.next(value);
    } else {
      self.state.rc_deref_mut().buffer.push_back(value);
    }
  }

  fn error(&mut self, err: Err) {
    flush(&self.state, &mut self.shared);
    self.shared.error(err);
  }

  fn complete(&mut self) {
    flush(&self.state, &mut self.shared);
    self.shared.complete();
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}

#[cfg(test)]
mod test {
  use std::{cell::RefCell, rc::Rc};

  use crate::prelude::*;

  #[test]
  fn buffers_while_shut_and_flushes_on_open() {
    let seen: Rc<RefCell<Vec<i32>>> = Rc::default();
    let mut source = Subject::<i32, ()>::new();
    let mut gate = Subject::<bool, ()>::new();
    let inspect = seen.clone();
    let _sub = source
      .clone()
      .pausable_buffered(gate.clone())
      .subscribe(move |v| inspect.borrow_mut().push(v));
    source.next(1);
    source.next(2);
    assert!(seen.borrow().is_empty());
    gate.next(true);
    assert_eq!(*seen.borrow(), vec![1, 2]);
    source.next(3);
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    gate.next(false);
    source.next(4);
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    gate.next(true);
    assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
  }

  #[test]
  fn completion_flushes_whatever_is_buffered() {
    let seen: Rc<RefCell<Vec<i32>>> = Rc::default();
    let done = Rc::new(RefCell::new(false));
    let mut source = Subject::<i32, ()>::new();
    let gate = Subject::<bool, ()>::new();
    let inspect = seen.clone();
    let finished = done.clone();
    let _sub = source
      .clone()
      .pausable_buffered(gate.clone())
      .subscribe_complete(
        move |v| inspect.borrow_mut().push(v),
        move || *finished.borrow_mut() = true,
      );
    source.next(1);
    source.next(2);
    source.complete();
    assert_eq!(*seen.borrow(), vec![1, 2]);
    assert!(*done.borrow());
  }
}
