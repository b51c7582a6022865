//! Cancellation tokens.
//!
//! Subscribing to an observable hands back a subscription; unsubscribing it
//! severs the upstream chain and releases every resource the chain holds.
//! The flavours below compose: operators collect their inner subscriptions
//! into a [`MultiSubscription`], swap live inner streams through a
//! [`SerialSubscription`], and share one upstream between several consumers
//! with a [`RefCountSubscription`]. Unsubscribing is always idempotent.

use crate::rc::{MutRc, RcDeref, RcDerefMut};
use smallvec::SmallVec;

pub trait SubscriptionLike {
  /// Sever the stream before it has delivered a terminal.
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

/// Type-erased subscription, for heterogeneous teardown lists.
pub struct BoxSubscription(Box<dyn SubscriptionLike>);

impl BoxSubscription {
  pub fn new(s: impl SubscriptionLike + 'static) -> Self { Self(Box::new(s)) }
}

impl SubscriptionLike for BoxSubscription {
  #[inline]
  fn unsubscribe(&mut self) { self.0.unsubscribe() }
  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// Wraps a one-shot teardown action.
pub struct SingleSubscription {
  teardown: Option<Box<dyn FnOnce()>>,
}

impl SingleSubscription {
  pub fn new(teardown: impl FnOnce() + 'static) -> Self {
    Self { teardown: Some(Box::new(teardown)) }
  }

  /// A subscription that was never connected to anything.
  pub fn empty() -> Self { Self { teardown: None } }
}

impl SubscriptionLike for SingleSubscription {
  fn unsubscribe(&mut self) {
    if let Some(teardown) = self.teardown.take() {
      teardown();
    }
  }

  fn is_closed(&self) -> bool { self.teardown.is_none() }
}

#[derive(Default)]
struct MultiInner {
  closed: bool,
  next_key: usize,
  teardown: SmallVec<[(usize, BoxSubscription); 2]>,
}

/// Composite subscription: unsubscribing it unsubscribes every member, and
/// members added afterwards are unsubscribed on arrival. Clones share the
/// same member set.
#[derive(Clone, Default)]
pub struct MultiSubscription(MutRc<MultiInner>);

impl MultiSubscription {
  /// A composite that is already closed; anything added is torn down at once.
  pub fn closed() -> Self {
    let this = Self::default();
    this.0.rc_deref_mut().closed = true;
    this
  }

  /// Add a member, returning a key usable with [`remove`](Self::remove).
  pub fn add(&self, s: impl SubscriptionLike + 'static) -> usize {
    let mut incoming = BoxSubscription::new(s);
    {
      let mut inner = self.0.rc_deref_mut();
      if !inner.closed {
        let key = inner.next_key;
        inner.next_key += 1;
        inner.teardown.push((key, incoming));
        return key;
      }
    }
    // Already closed: tear the incoming subscription down at once, outside
    // the borrow in case its teardown re-enters this composite.
    incoming.unsubscribe();
    usize::MAX
  }

  /// Remove a member by key and unsubscribe it.
  pub fn remove(&self, key: usize) {
    let removed = {
      let mut inner = self.0.rc_deref_mut();
      inner
        .teardown
        .iter()
        .position(|(k, _)| *k == key)
        .map(|at| inner.teardown.remove(at).1)
    };
    if let Some(mut sub) = removed {
      sub.unsubscribe();
    }
  }
}

impl SubscriptionLike for MultiSubscription {
  fn unsubscribe(&mut self) {
    let members = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        return;
      }
      inner.closed = true;
      std::mem::take(&mut inner.teardown)
    };
    // Run member teardowns without holding the borrow: a member may remove
    // itself or add to this composite while unwinding.
    for (_, mut sub) in members {
      sub.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.rc_deref().closed }
}

#[derive(Default)]
struct SerialInner {
  closed: bool,
  current: Option<BoxSubscription>,
}

/// A mutable slot holding at most one subscription. Assigning a replacement
/// unsubscribes the previous occupant; assigning into a slot that was itself
/// unsubscribed tears the incoming subscription down immediately.
#[derive(Clone, Default)]
pub struct SerialSubscription(MutRc<SerialInner>);

impl SerialSubscription {
  pub fn set(&self, s: impl SubscriptionLike + 'static) {
    let mut incoming = BoxSubscription::new(s);
    let closed = self.0.rc_deref().closed;
    if closed {
      incoming.unsubscribe();
      return;
    }
    let previous = self.0.rc_deref_mut().current.replace(incoming);
    if let Some(mut previous) = previous {
      previous.unsubscribe();
    }
  }
}

impl SubscriptionLike for SerialSubscription {
  fn unsubscribe(&mut self) {
    let current = {
      let mut inner = self.0.rc_deref_mut();
      if inner.closed {
        return;
      }
      inner.closed = true;
      inner.current.take()
    };
    if let Some(mut current) = current {
      current.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool { self.0.rc_deref().closed }
}

struct RefCountInner {
  count: usize,
  primary_closed: bool,
  underlying: Option<BoxSubscription>,
}

/// Shares one underlying subscription between several handles; the
/// underlying unsubscribes once the primary is closed and every acquired
/// handle has been released.
#[derive(Clone)]
pub struct RefCountSubscription(MutRc<RefCountInner>);

impl RefCountSubscription {
  pub fn new(underlying: impl SubscriptionLike + 'static) -> Self {
    Self(MutRc::own(RefCountInner {
      count: 0,
      primary_closed: false,
      underlying: Some(BoxSubscription::new(underlying)),
    }))
  }

  pub fn acquire(&self) -> RefCountHandle {
    let mut inner = self.0.rc_deref_mut();
    let released = inner.underlying.is_none();
    if !released {
      inner.count += 1;
    }
    RefCountHandle { parent: self.0.clone(), released }
  }

  fn release_if_done(rc: &MutRc<RefCountInner>) {
    let underlying = {
      let mut inner = rc.rc_deref_mut();
      if inner.primary_closed && inner.count == 0 {
        inner.underlying.take()
      } else {
        None
      }
    };
    if let Some(mut underlying) = underlying {
      underlying.unsubscribe();
    }
  }
}

impl SubscriptionLike for RefCountSubscription {
  fn unsubscribe(&mut self) {
    self.0.rc_deref_mut().primary_closed = true;
    Self::release_if_done(&self.0);
  }

  fn is_closed(&self) -> bool { self.0.rc_deref().underlying.is_none() }
}

pub struct RefCountHandle {
  parent: MutRc<RefCountInner>,
  released: bool,
}

impl SubscriptionLike for RefCountHandle {
  fn unsubscribe(&mut self) {
    if self.released {
      return;
    }
    self.released = true;
    self.parent.rc_deref_mut().count -= 1;
    RefCountSubscription::release_if_done(&self.parent);
  }

  fn is_closed(&self) -> bool { self.released }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{cell::Cell, rc::Rc};

  fn counter() -> (Rc<Cell<usize>>, impl Fn() -> SingleSubscription) {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    (count, move || {
      let c = c.clone();
      SingleSubscription::new(move || c.set(c.get() + 1))
    })
  }

  #[test]
  fn single_is_idempotent() {
    let (count, single) = counter();
    let mut s = single();
    s.unsubscribe();
    s.unsubscribe();
    assert_eq!(count.get(), 1);
    assert!(s.is_closed());
  }

  #[test]
  fn multi_unsubscribes_members() {
    let (count, single) = counter();
    let mut multi = MultiSubscription::default();
    multi.add(single());
    multi.add(single());
    multi.unsubscribe();
    assert_eq!(count.get(), 2);
    // Late additions are torn down on arrival.
    multi.add(single());
    assert_eq!(count.get(), 3);
    multi.unsubscribe();
    assert_eq!(count.get(), 3);
  }

  #[test]
  fn multi_remove_unsubscribes_the_member() {
    let (count, single) = counter();
    let multi = MultiSubscription::default();
    let key = multi.add(single());
    multi.add(single());
    multi.remove(key);
    assert_eq!(count.get(), 1);
  }

  #[test]
  fn serial_replaces_previous() {
    let (count, single) = counter();
    let serial = SerialSubscription::default();
    serial.set(single());
    assert_eq!(count.get(), 0);
    serial.set(single());
    assert_eq!(count.get(), 1);
    let mut handle = serial.clone();
    handle.unsubscribe();
    assert_eq!(count.get(), 2);
    // The slot itself is closed now; assignments die on arrival.
    serial.set(single());
    assert_eq!(count.get(), 3);
  }

  #[test]
  fn refcount_waits_for_all_handles() {
    let (count, single) = counter();
    let mut rc = RefCountSubscription::new(single());
    let mut a = rc.acquire();
    let mut b = rc.acquire();
    rc.unsubscribe();
    assert_eq!(count.get(), 0);
    a.unsubscribe();
    a.unsubscribe();
    assert_eq!(count.get(), 0);
    b.unsubscribe();
    assert_eq!(count.get(), 1);
    assert!(rc.is_closed());
  }
}
