//! Operator implementations, one file per operator.
//!
//! Every operator follows the same shape: an `XxxOp` struct owning the
//! upstream source plus its parameters, and an observer struct that runs the
//! state machine. Aggregates (`sum`, `count`, `min`, `max`, `average`,
//! `reduce`) are aliases over `scan` + `last_or` + `filter_map` compositions
//! rather than bespoke state machines.

use crate::{
  observer::{BoxObserver, Observer},
  rc::{MutRc, RcDeref, RcDerefMut},
};

pub mod amb;
pub mod box_it;
pub mod buffer;
pub mod combine_latest;
pub mod delay;
pub mod distinct;
pub mod element_at;
pub mod filter;
pub mod filter_map;
pub mod first;
pub mod group_by;
pub mod join;
pub mod last;
pub mod map;
pub mod merge;
pub mod merge_all;
pub mod repeat;
pub mod scan;
pub mod skip;
pub mod skip_until;
pub mod switch_on_next;
pub mod take;
pub mod take_until;
pub mod tap;
pub mod throttle;
pub mod timeout;
pub mod window;
pub mod zip;

/// One-shot downstream slot shared by the internal observers of one
/// operator. `next` takes the observer out for the call and puts it back;
/// a terminal takes it out for good. While the observer is out (or gone),
/// siblings see `is_closed` and drop their notification, which is what
/// makes "no leaks after termination" hold without any flags.
pub(crate) struct SharedObserver<Item, Err>(
  MutRc<Option<BoxObserver<Item, Err>>>,
);

impl<Item, Err> Clone for SharedObserver<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item, Err> SharedObserver<Item, Err> {
  pub(crate) fn new(observer: BoxObserver<Item, Err>) -> Self {
    Self(MutRc::own(Some(observer)))
  }
}

impl<Item, Err> Observer<Item, Err> for SharedObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    let taken = self.0.rc_deref_mut().take();
    if let Some(mut observer) = taken {
      observer.next(value);
      let mut slot = self.0.rc_deref_mut();
      if slot.is_none() {
        *slot = Some(observer);
      }
    }
  }

  fn error(&mut self, err: Err) {
    let taken = self.0.rc_deref_mut().take();
    if let Some(mut observer) = taken {
      observer.error(err);
    }
  }

  fn complete(&mut self) {
    let taken = self.0.rc_deref_mut().take();
    if let Some(mut observer) = taken {
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool { self.0.rc_deref().is_none() }
}

use filter_map::FilterMapOp;
use last::LastOrOp;
use map::MapOp;
use scan::ScanOp;

/// `reduce` family: fold, then surface only the final accumulator.
pub type ReduceOp<Source, BinaryOp, Acc> =
  LastOrOp<ScanOp<Source, BinaryOp, Acc>, Acc>;

pub type SumOp<Source, Item> =
  ReduceOp<Source, fn(Item, Item) -> Item, Item>;

pub type CountOp<Source, Item> =
  ReduceOp<Source, fn(usize, Item) -> usize, usize>;

/// `min`/`max`: fold into `Option`, then drop the `None` of an empty source
/// so the operator completes empty instead of erroring.
pub type MinMaxOp<Source, Item> = FilterMapOp<
  ReduceOp<Source, fn(Option<Item>, Item) -> Option<Item>, Option<Item>>,
  fn(Option<Item>) -> Option<Item>,
  Item,
>;

pub type AverageOp<Source, Item> = FilterMapOp<
  ReduceOp<MapOp<Source, fn(Item) -> f64>, fn((f64, usize), f64) -> (f64, usize), (f64, usize)>,
  fn((f64, usize)) -> Option<f64>,
  f64,
>;
