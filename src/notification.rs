//! The event grammar of a stream, reified as a value.
//!
//! A well-formed stream delivers `Next* (Complete | Error)?`. Turning that
//! grammar into data lets the test scheduler record and replay timelines and
//! lets sources queue events for later delivery.

use crate::observer::Observer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Complete,
  Error(Err),
}

impl<Item, Err> Notification<Item, Err> {
  /// Dispatch this notification to the matching observer method.
  pub fn accept<O: Observer<Item, Err>>(self, observer: &mut O) {
    match self {
      Notification::Next(value) => observer.next(value),
      Notification::Complete => observer.complete(),
      Notification::Error(err) => observer.error(err),
    }
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, Notification::Next(_))
  }
}
