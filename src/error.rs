//! Errors the library itself can inject into a stream.
//!
//! Streams stay generic over their error type; operators that synthesize an
//! error (`timeout_with_mapper`, `first`, `element_at`, ...) only require
//! `Err: From<RxError>` so user error types can absorb these alongside their
//! own variants.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxError {
  /// A timeout window elapsed before the source produced a value.
  Timeout,
  /// A positional query (`first`, `last`, `reduce` without a seed) ran
  /// against a source that completed without emitting.
  EmptySequence,
  /// `element_at` ran past the end of the source.
  ArgumentOutOfRange,
  /// A subject was used after `dispose`. This one is raised by panicking at
  /// the call site rather than travelling down the error channel: it is a
  /// protocol violation by the caller, not a stream failure.
  SubjectDisposed,
}

impl fmt::Display for RxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RxError::Timeout => write!(f, "timeout elapsed before a value arrived"),
      RxError::EmptySequence => write!(f, "sequence contains no elements"),
      RxError::ArgumentOutOfRange => write!(f, "argument out of range"),
      RxError::SubjectDisposed => write!(f, "subject accessed after dispose"),
    }
  }
}

impl std::error::Error for RxError {}
