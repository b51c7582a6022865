//! A push-based reactive streams library on a virtual clock.
//!
//! Streams are values: an operator chain is an ordinary struct composition
//! that does nothing until [`subscribe`](observable::ObservableExt::subscribe)
//! consumes it. Every notification follows the grammar
//! `next* (complete | error)?`, and delivering the terminal releases every
//! resource the chain acquired.
//!
//! Time never comes from the wall clock. Operators that wait take a
//! [`Scheduler`](scheduler::Scheduler), and the
//! [`TestScheduler`](scheduler::test_scheduler::TestScheduler) runs whole
//! timing scenarios deterministically:
//!
//! ```
//! use rxr::prelude::*;
//! use rxr::scheduler::test_scheduler::{complete, next, TestScheduler};
//!
//! let scheduler = TestScheduler::new();
//! let source = scheduler.create_hot_observable(vec![
//!   next(210, 2),
//!   next(220, 3),
//!   complete::<i32, ()>(230),
//! ]);
//! let src = source.clone();
//! let observed = scheduler.start(move || src.map(|v| v * 10));
//! assert_eq!(
//!   observed.messages(),
//!   vec![next(210, 20), next(220, 30), complete(230)]
//! );
//! ```

pub mod backpressure;
pub mod error;
pub mod notification;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscription;
