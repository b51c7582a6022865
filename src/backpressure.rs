//! Pull-flavored adapters over push streams.
//!
//! A push source can outrun its consumer. The adapters here put a valve
//! between the two: [`controlled`](crate::observable::ObservableExt::controlled)
//! buffers values until the consumer asks for them, and
//! [`pausable_buffered`](crate::observable::ObservableExt::pausable_buffered)
//! gates the flow on a boolean side channel while buffering whatever
//! arrives during a pause.

pub mod controlled;
pub mod pausable_buffered;

pub use controlled::{ControlledObservable, RequestHandle, WindowedObservable};
pub use pausable_buffered::PausableBufferedOp;
