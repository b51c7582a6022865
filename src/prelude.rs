//! One import for everyday use: `use rxr::prelude::*;`.

pub use crate::backpressure::{
  ControlledObservable, RequestHandle, WindowedObservable,
};
pub use crate::error::RxError;
pub use crate::notification::Notification;
pub use crate::observable::{self, Observable, ObservableExt};
pub use crate::observer::{BoxObserver, FnObserver, Observer};
pub use crate::ops::box_it::BoxObservable;
pub use crate::ops::group_by::GroupedObservable;
pub use crate::rc::{MutRc, RcDeref, RcDerefMut};
pub use crate::scheduler::{Scheduler, VirtualTime, VirtualTimeScheduler};
pub use crate::subject::{
  AsyncSubject, BehaviorSubject, ReplaySubject, Subject,
};
pub use crate::subscription::{
  BoxSubscription, MultiSubscription, RefCountHandle, RefCountSubscription,
  SerialSubscription, SingleSubscription, SubscriptionLike,
};
