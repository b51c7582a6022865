use std::collections::HashMap;
use std::hash::Hash;

use crate::{
  observable::Observable,
  observer::{BoxObserver, Observer},
  ops::SharedObserver,
  subject::Subject,
  subscription::MultiSubscription,
};

/// Demultiplexes a stream into per-key substreams. The first value seen for
/// a key surfaces a new [`GroupedObservable`] downstream; every value is
/// then routed into its group. Terminals reach every open group before the
/// outer stream.
#[derive(Clone)]
pub struct GroupByOp<S, KeySelector> {
  pub(crate) source: S,
  pub(crate) key_selector: KeySelector,
}

/// One substream of `group_by`, tagged with the key that selected it.
#[derive(Clone)]
pub struct GroupedObservable<Key, Item, Err> {
  key: Key,
  subject: Subject<Item, Err>,
}

impl<Key, Item, Err> GroupedObservable<Key, Item, Err> {
  pub fn key(&self) -> &Key { &self.key }
}

impl<Key, Item, Err> Observable for GroupedObservable<Key, Item, Err>
where
  Key: 'static,
  Item: Clone + 'static,
  Err: Clone + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.subject.actual_subscribe(observer)
  }
}

impl<S, KeySelector, Key> Observable for GroupByOp<S, KeySelector>
where
  S: Observable,
  S::Item: Clone,
  S::Err: Clone,
  KeySelector: FnMut(&S::Item) -> Key + 'static,
  Key: Clone + Eq + Hash + 'static,
{
  type Item = GroupedObservable<Key, S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe(
    self,
    observer: BoxObserver<Self::Item, Self::Err>,
  ) -> MultiSubscription {
    self.source.actual_subscribe(Box::new(GroupByObserver {
      shared: SharedObserver::new(observer),
      key_selector: self.key_selector,
      groups: HashMap::new(),
    }))
  }
}

struct GroupByObserver<Key, Item, Err, KeySelector> {
  shared: SharedObserver<GroupedObservable<Key, Item, Err>, Err>,
  key_selector: KeySelector,
  groups: HashMap<Key, Subject<Item, Err>>,
}

impl<Key, Item, Err, KeySelector> Observer<Item, Err>
  for GroupByObserver<Key, Item, Err, KeySelector>
where
  Key: Clone + Eq + Hash + 'static,
  Item: Clone + 'static,
  Err: Clone + 'static,
  KeySelector: FnMut(&Item) -> Key,
{
  fn next(&mut self, value: Item) {
    let key = (self.key_selector)(&value);
    let mut subject = match self.groups.get(&key) {
      Some(subject) => subject.clone(),
      None => {
        let subject = Subject::new();
        self.groups.insert(key.clone(), subject.clone());
        self.shared.next(GroupedObservable {
          key,
          subject: subject.clone(),
        });
        subject
      }
    };
    subject.next(value);
  }

  fn error(&mut self, err: Err) {
    for (_, mut subject) in self.groups.drain() {
      subject.error(err.clone());
    }
    self.shared.error(err);
  }

  fn complete(&mut self) {
    for (_, mut subject) in self.groups.drain() {
      subject.complete();
    }
    self.shared.complete();
  }

  fn is_closed(&self) -> bool { self.shared.is_closed() }
}
