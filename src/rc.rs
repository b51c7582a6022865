//! Shared interior mutability used by operator state machines.
//!
//! `MutRc<T>` is the single-threaded shared cell every stateful operator and
//! subject builds on. The `RcDeref`/`RcDerefMut` traits keep call sites
//! uniform (`state.rc_deref_mut().field`) instead of spelling out
//! `borrow`/`borrow_mut` everywhere.

use std::{
  cell::{Ref, RefCell, RefMut},
  rc::Rc,
};

pub trait RcDeref {
  type Target<'a>
  where
    Self: 'a;
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref<'a>(&'a self) -> Self::Target<'a>;
}

pub trait RcDerefMut {
  type Target<'a>
  where
    Self: 'a;
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref_mut<'a>(&'a self) -> Self::Target<'a>;
}

pub struct MutRc<T>(Rc<RefCell<T>>);

impl<T> MutRc<T> {
  pub fn own(t: T) -> Self { Self(Rc::new(RefCell::new(t))) }
}

impl<T: Default> Default for MutRc<T> {
  fn default() -> Self { Self::own(T::default()) }
}

impl<T> Clone for MutRc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> From<T> for MutRc<T> {
  #[inline]
  fn from(t: T) -> Self { Self::own(t) }
}

impl<T> RcDeref for MutRc<T> {
  type Target<'a>
    = Ref<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref<'a>(&'a self) -> Self::Target<'a> { self.0.borrow() }
}

impl<T> RcDerefMut for MutRc<T> {
  type Target<'a>
    = RefMut<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref_mut<'a>(&'a self) -> Self::Target<'a> { self.0.borrow_mut() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shared_mutation() {
    let a = MutRc::own(1);
    let b = a.clone();
    *b.rc_deref_mut() = 2;
    assert_eq!(*a.rc_deref(), 2);
  }
}
