/*!

Reference counted pointers to shared mutable state, and the complementary weak pointers.

`RcCell<T>` is the strong handle: cloning it is cheap and all clones see the same value.
`WeakCell<T>` is the non-owning companion. Upgrading a `WeakCell` whose last strong handle has
been dropped yields `None`, never undefined behavior, which is how the rest of the project turns
dangling references into error values instead of crashes.

*/

use std::{
  cell::{Ref, RefCell, RefMut},
  rc::{Rc, Weak},
};

pub struct RcCell<T: ?Sized>(Rc<RefCell<T>>);

impl<T> RcCell<T> {
  pub fn new(value: T) -> Self {
    RcCell(Rc::new(RefCell::new(value)))
  }
}

impl<T: ?Sized> RcCell<T> {
  #[inline(always)]
  pub fn borrow(&self) -> Ref<'_, T> {
    self.0.borrow()
  }

  #[inline(always)]
  pub fn borrow_mut(&self) -> RefMut<'_, T> {
    self.0.borrow_mut()
  }

  #[inline(always)]
  pub fn downgrade(&self) -> WeakCell<T> {
    WeakCell(Rc::downgrade(&self.0))
  }

  /// Address-based identity. Two handles are the same cell iff their addresses agree.
  #[inline(always)]
  pub fn addr(&self) -> usize {
    Rc::as_ptr(&self.0) as *const () as usize
  }

  #[inline(always)]
  pub fn ptr_eq(&self, other: &RcCell<T>) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  #[inline(always)]
  pub fn strong_count(&self) -> usize {
    Rc::strong_count(&self.0)
  }
}

impl<T: ?Sized> Clone for RcCell<T> {
  fn clone(&self) -> Self {
    RcCell(Rc::clone(&self.0))
  }
}

impl<T: Default> Default for RcCell<T> {
  fn default() -> Self {
    RcCell::new(T::default())
  }
}

pub struct WeakCell<T: ?Sized>(Weak<RefCell<T>>);

impl<T> WeakCell<T> {
  /// A weak cell that upgrades to `None`. Useful as a placeholder before the strong
  /// handle exists.
  pub fn empty() -> Self {
    WeakCell(Weak::new())
  }
}

impl<T: ?Sized> WeakCell<T> {
  #[inline(always)]
  pub fn upgrade(&self) -> Option<RcCell<T>> {
    self.0.upgrade().map(RcCell)
  }

  #[inline(always)]
  pub fn ptr_eq(&self, other: &WeakCell<T>) -> bool {
    Weak::ptr_eq(&self.0, &other.0)
  }
}

impl<T: ?Sized> Clone for WeakCell<T> {
  fn clone(&self) -> Self {
    WeakCell(Weak::clone(&self.0))
  }
}

impl<T> Default for WeakCell<T> {
  fn default() -> Self {
    WeakCell::empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_state() {
    let cell = RcCell::new(1);
    let other = cell.clone();
    *other.borrow_mut() = 2;
    assert_eq!(*cell.borrow(), 2);
    assert!(cell.ptr_eq(&other));
  }

  #[test]
  fn weak_upgrade_fails_after_drop() {
    let weak = {
      let cell = RcCell::new("transient");
      cell.downgrade()
    };
    assert!(weak.upgrade().is_none());

    let cell = RcCell::new("live");
    let weak = cell.downgrade();
    assert!(weak.upgrade().is_some());
  }
}
